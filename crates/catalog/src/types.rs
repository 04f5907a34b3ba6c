use crate::error::{CatalogError, Result};
use std::fmt;
use std::str::FromStr;

/// A value category of the build-description language.
///
/// Written in catalog data as `String`, `Array[String]`,
/// `Union[String, Number]`, `Optional[T]`, `Any` or `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticType {
    /// A concrete object category (`Boolean`, `Executable`, ...)
    Named(String),
    /// A sequence, optionally constrained to an element type
    Array(Option<Box<SemanticType>>),
    /// One of several arms, in declaration order
    Union(Vec<SemanticType>),
    /// Unconstrained
    Any,
    /// The "argument absent" marker produced by `Optional[T]`
    NoneMarker,
}

impl SemanticType {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    pub fn array_of(elem: SemanticType) -> Self {
        Self::Array(Some(Box::new(elem)))
    }

    /// Parse a type expression
    pub fn parse(expr: &str) -> Result<Self> {
        let mut parser = TypeParser::new(expr);
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(CatalogError::invalid_type(
                expr,
                format!("unexpected trailing input at offset {}", parser.pos),
            ));
        }
        Ok(ty)
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    pub fn is_none_marker(&self) -> bool {
        matches!(self, Self::NoneMarker)
    }

    /// Canonical display form, used as lookup key for templates
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// Name of the type descriptor that carries methods for this type, if any
    pub fn descriptor_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Array(_) => Some("Array"),
            _ => None,
        }
    }

    /// Every `Named` type referenced by this expression
    pub fn named_types(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Named(name) => out.push(name),
            Self::Array(Some(elem)) => elem.collect_named(out),
            Self::Union(arms) => arms.iter().for_each(|arm| arm.collect_named(out)),
            _ => {}
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Array(None) => f.write_str("Array"),
            Self::Array(Some(elem)) => write!(f, "Array[{elem}]"),
            Self::Union(arms) => {
                f.write_str("Union[")?;
                for (idx, arm) in arms.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{arm}")?;
                }
                f.write_str("]")
            }
            Self::Any => f.write_str("Any"),
            Self::NoneMarker => f.write_str("None"),
        }
    }
}

impl FromStr for SemanticType {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

struct TypeParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn error(&self, reason: impl Into<String>) -> CatalogError {
        CatalogError::invalid_type(self.src, reason)
    }

    fn expect(&mut self, want: char) -> Result<()> {
        self.skip_ws();
        match self.peek() {
            Some(c) if c == want => {
                self.pos += c.len_utf8();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{want}', found '{c}'"))),
            None => Err(self.error(format!("expected '{want}', found end of input"))),
        }
    }

    fn ident(&mut self) -> Result<&'a str> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error(format!("expected a type name at offset {start}")));
        }
        Ok(&self.src[start..self.pos])
    }

    fn args(&mut self) -> Result<Vec<SemanticType>> {
        self.expect('[')?;
        let mut args = vec![self.parse_type()?];
        loop {
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.pos += 1;
                    args.push(self.parse_type()?);
                }
                Some(']') => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(self.error("unterminated argument list")),
            }
        }
    }

    fn has_args(&mut self) -> bool {
        self.skip_ws();
        self.peek() == Some('[')
    }

    fn parse_type(&mut self) -> Result<SemanticType> {
        let name = self.ident()?;
        match name {
            "Any" => Ok(SemanticType::Any),
            "None" => Ok(SemanticType::NoneMarker),
            "Array" => {
                if !self.has_args() {
                    return Ok(SemanticType::Array(None));
                }
                let mut args = self.args()?;
                if args.len() != 1 {
                    return Err(self.error("Array takes exactly one element type"));
                }
                Ok(SemanticType::array_of(args.remove(0)))
            }
            "Union" => {
                let args = self.args()?;
                Ok(flatten_union(args))
            }
            "Optional" => {
                let mut args = self.args()?;
                if args.len() != 1 {
                    return Err(self.error("Optional takes exactly one type"));
                }
                let inner = args.remove(0);
                Ok(flatten_union(vec![inner, SemanticType::NoneMarker]))
            }
            other => {
                if self.has_args() {
                    return Err(self.error(format!("'{other}' is not generic")));
                }
                Ok(SemanticType::named(other))
            }
        }
    }
}

/// Nested unions are flattened and duplicate arms dropped, keeping first occurrence.
fn flatten_union(arms: Vec<SemanticType>) -> SemanticType {
    let mut flat: Vec<SemanticType> = Vec::with_capacity(arms.len());
    for arm in arms {
        let inner = match arm {
            SemanticType::Union(nested) => nested,
            single => vec![single],
        };
        for ty in inner {
            if !flat.contains(&ty) {
                flat.push(ty);
            }
        }
    }
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        SemanticType::Union(flat)
    }
}
