use crate::error::{CatalogError, Result};
use crate::types::SemanticType;
use std::fmt;

/// How an argument is supplied at a call site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    Positional,
    Keyword,
    /// `*name`: any number of positional arguments
    Variadic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub ty: SemanticType,
    pub kind: ParamKind,
    pub has_default: bool,
}

impl Parameter {
    pub fn positional(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParamKind::Positional,
            has_default: false,
        }
    }

    pub fn keyword(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParamKind::Keyword,
            has_default: true,
        }
    }

    pub fn variadic(name: impl Into<String>, ty: SemanticType) -> Self {
        Self {
            name: name.into(),
            ty,
            kind: ParamKind::Variadic,
            has_default: false,
        }
    }

    /// Supplied as `name : value`. Variadic parameters never are.
    pub fn is_keyword(&self) -> bool {
        self.kind == ParamKind::Keyword
    }

    /// Parse a declaration such as `name: Type`, `name: Type = None` or
    /// `*name: Type`. `after_variadic` turns plain parameters keyword-only.
    pub fn parse_decl(decl: &str, after_variadic: bool) -> Result<Self> {
        let trimmed = decl.trim();
        let (variadic, rest) = match trimmed.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (name, type_part) = rest
            .split_once(':')
            .ok_or_else(|| CatalogError::invalid_parameter(decl, "missing ':' before the type"))?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(CatalogError::invalid_parameter(decl, "invalid parameter name"));
        }
        let (type_expr, has_default) = match type_part.split_once('=') {
            Some((ty, _default)) => (ty, true),
            None => (type_part, false),
        };
        let ty = SemanticType::parse(type_expr.trim())?;

        let kind = if variadic {
            if has_default {
                return Err(CatalogError::invalid_parameter(
                    decl,
                    "variadic parameters cannot have a default",
                ));
            }
            ParamKind::Variadic
        } else if has_default || after_variadic {
            ParamKind::Keyword
        } else {
            ParamKind::Positional
        };

        Ok(Self {
            name: name.to_string(),
            ty,
            kind,
            has_default,
        })
    }

    /// Parse an ordered declaration list, applying the keyword-only rule
    pub fn parse_list<S: AsRef<str>>(decls: &[S]) -> Result<Vec<Self>> {
        let mut params = Vec::with_capacity(decls.len());
        let mut after_variadic = false;
        for decl in decls {
            let param = Self::parse_decl(decl.as_ref(), after_variadic)?;
            after_variadic |= param.kind == ParamKind::Variadic;
            params.push(param);
        }
        Ok(params)
    }
}

/// One overload of a function or method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    /// Receiver type for methods
    pub receiver: Option<String>,
    pub params: Vec<Parameter>,
    pub returns: SemanticType,
}

impl Signature {
    pub fn function(name: impl Into<String>, params: Vec<Parameter>, returns: SemanticType) -> Self {
        Self {
            name: name.into(),
            receiver: None,
            params,
            returns,
        }
    }

    pub fn method(
        receiver: impl Into<String>,
        name: impl Into<String>,
        params: Vec<Parameter>,
        returns: SemanticType,
    ) -> Self {
        Self {
            name: name.into(),
            receiver: Some(receiver.into()),
            params,
            returns,
        }
    }

    /// `name` for functions, `Receiver.name` for methods
    pub fn callable_id(&self) -> String {
        callable_id(self.receiver.as_deref(), &self.name)
    }
}

pub fn callable_id(receiver: Option<&str>, name: &str) -> String {
    match receiver {
        Some(receiver) => format!("{receiver}.{name}"),
        None => name.to_string(),
    }
}

/// Render `name(a : String, *Number)`-style listings of parameter types.
pub fn describe_params<'a, I>(params: I) -> String
where
    I: IntoIterator<Item = (&'a Parameter, &'a SemanticType)>,
{
    params
        .into_iter()
        .map(|(param, ty)| match param.kind {
            ParamKind::Keyword => format!("{} : {ty}", param.name),
            ParamKind::Variadic => format!("*{ty}"),
            ParamKind::Positional => ty.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = describe_params(self.params.iter().map(|p| (p, &p.ty)));
        write!(f, "{}({params}) -> {}", self.callable_id(), self.returns)
    }
}
