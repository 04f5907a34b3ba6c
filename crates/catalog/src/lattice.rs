use crate::error::{CatalogError, Result};
use crate::types::SemanticType;
use std::collections::{HashMap, HashSet};

/// How a parameter type admits a value of a given type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// The value can be passed as-is
    Direct,
    /// The value must be wrapped as an element of an array literal
    Element,
}

/// Subtyping relation over named types, precomputed from `(name, parent)` pairs.
#[derive(Debug, Clone, Default)]
pub struct TypeLattice {
    /// name -> ancestors (including the name itself), nearest first
    ancestors: HashMap<String, Vec<String>>,
}

impl TypeLattice {
    pub fn new<I, N, P>(descriptors: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, Option<P>)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut parents: HashMap<String, Option<String>> = HashMap::new();
        let mut order = Vec::new();
        for (name, parent) in descriptors {
            let name = name.into();
            if parents.contains_key(&name) {
                return Err(CatalogError::DuplicateType(name));
            }
            order.push(name.clone());
            parents.insert(name, parent.map(Into::into));
        }

        let mut ancestors = HashMap::with_capacity(order.len());
        for name in &order {
            let mut chain = vec![name.clone()];
            let mut seen: HashSet<&str> = HashSet::from([name.as_str()]);
            let mut current = name.as_str();
            while let Some(Some(parent)) = parents.get(current) {
                if !parents.contains_key(parent) {
                    return Err(CatalogError::UnknownParent {
                        name: current.to_string(),
                        parent: parent.clone(),
                    });
                }
                if !seen.insert(parent.as_str()) {
                    return Err(CatalogError::Cycle(name.clone()));
                }
                chain.push(parent.clone());
                current = parent.as_str();
            }
            ancestors.insert(name.clone(), chain);
        }

        Ok(Self { ancestors })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ancestors.contains_key(name)
    }

    /// Ancestor chain of `name`, starting with `name` itself
    pub fn ancestors(&self, name: &str) -> &[String] {
        self.ancestors.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// Reflexive subtyping between named types. Unknown names are only
    /// related to themselves.
    pub fn is_named_subtype(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.ancestors(sub).iter().any(|a| a == sup)
    }

    /// Structural subtyping: unions on the left need every arm to fit,
    /// unions on the right need one arm to accept, arrays are covariant.
    pub fn is_subtype(&self, sub: &SemanticType, sup: &SemanticType) -> bool {
        use SemanticType::*;
        match (sub, sup) {
            (_, Any) => true,
            (Union(arms), _) => arms.iter().all(|arm| self.is_subtype(arm, sup)),
            (_, Union(arms)) => arms.iter().any(|arm| self.is_subtype(sub, arm)),
            (Named(a), Named(b)) => self.is_named_subtype(a, b),
            (Array(_), Array(None)) | (Array(None), Array(Some(_))) => true,
            (Array(Some(a)), Array(Some(b))) => self.is_subtype(a, b),
            (NoneMarker, NoneMarker) => true,
            _ => false,
        }
    }

    /// Whether a parameter declared as `declared` can receive a value of
    /// type `value`, either directly or as an array element. Unconstrained
    /// declarations never count.
    pub fn containment(
        &self,
        declared: &SemanticType,
        value: &SemanticType,
    ) -> Option<Containment> {
        match declared {
            SemanticType::Any | SemanticType::NoneMarker => None,
            SemanticType::Union(arms) => arms
                .iter()
                .filter_map(|arm| self.containment(arm, value))
                .min_by_key(|c| matches!(c, Containment::Element)),
            SemanticType::Named(_) => self
                .is_subtype(value, declared)
                .then_some(Containment::Direct),
            SemanticType::Array(elem) => {
                if matches!(value, SemanticType::Array(_)) && self.is_subtype(value, declared) {
                    return Some(Containment::Direct);
                }
                let elem = elem.as_deref()?;
                self.containment(elem, value).map(|_| Containment::Element)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lattice() -> TypeLattice {
        TypeLattice::new([
            ("File", None),
            ("Target", Some("File")),
            ("BuildTarget", Some("Target")),
            ("Executable", Some("BuildTarget")),
            ("Library", Some("BuildTarget")),
            ("String", None),
            ("Number", None),
        ])
        .unwrap()
    }

    fn ty(expr: &str) -> SemanticType {
        SemanticType::parse(expr).unwrap()
    }

    #[test]
    fn test_named_chain() {
        let l = lattice();
        assert!(l.is_named_subtype("Executable", "File"));
        assert!(l.is_named_subtype("Executable", "Executable"));
        assert!(!l.is_named_subtype("File", "Executable"));
        assert!(!l.is_named_subtype("Library", "Executable"));
        assert_eq!(l.ancestors("Executable"), ["Executable", "BuildTarget", "Target", "File"]);
    }

    #[test]
    fn test_generic_containment() {
        let l = lattice();
        assert!(l.is_subtype(&ty("Array[Executable]"), &ty("Array[Target]")));
        assert!(!l.is_subtype(&ty("Array[File]"), &ty("Array[Target]")));
        assert!(l.is_subtype(&ty("Executable"), &ty("Union[String,Target]")));
        assert!(l.is_subtype(&ty("Union[Executable,Library]"), &ty("Target")));
        assert!(!l.is_subtype(&ty("Union[Executable,String]"), &ty("Target")));
        assert!(l.is_subtype(&ty("Array[String]"), &ty("Array")));
        assert!(l.is_subtype(&ty("Number"), &ty("Any")));
    }

    #[test]
    fn test_containment_kinds() {
        let l = lattice();
        assert_eq!(
            l.containment(&ty("Target"), &ty("Executable")),
            Some(Containment::Direct)
        );
        assert_eq!(
            l.containment(&ty("Array[Union[String,Target]]"), &ty("Executable")),
            Some(Containment::Element)
        );
        assert_eq!(
            l.containment(&ty("Union[Array[File],Executable]"), &ty("Executable")),
            Some(Containment::Direct)
        );
        assert_eq!(l.containment(&ty("Any"), &ty("Executable")), None);
        assert_eq!(l.containment(&ty("Array"), &ty("Executable")), None);
        assert_eq!(l.containment(&ty("String"), &ty("Executable")), None);
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let err = TypeLattice::new([("Jar", Some("Missing"))]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownParent { .. }));
    }

    #[test]
    fn test_cycle_rejected() {
        let err = TypeLattice::new([("A", Some("B")), ("B", Some("A"))]).unwrap_err();
        assert!(matches!(err, CatalogError::Cycle(_)));
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = TypeLattice::new([("A", None::<&str>), ("A", None)]).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateType(_)));
    }
}
