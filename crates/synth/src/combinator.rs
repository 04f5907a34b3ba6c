use sigcheck_catalog::{describe_params, Parameter, SemanticType, Signature};

/// One argument of a combination: the declared parameter and the concrete
/// type chosen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument<'a> {
    pub param: &'a Parameter,
    pub ty: SemanticType,
}

/// A concrete parameter-type assignment for one call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Combination<'a> {
    pub args: Vec<Argument<'a>>,
    /// Set once an absent-argument arm was chosen
    keyword_only: bool,
}

impl<'a> Combination<'a> {
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn get(&self, param: &str) -> Option<&Argument<'a>> {
        self.args.iter().find(|arg| arg.param.name == param)
    }

    /// `name(a : String, Number)`
    pub fn describe(&self, callable: &str) -> String {
        let params = describe_params(self.args.iter().map(|arg| (arg.param, &arg.ty)));
        format!("{callable}({params})")
    }

    fn push(&mut self, param: &'a Parameter, ty: &SemanticType) {
        if ty.is_none_marker() {
            self.keyword_only = true;
            return;
        }
        if self.keyword_only && !param.is_keyword() {
            return;
        }
        let ty = match ty {
            SemanticType::Any => SemanticType::named(UNCONSTRAINED_STAND_IN),
            other => other.clone(),
        };
        self.args.push(Argument { param, ty });
    }
}

/// Concrete type used wherever a parameter accepts anything
pub const UNCONSTRAINED_STAND_IN: &str = "Number";

/// Every parameter-type combination a signature permits.
///
/// Union parameters fan out one combination per arm, in arm order. An
/// absent (`None`) arm is not materialized; it makes the rest of that
/// combination keyword-only, so later positional and variadic parameters
/// are dropped from it. The result has exactly the product of all union
/// arities as its length and is never truncated here.
pub fn combinations(signature: &Signature) -> Vec<Combination<'_>> {
    let mut combos = vec![Combination::default()];
    for param in &signature.params {
        match &param.ty {
            SemanticType::Union(arms) => {
                let mut next = Vec::with_capacity(combos.len() * arms.len());
                for combo in &combos {
                    for arm in arms {
                        let mut branch = combo.clone();
                        branch.push(param, arm);
                        next.push(branch);
                    }
                }
                combos = next;
            }
            ty => {
                for combo in &mut combos {
                    combo.push(param, ty);
                }
            }
        }
    }
    combos
}

/// Expected number of combinations: product of union arities
pub fn combination_count(signature: &Signature) -> usize {
    signature
        .params
        .iter()
        .map(|p| match &p.ty {
            SemanticType::Union(arms) => arms.len(),
            _ => 1,
        })
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sig(decls: &[&str]) -> Signature {
        Signature::function(
            "f",
            Parameter::parse_list(decls).unwrap(),
            SemanticType::NoneMarker,
        )
    }

    fn shapes(combos: &[Combination<'_>]) -> Vec<String> {
        combos.iter().map(|c| c.describe("f")).collect()
    }

    #[test]
    fn test_no_params_yields_single_empty_combination() {
        let s = sig(&[]);
        let combos = combinations(&s);
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn test_union_fans_out_per_arm() {
        let s = sig(&["name: String", "value: Union[String, Number]"]);
        assert_eq!(
            shapes(&combinations(&s)),
            vec!["f(String, String)", "f(String, Number)"]
        );
    }

    #[test]
    fn test_any_becomes_number() {
        let s = sig(&["value: Any", "other: Union[Any, String]"]);
        assert_eq!(
            shapes(&combinations(&s)),
            vec!["f(Number, Number)", "f(Number, String)"]
        );
    }

    #[test]
    fn test_none_arm_drops_later_positionals() {
        let s = sig(&[
            "start: Number",
            "stop: Optional[Number]",
            "step: Number",
            "*rest: String",
            "flag: Boolean = None",
        ]);
        assert_eq!(
            shapes(&combinations(&s)),
            vec![
                "f(Number, Number, Number, *String, flag : Boolean)",
                "f(Number, flag : Boolean)",
            ]
        );
    }

    #[test]
    fn test_product_of_arities() {
        let s = sig(&[
            "a: Union[String, Number]",
            "b: Union[Boolean, String, Number]",
            "c: Optional[String]",
        ]);
        assert_eq!(combination_count(&s), 12);
        assert_eq!(combinations(&s).len(), 12);
    }

    #[test]
    fn test_combinations_are_restartable() {
        let s = sig(&["a: Union[String, Number]", "b: Optional[Dict]"]);
        assert_eq!(combinations(&s), combinations(&s));
    }
}
