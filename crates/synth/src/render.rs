use crate::combinator::Combination;
use crate::error::{Result, SynthError};
use sigcheck_catalog::Signature;
use sigcheck_templates::{OverrideContext, TemplateCatalog};
use std::collections::HashMap;

/// Methods spelled as operators in the build language, with their arity
const RESERVED_OPERATIONS: &[(&str, usize)] = &[
    ("__add__", 1),
    ("__sub__", 1),
    ("__mult__", 1),
    ("__div__", 1),
    ("__mod__", 1),
    ("__getitem__", 1),
    ("__setitem__", 2),
    ("__contains__", 1),
];

pub fn reserved_arity(name: &str) -> Option<usize> {
    RESERVED_OPERATIONS
        .iter()
        .find(|(op, _)| *op == name)
        .map(|&(_, arity)| arity)
}

/// Turns a combination into the source lines of one call.
///
/// Function form renders `name(args)`, method form `receiver.name(args)`
/// or the operator spelling of reserved methods.
#[derive(Debug, Clone)]
pub struct CallRenderer<'t> {
    templates: &'t TemplateCatalog,
    name: String,
    receiver: Option<String>,
    override_ids: Vec<String>,
    bound: HashMap<String, String>,
}

impl<'t> CallRenderer<'t> {
    pub fn function(templates: &'t TemplateCatalog, signature: &Signature) -> Self {
        Self {
            templates,
            name: signature.name.clone(),
            receiver: None,
            override_ids: vec![signature.callable_id()],
            bound: HashMap::new(),
        }
    }

    /// Method call on the variable `receiver`
    pub fn method(
        templates: &'t TemplateCatalog,
        signature: &Signature,
        receiver: impl Into<String>,
    ) -> Self {
        Self {
            templates,
            name: signature.name.clone(),
            receiver: Some(receiver.into()),
            override_ids: vec![signature.callable_id()],
            bound: HashMap::new(),
        }
    }

    /// Consult overrides of `id` before those of the declaring callable
    pub fn prefer_overrides_of(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.override_ids.contains(&id) {
            self.override_ids.insert(0, id);
        }
        self
    }

    /// Pass `token` for parameter `param` instead of a fresh literal
    pub fn bind(mut self, param: impl Into<String>, token: impl Into<String>) -> Self {
        self.bound.insert(param.into(), token.into());
        self
    }

    fn context(&self, param: &str) -> OverrideContext {
        let mut ids = self.override_ids.iter();
        let ctx = match ids.next() {
            Some(first) => OverrideContext::for_callable(first.clone()),
            None => OverrideContext::none(),
        };
        ids.fold(ctx, |ctx, id| ctx.or_callable(id.clone()))
            .with_param(param)
    }

    /// Render setup lines plus the call line. With `inline`, literals go
    /// straight into the argument list and no setup lines are emitted.
    pub fn render(
        &self,
        combination: &Combination<'_>,
        bind_return_as: Option<&str>,
        inline: bool,
    ) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        let mut tokens = Vec::with_capacity(combination.len());
        for arg in &combination.args {
            let name = &arg.param.name;
            let token = match self.bound.get(name) {
                Some(token) => token.clone(),
                None => {
                    let literal = self.templates.resolve(&arg.ty, &self.context(name))?;
                    if inline {
                        literal
                    } else {
                        let var = self.templates.fresh_name();
                        lines.push(format!("{var} = {literal}"));
                        var
                    }
                }
            };
            if arg.param.is_keyword() {
                tokens.push(format!("{name} : {token}"));
            } else {
                tokens.push(token);
            }
        }

        let call = self.call_expression(&tokens)?;
        lines.push(match bind_return_as {
            Some(ret) => format!("{ret} = {call}"),
            None => call,
        });
        Ok(lines)
    }

    fn call_expression(&self, tokens: &[String]) -> Result<String> {
        let Some(receiver) = &self.receiver else {
            return Ok(format!("{}({})", self.name, tokens.join(",")));
        };
        if let Some(expected) = reserved_arity(&self.name) {
            if tokens.len() != expected {
                return Err(SynthError::ArityMismatch {
                    op: self.name.clone(),
                    expected,
                    found: tokens.len(),
                });
            }
        }
        let expr = match self.name.as_str() {
            "__add__" => format!("{receiver} + {}", tokens[0]),
            "__sub__" => format!("{receiver} - {}", tokens[0]),
            "__mult__" => format!("{receiver} * {}", tokens[0]),
            "__div__" => format!("{receiver} / {}", tokens[0]),
            "__mod__" => format!("{receiver} % {}", tokens[0]),
            "__getitem__" => format!("{receiver}[{}]", tokens[0]),
            "__setitem__" => format!("{receiver}[{}] = {}", tokens[0], tokens[1]),
            "__contains__" => format!("{} in {receiver}", tokens[0]),
            _ => format!("{receiver}.{}({})", self.name, tokens.join(",")),
        };
        Ok(expr)
    }
}
