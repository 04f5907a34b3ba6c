use crate::combinator::combinations;
use crate::error::Result;
use crate::render::CallRenderer;
use sigcheck_catalog::{callable_id, Catalog, SemanticType};
use sigcheck_templates::TemplateCatalog;

/// Renders every method of a type as a call on an existing variable, to
/// check that a value really behaves as the type it was declared as.
pub struct ReturnUsageRenderer<'a> {
    catalog: &'a Catalog,
    templates: &'a TemplateCatalog,
}

impl<'a> ReturnUsageRenderer<'a> {
    pub fn new(catalog: &'a Catalog, templates: &'a TemplateCatalog) -> Self {
        Self { catalog, templates }
    }

    /// Non-capturing calls of every method of `ty` on `receiver`.
    ///
    /// Methods that need a specific receiver value are skipped, as are
    /// combinations without a template (logged). Types without a
    /// descriptor yield no lines.
    pub fn render_all_usages(&self, ty: &SemanticType, receiver: &str) -> Result<Vec<String>> {
        let Some(desc) = self.catalog.descriptor_for(ty) else {
            return Ok(Vec::new());
        };

        let mut lines = Vec::new();
        for method in self.catalog.methods_of(&desc.name) {
            let own_id = callable_id(Some(desc.name.as_str()), &method.callable.name);
            let declared_id = method.callable.id();
            if self.templates.requires_custom_receiver(&own_id)
                || self.templates.requires_custom_receiver(&declared_id)
            {
                log::debug!("Skipping {own_id}: needs a dedicated receiver");
                continue;
            }

            for signature in &method.callable.overloads {
                let renderer = CallRenderer::method(self.templates, signature, receiver)
                    .prefer_overrides_of(own_id.clone());
                for combination in combinations(signature) {
                    match renderer.render(&combination, None, false) {
                        Ok(rendered) => lines.extend(rendered),
                        Err(err) if err.is_template_miss() => {
                            log::warn!("{}: {err}", combination.describe(&own_id));
                        }
                        Err(err) => return Err(err),
                    }
                }
            }
        }
        Ok(lines)
    }
}
