use sigcheck_catalog::{Catalog, SemanticType};
use sigcheck_templates::{OverrideContext, TemplateCatalog, FRESH_NAME_MARKER};

#[test]
fn every_named_type_has_a_default_template() {
    let catalog = Catalog::builtin().expect("catalog");
    let templates = TemplateCatalog::builtin().expect("templates");
    for desc in catalog.types() {
        let ty = SemanticType::named(desc.name.clone());
        let ty = if desc.name == "Array" {
            SemanticType::Array(None)
        } else {
            ty
        };
        assert!(templates.has_default(&ty), "no default for {}", desc.name);
    }
}

#[test]
fn project_languages_override() {
    let templates = TemplateCatalog::builtin().expect("templates");
    let ctx = OverrideContext::for_callable("project").with_param("list_of_languages");
    let literal = templates
        .resolve(&SemanticType::named("String"), &ctx)
        .unwrap();
    assert_eq!(literal, "'c'");
}

#[test]
fn target_names_are_fresh() {
    let templates = TemplateCatalog::builtin().expect("templates");
    let ctx = OverrideContext::for_callable("executable").with_param("exe_name");
    let literal = templates
        .resolve(&SemanticType::named("String"), &ctx)
        .unwrap();
    assert!(!literal.contains(FRESH_NAME_MARKER));
    assert_eq!(literal.len(), 12);
}

#[test]
fn receiver_overrides_present_for_configuration_data_get() {
    let templates = TemplateCatalog::builtin().expect("templates");
    assert!(templates.requires_custom_receiver("ConfigurationData.get"));
    assert!(templates.requires_custom_receiver("String.to_int"));
    assert!(!templates.requires_custom_receiver("String.to_upper"));
}
