use crate::error::{Result, TemplateError};
use crate::naming::FreshNames;
use serde::Deserialize;
use sigcheck_catalog::SemanticType;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Mutex;

const BUILTIN_TEMPLATES: &str = include_str!("../../../catalog/templates.json");
const SCHEMA_VERSION: u32 = 1;

/// Replaced by a fresh quoted identifier each time a template is resolved
pub const FRESH_NAME_MARKER: &str = "$RANDOM_STRING$";
/// Replaced by the quoted project directory of the running session
pub const WORKDIR_MARKER: &str = "$BUILDFILE_DIR$";

/// Addresses one entry of a callable's override set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OverrideKey {
    /// The callable only works on a specific receiver value
    Receiver,
    Param(String),
    /// Parameter name plus canonical type
    ParamType(String, String),
    /// Canonical type, for every parameter of the callable
    Type(String),
}

/// Where a template is requested from: which callable (most specific id
/// first) and which parameter.
#[derive(Debug, Clone, Default)]
pub struct OverrideContext {
    callables: Vec<String>,
    param: Option<String>,
}

impl OverrideContext {
    /// Global defaults only
    pub fn none() -> Self {
        Self::default()
    }

    pub fn for_callable(id: impl Into<String>) -> Self {
        Self {
            callables: vec![id.into()],
            param: None,
        }
    }

    /// Consulted when no earlier callable id has an override set
    pub fn or_callable(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        if !self.callables.contains(&id) {
            self.callables.push(id);
        }
        self
    }

    pub fn with_param(mut self, name: impl Into<String>) -> Self {
        self.param = Some(name.into());
        self
    }
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default = "default_schema")]
    schema_version: u32,
    #[serde(default)]
    defaults: BTreeMap<String, String>,
    #[serde(default)]
    overrides: BTreeMap<String, RawOverride>,
}

#[derive(Debug, Default, Deserialize)]
struct RawOverride {
    #[serde(default)]
    receiver: Option<String>,
    #[serde(default)]
    params: BTreeMap<String, String>,
    #[serde(default)]
    typed_params: Vec<RawTypedParam>,
    #[serde(default)]
    types: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawTypedParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    template: String,
}

fn default_schema() -> u32 {
    SCHEMA_VERSION
}

fn canonical_key(expr: &str) -> Result<String> {
    Ok(SemanticType::parse(expr)?.canonical())
}

/// Literal source text per value category, with per-callable overrides.
#[derive(Debug)]
pub struct TemplateCatalog {
    defaults: HashMap<String, String>,
    overrides: HashMap<String, HashMap<OverrideKey, String>>,
    names: Mutex<FreshNames>,
    session_dir: Option<String>,
}

impl TemplateCatalog {
    /// The bundled Meson templates
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_TEMPLATES)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: TemplateFile = serde_json::from_str(raw)?;
        if file.schema_version != SCHEMA_VERSION {
            return Err(TemplateError::Schema(file.schema_version));
        }

        let mut defaults = HashMap::with_capacity(file.defaults.len());
        for (key, template) in file.defaults {
            defaults.insert(canonical_key(&key)?, template);
        }

        let mut overrides = HashMap::with_capacity(file.overrides.len());
        for (callable, raw) in file.overrides {
            let mut set = HashMap::new();
            if let Some(receiver) = raw.receiver {
                set.insert(OverrideKey::Receiver, receiver);
            }
            for (param, template) in raw.params {
                set.insert(OverrideKey::Param(param), template);
            }
            for typed in raw.typed_params {
                set.insert(
                    OverrideKey::ParamType(typed.name, canonical_key(&typed.ty)?),
                    typed.template,
                );
            }
            for (ty, template) in raw.types {
                set.insert(OverrideKey::Type(canonical_key(&ty)?), template);
            }
            overrides.insert(callable, set);
        }

        log::debug!(
            "Loaded {} default templates and {} override sets",
            defaults.len(),
            overrides.len()
        );

        Ok(Self {
            defaults,
            overrides,
            names: Mutex::new(FreshNames::new()),
            session_dir: None,
        })
    }

    /// Use a deterministic identifier sequence
    pub fn with_names(mut self, names: FreshNames) -> Self {
        self.names = Mutex::new(names);
        self
    }

    /// Directory substituted for the working-directory marker
    pub fn set_session_dir(&mut self, dir: &Path) {
        self.session_dir = Some(dir.display().to_string());
    }

    fn override_set(&self, ctx: &OverrideContext) -> Option<&HashMap<OverrideKey, String>> {
        ctx.callables.iter().find_map(|id| self.overrides.get(id))
    }

    /// Raw template for `ty`: parameter+type override, then parameter
    /// override, then type override, then the global default.
    pub fn lookup(&self, ty: &SemanticType, ctx: &OverrideContext) -> Result<&str> {
        let key = ty.canonical();
        if let Some(set) = self.override_set(ctx) {
            let specific = ctx.param.as_ref().and_then(|param| {
                set.get(&OverrideKey::ParamType(param.clone(), key.clone()))
                    .or_else(|| set.get(&OverrideKey::Param(param.clone())))
            });
            if let Some(template) = specific.or_else(|| set.get(&OverrideKey::Type(key.clone()))) {
                return Ok(template.as_str());
            }
        }
        self.defaults.get(&key).map(String::as_str).ok_or_else(|| {
            TemplateError::not_found(key.clone(), ctx.callables.first().map(String::as_str))
        })
    }

    /// Template for `ty` with markers expanded
    pub fn resolve(&self, ty: &SemanticType, ctx: &OverrideContext) -> Result<String> {
        let template = self.lookup(ty, ctx)?;
        Ok(self.expand(template))
    }

    /// Receiver literal for a callable that needs a specific object
    pub fn receiver_template(&self, callable: &str) -> Option<String> {
        self.overrides
            .get(callable)
            .and_then(|set| set.get(&OverrideKey::Receiver))
            .map(|template| self.expand(template))
    }

    pub fn requires_custom_receiver(&self, callable: &str) -> bool {
        self.overrides
            .get(callable)
            .is_some_and(|set| set.contains_key(&OverrideKey::Receiver))
    }

    /// Whether a parameter-specific override exists
    pub fn has_override(&self, ty: &SemanticType, ctx: &OverrideContext) -> bool {
        let (Some(set), Some(param)) = (self.override_set(ctx), ctx.param.as_ref()) else {
            return false;
        };
        set.contains_key(&OverrideKey::ParamType(param.clone(), ty.canonical()))
            || set.contains_key(&OverrideKey::Param(param.clone()))
    }

    pub fn has_default(&self, ty: &SemanticType) -> bool {
        self.defaults.contains_key(&ty.canonical())
    }

    /// A fresh bare identifier, for variable names
    pub fn fresh_name(&self) -> String {
        self.lock_names().next_name()
    }

    /// Substitute both markers. Every fresh-name occurrence gets its own name.
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(idx) = rest.find(FRESH_NAME_MARKER) {
            out.push_str(&rest[..idx]);
            out.push_str(&self.lock_names().next_quoted());
            rest = &rest[idx + FRESH_NAME_MARKER.len()..];
        }
        out.push_str(rest);

        match &self.session_dir {
            Some(dir) if out.contains(WORKDIR_MARKER) => {
                out.replace(WORKDIR_MARKER, &format!("'{dir}'"))
            }
            _ => out,
        }
    }

    fn lock_names(&self) -> std::sync::MutexGuard<'_, FreshNames> {
        self.names.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
