use crate::error::{CatalogError, Result};
use crate::lattice::TypeLattice;
use crate::signature::{callable_id, Parameter, Signature};
use crate::types::SemanticType;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

const BUILTIN_CATALOG: &str = include_str!("../../../catalog/meson.json");

/// A function or method name together with its ordered overloads
#[derive(Debug, Clone)]
pub struct Callable {
    pub name: String,
    pub receiver: Option<String>,
    pub overloads: Vec<Signature>,
}

impl Callable {
    pub fn id(&self) -> String {
        callable_id(self.receiver.as_deref(), &self.name)
    }
}

#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    pub name: String,
    pub parent: Option<String>,
    pub methods: Vec<Callable>,
}

impl TypeDescriptor {
    pub fn method(&self, name: &str) -> Option<&Callable> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// A method visible on a type, along with the type that declares it
#[derive(Debug, Clone, Copy)]
pub struct MethodRef<'a> {
    pub declared_on: &'a TypeDescriptor,
    pub callable: &'a Callable,
}

/// The registration table of every checked callable and type.
#[derive(Debug, Clone)]
pub struct Catalog {
    functions: Vec<Callable>,
    types: Vec<TypeDescriptor>,
    type_index: HashMap<String, usize>,
    lattice: TypeLattice,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    schema_version: u32,
    #[serde(default)]
    param_sets: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    functions: Vec<RawCallable>,
    #[serde(default)]
    types: Vec<RawType>,
}

#[derive(Debug, Deserialize)]
struct RawCallable {
    name: String,
    #[serde(default)]
    params: Vec<String>,
    #[serde(default = "default_return")]
    returns: String,
}

#[derive(Debug, Deserialize)]
struct RawType {
    name: String,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    methods: Vec<RawCallable>,
}

fn default_return() -> String {
    "None".to_string()
}

impl Catalog {
    /// The bundled Meson catalog
    pub fn builtin() -> Result<Self> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(raw)?;
        log::debug!(
            "Loading catalog schema v{}: {} functions, {} types",
            file.schema_version,
            file.functions.len(),
            file.types.len()
        );

        let lattice = TypeLattice::new(
            file.types
                .iter()
                .map(|t| (t.name.clone(), t.parent.clone())),
        )?;

        let functions = group_overloads(None, &file.functions, &file.param_sets)?;
        let mut types = Vec::with_capacity(file.types.len());
        let mut type_index = HashMap::with_capacity(file.types.len());
        for raw_type in &file.types {
            let methods = group_overloads(Some(&raw_type.name), &raw_type.methods, &file.param_sets)?;
            type_index.insert(raw_type.name.clone(), types.len());
            types.push(TypeDescriptor {
                name: raw_type.name.clone(),
                parent: raw_type.parent.clone(),
                methods,
            });
        }

        let catalog = Self {
            functions,
            types,
            type_index,
            lattice,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Every named type used by a signature must have a descriptor
    fn validate(&self) -> Result<()> {
        let callables = self
            .functions
            .iter()
            .chain(self.types.iter().flat_map(|t| t.methods.iter()));
        for callable in callables {
            for sig in &callable.overloads {
                let referenced = sig
                    .params
                    .iter()
                    .map(|p| (&p.ty, format!("parameter '{}' of {}", p.name, sig.callable_id())))
                    .chain(std::iter::once((
                        &sig.returns,
                        format!("return type of {}", sig.callable_id()),
                    )));
                for (ty, context) in referenced {
                    if let Some(missing) = ty.named_types().into_iter().find(|n| !self.lattice.contains(n)) {
                        return Err(CatalogError::unknown_type(missing, context));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn functions(&self) -> &[Callable] {
        &self.functions
    }

    pub fn types(&self) -> &[TypeDescriptor] {
        &self.types
    }

    pub fn lattice(&self) -> &TypeLattice {
        &self.lattice
    }

    pub fn function(&self, name: &str) -> Option<&Callable> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn type_descriptor(&self, name: &str) -> Option<&TypeDescriptor> {
        self.type_index.get(name).map(|&idx| &self.types[idx])
    }

    /// Descriptor carrying the methods of `ty`; `None` for unions, `Any` and `None`
    pub fn descriptor_for(&self, ty: &SemanticType) -> Option<&TypeDescriptor> {
        ty.descriptor_name().and_then(|name| self.type_descriptor(name))
    }

    /// Methods callable on `type_name`, own methods first, then inherited
    /// ones nearest ancestor first. A method name declared lower in the
    /// chain shadows the same name further up.
    pub fn methods_of(&self, type_name: &str) -> Vec<MethodRef<'_>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for ancestor in self.lattice.ancestors(type_name) {
            let Some(desc) = self.type_descriptor(ancestor) else {
                continue;
            };
            for callable in &desc.methods {
                if seen.insert(callable.name.as_str()) {
                    out.push(MethodRef {
                        declared_on: desc,
                        callable,
                    });
                }
            }
        }
        out
    }

    /// Every function and method, functions first
    pub fn all_callables(&self) -> impl Iterator<Item = &Callable> {
        self.functions
            .iter()
            .chain(self.types.iter().flat_map(|t| t.methods.iter()))
    }
}

fn expand_params<'a>(
    owner: &str,
    params: &'a [String],
    sets: &'a BTreeMap<String, Vec<String>>,
) -> Result<Vec<&'a str>> {
    let mut out = Vec::with_capacity(params.len());
    for decl in params {
        match decl.trim().strip_prefix("..") {
            Some(set) => {
                let expanded = sets
                    .get(set)
                    .ok_or_else(|| CatalogError::UnknownParamSet(format!("{set} (in {owner})")))?;
                out.extend(expanded.iter().map(String::as_str));
            }
            None => out.push(decl.as_str()),
        }
    }
    Ok(out)
}

fn group_overloads(
    receiver: Option<&str>,
    raw: &[RawCallable],
    sets: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<Callable>> {
    let mut callables: Vec<Callable> = Vec::new();
    for entry in raw {
        let id = callable_id(receiver, &entry.name);
        let decls = expand_params(&id, &entry.params, sets)?;
        let params = Parameter::parse_list(&decls)?;
        let returns = SemanticType::parse(&entry.returns)?;
        let sig = Signature {
            name: entry.name.clone(),
            receiver: receiver.map(str::to_string),
            params,
            returns,
        };
        match callables.iter_mut().find(|c| c.name == entry.name) {
            Some(existing) => existing.overloads.push(sig),
            None => callables.push(Callable {
                name: entry.name.clone(),
                receiver: receiver.map(str::to_string),
                overloads: vec![sig],
            }),
        }
    }
    Ok(callables)
}
