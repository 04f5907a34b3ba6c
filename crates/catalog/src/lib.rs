//! # Signature Catalog
//!
//! Declarative description of every function and object method the
//! checker exercises: parameter lists, value categories, return types and
//! the subtyping relation between categories.
//!
//! ## Architecture
//!
//! ```text
//! catalog/meson.json
//!     │
//!     ├──> param_sets splicing ("..build_target_kwargs")
//!     │
//!     ├──> Parameter / SemanticType parsing
//!     │    └─> "name: Type", "name: Type = None", "*name: Type"
//!     │
//!     ├──> TypeLattice (ancestor table from name/parent pairs)
//!     │
//!     └──> Catalog
//!          ├─> functions: Callable { overloads: Vec<Signature> }
//!          └─> types: TypeDescriptor { parent, methods }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sigcheck_catalog::{Catalog, SemanticType};
//!
//! let catalog = Catalog::builtin().unwrap();
//! let exe = catalog.function("executable").unwrap();
//! assert_eq!(exe.overloads[0].returns, SemanticType::named("Executable"));
//! assert!(catalog.lattice().is_named_subtype("Executable", "Target"));
//! ```

mod error;
mod lattice;
mod registry;
mod signature;
mod types;

pub use error::{CatalogError, Result};
pub use lattice::{Containment, TypeLattice};
pub use registry::{Callable, Catalog, MethodRef, TypeDescriptor};
pub use signature::{callable_id, describe_params, ParamKind, Parameter, Signature};
pub use types::SemanticType;
