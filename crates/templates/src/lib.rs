//! # Template Catalog
//!
//! Literal source text for every value category, used to build minimal
//! arguments and receivers for probe calls.
//!
//! ```text
//! resolve(type, ctx)
//!     │
//!     ├──> override set of the first callable id in ctx that has one
//!     │    ├─> (param, type)
//!     │    ├─> param
//!     │    └─> type
//!     ├──> global default for the canonical type
//!     │
//!     └──> marker expansion
//!          ├─> $RANDOM_STRING$ -> 'fresh10chr'
//!          └─> $BUILDFILE_DIR$ -> '/session/dir'
//! ```

mod catalog;
mod error;
mod naming;

pub use catalog::{
    OverrideContext, OverrideKey, TemplateCatalog, FRESH_NAME_MARKER, WORKDIR_MARKER,
};
pub use error::{Result, TemplateError};
pub use naming::{FreshNames, FRESH_NAME_LEN};
