//! # Transactional Build File
//!
//! A `meson.build` inside a configured project directory that accepts
//! speculative lines, asks the build tool about them and rolls back.
//!
//! ```text
//! probe(lines)
//!     │
//!     ├──> L = line_count()
//!     ├──> append lines + sentinel error('... ($IGNORE$)')
//!     ├──> BuildTool::invoke(["--reconfigure"], builddir)
//!     ├──> pop_lines(len + 1)            (every path)
//!     └──> classify(stdout, stderr, L)
//!          └─> offset = matched_line - L - 1
//! ```
//!
//! The tool is reached only through [`BuildTool`], so tests drive the
//! engine with a scripted fake instead of a real `meson` binary.

mod buildfile;
mod diagnostics;
mod error;
mod tool;

pub use buildfile::{BuildFileConfig, ProbeOutcome, TransactionalBuildFile, WORKDIR_MARKER};
pub use diagnostics::{classify, sentinel_line, Classification, DiagnosticKind, IGNORE_MARKER};
pub use error::{BuildFileError, Result};
pub use tool::{BuildTool, MesonTool, ToolOutput};
