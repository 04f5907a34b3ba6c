//! # Call Synthesis
//!
//! Derives every minimal, type-correct call form a signature permits and
//! renders each one as build-description source lines.
//!
//! ```text
//! Signature
//!     │
//!     ├──> combinations()          one Combination per union-arm choice
//!     │                            (None arm => keyword-only tail)
//!     ├──> CallRenderer            `v = literal` setup lines + call line
//!     │    └─> reserved methods    `a + b`, `a[b]`, `b in a`, ...
//!     │
//!     └──> ReturnUsageRenderer     every method of the returned type,
//!                                  called on the captured value
//! ```

mod combinator;
mod error;
mod render;
mod usage;

pub use combinator::{
    combination_count, combinations, Argument, Combination, UNCONSTRAINED_STAND_IN,
};
pub use error::{Result, SynthError};
pub use render::{reserved_arity, CallRenderer};
pub use usage::ReturnUsageRenderer;
