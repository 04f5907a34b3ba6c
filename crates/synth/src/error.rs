use sigcheck_templates::TemplateError;
use thiserror::Error;

/// Result type for call synthesis
pub type Result<T> = std::result::Result<T, SynthError>;

#[derive(Error, Debug)]
pub enum SynthError {
    /// A reserved operation received the wrong number of arguments
    #[error("{op} must be called with exactly {expected} argument(s) (not {found})")]
    ArityMismatch {
        op: String,
        expected: usize,
        found: usize,
    },

    /// No literal available for an argument
    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl SynthError {
    pub fn is_template_miss(&self) -> bool {
        matches!(self, Self::Template(TemplateError::NotFound { .. }))
    }
}
