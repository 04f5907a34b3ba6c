use sigcheck_catalog::CatalogError;
use thiserror::Error;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum TemplateError {
    /// Neither an override nor a default exists for the type
    #[error(
        "No template found for type {ty}{}",
        .callable.as_deref().map(|c| format!(" (in {c})")).unwrap_or_default()
    )]
    NotFound { ty: String, callable: Option<String> },

    /// A type key in the template file does not parse
    #[error("Invalid template key: {0}")]
    InvalidKey(#[from] CatalogError),

    /// Unsupported template file layout
    #[error("Unsupported template schema version {0}")]
    Schema(u32),

    /// Malformed template document
    #[error("Template parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TemplateError {
    /// Create a not-found error
    pub fn not_found(ty: impl Into<String>, callable: Option<&str>) -> Self {
        Self::NotFound {
            ty: ty.into(),
            callable: callable.map(str::to_string),
        }
    }
}
