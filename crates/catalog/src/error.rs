use thiserror::Error;

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors raised while loading or validating a signature catalog
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A type expression could not be parsed
    #[error("Invalid type expression '{expr}': {reason}")]
    InvalidType { expr: String, reason: String },

    /// A parameter declaration could not be parsed
    #[error("Invalid parameter declaration '{decl}': {reason}")]
    InvalidParameter { decl: String, reason: String },

    /// A `..name` splice refers to a parameter set that does not exist
    #[error("Unknown parameter set '{0}'")]
    UnknownParamSet(String),

    /// A signature references a type with no descriptor
    #[error("Unknown type '{name}' referenced by {context}")]
    UnknownType { name: String, context: String },

    /// A type descriptor names a parent that does not exist
    #[error("Unknown parent type '{parent}' for '{name}'")]
    UnknownParent { name: String, parent: String },

    /// The same type name is declared twice
    #[error("Duplicate type '{0}'")]
    DuplicateType(String),

    /// The parent chain loops back on itself
    #[error("Type hierarchy cycle through '{0}'")]
    Cycle(String),

    /// Malformed catalog document
    #[error("Catalog parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Create an invalid type error
    pub fn invalid_type(expr: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidType {
            expr: expr.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(decl: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            decl: decl.into(),
            reason: reason.into(),
        }
    }

    /// Create an unknown type error
    pub fn unknown_type(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnknownType {
            name: name.into(),
            context: context.into(),
        }
    }
}
