//! Validation errors

/// Value did not conform to a compiled schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Wrong JSON type at `path`
    #[error("at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        /// JSON pointer-ish location (`$.items[2].title`)
        path: String,
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        found: &'static str,
    },

    /// Declared property absent at `path`
    #[error("at {path}: missing required property '{property}'")]
    MissingProperty {
        /// Location of the enclosing object
        path: String,
        /// Property name
        property: String,
    },
}

impl ValidationError {
    /// Location the error refers to
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::TypeMismatch { path, .. } | Self::MissingProperty { path, .. } => path,
        }
    }
}
