use thiserror::Error;

/// Result type returned by every fallible assembly operation
pub type Result<T> = std::result::Result<T, AssemblyError>;

#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Surface lists of different length or accumulator of the wrong shape
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    /// Data the operation needs has not been populated on the surface
    #[error("surface is missing required attribute `{attribute}`")]
    MissingAttribute { attribute: &'static str },

    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("unable to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("unable to parse settings: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AssemblyError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl std::fmt::Debug,
        found: impl std::fmt::Debug,
    ) -> Self {
        AssemblyError::ShapeMismatch {
            context,
            expected: format!("{expected:?}"),
            found: format!("{found:?}"),
        }
    }
}
