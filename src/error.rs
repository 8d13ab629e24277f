//! Error types and handling for the ocshim bridge

use thiserror::Error;

/// Main error type for the crate's fallible operations.
///
/// The bridge entry points themselves never produce one of these: every
/// condition there is absorbed. This covers configuration and the C host API.
#[derive(Error, Debug)]
pub enum ShimError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument passed across the C boundary
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type alias for ocshim operations
pub type Result<T> = std::result::Result<T, ShimError>;

/// Helper trait for converting errors to ShimError
pub trait IntoShimError<T> {
    fn into_shim_error(self, context: &str) -> Result<T>;
}

impl<T, E> IntoShimError<T> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn into_shim_error(self, context: &str) -> Result<T> {
        self.map_err(|e| ShimError::Other(format!("{context}: {e}")))
    }
}

impl From<toml::de::Error> for ShimError {
    fn from(err: toml::de::Error) -> Self {
        ShimError::Config(format!("TOML parsing error: {err}"))
    }
}

impl From<toml::ser::Error> for ShimError {
    fn from(err: toml::ser::Error) -> Self {
        ShimError::Config(format!("TOML serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShimError::Config("unknown mode".to_string());
        assert_eq!(err.to_string(), "Configuration error: unknown mode");
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let shim_err: ShimError = io_err.into();
        assert!(matches!(shim_err, ShimError::Io(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("= nope").unwrap_err();
        let shim_err: ShimError = toml_err.into();
        assert!(matches!(shim_err, ShimError::Config(_)));
    }

    #[test]
    fn test_into_shim_error_trait() {
        let result: std::result::Result<(), &str> = Err("bad utf-8");
        let shim_result = result.into_shim_error("config string");
        assert!(shim_result.is_err());
        assert!(shim_result.unwrap_err().to_string().contains("config string"));
    }
}
