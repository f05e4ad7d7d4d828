//! Error types shared across the workspace boundary.

use thiserror::Error;

/// Configuration load or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Mapping variant name not in the closed registry
    #[error("Unknown mapping variant \"{0}\" (expected \"single-index\" or \"rule-routed\")")]
    UnknownVariant(String),

    /// A value failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Underlying loader failure (file, env)
    #[error("Configuration load error: {0}")]
    Load(String),
}

/// Backend unreachable or a transport-level failure mid-call.
///
/// Never retried inside this core; retry policy belongs to callers.
#[derive(Debug, Error)]
#[error("Search backend transport error: {0}")]
pub struct TransportError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_variant_display() {
        let err = ConfigError::UnknownVariant("fancy".to_string());
        assert!(err.to_string().contains("fancy"));
        assert!(err.to_string().contains("rule-routed"));
    }

    #[test]
    fn test_transport_error_display() {
        let err = TransportError("connection refused".to_string());
        assert!(err.to_string().contains("connection refused"));
    }
}
