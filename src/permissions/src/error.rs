//! Error types for permission guards

use thiserror::Error;

use crate::config::ConfigError;

/// Permission guard errors
///
/// Setup-time kinds (`Config`, `EmptyArgument`, `InvalidArgument`) indicate a
/// programming error and are never retried. Request-time kinds split into
/// client-facing denials (`Unauthorized`, `Forbidden`) and `DataIntegrity`,
/// which points at the token issuer rather than the caller.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Invalid guard options
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No permission arguments were declared
    #[error("At least one permission or predicate must be given")]
    EmptyArgument,

    /// A declared permission does not follow the grammar
    #[error("Invalid permission argument at index {index} ('{value}'): {reason}")]
    InvalidArgument {
        index: usize,
        value: String,
        reason: String,
    },

    /// The granted claim in the token violates the grammar or type contract
    #[error("Granted permission claim is malformed: {0}")]
    DataIntegrity(String),

    /// The request carries no token while credentials are required
    #[error("{0}")]
    Unauthorized(String),

    /// The authorization expression evaluated to false
    #[error("{0}")]
    Forbidden(String),
}

impl GuardError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::EmptyArgument => "empty_argument",
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::DataIntegrity(_) => "data_integrity",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
        }
    }

    /// Whether the message may be returned to the client verbatim
    pub fn is_exposed(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::Forbidden(_))
    }

    /// HTTP status code class for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            _ => 500,
        }
    }

    pub(crate) fn invalid_argument(
        index: usize,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidArgument {
            index,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for permission guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(GuardError::EmptyArgument.code(), "empty_argument");
        assert_eq!(GuardError::Forbidden("no".into()).code(), "forbidden");
        assert_eq!(
            GuardError::Config(ConfigError::SameDelimiters(',')).code(),
            "config_error"
        );
    }

    #[test]
    fn test_exposure_and_status() {
        let unauthorized = GuardError::Unauthorized("No token".into());
        assert!(unauthorized.is_exposed());
        assert_eq!(unauthorized.status_code(), 401);

        let forbidden = GuardError::Forbidden("Permission denied".into());
        assert!(forbidden.is_exposed());
        assert_eq!(forbidden.status_code(), 403);

        let integrity = GuardError::DataIntegrity("bad claim".into());
        assert!(!integrity.is_exposed());
        assert_eq!(integrity.status_code(), 500);
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = GuardError::invalid_argument(2, "user:*", "wildcards are not allowed");
        let message = err.to_string();
        assert!(message.contains("index 2"));
        assert!(message.contains("user:*"));
    }
}
