use std::fmt;

/// Error kinds surfaced to the CLI layer and mapped onto process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CalibanError {
    /// The project configuration or experiment-config document could not be parsed or was
    /// internally inconsistent.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A build recipe could not be formed from the project directory and requested mode.
    #[error("invalid build recipe: {0}")]
    RecipeInvalid(String),

    /// The requested mode is not supported on the chosen backend or host.
    #[error("platform not supported: {0}")]
    PlatformUnsupported(String),

    /// The backend would reject the submission; carries the nearest valid suggestion when known.
    #[error("submission would be rejected: {message}")]
    ValidationError {
        message: String,
        suggestion: Option<String>,
    },

    /// A rate-limited or otherwise transient backend failure. Retried internally with backoff;
    /// surfaced only once retries are exhausted.
    #[error("transient backend error: {0}")]
    TransientBackendError(String),

    /// A terminal rejection by a backend.
    #[error("backend error: {0}")]
    BackendError(String),

    /// A local container runtime exited with a non-zero status.
    #[error("run exited with non-zero status: {0}")]
    RuntimeExit(i32),

    /// Registry I/O or schema violation. Fatal to the current invocation.
    #[error("registry error: {0}")]
    RegistryError(String),

    /// The user interrupted the operation.
    #[error("cancelled")]
    Cancelled,
}

impl CalibanError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CalibanError::ConfigInvalid(_)
            | CalibanError::RecipeInvalid(_)
            | CalibanError::PlatformUnsupported(_)
            | CalibanError::ValidationError { .. } => 2,
            CalibanError::Cancelled => 130,
            CalibanError::TransientBackendError(_)
            | CalibanError::BackendError(_)
            | CalibanError::RuntimeExit(_)
            | CalibanError::RegistryError(_) => 1,
        }
    }
}

impl From<std::io::Error> for CalibanError {
    fn from(value: std::io::Error) -> Self {
        CalibanError::ConfigInvalid(value.to_string())
    }
}

impl From<serde_json::Error> for CalibanError {
    fn from(value: serde_json::Error) -> Self {
        CalibanError::ConfigInvalid(value.to_string())
    }
}

impl From<serde_yaml::Error> for CalibanError {
    fn from(value: serde_yaml::Error) -> Self {
        CalibanError::ConfigInvalid(value.to_string())
    }
}

impl From<rusqlite::Error> for CalibanError {
    fn from(value: rusqlite::Error) -> Self {
        CalibanError::RegistryError(value.to_string())
    }
}

impl From<crate::process::Error> for CalibanError {
    fn from(value: crate::process::Error) -> Self {
        CalibanError::BackendError(value.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for CalibanError {
    fn from(value: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        CalibanError::BackendError(value.to_string())
    }
}

/// A human-readable rendering used by `main`, matching the bold-red-prefix style the rest of the
/// codebase uses for top-level errors.
pub struct Highlighted<'a>(pub &'a CalibanError);

impl fmt::Display for Highlighted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{kind}: {err}", kind = self.0.kind_name(), err = self.0)
    }
}

impl CalibanError {
    pub fn kind_name(&self) -> &'static str {
        match self {
            CalibanError::ConfigInvalid(_) => "ConfigInvalid",
            CalibanError::RecipeInvalid(_) => "RecipeInvalid",
            CalibanError::PlatformUnsupported(_) => "PlatformUnsupported",
            CalibanError::ValidationError { .. } => "ValidationError",
            CalibanError::TransientBackendError(_) => "TransientBackendError",
            CalibanError::BackendError(_) => "BackendError",
            CalibanError::RuntimeExit(_) => "RuntimeExit",
            CalibanError::RegistryError(_) => "RegistryError",
            CalibanError::Cancelled => "Cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(CalibanError::ConfigInvalid("x".into()).exit_code(), 2);
        assert_eq!(CalibanError::Cancelled.exit_code(), 130);
        assert_eq!(CalibanError::RegistryError("x".into()).exit_code(), 1);
    }
}
