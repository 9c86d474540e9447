//! Error types for the yarnctl CLI.

use yarnctl_dockman::DockmanError;

/// Result type alias using [`CliError`].
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] DockmanError),

    /// The tenant listing itself was not found, so the address does not
    /// point at a management API.
    #[error(
        "Connection error: 404 Not Found.\nPlease ensure that the management API address is correct."
    )]
    ApiNotFound,

    #[error("No tenant found.  Please ensure that microservices are enabled.")]
    NoTenant,

    #[error("The specified tenant ({0}) does not exist")]
    TenantNotFound(String),

    #[error("Network not found for tenant ({0})")]
    NetworkNotFound(String),

    #[error("No registry IP address could be found")]
    RegistryIpNotFound,

    #[error("No consul IP address could be found")]
    ConsulIpNotFound,

    #[error("Error deploying pod {pod}.")]
    DeployFailed {
        pod: String,
        #[source]
        source: DockmanError,
    },

    #[error("Unable to start {pod} ({namespace}); timeout after {waited_secs}s.")]
    PodTimeout {
        pod: String,
        namespace: String,
        waited_secs: u64,
        /// Why the last attempt failed.
        reason: String,
    },

    #[error("Invalid step: {0}!")]
    InvalidStep(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CliError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Errors that end the run even while tearing down.
    ///
    /// Teardown records everything else against the failing step and moves
    /// on to the next one.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Api(err) => err.is_fatal(),
            Self::ApiNotFound
            | Self::NoTenant
            | Self::TenantNotFound(_)
            | Self::InvalidStep(_)
            | Self::Config(_) => true,
            Self::NetworkNotFound(_)
            | Self::RegistryIpNotFound
            | Self::ConsulIpNotFound
            | Self::DeployFailed { .. }
            | Self::PodTimeout { .. }
            | Self::Encode(_) => false,
        }
    }

    /// Process exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_keep_their_message() {
        let err = CliError::from(DockmanError::Unauthorized);
        assert!(err.to_string().starts_with("Connection error: 401 Unauthorized."));
        assert!(err.is_fatal());
    }

    #[test]
    fn soft_errors_are_not_fatal() {
        let err = CliError::from(DockmanError::not_found("https://h/api/dockman/ns/x/pods"));
        assert!(!err.is_fatal());
        assert!(!CliError::ConsulIpNotFound.is_fatal());
        assert!(CliError::NoTenant.is_fatal());
    }

    #[test]
    fn pod_timeout_message() {
        let err = CliError::PodTimeout {
            pod: "consul".to_owned(),
            namespace: "namespace1".to_owned(),
            waited_secs: 600,
            reason: "Could not find Pod that matches labels.name:consul".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to start consul (namespace1); timeout after 600s."
        );
        assert_eq!(err.exit_code(), 1);
    }
}
