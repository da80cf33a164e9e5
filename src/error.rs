/// Error types for cluster connection and resource queries
use thiserror::Error;

/// Error taxonomy surfaced by every connector operation
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Required request fields are missing or malformed
    #[error("{0}")]
    Validation(String),

    /// Explicit-key auth without both the access key and the secret
    #[error("AWS credentials required: access key ID and secret access key must both be provided")]
    MissingCredentials,

    /// Auth method other than `credentials` or `profile`
    #[error("Unsupported auth type: {0}")]
    UnsupportedAuthMethod(String),

    /// Error reported by the AWS API, code and message verbatim
    #[error("AWS Error ({code}): {message}")]
    Provider { code: String, message: String },

    /// DescribeCluster reported that the cluster does not exist
    #[error("AWS Error (ResourceNotFoundException): {0}")]
    ClusterNotFound(String),

    /// Liveness probe against the Kubernetes API failed after authentication
    #[error("Cluster API is not reachable: {0}")]
    Connectivity(String),

    /// Any other connect-time failure
    #[error("Failed to connect to cluster: {0}")]
    Connect(String),

    /// Unknown connection identifier
    #[error("Cluster not connected")]
    NotFound,

    #[error("Invalid resource type: {0}. Supported: pods, deployments, services, nodes")]
    UnsupportedResourceKind(String),

    /// Cluster-wide list call failed
    #[error("Failed to get resources: {0}")]
    List(String),

    /// A network call exceeded its time budget
    #[error("{operation} timed out after {secs} seconds")]
    Timeout { operation: String, secs: u64 },
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Wrap an AWS error, defaulting the code to `Unknown`
    pub fn provider(code: Option<&str>, message: impl Into<String>) -> Self {
        Self::Provider {
            code: code.unwrap_or("Unknown").to_string(),
            message: message.into(),
        }
    }

    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    pub fn connect(msg: impl Into<String>) -> Self {
        Self::Connect(msg.into())
    }

    pub fn list(msg: impl Into<String>) -> Self {
        Self::List(msg.into())
    }

    pub fn timeout(operation: impl Into<String>, secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            secs,
        }
    }

    /// Whether the caller caused the failure (bad input, unknown ids)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_)
                | Error::MissingCredentials
                | Error::UnsupportedAuthMethod(_)
                | Error::UnsupportedResourceKind(_)
                | Error::NotFound
                | Error::ClusterNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
