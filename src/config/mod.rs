/// Configuration management for Clusterdeck
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// AWS settings
    #[serde(default)]
    pub aws: AwsConfig,

    /// Per-call network timeouts
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Listen port (can also be set via PORT env var)
    #[serde(default = "default_port")]
    pub port: u16,
}

/// AWS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region used by CLI commands when --region is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,

    /// Executable invoked by Kubernetes clients to mint cluster tokens
    #[serde(default = "default_token_command")]
    pub token_command: String,
}

/// Timeouts in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Budget for each connect-time call (DescribeCluster, probe, ...)
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,

    /// Budget for each resource list call
    #[serde(default = "default_list_secs")]
    pub list_secs: u64,
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_token_command() -> String {
    "aws".to_string()
}

fn default_connect_secs() -> u64 {
    30
}

fn default_list_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            default_region: None,
            token_command: default_token_command(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            list_secs: default_list_secs(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServiceConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults; PORT overrides the port
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?
        } else {
            Self::default()
        };

        if let Ok(port) = std::env::var("PORT") {
            config.server.port = port
                .parse()
                .with_context(|| format!("Invalid PORT value: {}", port))?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.aws.token_command.trim().is_empty() {
            anyhow::bail!("aws.token_command cannot be empty");
        }

        if self.timeouts.connect_secs == 0 || self.timeouts.list_secs == 0 {
            anyhow::bail!("timeouts must be greater than zero");
        }

        self.listen_addr()?;

        Ok(())
    }

    /// Socket address for the HTTP listener
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.bind, self.server.port)
            .parse()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind))
    }

    /// Generate an example configuration file
    pub fn example() -> Self {
        Self {
            server: ServerConfig::default(),
            aws: AwsConfig {
                default_region: Some("us-east-1".to_string()),
                token_command: default_token_command(),
            },
            timeouts: TimeoutConfig::default(),
        }
    }
}
