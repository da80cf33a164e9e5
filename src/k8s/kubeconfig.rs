/// Access configuration (kubeconfig) synthesis for EKS clusters
///
/// The generated document never carries a bearer token. Authentication is
/// delegated to an exec credential plugin so every API call gets a freshly
/// minted, short-lived token.
use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use kube::config::Kubeconfig;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::aws::{ClusterDescription, ProviderSession};

const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";
const USER_NAME: &str = "aws";

/// Kubeconfig document for a single EKS cluster
///
/// Deliberately not `Debug`: the exec environment may hold access keys.
#[derive(Clone, Serialize, PartialEq)]
pub struct AccessConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    #[serde(rename = "current-context")]
    pub current_context: String,
    pub clusters: Vec<NamedCluster>,
    pub contexts: Vec<NamedContext>,
    pub users: Vec<NamedUser>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NamedCluster {
    pub name: String,
    pub cluster: ClusterEntry,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClusterEntry {
    pub server: String,
    #[serde(rename = "certificate-authority-data")]
    pub certificate_authority_data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NamedContext {
    pub name: String,
    pub context: ContextEntry,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContextEntry {
    pub cluster: String,
    pub user: String,
}

#[derive(Clone, Serialize, PartialEq)]
pub struct NamedUser {
    pub name: String,
    pub user: UserEntry,
}

#[derive(Clone, Serialize, PartialEq)]
pub struct UserEntry {
    pub exec: ExecCredential,
}

/// Exec-based token provider invoked by the Kubernetes client per request
#[derive(Clone, Serialize, PartialEq)]
pub struct ExecCredential {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub command: String,
    pub args: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<ExecEnvVar>,
    #[serde(rename = "interactiveMode")]
    pub interactive_mode: String,
}

#[derive(Clone, Serialize, PartialEq)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

impl AccessConfig {
    /// Build the access configuration for a described cluster
    ///
    /// The token region is taken from the cluster ARN; `requested_region` is
    /// only used when the ARN is missing or malformed.
    pub fn for_cluster(
        cluster: &ClusterDescription,
        requested_region: &str,
        session: &ProviderSession,
        token_command: &str,
    ) -> Result<Self> {
        let endpoint = cluster
            .endpoint
            .as_deref()
            .context("cluster has no API endpoint")?;
        let endpoint_url = url::Url::parse(endpoint)
            .with_context(|| format!("invalid cluster endpoint: {}", endpoint))?;
        if endpoint_url.scheme() != "https" {
            anyhow::bail!("cluster endpoint must use https: {}", endpoint);
        }

        let ca_data = cluster
            .certificate_authority_data
            .as_deref()
            .context("cluster has no certificate authority data")?;
        STANDARD
            .decode(ca_data)
            .context("invalid certificate authority data")?;

        let region = match cluster.arn_region() {
            Some(region) => {
                if region != requested_region {
                    warn!(
                        "Cluster ARN region {} differs from requested region {}; using ARN region",
                        region, requested_region
                    );
                }
                region
            }
            None => {
                warn!(
                    "Could not parse region from cluster ARN, using requested region {}",
                    requested_region
                );
                requested_region
            }
        };

        let name = cluster.name.clone();

        Ok(Self {
            api_version: "v1".to_string(),
            kind: "Config".to_string(),
            current_context: name.clone(),
            clusters: vec![NamedCluster {
                name: name.clone(),
                cluster: ClusterEntry {
                    server: endpoint.to_string(),
                    certificate_authority_data: ca_data.to_string(),
                },
            }],
            contexts: vec![NamedContext {
                name: name.clone(),
                context: ContextEntry {
                    cluster: name.clone(),
                    user: USER_NAME.to_string(),
                },
            }],
            users: vec![NamedUser {
                name: USER_NAME.to_string(),
                user: UserEntry {
                    exec: ExecCredential::eks_token(&name, region, session, token_command),
                },
            }],
        })
    }

    /// Write the document to a scoped temp file and load it back as a kubeconfig
    ///
    /// The file is removed before this returns.
    pub fn materialize(&self) -> Result<Kubeconfig> {
        self.materialize_in(&std::env::temp_dir())
    }

    /// Same as [`AccessConfig::materialize`] with an explicit directory
    pub fn materialize_in(&self, dir: &Path) -> Result<Kubeconfig> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize access configuration")?;

        let mut file = tempfile::Builder::new()
            .prefix("clusterdeck-")
            .suffix(".kubeconfig")
            .tempfile_in(dir)
            .context("Failed to create temporary access configuration")?;
        file.write_all(yaml.as_bytes())
            .context("Failed to write temporary access configuration")?;
        file.flush()
            .context("Failed to write temporary access configuration")?;

        debug!("Loading access configuration for context {}", self.current_context);

        let kubeconfig = Kubeconfig::read_from(file.path())
            .context("Failed to load generated access configuration")?;

        file.close()
            .context("Failed to remove temporary access configuration")?;

        Ok(kubeconfig)
    }
}

impl ExecCredential {
    /// `<command> eks get-token --cluster-name <name> --region <region> [--profile <profile>]`
    pub fn eks_token(
        cluster_name: &str,
        region: &str,
        session: &ProviderSession,
        token_command: &str,
    ) -> Self {
        let mut args = vec![
            "eks".to_string(),
            "get-token".to_string(),
            "--cluster-name".to_string(),
            cluster_name.to_string(),
            "--region".to_string(),
            region.to_string(),
        ];
        if let Some(profile) = session.profile_name() {
            args.push("--profile".to_string());
            args.push(profile.to_string());
        }

        let env = session
            .exec_env()
            .into_iter()
            .map(|(name, value)| ExecEnvVar {
                name: name.to_string(),
                value,
            })
            .collect();

        Self {
            api_version: EXEC_API_VERSION.to_string(),
            command: token_command.to_string(),
            args,
            env,
            interactive_mode: "Never".to_string(),
        }
    }
}
