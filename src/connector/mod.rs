/// Cluster connection manager
///
/// Turns AWS credentials into authenticated Kubernetes API sessions, keeps
/// them in a `ConnectionRegistry` keyed by `region_clusterName`, and answers
/// resource queries against registered sessions.
///
/// Network calls never run while the registry lock is held: sessions are read
/// at the start of a query and written at the end of a connect.
pub mod registry;

use futures::future::join_all;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aws::credentials::{self, CredentialParams, ProviderSession};
use crate::aws::{AvailableCluster, AwsSdkClientFactory, EksApi, EksClientFactory};
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::k8s::{
    list_resources, AccessConfig, ClusterApiFactory, KubeClientFactory, ResourceKind, ResourceList,
};

pub use registry::{connection_id, ClusterInfo, ClusterSession, ConnectionRegistry, ConnectionSummary};

/// Connector settings derived from the service configuration
#[derive(Debug, Clone)]
pub struct ConnectorSettings {
    /// Executable written into the exec credential spec
    pub token_command: String,
    /// Budget for each connect-time network step
    pub connect_timeout: Duration,
    /// Budget for each resource list call
    pub list_timeout: Duration,
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            token_command: "aws".to_string(),
            connect_timeout: Duration::from_secs(30),
            list_timeout: Duration::from_secs(60),
        }
    }
}

impl From<&ServiceConfig> for ConnectorSettings {
    fn from(config: &ServiceConfig) -> Self {
        Self {
            token_command: config.aws.token_command.clone(),
            connect_timeout: Duration::from_secs(config.timeouts.connect_secs),
            list_timeout: Duration::from_secs(config.timeouts.list_secs),
        }
    }
}

/// Successful connect
#[derive(Debug, Clone, Serialize)]
pub struct Connected {
    pub message: String,
    pub connection_id: String,
}

/// Successful disconnect
#[derive(Debug, Clone, Serialize)]
pub struct Disconnected {
    pub message: String,
}

/// Clusters available in a region
#[derive(Debug, Clone, Serialize)]
pub struct AvailableClusters {
    pub region: String,
    pub clusters: Vec<AvailableCluster>,
    pub count: usize,
}

/// Shared connection manager state; cheap to clone
#[derive(Clone)]
pub struct Connector {
    inner: Arc<Inner>,
}

struct Inner {
    registry: ConnectionRegistry,
    eks: Arc<dyn EksClientFactory>,
    kube: Arc<dyn ClusterApiFactory>,
    settings: ConnectorSettings,
}

impl Connector {
    pub fn new(
        eks: Arc<dyn EksClientFactory>,
        kube: Arc<dyn ClusterApiFactory>,
        settings: ConnectorSettings,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: ConnectionRegistry::new(),
                eks,
                kube,
                settings,
            }),
        }
    }

    /// Connector talking to real AWS and Kubernetes endpoints
    pub fn with_aws(settings: ConnectorSettings) -> Self {
        Self::new(
            Arc::new(AwsSdkClientFactory),
            Arc::new(KubeClientFactory),
            settings,
        )
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.inner.registry
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.inner.settings
    }

    /// Resolve credentials, authenticate, and register the session
    pub async fn connect(
        &self,
        cluster_name: &str,
        region: &str,
        params: &CredentialParams,
    ) -> Result<Connected> {
        if cluster_name.trim().is_empty() || region.trim().is_empty() {
            return Err(Error::validation("cluster_name and region are required."));
        }

        let session = credentials::resolve(params)?;
        info!(
            "Attempting to connect to cluster '{}' in region '{}'",
            cluster_name, region
        );

        let cluster = self.authenticate(cluster_name, region, &session).await?;
        let id = cluster.id.clone();

        if self.registry().put(cluster) {
            info!("Replaced existing connection {}", id);
        }
        info!("Connected to cluster {} ({})", cluster_name, id);

        Ok(Connected {
            message: format!("Successfully connected to cluster {}", cluster_name),
            connection_id: id,
        })
    }

    /// Describe the cluster, build its access configuration, and verify the
    /// resulting API session with a liveness probe
    pub async fn authenticate(
        &self,
        cluster_name: &str,
        region: &str,
        session: &ProviderSession,
    ) -> Result<ClusterSession> {
        let eks = self.eks_client(session, region).await?;

        let description = self
            .with_timeout(
                "DescribeCluster",
                self.settings().connect_timeout,
                eks.describe_cluster(cluster_name),
            )
            .await?;
        debug!(
            "Cluster {} status {:?}, version {:?}",
            description.name, description.status, description.version
        );

        let access = AccessConfig::for_cluster(
            &description,
            region,
            session,
            &self.settings().token_command,
        )
        .map_err(|e| Error::connect(format!("{:#}", e)))?;

        let api = self
            .with_timeout(
                "Creating Kubernetes client",
                self.settings().connect_timeout,
                async {
                    let kubeconfig = tokio::task::spawn_blocking(move || access.materialize())
                        .await
                        .map_err(|e| Error::connect(format!("access configuration task failed: {}", e)))?
                        .map_err(|e| Error::connect(format!("{:#}", e)))?;

                    self.inner
                        .kube
                        .connect(kubeconfig)
                        .await
                        .map_err(|e| Error::connect(format!("{:#}", e)))
                },
            )
            .await?;

        let probe_api = api.clone();
        self.run_detached(
            "Kubernetes API probe",
            self.settings().connect_timeout,
            async move {
                probe_api
                    .probe()
                    .await
                    .map_err(|e| Error::connectivity(format!("{:#}", e)))
            },
            Error::connectivity,
        )
        .await?;

        Ok(ClusterSession {
            id: connection_id(region, cluster_name),
            info: ClusterInfo {
                name: cluster_name.to_string(),
                region: region.to_string(),
                version: description.version,
                status: description.status,
                endpoint: description.endpoint,
            },
            api,
        })
    }

    /// List clusters in a region; clusters that cannot be described are skipped
    pub async fn list_available(
        &self,
        region: &str,
        params: &CredentialParams,
    ) -> Result<AvailableClusters> {
        if region.trim().is_empty() {
            return Err(Error::validation("Region is required."));
        }

        let session = credentials::resolve(params)?;
        let eks = self.eks_client(&session, region).await?;

        let names = self
            .with_timeout(
                "ListClusters",
                self.settings().connect_timeout,
                eks.list_clusters(),
            )
            .await?;
        info!("Found {} cluster(s) in {}", names.len(), region);

        let described = join_all(names.iter().map(|name| {
            let eks = eks.clone();
            async move {
                let result = self
                    .with_timeout(
                        "DescribeCluster",
                        self.settings().connect_timeout,
                        eks.describe_cluster(name),
                    )
                    .await;
                (name, result)
            }
        }))
        .await;

        let clusters: Vec<AvailableCluster> = described
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(cluster) => Some(AvailableCluster::from(cluster)),
                Err(e) => {
                    warn!("Skipping cluster {}: {}", name, e);
                    None
                }
            })
            .collect();

        Ok(AvailableClusters {
            region: region.to_string(),
            count: clusters.len(),
            clusters,
        })
    }

    pub fn list_connections(&self) -> Vec<ConnectionSummary> {
        self.registry().list()
    }

    pub fn disconnect(&self, id: &str) -> Result<Disconnected> {
        let info = self.registry().remove(id)?;
        info!("Disconnected from cluster {} ({})", info.name, id);
        Ok(Disconnected {
            message: format!("Disconnected from cluster {}", info.name),
        })
    }

    /// Query one resource kind on a registered cluster
    pub async fn get_resources(&self, id: &str, kind: &str) -> Result<ResourceList> {
        let kind: ResourceKind = kind.parse()?;
        let session = self.registry().get(id)?;

        debug!("Listing {} on {}", kind, id);
        self.run_detached(
            &format!("Listing {}", kind),
            self.settings().list_timeout,
            async move {
                list_resources(session.api.as_ref(), kind)
                    .await
                    .map_err(|e| Error::list(format!("{:#}", e)))
            },
            Error::list,
        )
        .await
    }

    async fn eks_client(
        &self,
        session: &ProviderSession,
        region: &str,
    ) -> Result<Arc<dyn EksApi>> {
        self.with_timeout(
            "Loading AWS configuration",
            self.settings().connect_timeout,
            self.inner.eks.eks_client(session, region),
        )
        .await
    }

    /// Run a cluster call on its own task under a timeout.
    ///
    /// kube refreshes exec tokens synchronously inside requests, which would
    /// stall the awaiting task and keep its timer from firing.
    async fn run_detached<T, F>(
        &self,
        operation: &str,
        limit: Duration,
        fut: F,
        on_join_error: impl FnOnce(String) -> Error,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::spawn(fut);
        let abort = task.abort_handle();

        let result = self
            .with_timeout(operation, limit, async {
                task.await
                    .map_err(|e| on_join_error(format!("{} task failed: {}", operation, e)))?
            })
            .await;

        abort.abort();
        result
    }

    async fn with_timeout<T, F>(&self, operation: &str, limit: Duration, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| Error::timeout(operation, limit.as_secs()))?
    }
}
