/// Kubernetes API access for connected clusters
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Node, Pod, Service};
use kube::api::{Api, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::debug;

/// Cluster-wide calls issued against a connected cluster
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Lightweight call proving the session can reach and query the API server
    async fn probe(&self) -> Result<()>;

    async fn list_pods(&self) -> Result<Vec<Pod>>;

    async fn list_deployments(&self) -> Result<Vec<Deployment>>;

    async fn list_services(&self) -> Result<Vec<Service>>;

    async fn list_nodes(&self) -> Result<Vec<Node>>;
}

/// Builds an authenticated cluster API session from a kubeconfig
#[async_trait]
pub trait ClusterApiFactory: Send + Sync {
    async fn connect(&self, kubeconfig: Kubeconfig) -> Result<Arc<dyn ClusterApi>>;
}

/// `ClusterApi` backed by a kube-rs client
#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// List a resource across all namespaces
    async fn list_all<K>(&self) -> Result<Vec<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn probe(&self) -> Result<()> {
        let namespaces: Api<Namespace> = Api::all(self.client.clone());
        let list = namespaces
            .list(&ListParams::default().limit(1))
            .await
            .context("Failed to list namespaces")?;
        debug!("Probe returned {} namespace(s)", list.items.len());
        Ok(())
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        self.list_all().await
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>> {
        self.list_all().await
    }

    async fn list_services(&self) -> Result<Vec<Service>> {
        self.list_all().await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        self.list_all().await
    }
}

/// Factory creating kube-rs clients from an in-memory kubeconfig
#[derive(Debug, Clone, Default)]
pub struct KubeClientFactory;

#[async_trait]
impl ClusterApiFactory for KubeClientFactory {
    async fn connect(&self, kubeconfig: Kubeconfig) -> Result<Arc<dyn ClusterApi>> {
        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .context("Failed to build client configuration")?;

        debug!("Creating Kubernetes client for {}", config.cluster_url);

        // Building the client runs the exec token command synchronously
        let runtime = tokio::runtime::Handle::current();
        let client = tokio::task::spawn_blocking(move || {
            let _guard = runtime.enter();
            Client::try_from(config)
        })
        .await
        .context("Kubernetes client task failed")?
        .context("Failed to create Kubernetes client")?;

        Ok(Arc::new(KubeClusterApi::new(client)))
    }
}
