/// In-memory stand-ins for the AWS and Kubernetes seams
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::config::Kubeconfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::aws::{ClusterDescription, EksApi, EksClientFactory, ProviderSession};
use crate::error::{Error, Result};
use crate::k8s::{ClusterApi, ClusterApiFactory};

#[derive(Default)]
pub struct MockEksApi {
    clusters: Mutex<Vec<ClusterDescription>>,
    describe_failures: Mutex<HashMap<String, Error>>,
    list_failure: Mutex<Option<Error>>,
    hang: AtomicBool,
    pub describe_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

impl MockEksApi {
    pub fn with_clusters(names: &[&str]) -> Self {
        let api = Self::default();
        *api.clusters.lock().unwrap() = names
            .iter()
            .map(|name| Self::cluster(name, "us-east-1"))
            .collect();
        api
    }

    pub fn cluster(name: &str, region: &str) -> ClusterDescription {
        ClusterDescription {
            name: name.to_string(),
            arn: Some(format!("arn:aws:eks:{}:123456789012:cluster/{}", region, name)),
            endpoint: Some(format!("https://{}.gr7.{}.eks.amazonaws.com", name, region)),
            certificate_authority_data: Some("Y2VydA==".to_string()),
            version: Some("1.30".to_string()),
            status: Some("ACTIVE".to_string()),
            created_at: None,
        }
    }

    pub fn set_cluster(&self, cluster: ClusterDescription) {
        let mut clusters = self.clusters.lock().unwrap();
        clusters.retain(|c| c.name != cluster.name);
        clusters.push(cluster);
    }

    pub fn fail_describe(&self, name: &str, err: Error) {
        self.describe_failures
            .lock()
            .unwrap()
            .insert(name.to_string(), err);
    }

    pub fn fail_list(&self, err: Error) {
        *self.list_failure.lock().unwrap() = Some(err);
    }

    pub fn hang_describe(&self) {
        self.hang.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EksApi for MockEksApi {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescription> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(err) = self.describe_failures.lock().unwrap().get(name) {
            return Err(err.clone());
        }
        self.clusters
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| Error::ClusterNotFound(format!("No cluster found for name: {}", name)))
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .clusters
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect())
    }
}

pub struct MockEksClientFactory {
    api: Arc<MockEksApi>,
    pub clients_created: AtomicUsize,
}

impl MockEksClientFactory {
    pub fn new(api: Arc<MockEksApi>) -> Self {
        Self {
            api,
            clients_created: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EksClientFactory for MockEksClientFactory {
    async fn eks_client(
        &self,
        _session: &ProviderSession,
        _region: &str,
    ) -> Result<Arc<dyn EksApi>> {
        self.clients_created.fetch_add(1, Ordering::SeqCst);
        Ok(self.api.clone())
    }
}

#[derive(Default)]
pub struct MockClusterApi {
    pub pods: Mutex<Vec<Pod>>,
    pub deployments: Mutex<Vec<Deployment>>,
    pub services: Mutex<Vec<Service>>,
    pub nodes: Mutex<Vec<Node>>,
    pub probe_error: Option<String>,
    pub list_error: Option<String>,
    /// Blocks the calling thread before answering, like an exec token refresh
    pub list_delay: Option<Duration>,
    pub list_calls: AtomicUsize,
}

impl MockClusterApi {
    pub fn failing_lists(message: &str) -> Self {
        Self {
            list_error: Some(message.to_string()),
            ..Default::default()
        }
    }

    fn listed<T: Clone>(&self, items: &Mutex<Vec<T>>) -> anyhow::Result<Vec<T>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.list_delay {
            std::thread::sleep(delay);
        }
        if let Some(message) = &self.list_error {
            anyhow::bail!("{}", message);
        }
        Ok(items.lock().unwrap().clone())
    }
}

#[async_trait]
impl ClusterApi for MockClusterApi {
    async fn probe(&self) -> anyhow::Result<()> {
        match &self.probe_error {
            Some(message) => anyhow::bail!("{}", message),
            None => Ok(()),
        }
    }

    async fn list_pods(&self) -> anyhow::Result<Vec<Pod>> {
        self.listed(&self.pods)
    }

    async fn list_deployments(&self) -> anyhow::Result<Vec<Deployment>> {
        self.listed(&self.deployments)
    }

    async fn list_services(&self) -> anyhow::Result<Vec<Service>> {
        self.listed(&self.services)
    }

    async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
        self.listed(&self.nodes)
    }
}

/// Hands out one `MockClusterApi` (holding a single node) per connect
#[derive(Default)]
pub struct MockClusterApiFactory {
    pub connects: AtomicUsize,
    probe_error: Mutex<Option<String>>,
    list_error: Mutex<Option<String>>,
    list_delay: Mutex<Option<Duration>>,
    last_kubeconfig: Mutex<Option<Kubeconfig>>,
    apis: Mutex<Vec<Arc<MockClusterApi>>>,
}

impl MockClusterApiFactory {
    pub fn fail_probe(&self, message: &str) {
        *self.probe_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_lists(&self, message: &str) {
        *self.list_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn block_lists(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn last_exec_args(&self) -> Option<Vec<String>> {
        self.last_kubeconfig
            .lock()
            .unwrap()
            .as_ref()?
            .auth_infos
            .first()?
            .auth_info
            .as_ref()?
            .exec
            .as_ref()?
            .args
            .clone()
    }

    pub fn last_api(&self) -> Option<Arc<MockClusterApi>> {
        self.apis.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ClusterApiFactory for MockClusterApiFactory {
    async fn connect(&self, kubeconfig: Kubeconfig) -> anyhow::Result<Arc<dyn ClusterApi>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        *self.last_kubeconfig.lock().unwrap() = Some(kubeconfig);

        let api = Arc::new(MockClusterApi {
            nodes: Mutex::new(vec![Node {
                metadata: ObjectMeta {
                    name: Some("node-1".to_string()),
                    ..Default::default()
                },
                ..Default::default()
            }]),
            probe_error: self.probe_error.lock().unwrap().clone(),
            list_error: self.list_error.lock().unwrap().clone(),
            list_delay: *self.list_delay.lock().unwrap(),
            ..Default::default()
        });
        self.apis.lock().unwrap().push(api.clone());
        Ok(api)
    }
}
