/// Normalized views of Kubernetes resources
use anyhow::Result;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Node, Pod, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use super::client::ClusterApi;
use crate::error::Error;

const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";
const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";
const ZONE_LABEL: &str = "topology.kubernetes.io/zone";
const UNKNOWN: &str = "Unknown";
const NOT_SCHEDULED: &str = "Not scheduled";

/// Resource kinds that can be queried on a connected cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Pods,
    Deployments,
    Services,
    Nodes,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Pods,
        ResourceKind::Deployments,
        ResourceKind::Services,
        ResourceKind::Nodes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::Services => "services",
            ResourceKind::Nodes => "nodes",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnsupportedResourceKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PodSummary {
    pub name: String,
    pub namespace: String,
    /// Pod phase
    pub status: Option<String>,
    pub containers: Vec<String>,
    pub node: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeploymentSummary {
    pub name: String,
    pub namespace: String,
    /// Desired replica count
    pub replicas: Option<i32>,
    pub available_replicas: i32,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub ports: Vec<ServicePortSummary>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServicePortSummary {
    pub port: i32,
    pub target_port: Option<IntOrString>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeSummary {
    pub name: String,
    /// `Ready` or `NotReady`
    pub status: String,
    pub roles: Vec<String>,
    pub instance_type: String,
    pub zone: String,
    pub kubelet_version: Option<String>,
    pub created_at: Option<String>,
}

/// A normalized resource record, one shape per kind
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NormalizedResource {
    Pod(PodSummary),
    Deployment(DeploymentSummary),
    Service(ServiceSummary),
    Node(NodeSummary),
}

/// Result of listing one resource kind
#[derive(Debug, Clone, Serialize)]
pub struct ResourceList {
    pub resource_type: ResourceKind,
    pub count: usize,
    pub items: Vec<NormalizedResource>,
}

impl ResourceList {
    pub fn new(resource_type: ResourceKind, items: Vec<NormalizedResource>) -> Self {
        Self {
            resource_type,
            count: items.len(),
            items,
        }
    }
}

/// List every object of `kind` across all namespaces and normalize it
///
/// A failed list call fails the whole operation; no partial results.
pub async fn list_resources(api: &dyn ClusterApi, kind: ResourceKind) -> Result<ResourceList> {
    let items: Vec<NormalizedResource> = match kind {
        ResourceKind::Pods => api
            .list_pods()
            .await?
            .iter()
            .map(|p| NormalizedResource::Pod(pod_summary(p)))
            .collect(),
        ResourceKind::Deployments => api
            .list_deployments()
            .await?
            .iter()
            .map(|d| NormalizedResource::Deployment(deployment_summary(d)))
            .collect(),
        ResourceKind::Services => api
            .list_services()
            .await?
            .iter()
            .map(|s| NormalizedResource::Service(service_summary(s)))
            .collect(),
        ResourceKind::Nodes => api
            .list_nodes()
            .await?
            .iter()
            .map(|n| NormalizedResource::Node(node_summary(n)))
            .collect(),
    };

    debug!("Listed {} {}", items.len(), kind);
    Ok(ResourceList::new(kind, items))
}

pub fn pod_summary(pod: &Pod) -> PodSummary {
    let spec = pod.spec.as_ref();
    PodSummary {
        name: name(&pod.metadata),
        namespace: namespace(&pod.metadata),
        status: pod.status.as_ref().and_then(|s| s.phase.clone()),
        containers: spec
            .map(|s| s.containers.iter().map(|c| c.name.clone()).collect())
            .unwrap_or_default(),
        node: spec
            .and_then(|s| s.node_name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| NOT_SCHEDULED.to_string()),
        created_at: created_at(&pod.metadata),
    }
}

pub fn deployment_summary(deployment: &Deployment) -> DeploymentSummary {
    DeploymentSummary {
        name: name(&deployment.metadata),
        namespace: namespace(&deployment.metadata),
        replicas: deployment.spec.as_ref().and_then(|s| s.replicas),
        available_replicas: deployment
            .status
            .as_ref()
            .and_then(|s| s.available_replicas)
            .unwrap_or(0),
        created_at: created_at(&deployment.metadata),
    }
}

pub fn service_summary(service: &Service) -> ServiceSummary {
    let spec = service.spec.as_ref();
    ServiceSummary {
        name: name(&service.metadata),
        namespace: namespace(&service.metadata),
        service_type: spec.and_then(|s| s.type_.clone()),
        cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
        ports: spec
            .and_then(|s| s.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| ServicePortSummary {
                        port: p.port,
                        target_port: p.target_port.clone(),
                        protocol: p.protocol.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        created_at: created_at(&service.metadata),
    }
}

pub fn node_summary(node: &Node) -> NodeSummary {
    let status = node.status.as_ref();
    let ready = status
        .and_then(|s| s.conditions.as_ref())
        .and_then(|conditions| conditions.iter().find(|c| c.type_ == "Ready"))
        .is_some_and(|c| c.status == "True");

    let labels = node.metadata.labels.as_ref();
    let label = |key: &str| {
        labels
            .and_then(|l| l.get(key).cloned())
            .unwrap_or_else(|| UNKNOWN.to_string())
    };

    NodeSummary {
        name: name(&node.metadata),
        status: if ready { "Ready" } else { "NotReady" }.to_string(),
        roles: labels
            .map(|l| {
                l.keys()
                    .filter_map(|key| key.strip_prefix(NODE_ROLE_PREFIX))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        instance_type: label(INSTANCE_TYPE_LABEL),
        zone: label(ZONE_LABEL),
        kubelet_version: status
            .and_then(|s| s.node_info.as_ref())
            .map(|info| info.kubelet_version.clone()),
        created_at: created_at(&node.metadata),
    }
}

fn name(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn namespace(meta: &ObjectMeta) -> String {
    meta.namespace.clone().unwrap_or_default()
}

fn created_at(meta: &ObjectMeta) -> Option<String> {
    meta.creation_timestamp
        .as_ref()
        .map(|Time(ts)| ts.to_rfc3339())
}
