/// Kubernetes access configuration, API sessions and resource listing
pub mod client;
pub mod kubeconfig;
pub mod resources;

pub use client::{ClusterApi, ClusterApiFactory, KubeClientFactory};
pub use kubeconfig::AccessConfig;
pub use resources::{list_resources, ResourceKind, ResourceList};
