/// AWS credential resolution and EKS control-plane access
pub mod client;
pub mod credentials;
pub mod models;

pub use client::{AwsSdkClientFactory, EksApi, EksClientFactory};
pub use credentials::{CredentialParams, ProviderSession};
pub use models::{AvailableCluster, ClusterDescription};
