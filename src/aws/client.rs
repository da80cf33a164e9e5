/// EKS control-plane API client
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_eks::config::{Credentials, Region};
use aws_sdk_eks::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_eks::operation::describe_cluster::DescribeClusterError;
use aws_sdk_eks::types::Cluster;
use aws_sdk_eks::Client;
use chrono::DateTime;
use std::sync::Arc;
use tracing::debug;

use super::credentials::ProviderSession;
use super::models::ClusterDescription;
use crate::error::{Error, Result};

/// Provider name recorded on static credentials
const CREDENTIALS_PROVIDER_NAME: &str = "clusterdeck";

/// Operations used against the EKS control plane
#[async_trait]
pub trait EksApi: Send + Sync {
    /// Describe a single cluster by name
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescription>;

    /// Names of all clusters in the client's region
    async fn list_clusters(&self) -> Result<Vec<String>>;
}

/// Builds region-bound control-plane clients from a provider session
#[async_trait]
pub trait EksClientFactory: Send + Sync {
    async fn eks_client(&self, session: &ProviderSession, region: &str)
        -> Result<Arc<dyn EksApi>>;
}

/// EKS client backed by the AWS SDK
#[derive(Clone)]
pub struct AwsEksClient {
    client: Client,
}

impl AwsEksClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EksApi for AwsEksClient {
    async fn describe_cluster(&self, name: &str) -> Result<ClusterDescription> {
        debug!("DescribeCluster {}", name);

        let response = self
            .client
            .describe_cluster()
            .name(name)
            .send()
            .await
            .map_err(|e| describe_error(name, e))?;

        let cluster = response.cluster.ok_or_else(|| {
            Error::provider(None, format!("DescribeCluster returned no cluster for {}", name))
        })?;

        Ok(cluster_description(cluster, name))
    }

    async fn list_clusters(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            debug!("ListClusters (next_token present: {})", next_token.is_some());

            let response = self
                .client
                .list_clusters()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(sdk_error)?;

            names.extend(response.clusters.unwrap_or_default());

            match response.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }
}

/// Factory creating SDK clients with the session's credentials
#[derive(Debug, Clone, Default)]
pub struct AwsSdkClientFactory;

#[async_trait]
impl EksClientFactory for AwsSdkClientFactory {
    async fn eks_client(
        &self,
        session: &ProviderSession,
        region: &str,
    ) -> Result<Arc<dyn EksApi>> {
        let loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));

        let loader = match session {
            ProviderSession::StaticKeys {
                access_key_id,
                secret_access_key,
                session_token,
            } => loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            )),
            ProviderSession::Profile { name } => loader.profile_name(name),
        };

        let config = loader.load().await;
        Ok(Arc::new(AwsEksClient::new(Client::new(&config))))
    }
}

/// Convert an SDK cluster into the connector's model
fn cluster_description(cluster: Cluster, requested_name: &str) -> ClusterDescription {
    ClusterDescription {
        name: cluster
            .name
            .unwrap_or_else(|| requested_name.to_string()),
        arn: cluster.arn,
        endpoint: cluster.endpoint,
        certificate_authority_data: cluster.certificate_authority.and_then(|ca| ca.data),
        version: cluster.version,
        status: cluster.status.map(|status| status.as_str().to_string()),
        created_at: cluster
            .created_at
            .and_then(|t| DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
    }
}

fn describe_error(name: &str, err: SdkError<DescribeClusterError>) -> Error {
    if let Some(service_error) = err.as_service_error() {
        if service_error.is_resource_not_found_exception() {
            let message = service_error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("No cluster found for name: {}", name));
            return Error::ClusterNotFound(message);
        }
    }
    sdk_error(err)
}

/// Wrap an SDK error, keeping the service error code and message verbatim
fn sdk_error<E, R>(err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    match err.as_service_error() {
        Some(service_error) => Error::provider(
            service_error.code(),
            service_error
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| service_error.to_string()),
        ),
        None => Error::provider(None, DisplayErrorContext(&err).to_string()),
    }
}
