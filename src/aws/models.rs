/// EKS cluster metadata models
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Cluster metadata as reported by DescribeCluster
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterDescription {
    pub name: String,
    pub arn: Option<String>,
    pub endpoint: Option<String>,
    /// Base64-encoded PEM bundle of the cluster CA
    pub certificate_authority_data: Option<String>,
    pub version: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClusterDescription {
    /// Region parsed out of the ARN (`arn:aws:eks:<region>:<account>:cluster/<name>`)
    pub fn arn_region(&self) -> Option<&str> {
        self.arn
            .as_deref()?
            .split(':')
            .nth(3)
            .filter(|region| !region.is_empty())
    }
}

/// One entry of an available-clusters listing
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AvailableCluster {
    pub name: String,
    pub status: Option<String>,
    pub version: Option<String>,
    pub endpoint: Option<String>,
    pub created_at: Option<String>,
}

impl From<ClusterDescription> for AvailableCluster {
    fn from(cluster: ClusterDescription) -> Self {
        Self {
            created_at: cluster.created_at.map(|t| t.to_rfc3339()),
            name: cluster.name,
            status: cluster.status,
            version: cluster.version,
            endpoint: cluster.endpoint,
        }
    }
}
