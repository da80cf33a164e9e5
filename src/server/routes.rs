/// HTTP handlers
///
/// Handlers validate request bodies, call into the `Connector`, and map
/// its errors to status codes. Every body carries a `success` flag.
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::aws::CredentialParams;
use crate::connector::{ConnectionSummary, Connector};
use crate::error::Error;
use crate::k8s::ResourceKind;

/// Successful response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(body: T) -> Json<Self> {
        Json(Self {
            success: true,
            body,
        })
    }
}

/// Failure response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

/// Connector error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::NotFound | Error::ClusterNotFound(_) => StatusCode::NOT_FOUND,
            Error::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            err if err.is_client_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        }
        let body = ErrorBody {
            success: false,
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// POST /api/clusters/connect
#[derive(Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub cluster_name: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialParams,
}

/// POST /api/clusters/available
#[derive(Deserialize)]
pub struct AvailableRequest {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(flatten)]
    pub credentials: CredentialParams,
}

#[derive(Debug, Serialize)]
pub struct ConnectionsBody {
    pub clusters: Vec<ConnectionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub message: String,
}

fn no_data() -> ApiError {
    Error::validation("No data provided").into()
}

/// Health check
pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
        message: "API is running".to_string(),
    })
}

pub async fn connect_cluster(
    State(connector): State<Connector>,
    request: Option<Json<ConnectRequest>>,
) -> ApiResult<crate::connector::Connected> {
    let Json(request) = request.ok_or_else(no_data)?;
    let cluster_name = request.cluster_name.unwrap_or_default();
    let region = request.region.unwrap_or_default();

    let connected = connector
        .connect(&cluster_name, &region, &request.credentials)
        .await?;
    Ok(ApiResponse::ok(connected))
}

pub async fn list_available_clusters(
    State(connector): State<Connector>,
    request: Option<Json<AvailableRequest>>,
) -> ApiResult<crate::connector::AvailableClusters> {
    let Json(request) = request.ok_or_else(no_data)?;
    let region = request.region.unwrap_or_default();

    let available = connector
        .list_available(&region, &request.credentials)
        .await?;
    Ok(ApiResponse::ok(available))
}

pub async fn list_clusters(State(connector): State<Connector>) -> Json<ApiResponse<ConnectionsBody>> {
    ApiResponse::ok(ConnectionsBody {
        clusters: connector.list_connections(),
    })
}

pub async fn disconnect_cluster(
    State(connector): State<Connector>,
    Path(connection_id): Path<String>,
) -> ApiResult<crate::connector::Disconnected> {
    Ok(ApiResponse::ok(connector.disconnect(&connection_id)?))
}

pub async fn get_resources(
    State(connector): State<Connector>,
    Path((connection_id, resource_type)): Path<(String, String)>,
) -> ApiResult<crate::k8s::ResourceList> {
    info!("Fetching {} for {}", resource_type, connection_id);
    let resources = connector
        .get_resources(&connection_id, &resource_type)
        .await?;
    Ok(ApiResponse::ok(resources))
}

/// Convenience route for pods
pub async fn get_pods(
    State(connector): State<Connector>,
    Path(connection_id): Path<String>,
) -> ApiResult<crate::k8s::ResourceList> {
    let resources = connector
        .get_resources(&connection_id, ResourceKind::Pods.as_str())
        .await?;
    Ok(ApiResponse::ok(resources))
}
