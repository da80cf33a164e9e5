/// HTTP API for the cluster connection manager
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::connector::Connector;

/// Build the API router around a shared connector
pub fn router(connector: Connector) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/api/clusters", get(routes::list_clusters))
        .route("/api/clusters/connect", post(routes::connect_cluster))
        .route("/api/clusters/available", post(routes::list_available_clusters))
        .route(
            "/api/clusters/:connection_id/disconnect",
            post(routes::disconnect_cluster),
        )
        .route(
            "/api/clusters/:connection_id/resources/:resource_type",
            get(routes::get_resources),
        )
        .route("/api/clusters/:connection_id/pods", get(routes::get_pods))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(connector)
}

/// Serve the API until Ctrl-C
pub async fn serve(addr: SocketAddr, connector: Connector) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(connector))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::ConnectorSettings;
    use crate::testing::{MockClusterApiFactory, MockEksApi, MockEksClientFactory};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_connector() -> Connector {
        let eks = Arc::new(MockEksApi::with_clusters(&["alpha", "beta"]));
        Connector::new(
            Arc::new(MockEksClientFactory::new(eks)),
            Arc::new(MockClusterApiFactory::default()),
            ConnectorSettings::default(),
        )
    }

    async fn send(router: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = router.oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn credentials(cluster: &str) -> Value {
        json!({
            "cluster_name": cluster,
            "region": "us-east-1",
            "auth_type": "credentials",
            "aws_access_key_id": "AKIAEXAMPLE",
            "aws_secret_access_key": "secret"
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(router(test_connector()), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_connect_then_list() {
        let connector = test_connector();

        let (status, body) = send(
            router(connector.clone()),
            "POST",
            "/api/clusters/connect",
            Some(credentials("alpha")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["connection_id"], "us-east-1_alpha");

        let (status, body) = send(router(connector), "GET", "/api/clusters", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["clusters"][0]["connection_id"], "us-east-1_alpha");
        assert_eq!(body["clusters"][0]["cluster_info"]["region"], "us-east-1");
    }

    #[tokio::test]
    async fn test_connect_validation() {
        let connector = test_connector();

        let (status, body) =
            send(router(connector.clone()), "POST", "/api/clusters/connect", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let mut missing_secret = credentials("alpha");
        missing_secret["aws_secret_access_key"] = Value::Null;
        let (status, body) = send(
            router(connector.clone()),
            "POST",
            "/api/clusters/connect",
            Some(missing_secret),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("credentials required"));

        let (status, body) = send(
            router(connector),
            "POST",
            "/api/clusters/connect",
            Some(json!({ "cluster_name": "alpha", "region": "us-east-1", "auth_type": "sso" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Unsupported auth type: sso");
    }

    #[tokio::test]
    async fn test_unknown_cluster_is_not_found() {
        let (status, body) = send(
            router(test_connector()),
            "POST",
            "/api/clusters/connect",
            Some(credentials("missing")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_available() {
        let (status, body) = send(
            router(test_connector()),
            "POST",
            "/api/clusters/available",
            Some(json!({ "region": "us-east-1", "auth_type": "profile" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["region"], "us-east-1");
        assert_eq!(body["clusters"][1]["name"], "beta");
    }

    #[tokio::test]
    async fn test_resources_and_disconnect() {
        let connector = test_connector();
        send(
            router(connector.clone()),
            "POST",
            "/api/clusters/connect",
            Some(credentials("alpha")),
        )
        .await;

        let (status, body) = send(
            router(connector.clone()),
            "GET",
            "/api/clusters/us-east-1_alpha/resources/nodes",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["resource_type"], "nodes");
        assert_eq!(body["count"], 1);
        assert_eq!(body["items"][0]["name"], "node-1");

        let (status, _) = send(
            router(connector.clone()),
            "GET",
            "/api/clusters/us-east-1_alpha/resources/secrets",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            router(connector.clone()),
            "POST",
            "/api/clusters/us-east-1_alpha/disconnect",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Disconnected from cluster alpha");

        let (status, body) = send(
            router(connector.clone()),
            "POST",
            "/api/clusters/us-east-1_alpha/disconnect",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Cluster not connected");

        let (status, _) = send(router(connector), "GET", "/api/clusters/us-east-1_alpha/pods", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
