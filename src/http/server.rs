//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the guard handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Run the signature cascade on every image request
//! - Forward requests to the upstream image service
//! - Swap in reloaded configuration without dropping connections

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, Version},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GuardConfig;
use crate::http::forward::{strip_hop_by_hop, upstream_uri};
use crate::http::request::{MakeRequestUuid, RequestIdExt};
use crate::imaging::SignedRequest;
use crate::lifecycle::startup::GuardRuntime;
use crate::observability::metrics;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<GuardRuntime>>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the guard.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server around an initialized runtime.
    pub fn new(runtime: GuardRuntime) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let request_secs = runtime.config.timeouts.request_secs;

        let state = AppState {
            runtime: Arc::new(ArcSwap::from_pointee(runtime)),
            client,
        };

        let router = Self::build_router(request_secs, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_secs: u64, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", get(guard_handler))
            .route("/", get(guard_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configurations received on `config_updates` replace the running one.
    /// The request timeout is fixed at startup.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GuardConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let runtime = self.state.runtime.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match GuardRuntime::from_config(config) {
                    Ok(next) => {
                        runtime.store(Arc::new(next));
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to apply reloaded config, keeping current configuration");
                    }
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Currently active runtime.
    pub fn runtime(&self) -> Arc<GuardRuntime> {
        self.state.runtime.load_full()
    }
}

/// Validates, repairs and forwards one image request.
async fn guard_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start_time = Instant::now();
    let runtime = state.runtime.load_full();
    let request_id = request.request_id().to_string();
    let method = request.method().clone();

    let (mut parts, body) = request.into_parts();
    let received = parts.uri.path().to_string();

    let path = match SignedRequest::parse(&received) {
        Ok(mut signed) => {
            let outcome = runtime.repair.apply(&mut signed).await;
            tracing::debug!(
                request_id = %request_id,
                outcome = outcome.label(),
                stage = outcome.stage().map(|s| s.as_str()).unwrap_or("none"),
                "Signature checked"
            );
            if outcome.is_rewrite() {
                signed.path().to_string()
            } else {
                received
            }
        }
        Err(e) => {
            tracing::debug!(request_id = %request_id, error = %e, "Forwarding unparsed request unchanged");
            received
        }
    };

    parts.uri = match upstream_uri(&runtime.config.upstream.address, &path, parts.uri.query()) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Invalid upstream URI");
            metrics::record_request(method.as_str(), 502, start_time);
            return (StatusCode::BAD_GATEWAY, "Invalid upstream URI").into_response();
        }
    };
    parts.version = Version::HTTP_11;
    strip_hop_by_hop(&mut parts.headers);

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), start_time);

            let (mut parts, body) = response.into_parts();
            strip_hop_by_hop(&mut parts.headers);
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Upstream error");
            metrics::record_request(method.as_str(), 502, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn server_without_upstream() -> HttpServer {
        let mut config = GuardConfig::default();
        config.security.security_key = "MY_SECURE_KEY".into();
        config.upstream.address = "127.0.0.1:1".into();
        HttpServer::new(GuardRuntime::from_config(config).unwrap())
    }

    #[tokio::test]
    async fn test_unreachable_upstream_maps_to_bad_gateway() {
        let server = server_without_upstream();

        let response = server
            .router
            .oneshot(Request::get("/unsafe/a.png").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_only_get_and_head_are_routed() {
        let server = server_without_upstream();

        let response = server
            .router
            .oneshot(Request::post("/unsafe/a.png").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
