//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, timeouts, limits, CORS)
//! - Serve over plain TCP or TLS
//! - Coordinate graceful shutdown with open streams and sockets

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::{AppConfig, ListenerConfig, SseConfig, TlsConfig, WebSocketConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::{handlers, sse, websocket};
use crate::lifecycle::Shutdown;
use crate::net::{tls::load_tls_config, ConnectionTracker};
use crate::observability::{metrics, spans};
use crate::security::{cors::cors_layer, headers::with_security_headers, limits::with_body_limit};
use crate::service::HttpService;

/// Errors that stop the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid bind address {0:?}")]
    InvalidAddress(String),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(#[source] std::io::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: HttpService,
    pub sse: SseConfig,
    pub websocket: WebSocketConfig,
    pub connections: ConnectionTracker,
    /// Fired when the server starts draining; ends streams and sockets.
    pub shutdown: Shutdown,
}

/// HTTP server for the testbed.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: AppConfig) -> Self {
        let state = AppState {
            service: HttpService::new(),
            sse: config.sse.clone(),
            websocket: config.websocket.clone(),
            connections: ConnectionTracker::new(),
            shutdown: Shutdown::new(),
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        let router = Router::new()
            .route("/api/http/get", get(handlers::get_example))
            .route("/api/http/post", post(handlers::post_example))
            .route("/api/http/put", put(handlers::put_example))
            .route("/api/http/patch", patch(handlers::patch_example))
            .route("/api/http/delete", delete(handlers::delete_example))
            .route("/sse", get(sse::sse_handler))
            .route("/ws", get(websocket::ws_handler))
            .route("/health", get(handlers::health))
            .route_layer(middleware::from_fn(metrics::track_requests))
            .with_state(state);

        let mut router = with_body_limit(router, config.security.max_body_size)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        if config.cors.enabled {
            router = router.layer(cors_layer(&config.cors));
        }
        if config.security.enable_headers {
            router = with_security_headers(router);
        }

        router
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(spans::make_request_span))
            .layer(set_request_id_layer())
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Tracker of open WebSocket sessions and event streams.
    pub fn connections(&self) -> &ConnectionTracker {
        &self.state.connections
    }

    /// Bind the configured address and serve, over TLS when configured.
    pub async fn serve(self, shutdown: Shutdown) -> Result<(), ServerError> {
        match self.config.listener.tls.clone() {
            Some(tls) => {
                let addr = parse_bind_address(&self.config.listener)?;
                self.run_tls(addr, &tls, shutdown).await
            }
            None => {
                let listener = bind(&self.config.listener).await?;
                self.run(listener, shutdown).await
            }
        }
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Returns once `shutdown` fired and in-flight requests finished, or
    /// the grace period elapsed.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let drain = self.state.shutdown.clone();
        let signal = shutdown.clone();

        let server = axum::serve(listener, self.router).with_graceful_shutdown(async move {
            signal.wait().await;
            tracing::info!("Draining connections");
            drain.trigger();
        });

        tokio::select! {
            result = server.into_future() => result?,
            _ = async {
                shutdown.wait().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(grace_secs = grace.as_secs(), "Grace period elapsed, forcing shutdown");
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server over TLS on `addr`.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: &TlsConfig,
        shutdown: Shutdown,
    ) -> Result<(), ServerError> {
        let rustls = load_tls_config(tls).await.map_err(ServerError::Tls)?;
        tracing::info!(address = %addr, "HTTPS server starting");

        let handle = axum_server::Handle::new();
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        {
            let handle = handle.clone();
            let drain = self.state.shutdown.clone();
            tokio::spawn(async move {
                shutdown.wait().await;
                tracing::info!("Draining connections");
                drain.trigger();
                handle.graceful_shutdown(Some(grace));
            });
        }

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

fn parse_bind_address(config: &ListenerConfig) -> Result<SocketAddr, ServerError> {
    config
        .bind_address
        .parse()
        .map_err(|_| ServerError::InvalidAddress(config.bind_address.clone()))
}

/// Bind a TCP listener on the configured address.
pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ServerError> {
    let addr = parse_bind_address(config)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_address.clone(),
            source,
        })?;
    tracing::info!(address = %listener.local_addr()?, "Listener bound");
    Ok(listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::http::request::X_REQUEST_ID;

    fn app() -> Router {
        HttpServer::new(AppConfig::default()).router()
    }

    fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn get_wraps_param() {
        let response = app()
            .oneshot(Request::get("/api/http/get?param=abc").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body, json!({ "status": "success", "message": "GET param: abc" }));
    }

    #[tokio::test]
    async fn body_verbs_wrap_value() {
        for (method, path, verb) in [
            (Method::POST, "/api/http/post", "POST"),
            (Method::PUT, "/api/http/put", "PUT"),
            (Method::PATCH, "/api/http/patch", "PATCH"),
        ] {
            let response = app()
                .oneshot(json_request(method, path, json!({ "value": "x" })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
            assert_eq!(body["message"], format!("{verb} value: x"));
        }
    }

    #[tokio::test]
    async fn delete_answers_plain_text() {
        let response = app()
            .oneshot(
                Request::delete("/api/http/delete?id=42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
        assert_eq!(body_text(response).await, "Deleted ID: 42");
    }

    #[tokio::test]
    async fn binding_failures_use_framework_rejections() {
        let missing_param = app()
            .oneshot(Request::get("/api/http/get").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing_param.status(), StatusCode::BAD_REQUEST);

        let structured_value = app()
            .oneshot(json_request(Method::POST, "/api/http/post", json!({ "value": [1] })))
            .await
            .unwrap();
        assert_eq!(structured_value.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let no_content_type = app()
            .oneshot(
                Request::put("/api/http/put")
                    .body(Body::from(r#"{"value":"x"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(no_content_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn repeated_query_params_are_joined() {
        let response = app()
            .oneshot(
                Request::get("/api/http/get?param=a&param=b")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "GET param: a,b");

        let response = app()
            .oneshot(
                Request::delete("/api/http/delete?id=1&id=2")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Deleted ID: 1,2");
    }

    #[tokio::test]
    async fn missing_value_binds_as_null() {
        let response = app()
            .oneshot(json_request(Method::POST, "/api/http/post", json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "POST value: null");
    }

    #[tokio::test]
    async fn numeric_value_keeps_request_text() {
        let response = app()
            .oneshot(
                Request::patch("/api/http/patch")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"value":1.50}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["message"], "PATCH value: 1.50");
    }

    #[tokio::test]
    async fn wrong_verb_is_rejected() {
        let response = app()
            .oneshot(Request::get("/api/http/post").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let mut config = AppConfig::default();
        config.security.max_body_size = 16;
        let response = HttpServer::new(config)
            .router()
            .oneshot(json_request(
                Method::POST,
                "/api/http/post",
                json!({ "value": "a value longer than sixteen bytes" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn request_id_is_generated_or_propagated() {
        let generated = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(generated.headers().contains_key(X_REQUEST_ID));

        let supplied = app()
            .oneshot(
                Request::get("/health")
                    .header(X_REQUEST_ID, "client-chosen")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(supplied.headers()[X_REQUEST_ID], "client-chosen");
    }

    #[tokio::test]
    async fn security_headers_follow_config() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

        let mut config = AppConfig::default();
        config.security.enable_headers = false;
        let response = HttpServer::new(config)
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!response.headers().contains_key(header::X_CONTENT_TYPE_OPTIONS));
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/http/post")
                    .header(header::ORIGIN, "http://localhost:4200")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn cors_origin_list_is_enforced() {
        let mut config = AppConfig::default();
        config.cors.allowed_origins = vec!["http://allowed.test".into()];
        let router = HttpServer::new(config).router();

        let allowed = router
            .clone()
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://allowed.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://allowed.test"
        );

        let denied = router
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "http://other.test")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!denied
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn sse_declares_event_stream() {
        let response = app()
            .oneshot(Request::get("/sse").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    }

    #[tokio::test]
    async fn health_reports_version() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body: handlers::HealthStatus =
            serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn bind_rejects_bad_address() {
        let config = ListenerConfig {
            bind_address: "not-an-address".into(),
            tls: None,
        };
        assert!(matches!(
            bind(&config).await,
            Err(ServerError::InvalidAddress(_))
        ));
    }
}
