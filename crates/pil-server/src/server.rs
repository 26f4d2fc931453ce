use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// PIL HTTP server.
pub struct PilServer {
    config: ServerConfig,
    state: AppState,
}

impl PilServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        let router = build_router(self.state.clone());
        if self.config.allow_any_origin {
            router.layer(CorsLayer::permissive())
        } else {
            router
        }
    }

    /// Start serving requests.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            hash_function = %self.config.hash_function,
            "PIL server listening"
        );
        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use tower::util::ServiceExt;

    use pil_ledger::InMemoryLedgerStore;

    use super::*;

    fn server(allow_any_origin: bool) -> PilServer {
        let config = ServerConfig {
            allow_any_origin,
            ..ServerConfig::default()
        };
        let state = AppState::in_memory(&config, InMemoryLedgerStore::new());
        PilServer::new(config, state)
    }

    #[test]
    fn server_construction() {
        let server = server(false);
        assert_eq!(server.config().bind_addr, "127.0.0.1:8640".parse().unwrap());
    }

    #[tokio::test]
    async fn cors_is_opt_in() {
        let preflight = || {
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/v1/health")
                .header(header::ORIGIN, "https://dashboard.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap()
        };

        let open = server(true).router().oneshot(preflight()).await.unwrap();
        assert!(open
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));

        let closed = server(false).router().oneshot(preflight()).await.unwrap();
        assert!(!closed
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
