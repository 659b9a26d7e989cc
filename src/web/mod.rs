//! Web server module.

mod handlers;

pub use handlers::*;

use crate::alert::AlertDispatcher;
use crate::config::ServerConfig;
use crate::mirror::MirrorPublisher;
use crate::scheduler::Scheduler;
use crate::store::Store;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub scheduler: Arc<Scheduler>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub mirror: Arc<MirrorPublisher>,
}

/// Web server for PulseWatch.
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(
        config: ServerConfig,
        store: Arc<Store>,
        scheduler: Arc<Scheduler>,
        dispatcher: Arc<AlertDispatcher>,
        mirror: Arc<MirrorPublisher>,
    ) -> Self {
        Self {
            config,
            state: AppState {
                store,
                scheduler,
                dispatcher,
                mirror,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Resource CRUD
            .route("/api/servers", get(handlers::handle_get_resources))
            .route("/api/servers", post(handlers::handle_create_resource))
            .route("/api/servers/{id}", put(handlers::handle_update_resource))
            .route("/api/servers/{id}", delete(handlers::handle_delete_resource))
            // Notification settings
            .route("/api/config", get(handlers::handle_get_config))
            .route("/api/config", post(handlers::handle_set_config))
            .route("/api/test-alert", post(handlers::handle_test_alert))
            // Mirror
            .route("/api/mirror/publish", post(handlers::handle_mirror_publish))
            // Engine control
            .route("/api/engine/status", get(handlers::handle_engine_status))
            .route("/api/engine/start", post(handlers::handle_engine_start))
            .route("/api/engine/stop", post(handlers::handle_engine_stop))
            .route("/api/engine/restart", post(handlers::handle_engine_restart))
            // Health
            .route("/api/health", get(handlers::handle_health))
            .layer(cors)
            .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
