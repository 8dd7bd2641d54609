//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router for `/api/super-info`
//! - Wire up middleware (CORS, timeout, request ID, tracing)
//! - Spawn the rate-limiter and cache sweepers
//! - Bind to the listener and drain on shutdown

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::Request,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::aggregate::Aggregator;
use crate::config::ServiceConfig;
use crate::health::HealthProbe;
use crate::http::handlers::{handle_middleware_error, preflight, super_info};
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::lifecycle::shutdown::{signalled, Shutdown};
use crate::upstream::ClientInitError;

/// Route served by this service.
pub const SUPER_INFO_PATH: &str = "/api/super-info";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub health: Arc<HealthProbe>,
}

/// HTTP server for the aggregation endpoint.
pub struct HttpServer {
    router: Router,
    config: ServiceConfig,
    aggregator: Arc<Aggregator>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServiceConfig) -> Result<Self, ClientInitError> {
        let aggregator = Arc::new(Aggregator::from_config(&config)?);
        let health = Arc::new(HealthProbe::new(&config.upstreams, &config.health)?);

        let state = AppState {
            aggregator: aggregator.clone(),
            health,
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            aggregator,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Methods other than GET and OPTIONS get 405 from the method router.
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id(request.headers()),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(CorsLayer::permissive())
            .layer(HandleErrorLayer::new(handle_middleware_error))
            .timeout(Duration::from_secs(config.timeouts.request_secs));

        Router::new()
            .route(SUPER_INFO_PATH, get(super_info).options(preflight))
            .with_state(state)
            .layer(middleware)
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: Shutdown,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        if self.config.rate_limit.enabled {
            let limiter = self.aggregator.limiter().clone();
            let every = self.config.rate_limit.sweep_interval();
            tokio::spawn(limiter.run_sweeper(every, shutdown.subscribe()));
        }
        let cache = self.aggregator.cache().clone();
        let every = self.config.cache.sweep_interval();
        tokio::spawn(cache.run_sweeper(every, shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(signalled(shutdown.subscribe()))
            .await?;

        tracing::info!(breakers = ?self.aggregator.breakers().snapshot(), "HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Shared aggregation context.
    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }
}
