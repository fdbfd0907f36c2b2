//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the load balancer, throttle and forwarder from configuration
//! - Create the Axum router with a single catch-all route
//! - Wire up middleware (request id, tracing, timeout, throttling)
//! - Run background maintenance for strategies with expiring state
//! - Serve until the shutdown signal fires

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::clock::{self, SharedClock};
use crate::config::{validate_config, ConfigError, ProxyConfig};
use crate::http::forward::RequestForwarder;
use crate::http::pipeline::proxy_handler;
use crate::http::request::{make_request_span, propagate_request_id_layer, set_request_id_layer};
use crate::load_balancer::{self, LoadBalancer};
use crate::throttling::{self, throttle_middleware, SlidingWindow};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub balancer: Arc<dyn LoadBalancer>,
    pub forwarder: Arc<RequestForwarder>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    balancer: Arc<dyn LoadBalancer>,
    throttle: Arc<SlidingWindow>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails on an invalid configuration; nothing is bound in that case.
    pub fn new(config: ProxyConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, clock::system())
    }

    /// Like [`HttpServer::new`], reading time from `clock`.
    pub fn with_clock(config: ProxyConfig, clock: SharedClock) -> Result<Self, ConfigError> {
        validate_config(&config).map_err(ConfigError::Validation)?;

        let balancer = load_balancer::from_config(&config.load_balancer, clock.clone())?;
        let throttle = Arc::new(throttling::from_config(&config.throttling, clock));
        let forwarder = Arc::new(RequestForwarder::new(&config.timeouts));

        let state = AppState {
            balancer: balancer.clone(),
            forwarder,
        };

        let router = Self::build_router(&config, state, throttle.clone());
        Ok(Self {
            router,
            config,
            balancer,
            throttle,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState, throttle: Arc<SlidingWindow>) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(middleware::from_fn_with_state(throttle, throttle_middleware))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.timeouts.request_secs),
            ))
            .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn balancer(&self) -> &Arc<dyn LoadBalancer> {
        &self.balancer
    }

    pub fn throttle(&self) -> &Arc<SlidingWindow> {
        &self.throttle
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            strategy = self.balancer.name(),
            "HTTP server starting"
        );

        if let Some(interval) = self.balancer.sweep_interval() {
            spawn_sweeper(self.balancer.clone(), interval, shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Periodically drop expired strategy state until shutdown.
fn spawn_sweeper(
    balancer: Arc<dyn LoadBalancer>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = balancer.sweep();
                    tracing::debug!(strategy = balancer.name(), removed, "Swept expired sessions");
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}
