//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, limits, timeout, metrics)
//! - Bind server to listener, plain or TLS
//! - Swap upstream settings when the config changes
//! - Drain connections on shutdown

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::aggregate::Aggregator;
use crate::config::GatewayConfig;
use crate::http::handlers::{health, passthrough, unified};
use crate::http::middleware::{cors_layer, track_metrics};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestIdExt};
use crate::upstream::{UpstreamClient, DEFAULT_TIMEOUT};

/// How long in-flight requests get to finish once shutdown starts (TLS listener).
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<ArcSwap<Aggregator>>,
}

impl AppState {
    pub fn new(aggregator: Aggregator) -> Self {
        Self {
            aggregator: Arc::new(ArcSwap::from_pointee(aggregator)),
        }
    }

    /// Snapshot for one request; a concurrent reload does not affect it.
    pub fn aggregator(&self) -> Arc<Aggregator> {
        self.aggregator.load_full()
    }

    pub fn replace(&self, aggregator: Aggregator) {
        self.aggregator.store(Arc::new(aggregator));
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
    client: UpstreamClient,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given (validated) configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, url::ParseError> {
        let client = UpstreamClient::pooled(DEFAULT_TIMEOUT);
        let aggregator = Aggregator::new(&client, &config.upstreams)?;
        let state = AppState::new(aggregator);
        let router = Self::build_router(&config, state.clone());

        Ok(Self {
            router,
            state,
            client,
            config,
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/auth/login", post(passthrough::login))
            .route("/auth/register", post(passthrough::register))
            .route("/users/{username}", delete(passthrough::delete_user))
            .route(
                "/users/{username}/profile",
                get(unified::get_unified_user)
                    .patch(unified::update_unified_user)
                    .put(unified::update_unified_user),
            )
            .route(
                "/profiles/me",
                get(passthrough::get_my_profile).put(passthrough::update_my_profile),
            )
            .route("/profiles/search", get(passthrough::search_profiles))
            .route("/profiles/stats/me", get(passthrough::get_profile_stats))
            .route("/profiles/{username}", get(passthrough::get_public_profile));

        let layers = ServiceBuilder::new()
            .layer(set_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request.headers().request_id(),
                )
            }))
            .layer(propagate_request_id_layer())
            .layer(cors_layer())
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        Router::new()
            .route("/health", get(health::health))
            .nest("/api/v1", api)
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            // Must sit inside CorsLayer, whose inner body has to be `Default`.
            .layer(RequestBodyLimitLayer::new(config.limits.max_body_bytes))
            .layer(layers)
    }

    /// Router with state applied, for driving the gateway without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server on a plain TCP listener until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_config_updates(config_updates, shutdown.resubscribe());

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until `shutdown` fires.
    pub async fn run_tls(
        self,
        listener: std::net::TcpListener,
        tls: RustlsConfig,
        config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_config_updates(config_updates, shutdown.resubscribe());

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!("Shutdown signal received, draining connections");
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        axum_server::from_tcp_rustls(listener, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    fn spawn_config_updates(
        &self,
        mut updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        let state = self.state.clone();
        let client = self.client.clone();
        let current = self.config.clone();

        tokio::spawn(async move {
            loop {
                let config = tokio::select! {
                    update = updates.recv() => match update {
                        Some(config) => config,
                        None => break,
                    },
                    _ = shutdown.recv() => break,
                };

                if config.listener != current.listener
                    || config.timeouts != current.timeouts
                    || config.limits != current.limits
                {
                    tracing::warn!("Listener, timeout and limit changes take effect after restart");
                }

                match Aggregator::new(&client, &config.upstreams) {
                    Ok(aggregator) => {
                        state.replace(aggregator);
                        tracing::info!(
                            auth = %config.upstreams.auth_url,
                            profile = %config.upstreams.profile_url,
                            orchestrator = %config.upstreams.orchestrator_url,
                            timeout_secs = config.upstreams.timeout_secs,
                            "Upstream configuration reloaded"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Rejected upstream configuration, keeping current");
                    }
                }
            }
        });
    }
}
