// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Server implementation module
//!
//! This module provides the main server struct for the classification service,
//! including wiring of the classifier and feedback store, router configuration,
//! and coordinated graceful shutdown using `CancellationToken`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{Router, extract::DefaultBodyLimit, http::HeaderName};
use feedback_store::{FeedbackSink, InMemoryFeedbackStore, JsonLinesFeedbackStore};
use hyper::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, info_span, warn};
use waste_classifier::{OpenAiVisionClient, ResultNormalizer, WasteClassifier};

use crate::{
    config::{FeedbackBackend, ServerConfig},
    error::{ServerError, ServerResult},
    extractors::MAX_JSON_PAYLOAD_SIZE,
    middleware::RateLimiter,
    routes::create_routes,
    state::{ServerState, ServiceClassifier},
};

// Server constants
const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
const DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS: u64 = 5;

/// Configuration for server shutdown behavior
#[derive(Debug, Clone)]
pub struct ShutdownConfig {
    /// Maximum time to wait for in-flight requests after shutdown is requested
    pub graceful_timeout: Duration,
    /// Maximum time to wait for the server task once the graceful period is over
    pub force_timeout: Duration,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            graceful_timeout: Duration::from_secs(DEFAULT_GRACEFUL_SHUTDOWN_TIMEOUT_SECONDS),
            force_timeout: Duration::from_secs(DEFAULT_FORCE_SHUTDOWN_TIMEOUT_SECONDS),
        }
    }
}

/// Main server struct
#[derive(Debug)]
pub struct Server {
    /// Server configuration
    config: ServerConfig,
    /// Application router
    router: Router,
    /// Server state
    state: ServerState,
    /// Cancellation token for coordinated shutdown
    cancellation_token: CancellationToken,
    /// Configuration for coordinated shutdown
    graceful_shutdown_config: ShutdownConfig,
}

impl Server {
    /// Create new server instance
    ///
    /// Builds the OpenAI backend, the normalizer and the feedback store from
    /// the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the classifier configuration is invalid.
    pub fn new(config: ServerConfig, shutdown_config: ShutdownConfig) -> ServerResult<Self> {
        let classifier = Self::create_classifier_from_config(&config)?;
        let feedback = Self::create_feedback_sink_from_config(&config);
        Self::with_dependencies(config, shutdown_config, classifier, feedback)
    }

    /// Create the classifier from server configuration
    fn create_classifier_from_config(config: &ServerConfig) -> ServerResult<ServiceClassifier> {
        let backend = OpenAiVisionClient::new(&config.classifier.openai_config()).map_err(|e| {
            ServerError::Config {
                message: format!("invalid classifier configuration: {e}"),
            }
        })?;
        let normalizer = ResultNormalizer::new(config.classifier.normalization_policy()?);

        Ok(WasteClassifier::new(backend, normalizer))
    }

    /// Create the feedback store from server configuration
    fn create_feedback_sink_from_config(config: &ServerConfig) -> Arc<FeedbackSink> {
        let sink = match config.feedback.backend {
            FeedbackBackend::Jsonl => {
                info!(path = %config.feedback.path.display(), "using JSON Lines feedback store");
                FeedbackSink::from(JsonLinesFeedbackStore::new(config.feedback.path.clone()))
            }
            FeedbackBackend::Memory => {
                warn!("using in-memory feedback store, feedback is lost on restart");
                FeedbackSink::from(InMemoryFeedbackStore::new())
            }
        };
        Arc::new(sink)
    }

    /// Create server with injected classifier and feedback store
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the configuration is invalid.
    pub fn with_dependencies(
        config: ServerConfig,
        graceful_shutdown_config: ShutdownConfig,
        classifier: ServiceClassifier,
        feedback: Arc<FeedbackSink>,
    ) -> ServerResult<Self> {
        config.validate().map_err(|e| ServerError::Config {
            message: e.to_string(),
        })?;

        let cancellation_token = CancellationToken::new();
        let state = ServerState::new(
            config.clone(),
            classifier,
            feedback,
            cancellation_token.child_token(),
        );
        let router = Self::create_router(state.clone());

        Ok(Self {
            config,
            router,
            state,
            cancellation_token,
            graceful_shutdown_config,
        })
    }

    /// Create application router with middleware
    fn create_router(state: ServerState) -> Router {
        let timeout_duration = state.config().timeout_seconds.value();

        let rate_limiter = RateLimiter::new(state.config().rate_limiting.clone());

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    if let Some(request_id) = req.headers().get(REQUEST_ID_HEADER) {
                        info_span!("http_request", ?request_id, method = %req.method(), uri = %req.uri())
                    } else {
                        error!("failed to extract id from request");
                        info_span!("http_request", request_id = "unknown", method = %req.method(), uri = %req.uri())
                    }
                }),
            )
            .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
            .layer(CorsLayer::permissive())
            .layer(TimeoutLayer::new(timeout_duration))
            .layer(DefaultBodyLimit::max(MAX_JSON_PAYLOAD_SIZE));

        create_routes(rate_limiter)
            .layer(middleware)
            .with_state(state)
    }

    async fn bind(&self) -> ServerResult<(TcpListener, SocketAddr)> {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                address: addr,
                source,
            })?;

        let actual_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Startup { source })?;

        Ok((listener, actual_addr))
    }

    /// Run the server with coordinated graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address,
    /// or `ServerError::Startup` if the server fails to start.
    pub async fn run(self) -> ServerResult<()> {
        let (listener, actual_addr) = self.bind().await?;

        info!(
            address = %actual_addr,
            environment = %self.config.environment,
            backend = self.state.classifier().backend_name(),
            rate_limiting = self.config.rate_limiting.enabled,
            "classification server starting",
        );

        let cancellation_token = self.cancellation_token.clone();
        let shutdown_token = cancellation_token.clone();
        tokio::spawn(async move {
            info!("spawning the graceful shutdown task");
            Self::shutdown_signal_handler(shutdown_token).await;
        });

        let drain_limit = self.graceful_shutdown_config.graceful_timeout
            + self.graceful_shutdown_config.force_timeout;
        let router = self.router;

        let serve_token = cancellation_token.clone();
        let mut server_task = tokio::spawn(async move {
            axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move {
                serve_token.cancelled().await;
                info!("no longer accepting connections");
            })
            .await
        });

        let server_result = tokio::select! {
            result = &mut server_task => result,
            () = async {
                cancellation_token.cancelled().await;
                tokio::time::sleep(drain_limit).await;
            } => {
                warn!(
                    timeout_secs = drain_limit.as_secs(),
                    "in-flight requests did not finish in time, aborting"
                );
                server_task.abort();
                return Ok(());
            }
        };

        match server_result {
            Ok(Ok(())) => {
                info!("classification server shut down gracefully");
                Ok(())
            }
            Ok(Err(e)) => {
                error!(error = ?e, "Server error during shutdown");
                Err(ServerError::Shutdown { source: e })
            }
            Err(e) => {
                error!(error = ?e, "Server task failed");
                Err(ServerError::Shutdown {
                    source: std::io::Error::other(e),
                })
            }
        }
    }

    /// Handle shutdown signals and trigger coordinated cancellation
    ///
    /// This function listens for SIGINT (Ctrl+C) and SIGTERM signals,
    /// and cancels the provided cancellation token when received.
    async fn shutdown_signal_handler(cancellation_token: CancellationToken) {
        let signal_received = async {
            #[cfg(unix)]
            #[allow(clippy::expect_used)]
            {
                use tokio::signal::unix::{SignalKind, signal};

                let mut sigterm =
                    signal(SignalKind::terminate()).expect("Failed to register SIGTERM handler");
                let mut sigint =
                    signal(SignalKind::interrupt()).expect("Failed to register SIGINT handler");

                tokio::select! {
                    _ = sigterm.recv() => {
                        warn!("Received SIGTERM signal, initiating coordinated shutdown");
                        "SIGTERM"
                    },
                    _ = sigint.recv() => {
                        warn!("Received SIGINT signal, initiating coordinated shutdown");
                        "SIGINT"
                    },
                }
            }

            #[cfg(not(unix))]
            #[allow(clippy::expect_used)]
            {
                tokio::signal::ctrl_c()
                    .await
                    .expect("Failed to install CTRL+C signal handler");
                warn!("Received CTRL+C signal, initiating coordinated shutdown");
                "CTRL+C"
            }
        };

        tokio::select! {
            signal_name = signal_received => {
                warn!("Shutdown signal {} received, cancelling all operations...", signal_name);
                cancellation_token.cancel();
            },
            () = cancellation_token.cancelled() => {
                warn!("Cancellation token already cancelled, shutdown signal handler exiting");
            }
        }
    }

    /// Returns a clone of the cancellation token for coordinated shutdown
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Initiates graceful shutdown by cancelling the server's cancellation token
    pub fn shutdown(&self) {
        info!("programmatic shutdown requested");
        self.cancellation_token.cancel();
    }

    /// Run server for testing, returns the bound address
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Bind` if unable to bind to the configured address.
    pub async fn run_for_testing(self) -> ServerResult<(SocketAddr, CancellationToken)> {
        let (listener, actual_addr) = self.bind().await?;

        let token = self.cancellation_token.child_token();
        let task = token.child_token();
        let router = self.router;
        tokio::spawn(async move {
            let _ = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(async move { task.cancelled().await })
            .await;
        });

        Ok((actual_addr, token))
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get shutdown configuration
    pub fn shutdown_config(&self) -> &ShutdownConfig {
        &self.graceful_shutdown_config
    }

    /// Get server state for testing
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}
