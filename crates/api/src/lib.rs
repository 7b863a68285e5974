// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Waste Classification API Server
//!
//! This crate provides the HTTP server for the waste classification service, built
//! with Axum. It accepts photos of waste items, classifies them through a vision
//! model backend, and records user feedback on the results.
//!
//! # Module Structure
//!
//! - [`config`]: Server configuration and environment management with hierarchical loading
//! - [`error`]: Error types and their translation to HTTP responses
//! - [`state`]: Shared application state with cancellation token support
//! - [`server`]: Server lifecycle, dependency wiring and coordinated shutdown
//! - [`routes`]: Route configuration and HTTP request handlers
//! - [`middleware`]: Per-client rate limiting of the classification endpoint
//! - [`extractors`]: JSON body extraction with descriptive errors
//! - [`metrics`]: Prometheus counters and histograms
//! - [`openapi`] and [`docs`]: `OpenAPI` specification and Swagger UI
//!
//! # Key Features
//!
//! - **Safe Results**: Backend answers are normalized and low-confidence answers become `Special`
//! - **No Leaked Errors**: Backend failures reach callers only as a generic message
//! - **Rate Limiting**: Fixed-window limit per client with a bounded client table
//! - **Feedback Log**: Append-only JSON Lines file or in-memory store
//! - **Graceful Shutdown**: Coordinated termination using `CancellationToken`

pub mod config;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod metrics;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;

pub use config::{Environment, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use middleware::{Admission, ClientKey, RateLimiter};
pub use server::{Server, ShutdownConfig};
pub use state::{HealthCheck, ServerState};
