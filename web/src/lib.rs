//! Axum integration for railyard pipelines.
//!
//! HTTP is one transport for pipelines. This crate converts between the two
//! worlds and nothing more: stages never see Axum types, and Axum handlers
//! never see stages.
//!
//! # Request Flow
//!
//! 1. **HTTP Request** arrives at an Axum route
//! 2. **Extract** an [`Envelope`]: JSON body to `data`, headers/params/query to `metadata`
//! 3. **Run** the pipeline with the route's environment
//! 4. **Render** the outcome with [`HttpResponse`] (`Next` becomes 404)
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use railyard_web::{health_check, pipeline_route};
//!
//! let app = Router::new()
//!     .route("/health", axum::routing::get(health_check))
//!     .route("/accounts/:id", pipeline_route(accounts, Arc::clone(&env)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod route;

// Re-export key types for convenience
pub use error::AppError;
pub use extractors::{Envelope, CORRELATION_ID_HEADER};
pub use handlers::{health_check, metrics_route};
pub use response::HttpResponse;
pub use route::pipeline_route;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
