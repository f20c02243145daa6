//! HTTP boundary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, decode + validate payload)
//!     → products.rs (call the service)
//!     → Product JSON, or ErrorResponse from the classifier
//! ```

pub mod products;
pub mod request;
pub mod server;

pub use request::{ProductRequest, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
