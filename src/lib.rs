//! Product catalog service library.
//!
//! A small catalog whose interesting parts are the failure classifier and
//! the resilience policies wrapped around the store.

// Domain
pub mod catalog;
pub mod failure;
pub mod service;

// Boundary
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use catalog::{InMemoryStore, Product, ProductId, ProductStore};
pub use config::CatalogConfig;
pub use failure::{Classifier, ErrorResponse, Failure};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use service::ProductService;
