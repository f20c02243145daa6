//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Render routing and timeout failures through the classifier
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{DefaultBodyLimit, Request, State};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::catalog::ProductStore;
use crate::config::CatalogConfig;
use crate::failure::{Classifier, ErrorResponse, Failure};
use crate::http::products;
use crate::http::request::{propagate_request_id_layer, request_span, set_request_id_layer};
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::service::ProductService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ProductService>,
    pub classifier: Arc<Classifier>,
    pub request_timeout: Duration,
}

impl AppState {
    /// Classify a failure for the response body.
    pub fn reject(&self, failure: &Failure) -> ErrorResponse {
        self.classifier.classify(failure)
    }
}

/// HTTP server for the product catalog.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a server whose service runs against `store`.
    pub fn new(config: CatalogConfig, store: Arc<dyn ProductStore>) -> Self {
        let state = AppState {
            service: Arc::new(ProductService::new(store, &config)),
            classifier: Arc::new(Classifier::standard()),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };

        Self {
            router: Self::build_router(&config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &CatalogConfig, state: AppState) -> Router {
        let request_timeout = state.request_timeout;

        Router::new()
            .route(
                "/products",
                get(products::list_products).post(products::create_product),
            )
            .route(
                "/products/{id}",
                get(products::get_product)
                    .put(products::update_product)
                    .delete(products::delete_product),
            )
            .route("/health", get(|| async { "ok" }))
            .fallback(unknown_route)
            .method_not_allowed_fallback(unsupported_method)
            .with_state(state.clone())
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(propagate_request_id_layer())
                    .layer(middleware::from_fn_with_state(state, render_timeout))
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// Run the server, accepting connections on the given listener until a
    /// shutdown signal arrives.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = wait_for_shutdown_signal() => {}
                    _ = shutdown.recv() => {
                        tracing::info!("Shutdown requested");
                    }
                }
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn unsupported_method(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
) -> ErrorResponse {
    state.reject(&Failure::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    })
}

/// The timeout layer answers a bare 408; give it the classified body.
async fn render_timeout(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::REQUEST_TIMEOUT {
        return response;
    }
    tracing::warn!(timeout = ?state.request_timeout, "Request timed out");
    state
        .reject(&Failure::TimedOut(state.request_timeout))
        .into_response()
}

async fn unknown_route(method: Method, uri: Uri) -> ErrorResponse {
    ErrorResponse::single(
        StatusCode::NOT_FOUND,
        format!("no route for {method} {}", uri.path()),
    )
}
