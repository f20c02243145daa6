//! Resilient product service.
//!
//! # Responsibilities
//! - Perform create/list/get/update/delete against a [`ProductStore`]
//! - Apply the per-operation resilience policy
//! - Turn store and policy outcomes into [`Failure`] values
//!
//! # Policies
//! ```text
//! create      → store (no policy)
//! list        → admission limiter "product-list" → store
//! get_by_id   → circuit breaker "product-service" → retry → store
//! update      → exists check → store
//! delete      → exists check → store
//! ```
//!
//! # Design Decisions
//! - A missing product is an answer, not a fault: never retried and
//!   recorded as a success by the breaker
//! - update/delete check existence first so a write never creates a record
//! - The service holds no product cache; the store owns every product

use std::sync::Arc;

use crate::catalog::{Product, ProductId, ProductStore};
use crate::config::CatalogConfig;
use crate::failure::Failure;
use crate::observability::metrics;
use crate::resilience::{
    AdmissionLimiter, CallError, CircuitBreaker, GuardError, RetryExhausted, RetryPolicy,
};

/// Name of the admission limiter guarding `list`.
pub const LIST_LIMITER: &str = "product-list";

/// Name shared by the retry policy and circuit breaker guarding `get_by_id`.
pub const LOOKUP_GUARD: &str = "product-service";

/// Message carried by a rejected `list` call.
pub const LIST_RATE_LIMITED: &str = "request limit reached for product listing";

/// Product operations wrapped in resilience policies.
pub struct ProductService {
    store: Arc<dyn ProductStore>,
    list_limiter: AdmissionLimiter,
    lookup_retry: RetryPolicy,
    lookup_breaker: CircuitBreaker,
}

impl ProductService {
    /// Build the service with policies configured from `config`.
    pub fn new(store: Arc<dyn ProductStore>, config: &CatalogConfig) -> Self {
        Self {
            store,
            list_limiter: AdmissionLimiter::new(LIST_LIMITER, &config.rate_limit),
            lookup_retry: RetryPolicy::new(LOOKUP_GUARD, &config.retries),
            lookup_breaker: CircuitBreaker::new(LOOKUP_GUARD, config.circuit_breaker.clone()),
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.lookup_breaker
    }

    /// Store a new product. Any id carried by `product` is ignored.
    pub async fn create(&self, mut product: Product) -> Result<Product, Failure> {
        metrics::record_request("create");
        if let Some(ignored) = product.id.take() {
            tracing::debug!(id = %ignored, "Ignoring client supplied id on create");
        }

        let created = self.store.save(product)?;
        tracing::info!(id = ?created.id, tariff_code = %created.tariff_code, "Product created");
        Ok(created)
    }

    /// All products, in store order.
    pub async fn list(&self) -> Result<Vec<Product>, Failure> {
        metrics::record_request("list");
        if !self.list_limiter.try_acquire() {
            return Err(Failure::RateLimited(LIST_RATE_LIMITED.to_string()));
        }

        Ok(self.store.find_all()?)
    }

    /// Look up one product, retrying transient store faults behind the
    /// circuit breaker.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Product, Failure> {
        metrics::record_request("get_by_id");
        let store = &self.store;

        let outcome = self
            .lookup_breaker
            .call(|| self.lookup_retry.run(|| store.find_by_id(id)))
            .await;

        match outcome {
            Ok(Some(product)) => Ok(product),
            Ok(None) => Err(Failure::NotFound(id)),
            Err(CallError::Rejected) => Err(Failure::Unavailable {
                id,
                cause: GuardError::CircuitOpen(self.lookup_breaker.name().to_string()),
            }),
            Err(CallError::Failed(RetryExhausted { attempts, last })) => {
                tracing::warn!(id = %id, attempts, error = %last, "Product lookup gave up");
                Err(Failure::Unavailable {
                    id,
                    cause: GuardError::RetriesExhausted { attempts, last },
                })
            }
        }
    }

    /// Replace an existing product. Fails with `NotFound` rather than
    /// creating a record for an unknown id.
    pub async fn update(&self, product: Product) -> Result<Product, Failure> {
        metrics::record_request("update");
        let id = product
            .id
            .ok_or_else(|| Failure::BadRequest("product id is required for update".to_string()))?;

        self.ensure_exists(id)?;

        let updated = self.store.save(product)?;
        tracing::info!(id = %id, "Product updated");
        Ok(updated)
    }

    pub async fn delete(&self, id: ProductId) -> Result<(), Failure> {
        metrics::record_request("delete");
        self.ensure_exists(id)?;

        self.store.delete_by_id(id)?;
        tracing::info!(id = %id, "Product deleted");
        Ok(())
    }

    fn ensure_exists(&self, id: ProductId) -> Result<(), Failure> {
        if self.store.exists_by_id(id)? {
            Ok(())
        } else {
            Err(Failure::NotFound(id))
        }
    }
}
