//! Product persistence.
//!
//! # Responsibilities
//! - Define the storage contract the service layer depends on
//! - Provide an in-memory implementation with the catalog's unique
//!   tariff-code constraint
//!
//! # Design Decisions
//! - The contract is synchronous; callers treat it as a blocking dependency
//! - Constraint violations are permanent, `Unavailable` is transient

use std::sync::atomic::{AtomicI64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::catalog::product::{Product, ProductId};

/// Name of the unique constraint on `Product::tariff_code`.
pub const TARIFF_CODE_CONSTRAINT: &str = "UK_PRODUCTS_TARIFF_CODE";

/// Root cause of a rejected write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unique index or primary key violation: \"{constraint}\" {detail}")]
pub struct ConstraintViolation {
    pub constraint: String,
    pub detail: String,
}

/// Errors raised by a [`ProductStore`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A write broke an integrity rule. Retrying will not help.
    #[error("{message}")]
    Constraint {
        message: String,
        #[source]
        cause: Option<ConstraintViolation>,
    },

    /// The store could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether the same call may succeed if attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }

    fn duplicate_tariff_code(code: &str) -> Self {
        StoreError::Constraint {
            message: format!("could not execute statement; constraint [{TARIFF_CODE_CONSTRAINT}]"),
            cause: Some(ConstraintViolation {
                constraint: TARIFF_CODE_CONSTRAINT.to_string(),
                detail: format!("on PRODUCTS(TARIFF_CODE) values ('{code}')"),
            }),
        }
    }
}

/// Storage contract for products.
pub trait ProductStore: Send + Sync {
    /// Insert a product without an id, or replace the product with the given id.
    fn save(&self, product: Product) -> Result<Product, StoreError>;

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    fn exists_by_id(&self, id: ProductId) -> Result<bool, StoreError>;

    fn find_all(&self) -> Result<Vec<Product>, StoreError>;

    fn delete_by_id(&self, id: ProductId) -> Result<(), StoreError>;
}

/// Concurrent in-memory product store.
#[derive(Debug)]
pub struct InMemoryStore {
    products: DashMap<ProductId, Product>,
    /// tariff code -> owning product
    tariff_codes: DashMap<String, ProductId>,
    next_id: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
            tariff_codes: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    fn reserve_tariff_code(&self, code: &str, id: ProductId) -> Result<(), StoreError> {
        match self.tariff_codes.entry(code.to_string()) {
            Entry::Occupied(owner) if *owner.get() != id => {
                Err(StoreError::duplicate_tariff_code(code))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(id);
                Ok(())
            }
        }
    }

    fn release_tariff_code(&self, code: &str, id: ProductId) {
        self.tariff_codes.remove_if(code, |_, owner| *owner == id);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductStore for InMemoryStore {
    fn save(&self, mut product: Product) -> Result<Product, StoreError> {
        let id = match product.id {
            Some(id) => id,
            None => ProductId(self.next_id.fetch_add(1, Ordering::Relaxed)),
        };

        self.reserve_tariff_code(&product.tariff_code, id)?;

        product.id = Some(id);
        let previous = self.products.insert(id, product.clone());

        if let Some(previous) = previous {
            if previous.tariff_code != product.tariff_code {
                self.release_tariff_code(&previous.tariff_code, id);
            }
        }

        tracing::trace!(id = %id, "Product saved");
        Ok(product)
    }

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(&id).map(|r| r.value().clone()))
    }

    fn exists_by_id(&self, id: ProductId) -> Result<bool, StoreError> {
        Ok(self.products.contains_key(&id))
    }

    fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        let mut all: Vec<Product> = self.products.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }

    fn delete_by_id(&self, id: ProductId) -> Result<(), StoreError> {
        if let Some((_, removed)) = self.products.remove(&id) {
            self.release_tariff_code(&removed.tariff_code, id);
            tracing::trace!(id = %id, "Product deleted");
        }
        Ok(())
    }
}
