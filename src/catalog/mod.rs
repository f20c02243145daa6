//! Catalog domain.
//!
//! # Data Flow
//! ```text
//! service.rs
//!     → store.rs (ProductStore trait; InMemoryStore)
//!     → product.rs (Product values, owned by the store)
//! ```

pub mod product;
pub mod store;

pub use product::{Product, ProductId};
pub use store::{ConstraintViolation, InMemoryStore, ProductStore, StoreError, TARIFF_CODE_CONSTRAINT};
