//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;

use product_catalog::catalog::StoreError;
use product_catalog::{CatalogConfig, HttpServer, InMemoryStore, Product, ProductId, ProductStore};

/// In-memory store whose lookups can be switched to fail with a transient
/// error, counting how often the server reaches it.
#[derive(Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    down: AtomicBool,
    lookups: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every `find_by_id` fail until switched back.
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ProductStore for FlakyStore {
    fn save(&self, product: Product) -> Result<Product, StoreError> {
        self.inner.save(product)
    }

    fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("connection refused".into()));
        }
        self.inner.find_by_id(id)
    }

    fn exists_by_id(&self, id: ProductId) -> Result<bool, StoreError> {
        self.inner.exists_by_id(id)
    }

    fn find_all(&self) -> Result<Vec<Product>, StoreError> {
        self.inner.find_all()
    }

    fn delete_by_id(&self, id: ProductId) -> Result<(), StoreError> {
        self.inner.delete_by_id(id)
    }
}

/// Defaults tuned so tests run fast: no retry delay worth waiting for.
pub fn test_config() -> CatalogConfig {
    let mut config = CatalogConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config
}

/// A running server plus the means to stop it.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: product_catalog::Shutdown,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the catalog on an ephemeral port.
pub async fn spawn_server(config: CatalogConfig, store: Arc<dyn ProductStore>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = product_catalog::Shutdown::new();
    let server = HttpServer::new(config, store);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestServer { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

pub fn notebook_json(tariff_code: &str) -> serde_json::Value {
    serde_json::json!({
        "name": "Notebook Dell",
        "tariff_code": tariff_code,
        "tariff_description": "Notebook with Intel Core i7",
        "price": 22.95,
        "quantity": 10
    })
}
