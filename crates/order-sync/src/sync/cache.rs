//! # Local Cache
//!
//! Device-local copy of the cart, the restaurant catalog and the last-known order
//! collection.
//!
//! Values are stored wholesale under three keys, `cart`, `restaurants` and `orders`, as JSON. There are no
//! partial-record updates: every save rewrites the whole value. A missing key reads as an
//! empty collection.
//!
//! Two backends: [`MemoryBackend`] for tests and ephemeral sessions, [`FileBackend`] which
//! keeps one `<key>.json` file per key in a directory so the cache survives restarts.

use crate::model::{CartLine, Order, Restaurant};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

pub const CART_KEY: &str = "cart";
pub const ORDERS_KEY: &str = "orders";
pub const RESTAURANTS_KEY: &str = "restaurants";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cache entry '{key}' is not valid JSON: {source}")]
    Serde {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw string storage. Implementations must make `write` replace the whole value.
pub trait CacheBackend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn write(&self, key: &str, value: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<String, String>>,
}

impl CacheBackend for MemoryBackend {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// Uses `dir` as the cache directory, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| CacheError::Io {
            key: dir.display().to_string(),
            source,
        })?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl CacheBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(CacheError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), CacheError> {
        // Write then rename so a crash never leaves a half-written value behind
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        let io = |source| CacheError::Io {
            key: key.to_string(),
            source,
        };
        std::fs::write(&tmp, value).map_err(io)?;
        std::fs::rename(&tmp, self.path(key)).map_err(io)
    }
}

/// Typed view over a [`CacheBackend`].
pub struct LocalCache {
    backend: Box<dyn CacheBackend>,
}

impl LocalCache {
    pub fn new(backend: impl CacheBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    pub fn load_cart(&self) -> Result<Vec<CartLine>, CacheError> {
        self.load(CART_KEY)
    }

    pub fn save_cart(&self, lines: &[CartLine]) -> Result<(), CacheError> {
        self.save(CART_KEY, lines)
    }

    pub fn load_orders(&self) -> Result<Vec<Order>, CacheError> {
        self.load(ORDERS_KEY)
    }

    pub fn save_orders(&self, orders: &[Order]) -> Result<(), CacheError> {
        self.save(ORDERS_KEY, orders)
    }

    pub fn load_restaurants(&self) -> Result<Vec<Restaurant>, CacheError> {
        self.load(RESTAURANTS_KEY)
    }

    pub fn save_restaurants(&self, restaurants: &[Restaurant]) -> Result<(), CacheError> {
        self.save(RESTAURANTS_KEY, restaurants)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, CacheError> {
        let Some(raw) = self.backend.read(key)? else {
            return Ok(Vec::new());
        };
        serde_json::from_str(&raw).map_err(|source| CacheError::Serde {
            key: key.to_string(),
            source,
        })
    }

    fn save<T: Serialize>(&self, key: &str, values: &[T]) -> Result<(), CacheError> {
        let raw = serde_json::to_string(values).map_err(|source| CacheError::Serde {
            key: key.to_string(),
            source,
        })?;
        self.backend.write(key, &raw)?;
        debug!(key, entries = values.len(), "Cache saved");
        Ok(())
    }
}
