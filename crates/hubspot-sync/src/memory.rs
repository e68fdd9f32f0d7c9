//! Key-value memory store used to persist contacts and ticket references.
//!
//! The store only knows about JSON values under string keys. The typed
//! helpers [`load_map`] and [`save_map`] read and write the flat
//! `name -> record` mappings the ticket manager and contact resolver keep.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::error::{Error, Result};

/// Memory key holding the username -> contact mapping.
pub const CONTACTS_KEY: &str = "contacts";

/// Memory key holding the issue title -> ticket reference mapping.
pub const TICKETS_KEY: &str = "tickets";

/// Persistence contract: get a value by key, put a value under a key.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: Value) -> Result<()>;
}

/// Load a flat mapping stored under `key`. Missing or `null` reads as empty.
pub async fn load_map<T: DeserializeOwned>(
    store: &dyn MemoryStore,
    key: &str,
) -> Result<BTreeMap<String, T>> {
    match store.get(key).await? {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(value @ Value::Object(_)) => Ok(serde_json::from_value(value)?),
        Some(other) => Err(Error::Memory(format!(
            "expected a mapping under '{key}', found {other}"
        ))),
    }
}

/// Persist a flat mapping under `key`.
pub async fn save_map<T: Serialize>(
    store: &dyn MemoryStore,
    key: &str,
    map: &BTreeMap<String, T>,
) -> Result<()> {
    store.put(key, serde_json::to_value(map)?).await
}

/// Process-local store. Contents are lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// Store backed by a single JSON object file.
///
/// Every `put` rewrites the whole file through a sibling temp file that is
/// renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<serde_json::Map<String, Value>> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(serde_json::Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::Map::new());
        }

        match serde_json::from_slice(&raw)? {
            Value::Object(map) => Ok(map),
            other => Err(Error::Memory(format!(
                "{} does not hold a JSON object (found {other})",
                self.path.display()
            ))),
        }
    }
}

#[async_trait]
impl MemoryStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.remove(key))
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut all = self.read_all().await?;
        all.insert(key.to_string(), value);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&Value::Object(all))?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        debug!(key = %key, path = %self.path.display(), "Persisted memory key");
        Ok(())
    }
}
