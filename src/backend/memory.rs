//! In-memory backend
//!
//! Default backend for single-process deployments and tests. It can be marked
//! unavailable to simulate a node outage.

use crate::backend::CacheBackend;
use crate::common::{Error, OpContext, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

pub struct MemoryBackend {
    name: String,
    map: RwLock<HashMap<String, String>>,
    available: AtomicBool,
}

impl MemoryBackend {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            map: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// While unavailable every call fails with `CacheUnavailable`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.map.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::CacheUnavailable(self.name.clone()))
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, _ctx: &OpContext, key: &str) -> Result<String> {
        self.ensure_available()?;
        let map = self.map.read().unwrap_or_else(PoisonError::into_inner);
        match map.get(key) {
            Some(value) => {
                tracing::trace!(node = %self.name, key, "cache hit");
                Ok(value.clone())
            }
            None => {
                tracing::trace!(node = %self.name, key, "cache miss");
                Err(Error::KeyNotFound(key.to_string()))
            }
        }
    }

    async fn set(&self, _ctx: &OpContext, key: &str, value: &str) -> Result<()> {
        self.ensure_available()?;
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, _ctx: &OpContext, key: &str) -> Result<()> {
        self.ensure_available()?;
        self.map
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }

    async fn health_check(&self, _ctx: &OpContext) -> Result<()> {
        self.ensure_available()
    }
}
