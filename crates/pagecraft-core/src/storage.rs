//! Storage abstraction for page persistence.
//!
//! Real backends live outside the engine. [`MemoryStorage`] keeps pages in
//! process for tests and ephemeral sessions.

use crate::page::Page;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage error: {0}")]
    Other(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A page store.
pub trait Storage: Send + Sync {
    fn save(&self, id: &str, page: &Page) -> StorageResult<()>;

    fn load(&self, id: &str) -> StorageResult<Page>;

    fn delete(&self, id: &str) -> StorageResult<()>;

    fn list(&self) -> StorageResult<Vec<String>>;

    fn exists(&self, id: &str) -> StorageResult<bool>;
}

/// In-memory storage. Pages are kept as JSON so a load goes through the same
/// path as a real backend.
#[derive(Default)]
pub struct MemoryStorage {
    pages: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(err: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", err))
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, page: &Page) -> StorageResult<()> {
        let json = page.to_json()?;
        let mut pages = self.pages.write().map_err(lock_error)?;
        pages.insert(id.to_string(), json);
        log::debug!("Saved page {}", id);
        Ok(())
    }

    fn load(&self, id: &str) -> StorageResult<Page> {
        let pages = self.pages.read().map_err(lock_error)?;
        let json = pages.get(id).ok_or_else(|| StorageError::NotFound(id.to_string()))?;
        Ok(Page::from_json(json)?)
    }

    fn delete(&self, id: &str) -> StorageResult<()> {
        let mut pages = self.pages.write().map_err(lock_error)?;
        pages.remove(id);
        Ok(())
    }

    fn list(&self) -> StorageResult<Vec<String>> {
        let pages = self.pages.read().map_err(lock_error)?;
        Ok(pages.keys().cloned().collect())
    }

    fn exists(&self, id: &str) -> StorageResult<bool> {
        let pages = self.pages.read().map_err(lock_error)?;
        Ok(pages.contains_key(id))
    }
}
