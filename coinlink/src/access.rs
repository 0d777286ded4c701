use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::LinkError;

/// Wallet engine behind the engine's coarse lock.
///
/// Readers take one guard per batch of queries. Values read under different
/// guards may come from different engine states.
pub struct SharedWallet<W> {
    inner: Arc<RwLock<W>>,
}

impl<W> SharedWallet<W> {
    pub fn new(wallet: W) -> Self {
        Self {
            inner: Arc::new(RwLock::new(wallet)),
        }
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, W>, LinkError> {
        self.inner.read().map_err(|e| {
            log::error!("Failed to acquire wallet read lock: {}", e);
            LinkError::LockPoisoned(e.to_string())
        })
    }

    /// Engine-side access, for whoever feeds the wallet new state
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, W>, LinkError> {
        self.inner.write().map_err(|e| {
            log::error!("Failed to acquire wallet write lock: {}", e);
            LinkError::LockPoisoned(e.to_string())
        })
    }
}

impl<W> Clone for SharedWallet<W> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}
