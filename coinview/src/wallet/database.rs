use bdk_wallet::rusqlite;
use bdk_wallet::{PersistedWallet, Wallet};
use bitcoin::Network;
use std::path::{Path, PathBuf};

use crate::error::FrontendError;

/// SQLite file holding a BDK wallet written by the engine
pub struct WalletDatabase {
    /// Path to the SQLite database file
    db_path: PathBuf,
}

impl WalletDatabase {
    pub fn new(db_path: PathBuf) -> Self {
        Self { db_path }
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn exists(&self) -> bool {
        self.db_path.exists()
    }

    pub fn open_connection(&self) -> Result<rusqlite::Connection, FrontendError> {
        rusqlite::Connection::open(&self.db_path)
            .map_err(|e| FrontendError::DatabaseError(format!("Failed to open database: {}", e)))
    }

    /// Load the stored wallet; descriptors come from the database itself
    pub fn load_wallet(
        &self,
        network: Network,
    ) -> Result<PersistedWallet<rusqlite::Connection>, FrontendError> {
        if !self.exists() {
            return Err(FrontendError::DatabaseError(format!(
                "No wallet database at {}",
                self.db_path.display()
            )));
        }

        let mut conn = self.open_connection()?;
        let persisted = Wallet::load()
            .check_network(network)
            .load_wallet(&mut conn)
            .map_err(|e| FrontendError::DatabaseError(format!("Failed to load wallet: {}", e)))?;

        persisted.ok_or_else(|| {
            FrontendError::DatabaseError(format!(
                "No wallet found in database {}",
                self.db_path.display()
            ))
        })
    }
}
