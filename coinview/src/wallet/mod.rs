mod bdk;
mod database;
mod settings;

pub use bdk::BdkWallet;
pub use database::WalletDatabase;
pub use settings::{JsonSettingsStore, MemorySettingsStore, SettingsStore};
