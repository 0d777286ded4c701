//! Headless front-end: polls the node and wallet and reports changes.

use std::collections::BTreeSet;
use std::fs;
use std::sync::Arc;

use bdk_wallet::rusqlite;
use bdk_wallet::PersistedWallet;
use bitcoin::{BlockHash, Txid};
use coinlink::{NodeInterface, SharedWallet, WalletInterface};
use tokio::time::{interval, MissedTickBehavior};

use crate::config::Config;
use crate::error::FrontendError;
use crate::model::{
    show_transaction, CallbackHandler, ClientModel, ClientNotification, NotificationDispatcher,
    OptionsModel, TransactionTableModel, MODEL_UPDATE_DELAY,
};
use crate::rpc::{RpcClient, RpcNode};
use crate::wallet::{BdkWallet, JsonSettingsStore, WalletDatabase};

pub type LoadedWallet = BdkWallet<PersistedWallet<rusqlite::Connection>>;

/// Models driven by the poll loop
pub struct Frontend<W> {
    pub client: ClientModel,
    pub options: OptionsModel,
    pub wallet: Option<SharedWallet<W>>,
    pub transactions: TransactionTableModel,
    known_transactions: BTreeSet<(Txid, Option<BlockHash>)>,
    known_height: Option<u32>,
}

impl<W: WalletInterface> Frontend<W> {
    pub fn new(client: ClientModel, options: OptionsModel, wallet: Option<SharedWallet<W>>) -> Self {
        Self {
            client,
            options,
            wallet,
            transactions: TransactionTableModel::new(),
            known_transactions: BTreeSet::new(),
            known_height: None,
        }
    }

    /// One poll: node status first, then the transaction list
    pub async fn tick(&mut self) -> Result<(), FrontendError> {
        self.client.update().await;

        let Some(wallet) = &self.wallet else {
            return Ok(());
        };
        let guard = wallet.read()?;
        let best_height = guard.best_height();

        // Generated coins become visible only as blocks arrive, without new transactions
        let transactions = guard.transactions();
        let hidden = transactions
            .iter()
            .any(|wtx| !show_transaction(&*guard, wtx));
        let height_changed = self.known_height != Some(best_height);
        let snapshot: BTreeSet<_> = transactions
            .iter()
            .map(|wtx| (wtx.txid(), wtx.block_hash))
            .collect();

        if snapshot != self.known_transactions || (hidden && height_changed) {
            self.transactions.refresh(&*guard);
            self.known_transactions = snapshot;
            log::info!(
                "Wallet has {} transactions in {} rows",
                transactions.len(),
                self.transactions.len()
            );
        } else {
            let updated = self.transactions.update_status(&*guard, best_height);
            if updated > 0 {
                log::debug!("Recomputed status of {} rows", updated);
            }
        }
        self.known_height = Some(best_height);
        Ok(())
    }
}

fn log_notification(notification: &ClientNotification) {
    match notification {
        ClientNotification::NumConnectionsChanged(count) => {
            log::info!("{} active connection(s) to the network", count)
        }
        ClientNotification::NumBlocksChanged(height) => log::info!("Best height is now {}", height),
        ClientNotification::DisplayUnitChanged(unit) => {
            log::info!("Amounts now shown in {}", unit.name())
        }
        ClientNotification::OptionChanged(id) => log::debug!("Option {:?} changed", id),
    }
}

fn load_wallet(config: &Config) -> Option<SharedWallet<LoadedWallet>> {
    let db = WalletDatabase::new(config.wallet_path());
    if !db.exists() {
        log::warn!("No wallet at {}, showing node status only", db.path().display());
        return None;
    }

    match db.load_wallet(config.network) {
        Ok(persisted) => {
            log::info!("Loaded wallet from {}", db.path().display());
            Some(SharedWallet::new(BdkWallet::new(persisted)))
        }
        Err(e) => {
            log::error!("Failed to load wallet: {}", e);
            None
        }
    }
}

fn write_pid_file(config: &Config) -> Result<(), FrontendError> {
    if let Some(pid_file) = &config.pid_file {
        let path = config.data_dir.join(pid_file);
        fs::write(&path, format!("{}\n", std::process::id()))?;
        log::debug!("Wrote pid file {}", path.display());
    }
    Ok(())
}

/// Run the front-end until Ctrl+C
pub async fn run(config: Config) -> Result<(), FrontendError> {
    for url in &config.urls {
        log::info!("Received payment request {}", url);
    }

    fs::create_dir_all(&config.data_dir)?;
    write_pid_file(&config)?;

    if config.generate {
        log::warn!("Coin generation is handled by the node; ignoring -gen");
    }
    if config.wallet.rescan {
        log::warn!("Rescanning is handled by the wallet engine; ignoring -rescan");
    }
    log::debug!(
        "Network settings: listen={} addnode={:?} connect={:?} lang={:?} min={}",
        config.listen,
        config.add_nodes,
        config.connect_nodes,
        config.lang,
        config.start_minimized
    );
    log::debug!(
        "Ignored node options: rpcallowip={:?} rpcsslcertificatechainfile={} rpcsslprivatekeyfile={} keypool={:?}",
        config.rpc.allow_ips,
        config.rpc.cert_chain.display(),
        config.rpc.private_key.display(),
        config.wallet.keypool_size
    );

    let notifications = NotificationDispatcher::new();
    let store = JsonSettingsStore::open(&config.settings_path())?;
    let options = OptionsModel::new(Box::new(store), notifications.clone());

    notifications.register_handler(Arc::new(CallbackHandler::new(log_notification)))?;
    log::info!("Amounts shown in {}", options.display_unit().name());

    let node: Arc<dyn NodeInterface> = Arc::new(RpcNode::new(RpcClient::new(&config.rpc)?, config.network));
    let mut client = ClientModel::new(node, notifications);
    log::info!(
        "Following {} node at {} ({})",
        config.network,
        config.rpc.url(),
        client.format_full_version()
    );
    match client.num_blocks_at_startup().await {
        Ok(height) => log::info!("Node is at height {}", height),
        Err(e) => log::warn!("Node not reachable yet: {}", e),
    }

    let mut frontend = Frontend::new(client, options, load_wallet(&config));
    let mut ticker = interval(MODEL_UPDATE_DELAY);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    log::info!("Front-end is running. Press Ctrl+C to exit");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = frontend.tick().await {
                    log::error!("Poll failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down front-end");
                break;
            }
        }
    }

    if let Some(pid_file) = &config.pid_file {
        let _ = fs::remove_file(config.data_dir.join(pid_file));
    }
    Ok(())
}
