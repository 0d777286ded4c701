use std::collections::HashMap;

use bitcoin::Txid;
use coinlink::{WalletInterface, WalletTx};

use super::transaction_desc::to_html;
use super::transaction_record::{decompose_transaction, TransactionRecord};

/// Every displayable row of the wallet, kept in sort-key order
#[derive(Debug, Default)]
pub struct TransactionTableModel {
    records: Vec<TransactionRecord>,
    debug: bool,
}

impl TransactionTableModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include raw transaction details in descriptions
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn get(&self, row: usize) -> Option<&TransactionRecord> {
        self.records.get(row)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rebuild every row from the wallet's current transactions
    pub fn refresh<W: WalletInterface + ?Sized>(&mut self, wallet: &W) {
        let best_height = wallet.best_height();
        self.records.clear();

        for wtx in wallet.transactions() {
            for mut record in decompose_transaction(wallet, &wtx) {
                record.update_status(wallet, &wtx, best_height);
                self.records.push(record);
            }
        }
        self.sort();
        log::debug!("Transaction table holds {} rows at height {}", self.records.len(), best_height);
    }

    /// Recompute stale rows only; returns how many were recomputed
    pub fn update_status<W: WalletInterface + ?Sized>(&mut self, wallet: &W, best_height: u32) -> usize {
        if !self.records.iter().any(|record| record.status_update_needed(best_height)) {
            return 0;
        }

        let current: HashMap<Txid, WalletTx> = wallet
            .transactions()
            .into_iter()
            .map(|wtx| (wtx.txid(), wtx))
            .collect();

        let mut updated = 0;
        for record in self.records.iter_mut() {
            if !record.status_update_needed(best_height) {
                continue;
            }
            match current.get(&record.hash) {
                Some(wtx) => {
                    record.update_status(wallet, wtx, best_height);
                    updated += 1;
                }
                None => log::warn!("Transaction {} is no longer in the wallet", record.hash),
            }
        }

        self.sort();
        updated
    }

    /// HTML description of the transaction behind `row`
    pub fn describe<W: WalletInterface + ?Sized>(&self, wallet: &W, row: usize) -> Option<String> {
        let record = self.records.get(row)?;
        let wtx = wallet
            .transactions()
            .into_iter()
            .find(|wtx| wtx.txid() == record.hash)?;
        Some(to_html(wallet, &wtx, self.debug))
    }

    fn sort(&mut self) {
        self.records
            .sort_by(|a, b| a.status.sort_key.cmp(&b.status.sort_key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::transaction_status::Status;
    use bitcoin::Network;
    use coinlink::memory::{fixtures, MemoryWallet};

    fn wallet_with_history() -> MemoryWallet {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let mine = fixtures::script(1);
        wallet.add_script(mine.clone());
        let old_block = fixtures::block_hash(1);
        let new_block = fixtures::block_hash(2);
        wallet.add_block(old_block, 10);
        wallet.add_block(new_block, 12);

        for (seed, block, time) in [(1, Some(old_block), 100), (2, Some(new_block), 300), (3, None, 400)] {
            let tx = fixtures::spend(&[fixtures::outpoint(seed, 0)], &[(mine.clone(), 1_000)]);
            let mut wtx = WalletTx::new(tx, time);
            wtx.block_hash = block;
            wallet.add_transaction(wtx);
        }
        wallet
    }

    #[test]
    fn refresh_orders_pending_then_newest() {
        let wallet = wallet_with_history();
        let mut table = TransactionTableModel::new();
        table.refresh(&wallet);

        let times: Vec<i64> = table.records().iter().map(|record| record.time).collect();
        assert_eq!(times, vec![400, 300, 100]);
        assert_eq!(table.get(0).unwrap().status.depth, 0);
        assert_eq!(table.get(2).unwrap().status.depth, 3);
    }

    #[test]
    fn only_stale_rows_are_recomputed() {
        let mut wallet = wallet_with_history();
        let mut table = TransactionTableModel::new();
        table.refresh(&wallet);

        assert_eq!(table.update_status(&wallet, 12), 0);

        wallet.set_best_height(17);
        assert_eq!(table.update_status(&wallet, 17), 3);
        assert_eq!(table.get(2).unwrap().status.status, Status::HaveConfirmations);
        assert_eq!(table.update_status(&wallet, 17), 0);
    }

    #[test]
    fn describe_renders_row_transaction() {
        let wallet = wallet_with_history();
        let mut table = TransactionTableModel::new();
        table.refresh(&wallet);

        let html = table.describe(&wallet, 0).unwrap();
        assert!(html.contains(&table.get(0).unwrap().hash.to_string()));
        assert!(table.describe(&wallet, 3).is_none());
    }
}
