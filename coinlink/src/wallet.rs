//! Wallet engine queries consumed by the front-end.
//!
//! The engine owns keys, the transaction store and the address book. The
//! front-end only reads: a [`WalletInterface`] implementation answers
//! ownership and per-transaction questions, and most derived quantities
//! (credit, debit, change, depth, finality) have provided implementations
//! built on a handful of primitive queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use bitcoin::absolute::LOCK_TIME_THRESHOLD;
use bitcoin::{Address, Amount, BlockHash, Network, Script, Sequence, Transaction, TxIn, TxOut, Txid};

/// Blocks a coinbase output must be buried under before consensus allows spending it
pub const COINBASE_MATURITY: u32 = 100;

/// The wallet waits this many blocks past consensus maturity before counting generated coins
const MATURITY_MARGIN: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditFilter {
    /// Every owned output
    All,
    /// Owned outputs, except coinbase outputs that have not matured yet
    Mature,
}

/// A transaction as stored by the wallet engine
#[derive(Debug, Clone)]
pub struct WalletTx {
    pub tx: Arc<Transaction>,

    /// Block that contains the transaction, if it has been mined
    pub block_hash: Option<BlockHash>,

    /// Unix time the wallet first saw the transaction
    pub time_received: i64,

    /// Free-form annotations such as "from", "to", "message", "comment"
    pub annotations: BTreeMap<String, String>,
}

impl WalletTx {
    pub fn new(tx: Transaction, time_received: i64) -> Self {
        Self {
            tx: Arc::new(tx),
            block_hash: None,
            time_received,
            annotations: BTreeMap::new(),
        }
    }

    pub fn in_block(mut self, block_hash: BlockHash) -> Self {
        self.block_hash = Some(block_hash);
        self
    }

    pub fn with_annotation(mut self, key: &str, value: &str) -> Self {
        self.annotations.insert(key.to_string(), value.to_string());
        self
    }

    pub fn txid(&self) -> Txid {
        self.tx.compute_txid()
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx.is_coinbase()
    }

    /// Raw consensus lock time
    pub fn lock_time(&self) -> u32 {
        self.tx.lock_time.to_consensus_u32()
    }

    /// Annotation value, empty when absent
    pub fn annotation(&self, key: &str) -> &str {
        self.annotations.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn value_out(&self) -> Amount {
        sum_amounts(self.tx.output.iter().map(|txout| txout.value))
    }

    /// Timestamp shown to the user
    pub fn tx_time(&self) -> i64 {
        self.time_received
    }
}

/// Whether `tx` could be included in a block at `block_height` / `block_time`.
pub fn is_final_tx(tx: &Transaction, block_height: u32, block_time: i64) -> bool {
    let lock_time = tx.lock_time.to_consensus_u32();
    if lock_time == 0 {
        return true;
    }

    let limit = if lock_time < LOCK_TIME_THRESHOLD {
        i64::from(block_height)
    } else {
        block_time
    };
    if i64::from(lock_time) < limit {
        return true;
    }

    tx.input.iter().all(|txin| txin.sequence == Sequence::MAX)
}

/// Blocks left before generated coins at `depth` count as spendable.
pub fn generated_blocks_to_maturity(depth: i32) -> u32 {
    let required = (COINBASE_MATURITY + MATURITY_MARGIN) as i32;
    (required - depth).max(0) as u32
}

pub(crate) fn sum_amounts(amounts: impl Iterator<Item = Amount>) -> Amount {
    Amount::from_sat(amounts.map(|amount| amount.to_sat()).sum())
}

/// Read access to the wallet engine.
///
/// Callers hold one scoped guard (see [`crate::SharedWallet`]) for a batch
/// of queries; nothing here mutates engine state.
pub trait WalletInterface {
    fn network(&self) -> Network;

    /// Height of the best block the wallet knows about
    fn best_height(&self) -> u32;

    /// Network-adjusted unix time
    fn adjusted_time(&self) -> i64;

    /// Every transaction stored in the wallet
    fn transactions(&self) -> Vec<WalletTx>;

    /// Any transaction the engine can look up, wallet-owned or not
    fn get_transaction(&self, txid: &Txid) -> Option<Arc<Transaction>>;

    /// Whether the wallet can spend outputs locked by `script`
    fn is_mine_script(&self, script: &Script) -> bool;

    /// Height of the main-chain block containing `wtx`
    fn block_height(&self, wtx: &WalletTx) -> Option<u32>;

    /// Times peers asked for the transaction, `None` when not tracked
    fn request_count(&self, wtx: &WalletTx) -> Option<u32>;

    /// Address-book label for `address`
    fn address_label(&self, address: &Address) -> Option<String>;

    fn is_mine_output(&self, txout: &TxOut) -> bool {
        self.is_mine_script(&txout.script_pubkey)
    }

    fn previous_output(&self, txin: &TxIn) -> Option<TxOut> {
        let prev = self.get_transaction(&txin.previous_output.txid)?;
        prev.output.get(txin.previous_output.vout as usize).cloned()
    }

    fn is_mine_input(&self, txin: &TxIn) -> bool {
        self.previous_output(txin)
            .map_or(false, |prevout| self.is_mine_output(&prevout))
    }

    fn input_debit(&self, txin: &TxIn) -> Amount {
        match self.previous_output(txin) {
            Some(prevout) if self.is_mine_output(&prevout) => prevout.value,
            _ => Amount::ZERO,
        }
    }

    fn output_credit(&self, txout: &TxOut) -> Amount {
        if self.is_mine_output(txout) {
            txout.value
        } else {
            Amount::ZERO
        }
    }

    /// Owned output paying an address that is not in the address book
    fn is_change(&self, txout: &TxOut) -> bool {
        if !self.is_mine_output(txout) {
            return false;
        }
        match self.address_of(&txout.script_pubkey) {
            Some(address) => self.address_label(&address).is_none(),
            None => true,
        }
    }

    fn debit(&self, wtx: &WalletTx) -> Amount {
        sum_amounts(wtx.tx.input.iter().map(|txin| self.input_debit(txin)))
    }

    fn credit(&self, wtx: &WalletTx, filter: CreditFilter) -> Amount {
        if filter == CreditFilter::Mature && wtx.is_coinbase() && self.blocks_to_maturity(wtx) > 0 {
            return Amount::ZERO;
        }
        sum_amounts(wtx.tx.output.iter().map(|txout| self.output_credit(txout)))
    }

    fn change(&self, wtx: &WalletTx) -> Amount {
        sum_amounts(
            wtx.tx
                .output
                .iter()
                .filter(|txout| self.is_change(txout))
                .map(|txout| txout.value),
        )
    }

    fn address_of(&self, script: &Script) -> Option<Address> {
        Address::from_script(script, self.network()).ok()
    }

    fn have_key(&self, address: &Address) -> bool {
        self.is_mine_script(&address.script_pubkey())
    }

    fn depth_in_main_chain(&self, wtx: &WalletTx) -> i32 {
        match self.block_height(wtx) {
            Some(height) => (i64::from(self.best_height()) - i64::from(height) + 1).max(0) as i32,
            None => 0,
        }
    }

    fn is_in_main_chain(&self, wtx: &WalletTx) -> bool {
        self.depth_in_main_chain(wtx) > 0
    }

    fn is_final(&self, wtx: &WalletTx) -> bool {
        is_final_tx(&wtx.tx, self.best_height() + 1, self.adjusted_time())
    }

    fn is_from_me(&self, wtx: &WalletTx) -> bool {
        self.debit(wtx) > Amount::ZERO
    }

    /// Mined, or unmined but spending only our own coins
    fn is_confirmed(&self, wtx: &WalletTx) -> bool {
        if !self.is_final(wtx) {
            return false;
        }
        if self.depth_in_main_chain(wtx) >= 1 {
            return true;
        }
        self.is_from_me(wtx)
    }

    fn blocks_to_maturity(&self, wtx: &WalletTx) -> u32 {
        if !wtx.is_coinbase() {
            return 0;
        }
        generated_blocks_to_maturity(self.depth_in_main_chain(wtx))
    }
}
