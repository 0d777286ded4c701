//! In-memory node and wallet engine.
//!
//! Deterministic stand-ins for the external engine: every value a query
//! returns is set explicitly, including the clock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use bitcoin::{Address, BlockHash, Network, Script, ScriptBuf, Transaction, Txid};

use crate::chain::NodeInterface;
use crate::wallet::{WalletInterface, WalletTx};
use crate::LinkError;

pub struct MemoryNode {
    network: Network,
    connections: AtomicU32,
    height: AtomicU32,
    block_time: AtomicU32,
    initial_download: AtomicBool,
    peer_median: AtomicU32,
}

impl MemoryNode {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            connections: AtomicU32::new(0),
            height: AtomicU32::new(0),
            block_time: AtomicU32::new(0),
            initial_download: AtomicBool::new(false),
            peer_median: AtomicU32::new(0),
        }
    }

    pub fn set_connection_count(&self, count: u32) {
        self.connections.store(count, Ordering::SeqCst);
    }

    pub fn set_best_block(&self, height: u32, time: u32) {
        self.height.store(height, Ordering::SeqCst);
        self.block_time.store(time, Ordering::SeqCst);
    }

    pub fn set_initial_block_download(&self, active: bool) {
        self.initial_download.store(active, Ordering::SeqCst);
    }

    pub fn set_peer_median_height(&self, height: u32) {
        self.peer_median.store(height, Ordering::SeqCst);
    }
}

#[async_trait::async_trait(?Send)]
impl NodeInterface for MemoryNode {
    async fn connection_count(&self) -> Result<u32, LinkError> {
        Ok(self.connections.load(Ordering::SeqCst))
    }

    async fn best_height(&self) -> Result<u32, LinkError> {
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn best_block_time(&self) -> Result<u32, LinkError> {
        Ok(self.block_time.load(Ordering::SeqCst))
    }

    async fn is_initial_block_download(&self) -> Result<bool, LinkError> {
        Ok(self.initial_download.load(Ordering::SeqCst))
    }

    async fn peer_median_height(&self) -> Result<u32, LinkError> {
        Ok(self.peer_median.load(Ordering::SeqCst))
    }

    fn network(&self) -> Network {
        self.network
    }
}

pub struct MemoryWallet {
    network: Network,
    best_height: u32,
    adjusted_time: i64,
    transactions: BTreeMap<Txid, WalletTx>,
    foreign: HashMap<Txid, Arc<Transaction>>,
    blocks: HashMap<BlockHash, u32>,
    scripts: HashSet<ScriptBuf>,
    address_book: HashMap<Address, String>,
    request_counts: HashMap<Txid, u32>,
}

impl MemoryWallet {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            best_height: 0,
            adjusted_time: 0,
            transactions: BTreeMap::new(),
            foreign: HashMap::new(),
            blocks: HashMap::new(),
            scripts: HashSet::new(),
            address_book: HashMap::new(),
            request_counts: HashMap::new(),
        }
    }

    pub fn set_best_height(&mut self, height: u32) {
        self.best_height = height;
    }

    pub fn set_adjusted_time(&mut self, time: i64) {
        self.adjusted_time = time;
    }

    /// Mark `script` as spendable by this wallet
    pub fn add_script(&mut self, script: ScriptBuf) {
        self.scripts.insert(script);
    }

    pub fn set_label(&mut self, address: &Address, label: &str) {
        self.address_book.insert(address.clone(), label.to_string());
    }

    /// Record a main-chain block
    pub fn add_block(&mut self, hash: BlockHash, height: u32) {
        self.blocks.insert(hash, height);
        self.best_height = self.best_height.max(height);
    }

    /// Drop a block from the main chain, as after a reorganisation
    pub fn remove_block(&mut self, hash: &BlockHash) {
        self.blocks.remove(hash);
    }

    pub fn add_transaction(&mut self, wtx: WalletTx) -> Txid {
        let txid = wtx.txid();
        self.transactions.insert(txid, wtx);
        txid
    }

    /// Forget a transaction, as after a replacement or mempool eviction
    pub fn remove_transaction(&mut self, txid: &Txid) -> Option<WalletTx> {
        self.transactions.remove(txid)
    }

    /// Make a transaction the wallet does not own available for input lookups
    pub fn add_foreign_transaction(&mut self, tx: Transaction) -> Txid {
        let txid = tx.compute_txid();
        self.foreign.insert(txid, Arc::new(tx));
        txid
    }

    pub fn set_request_count(&mut self, txid: Txid, count: u32) {
        self.request_counts.insert(txid, count);
    }
}

impl WalletInterface for MemoryWallet {
    fn network(&self) -> Network {
        self.network
    }

    fn best_height(&self) -> u32 {
        self.best_height
    }

    fn adjusted_time(&self) -> i64 {
        self.adjusted_time
    }

    fn transactions(&self) -> Vec<WalletTx> {
        self.transactions.values().cloned().collect()
    }

    fn get_transaction(&self, txid: &Txid) -> Option<Arc<Transaction>> {
        self.transactions
            .get(txid)
            .map(|wtx| wtx.tx.clone())
            .or_else(|| self.foreign.get(txid).cloned())
    }

    fn is_mine_script(&self, script: &Script) -> bool {
        self.scripts.contains(script)
    }

    fn block_height(&self, wtx: &WalletTx) -> Option<u32> {
        wtx.block_hash
            .and_then(|hash| self.blocks.get(&hash))
            .copied()
    }

    fn request_count(&self, wtx: &WalletTx) -> Option<u32> {
        self.request_counts.get(&wtx.txid()).copied()
    }

    fn address_label(&self, address: &Address) -> Option<String> {
        self.address_book.get(address).cloned()
    }
}

/// Transaction and script builders for exercising the engine interfaces.
pub mod fixtures {
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{
        Amount, BlockHash, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
        WPubkeyHash, Witness,
    };

    /// Standard pay-to-witness-pubkey-hash script derived from `seed`
    pub fn script(seed: u8) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array([seed; 20]))
    }

    /// Script no address can be extracted from
    pub fn bare_script(seed: u8) -> ScriptBuf {
        ScriptBuf::from_bytes(vec![0x51, 0x01, seed, 0x87])
    }

    pub fn outpoint(seed: u8, vout: u32) -> OutPoint {
        OutPoint::new(Txid::from_byte_array([seed; 32]), vout)
    }

    pub fn block_hash(seed: u8) -> BlockHash {
        BlockHash::from_byte_array([seed; 32])
    }

    fn outputs(outputs: &[(ScriptBuf, u64)]) -> Vec<TxOut> {
        outputs
            .iter()
            .map(|(script, value)| TxOut {
                value: Amount::from_sat(*value),
                script_pubkey: script.clone(),
            })
            .collect()
    }

    pub fn spend(prevouts: &[OutPoint], outs: &[(ScriptBuf, u64)]) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: prevouts
                .iter()
                .map(|prevout| TxIn {
                    previous_output: *prevout,
                    script_sig: ScriptBuf::new(),
                    sequence: Sequence::MAX,
                    witness: Witness::new(),
                })
                .collect(),
            output: outputs(outs),
        }
    }

    pub fn coinbase(outs: &[(ScriptBuf, u64)]) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::null(),
                script_sig: ScriptBuf::from_bytes(vec![0x01, 0x2a]),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: outputs(outs),
        }
    }

    /// Lock `tx` until `lock_time` and make the lock effective
    pub fn locked(mut tx: Transaction, lock_time: u32) -> Transaction {
        tx.lock_time = LockTime::from_consensus(lock_time);
        for txin in tx.input.iter_mut() {
            txin.sequence = Sequence(0xffff_fffe);
        }
        tx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_node_reports_what_was_set() {
        let node = MemoryNode::new(Network::Testnet);
        node.set_connection_count(8);
        node.set_best_block(812_000, 1_700_000_000);
        node.set_initial_block_download(true);
        node.set_peer_median_height(812_004);

        assert_eq!(node.connection_count().await.unwrap(), 8);
        assert_eq!(node.best_height().await.unwrap(), 812_000);
        assert_eq!(node.best_block_time().await.unwrap(), 1_700_000_000);
        assert!(node.is_initial_block_download().await.unwrap());
        assert_eq!(node.peer_median_height().await.unwrap(), 812_004);
        assert_eq!(node.network(), Network::Testnet);
    }

    #[test]
    fn removed_block_leaves_main_chain() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let block = fixtures::block_hash(3);
        wallet.add_block(block, 5);
        wallet.set_best_height(7);

        let wtx = WalletTx::new(fixtures::spend(&[], &[]), 0).in_block(block);
        assert_eq!(wallet.depth_in_main_chain(&wtx), 3);
        assert!(wallet.is_in_main_chain(&wtx));

        wallet.remove_block(&block);
        assert_eq!(wallet.depth_in_main_chain(&wtx), 0);
        assert!(!wallet.is_in_main_chain(&wtx));
    }

    #[test]
    fn inputs_are_mine_only_when_prevout_is_known_and_owned() {
        let mut wallet = MemoryWallet::new(Network::Regtest);
        let mine = fixtures::script(1);
        wallet.add_script(mine.clone());

        let owned = wallet.add_foreign_transaction(fixtures::spend(&[], &[(mine, 10)]));
        let other = wallet.add_foreign_transaction(fixtures::spend(&[], &[(fixtures::script(2), 10)]));

        let tx = fixtures::spend(
            &[
                bitcoin::OutPoint::new(owned, 0),
                bitcoin::OutPoint::new(other, 0),
                fixtures::outpoint(99, 0),
            ],
            &[],
        );
        assert!(wallet.is_mine_input(&tx.input[0]));
        assert!(!wallet.is_mine_input(&tx.input[1]));
        assert!(!wallet.is_mine_input(&tx.input[2]));
    }

    #[test]
    fn bare_script_has_no_address() {
        let wallet = MemoryWallet::new(Network::Regtest);
        assert!(wallet.address_of(&fixtures::bare_script(1)).is_none());
        assert!(wallet.address_of(&fixtures::script(1)).is_some());
    }
}
