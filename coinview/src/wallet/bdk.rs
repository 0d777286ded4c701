//! Wallet queries answered from a BDK wallet.

use std::ops::Deref;
use std::sync::Arc;

use bdk_chain::ChainPosition;
use bdk_wallet::{KeychainKind, Wallet};
use bitcoin::{Address, Network, Script, Transaction, Txid};
use coinlink::{WalletInterface, WalletTx};

/// Read-only view of a BDK wallet.
///
/// BDK does not record address-book labels, peer requests or annotations:
/// receiving addresses of the external keychain count as address-book
/// entries without a label, request counts are unknown and annotations are
/// empty.
pub struct BdkWallet<W> {
    wallet: W,
}

impl<W> BdkWallet<W>
where
    W: Deref<Target = Wallet>,
{
    pub fn new(wallet: W) -> Self {
        Self { wallet }
    }

    pub fn inner(&self) -> &Wallet {
        &self.wallet
    }
}

fn position_of<A>(position: &ChainPosition<A>) -> (Option<&A>, Option<u64>) {
    match position {
        ChainPosition::Confirmed { anchor, .. } => (Some(anchor), None),
        ChainPosition::Unconfirmed { last_seen, .. } => (None, *last_seen),
    }
}

impl<W> WalletInterface for BdkWallet<W>
where
    W: Deref<Target = Wallet>,
{
    fn network(&self) -> Network {
        self.wallet.network()
    }

    fn best_height(&self) -> u32 {
        self.wallet.latest_checkpoint().height()
    }

    fn adjusted_time(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn transactions(&self) -> Vec<WalletTx> {
        self.wallet
            .transactions()
            .map(|canonical| {
                let tx: Arc<Transaction> = canonical.tx_node.tx.clone();
                let (anchor, last_seen) = position_of(&canonical.chain_position);
                WalletTx {
                    tx,
                    block_hash: anchor.map(|anchor| anchor.block_id.hash),
                    time_received: anchor
                        .map(|anchor| anchor.confirmation_time)
                        .or(last_seen)
                        .unwrap_or(0) as i64,
                    annotations: Default::default(),
                }
            })
            .collect()
    }

    fn get_transaction(&self, txid: &Txid) -> Option<Arc<Transaction>> {
        self.wallet
            .get_tx(*txid)
            .map(|canonical| canonical.tx_node.tx.clone())
    }

    fn is_mine_script(&self, script: &Script) -> bool {
        self.wallet.is_mine(script.to_owned())
    }

    fn block_height(&self, wtx: &WalletTx) -> Option<u32> {
        let canonical = self.wallet.get_tx(wtx.txid())?;
        let (anchor, _) = position_of(&canonical.chain_position);
        anchor.map(|anchor| anchor.block_id.height)
    }

    fn request_count(&self, _wtx: &WalletTx) -> Option<u32> {
        None
    }

    fn address_label(&self, address: &Address) -> Option<String> {
        match self.wallet.derivation_of_spk(address.script_pubkey()) {
            Some((KeychainKind::External, _)) => Some(String::new()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{decompose_transaction, RecordType};
    use bitcoin::absolute::LockTime;
    use bitcoin::hashes::Hash;
    use bitcoin::transaction::Version;
    use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, TxIn, TxOut, Witness};
    use coinlink::CreditFilter;

    const EXTERNAL_DESCRIPTOR: &str = "tr(tprv8ZgxMBicQKsPdJuLWWArdBsWjqDA3W5WoREnfdgKEcCQB1FMKfSoaFz9JHZU71HwXAqTsjHripkLM62kUQar14SDD8brsmhFKqVUPXGrZLc/86'/1'/0'/0/*)";
    const INTERNAL_DESCRIPTOR: &str = "tr(tprv8ZgxMBicQKsPdJuLWWArdBsWjqDA3W5WoREnfdgKEcCQB1FMKfSoaFz9JHZU71HwXAqTsjHripkLM62kUQar14SDD8brsmhFKqVUPXGrZLc/86'/1'/0'/1/*)";

    fn wallet() -> Wallet {
        Wallet::create(EXTERNAL_DESCRIPTOR, INTERNAL_DESCRIPTOR)
            .network(Network::Regtest)
            .create_wallet_no_persist()
            .unwrap()
    }

    fn paying(script: ScriptBuf, value: u64) -> Transaction {
        Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::new(Txid::from_byte_array([7; 32]), 0),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(value),
                script_pubkey: script,
            }],
        }
    }

    #[test]
    fn unconfirmed_receive_is_visible() {
        let mut inner = wallet();
        let receive = inner.reveal_next_address(KeychainKind::External).address;
        let tx = paying(receive.script_pubkey(), 25_000);
        let txid = tx.compute_txid();
        inner.apply_unconfirmed_txs([(tx, 1_700_000_000)]);

        let wallet = BdkWallet::new(Box::new(inner));
        let transactions = wallet.transactions();
        assert_eq!(transactions.len(), 1);

        let wtx = &transactions[0];
        assert_eq!(wtx.txid(), txid);
        assert_eq!(wtx.block_hash, None);
        assert_eq!(wtx.time_received, 1_700_000_000);
        assert_eq!(wallet.block_height(wtx), None);
        assert_eq!(wallet.request_count(wtx), None);
        assert_eq!(wallet.credit(wtx, CreditFilter::All), Amount::from_sat(25_000));
        assert!(wallet.get_transaction(&txid).is_some());

        assert_eq!(wallet.address_label(&receive), Some(String::new()));
        assert_eq!(wallet.change(wtx), Amount::ZERO);

        let rows = decompose_transaction(&wallet, wtx);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RecordType::ReceivedByAddress);
        assert_eq!(rows[0].address, receive.to_string());
    }

    #[test]
    fn internal_outputs_count_as_change() {
        let mut inner = wallet();
        let change = inner.reveal_next_address(KeychainKind::Internal).address;
        let wallet = BdkWallet::new(Box::new(inner));

        assert!(wallet.is_mine_script(&change.script_pubkey()));
        assert_eq!(wallet.address_label(&change), None);
        assert!(wallet.is_change(&TxOut {
            value: Amount::from_sat(1_000),
            script_pubkey: change.script_pubkey(),
        }));
        assert_eq!(wallet.network(), Network::Regtest);
        assert_eq!(wallet.best_height(), 0);
    }
}
