//! Splitting wallet transactions into display rows.
//!
//! One wallet transaction can turn into several rows: an incoming
//! transaction gets a row per owned output, an outgoing one a row per
//! recipient. Owned outputs of outgoing transactions are treated as change
//! and never shown.

use bitcoin::{Amount, SignedAmount, Txid};
use coinlink::{CreditFilter, WalletInterface, WalletTx};

use super::transaction_status::TransactionStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Other,
    Generated,
    SentToAddress,
    SentToOther,
    ReceivedByAddress,
    ReceivedFromOther,
    SentToSelf,
}

/// One row of the transaction list
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub hash: Txid,
    pub time: i64,
    pub kind: RecordType,

    /// Counterparty: a derived address, an annotation, or empty
    pub address: String,
    pub debit: SignedAmount,
    pub credit: SignedAmount,

    /// Position among the rows produced from the same transaction
    pub idx: usize,
    pub status: TransactionStatus,
}

impl TransactionRecord {
    pub fn new(hash: Txid, time: i64) -> Self {
        Self {
            hash,
            time,
            kind: RecordType::Other,
            address: String::new(),
            debit: SignedAmount::ZERO,
            credit: SignedAmount::ZERO,
            idx: 0,
            status: TransactionStatus::default(),
        }
    }

    fn with_amounts(
        hash: Txid,
        time: i64,
        kind: RecordType,
        address: String,
        debit: SignedAmount,
        credit: SignedAmount,
    ) -> Self {
        Self {
            kind,
            address,
            debit,
            credit,
            ..Self::new(hash, time)
        }
    }

    /// Identifier unique across rows: transaction hash plus row index
    pub fn tx_id(&self) -> String {
        format!("{}-{:03}", self.hash, self.idx)
    }

    /// Net effect of the row on the balance
    pub fn amount(&self) -> SignedAmount {
        self.credit + self.debit
    }
}

pub(crate) fn signed(amount: Amount) -> SignedAmount {
    SignedAmount::from_sat(amount.to_sat() as i64)
}

/// Whether `wtx` belongs in the transaction list at all.
///
/// Generated coins stay hidden until a block has been built on top of the
/// one containing them, since their block may still be orphaned.
pub fn show_transaction<W: WalletInterface + ?Sized>(wallet: &W, wtx: &WalletTx) -> bool {
    if wtx.is_coinbase() && wallet.depth_in_main_chain(wtx) < 2 {
        return false;
    }
    true
}

/// Break `wtx` down into display rows, numbered in emission order.
pub fn decompose_transaction<W: WalletInterface + ?Sized>(
    wallet: &W,
    wtx: &WalletTx,
) -> Vec<TransactionRecord> {
    let mut parts = Vec::new();
    if !show_transaction(wallet, wtx) {
        return parts;
    }

    let time = wtx.tx_time();
    let hash = wtx.txid();
    let credit = signed(wallet.credit(wtx, CreditFilter::Mature));
    let debit = signed(wallet.debit(wtx));
    let net = credit - debit;

    if net > SignedAmount::ZERO || wtx.is_coinbase() {
        for txout in wtx.tx.output.iter() {
            if !wallet.is_mine_output(txout) {
                continue;
            }

            let mut sub = TransactionRecord::new(hash, time);
            sub.idx = parts.len();
            sub.credit = signed(txout.value);

            let address = wallet
                .address_of(&txout.script_pubkey)
                .filter(|address| wallet.have_key(address));
            if wtx.is_coinbase() {
                sub.kind = RecordType::Generated;
            } else if let Some(address) = address {
                sub.kind = RecordType::ReceivedByAddress;
                sub.address = address.to_string();
            } else {
                sub.kind = RecordType::ReceivedFromOther;
                sub.address = wtx.annotation("from").to_string();
            }
            parts.push(sub);
        }
        return parts;
    }

    let all_from_me = wtx.tx.input.iter().all(|txin| wallet.is_mine_input(txin));
    let all_to_me = wtx.tx.output.iter().all(|txout| wallet.is_mine_output(txout));

    if all_from_me && all_to_me {
        let change = signed(wallet.change(wtx));
        parts.push(TransactionRecord::with_amounts(
            hash,
            time,
            RecordType::SentToSelf,
            String::new(),
            -(debit - change),
            credit - change,
        ));
    } else if all_from_me {
        let mut fee = debit - signed(wtx.value_out());

        for txout in wtx.tx.output.iter() {
            if wallet.is_mine_output(txout) {
                continue;
            }

            let mut sub = TransactionRecord::new(hash, time);
            sub.idx = parts.len();
            match wallet.address_of(&txout.script_pubkey) {
                Some(address) => {
                    sub.kind = RecordType::SentToAddress;
                    sub.address = address.to_string();
                }
                None => {
                    sub.kind = RecordType::SentToOther;
                    sub.address = wtx.annotation("to").to_string();
                }
            }

            let mut value = signed(txout.value);
            if fee > SignedAmount::ZERO {
                value += fee;
                fee = SignedAmount::ZERO;
            }
            sub.debit = -value;
            parts.push(sub);
        }
    } else {
        // Some inputs belong to someone else; payees cannot be told apart.
        parts.push(TransactionRecord::with_amounts(
            hash,
            time,
            RecordType::Other,
            String::new(),
            net,
            SignedAmount::ZERO,
        ));
    }

    parts
}
