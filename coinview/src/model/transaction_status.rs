//! Confirmation and maturity state of a display row.

use bitcoin::absolute::LOCK_TIME_THRESHOLD;
use coinlink::{CreditFilter, WalletInterface, WalletTx};

use super::transaction_record::{RecordType, TransactionRecord};

/// Depth at which a transaction counts as confirmed
pub const NUM_CONFIRMATIONS: i32 = 6;

/// Height recorded for transactions that are not in a block
pub const UNMINED_HEIGHT: i32 = i32::MAX;

/// Seconds after which an unrequested transaction looks like it never left
pub const OFFLINE_AFTER_SECS: i64 = 2 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Not final until the chain reaches a given height
    OpenUntilBlock,
    /// Not final until a given time
    OpenUntilDate,
    /// No peer has asked for it since it was sent
    #[default]
    Offline,
    Unconfirmed,
    HaveConfirmations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Maturity {
    Immature,
    /// Immature, and its block does not seem to have been relayed
    MaturesWarning,
    /// Its block is not in the main chain
    NotAccepted,
    #[default]
    Mature,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransactionStatus {
    pub confirmed: bool,

    /// Ascending order puts unmined rows first, then newest blocks first
    pub sort_key: String,

    /// Only meaningful for generated rows
    pub maturity: Maturity,
    pub matures_in: u32,

    pub status: Status,
    pub depth: i32,

    /// Blocks remaining for [`Status::OpenUntilBlock`], the unlock time for
    /// [`Status::OpenUntilDate`]
    pub open_for: i64,

    /// Best height this status was computed at
    pub cur_num_blocks: Option<u32>,
}

/// Sent more than two minutes ago and no peer ever asked for it
pub(crate) fn looks_offline<W: WalletInterface + ?Sized>(wallet: &W, wtx: &WalletTx) -> bool {
    wallet.adjusted_time() - wtx.time_received > OFFLINE_AFTER_SECS
        && wallet.request_count(wtx) == Some(0)
}

pub(crate) fn sort_key(height: i32, coinbase: bool, time_received: i64, idx: usize) -> String {
    format!(
        "{:010}-{:01}-{:010}-{:03}",
        UNMINED_HEIGHT - height,
        u8::from(coinbase),
        time_received.max(0),
        idx
    )
}

impl TransactionRecord {
    /// Recompute `self.status` against the wallet at `best_height`
    pub fn update_status<W: WalletInterface + ?Sized>(
        &mut self,
        wallet: &W,
        wtx: &WalletTx,
        best_height: u32,
    ) {
        let height = wallet
            .block_height(wtx)
            .and_then(|height| i32::try_from(height).ok())
            .unwrap_or(UNMINED_HEIGHT);

        let tx_id = self.tx_id();
        let status = &mut self.status;
        status.sort_key = sort_key(height, wtx.is_coinbase(), wtx.time_received, self.idx);
        status.confirmed = wallet.is_confirmed(wtx);
        status.depth = wallet.depth_in_main_chain(wtx);
        status.cur_num_blocks = Some(best_height);

        let offline = looks_offline(wallet, wtx);
        if !wallet.is_final(wtx) {
            let lock_time = wtx.lock_time();
            if lock_time < LOCK_TIME_THRESHOLD {
                status.status = Status::OpenUntilBlock;
                status.open_for = i64::from(lock_time) - i64::from(best_height);
            } else {
                status.status = Status::OpenUntilDate;
                status.open_for = i64::from(lock_time);
            }
        } else if offline {
            status.status = Status::Offline;
        } else if status.depth < NUM_CONFIRMATIONS {
            status.status = Status::Unconfirmed;
        } else {
            status.status = Status::HaveConfirmations;
        }

        if self.kind == RecordType::Generated {
            if wallet.credit(wtx, CreditFilter::Mature).to_sat() == 0 {
                if wallet.is_in_main_chain(wtx) {
                    status.matures_in = wallet.blocks_to_maturity(wtx);
                    status.maturity = if offline {
                        Maturity::MaturesWarning
                    } else {
                        Maturity::Immature
                    };
                } else {
                    status.maturity = Maturity::NotAccepted;
                }
            } else {
                status.maturity = Maturity::Mature;
            }
        }

        log::debug!(
            "Status of {} at height {}: {:?}, depth {}",
            tx_id,
            best_height,
            status.status,
            status.depth
        );
    }

    /// Whether the status was computed at a height other than `best_height`
    pub fn status_update_needed(&self, best_height: u32) -> bool {
        self.status.cur_num_blocks != Some(best_height)
    }
}
