mod access;
mod chain;
mod error;
pub mod memory;
mod wallet;

pub use access::SharedWallet;
pub use chain::{median_height, NodeInterface};
pub use error::LinkError;
pub use wallet::{
    generated_blocks_to_maturity, is_final_tx, CreditFilter, WalletInterface, WalletTx,
    COINBASE_MATURITY,
};
