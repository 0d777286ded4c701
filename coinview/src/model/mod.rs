mod client;
mod notification;
mod options;
mod transaction_desc;
mod transaction_record;
mod transaction_status;
mod transaction_table;
mod units;

pub use client::{ClientModel, MODEL_UPDATE_DELAY};
pub use notification::{
    CallbackHandler, ChannelHandler, ClientNotification, NotificationDispatcher, NotificationHandler,
};
pub use options::{OptionId, OptionValue, OptionsModel, Settings};
pub use transaction_desc::{date_time_str, format_tx_status, html_escape, to_html};
pub use transaction_record::{decompose_transaction, show_transaction, RecordType, TransactionRecord};
pub use transaction_status::{Maturity, Status, TransactionStatus, NUM_CONFIRMATIONS};
pub use transaction_table::TransactionTableModel;
pub use units::Unit;
