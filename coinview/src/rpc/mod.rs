mod client;
mod config;
mod error;
mod node;
mod types;

pub use client::{parse_param, run_command, RpcClient, RpcResponse};
pub use config::{RpcAuth, RpcConfig};
pub use error::link_error_from_frontend_error;
pub use node::RpcNode;
pub use types::*;
