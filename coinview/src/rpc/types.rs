use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reply envelope, accepting both 1.0 (`"error": null`) and 2.0 style servers
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RpcReply {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<jsonrpc_core::Error>,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct BlockchainInfo {
    pub chain: String,
    pub blocks: u32,
    #[serde(rename = "initialblockdownload", default)]
    pub initial_block_download: bool,
}

#[derive(Debug, Deserialize)]
pub struct BlockHeaderInfo {
    pub hash: String,
    pub height: u32,
    pub time: u32,
}

#[derive(Debug, Deserialize)]
pub struct PeerInfo {
    pub id: i64,
    #[serde(rename = "startingheight", default)]
    pub starting_height: i64,
}
