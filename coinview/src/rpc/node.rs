use bitcoin::Network;
use coinlink::{median_height, LinkError, NodeInterface};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::client::RpcClient;
use super::error::link_error_from_frontend_error;
use super::types::{BlockHeaderInfo, BlockchainInfo, PeerInfo};

/// Node status read over the node's JSON-RPC interface
pub struct RpcNode {
    client: RpcClient,
    network: Network,
}

impl RpcNode {
    pub fn new(client: RpcClient, network: Network) -> Self {
        Self { client, network }
    }

    async fn fetch<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, LinkError> {
        let value = self
            .client
            .call(method, params)
            .await
            .map_err(|e| link_error_from_frontend_error(method, e))?;

        serde_json::from_value(value).map_err(|e| {
            log::error!("Unexpected reply to {}: {}", method, e);
            LinkError::node_error(format!("Unexpected reply to {}", method), -1).with_source(e)
        })
    }
}

#[async_trait::async_trait(?Send)]
impl NodeInterface for RpcNode {
    async fn connection_count(&self) -> Result<u32, LinkError> {
        self.fetch("getconnectioncount", vec![]).await
    }

    async fn best_height(&self) -> Result<u32, LinkError> {
        self.fetch("getblockcount", vec![]).await
    }

    async fn best_block_time(&self) -> Result<u32, LinkError> {
        let tip: String = self.fetch("getbestblockhash", vec![]).await?;
        let header: BlockHeaderInfo = self.fetch("getblockheader", vec![Value::String(tip)]).await?;
        log::debug!("Best block {} at height {} has time {}", header.hash, header.height, header.time);
        Ok(header.time)
    }

    async fn is_initial_block_download(&self) -> Result<bool, LinkError> {
        let info: BlockchainInfo = self.fetch("getblockchaininfo", vec![]).await?;
        log::debug!("Chain {} at {} blocks", info.chain, info.blocks);
        Ok(info.initial_block_download)
    }

    async fn peer_median_height(&self) -> Result<u32, LinkError> {
        let peers: Vec<PeerInfo> = self.fetch("getpeerinfo", vec![]).await?;
        let heights = peers
            .iter()
            .filter(|peer| peer.starting_height >= 0)
            .map(|peer| peer.starting_height as u32)
            .collect();
        Ok(median_height(heights))
    }

    fn network(&self) -> Network {
        self.network
    }
}
