use bitcoin::Network;

use crate::LinkError;

/// Status queries answered by the running node.
///
/// Every call is an independent read; two calls may observe the chain at
/// slightly different moments.
#[async_trait::async_trait(?Send)]
pub trait NodeInterface {
    /// Number of peers the node is connected to
    async fn connection_count(&self) -> Result<u32, LinkError>;

    /// Height of the best chain tip
    async fn best_height(&self) -> Result<u32, LinkError>;

    /// Header timestamp of the best chain tip
    async fn best_block_time(&self) -> Result<u32, LinkError>;

    /// True while the node is still in initial block download
    async fn is_initial_block_download(&self) -> Result<bool, LinkError>;

    /// Median of the chain heights announced by connected peers
    async fn peer_median_height(&self) -> Result<u32, LinkError>;

    /// Network the node runs on
    fn network(&self) -> Network;
}

/// Median of the peers' announced heights, 0 when there are no peers.
pub fn median_height(mut heights: Vec<u32>) -> u32 {
    if heights.is_empty() {
        return 0;
    }
    heights.sort_unstable();
    heights[heights.len() / 2]
}
