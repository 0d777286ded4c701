//! Connection and chain status, polled from the node.

use std::sync::Arc;
use std::time::Duration;

use bitcoin::Network;
use chrono::{DateTime, Utc};
use coinlink::NodeInterface;

use super::notification::{ClientNotification, NotificationDispatcher};
use crate::error::FrontendError;

/// Interval between polls of node and wallet state
pub const MODEL_UPDATE_DELAY: Duration = Duration::from_millis(500);

pub struct ClientModel {
    node: Arc<dyn NodeInterface>,
    notifications: NotificationDispatcher,
    cached_num_connections: u32,
    cached_num_blocks: u32,
    num_blocks_at_startup: Option<u32>,
}

impl ClientModel {
    pub fn new(node: Arc<dyn NodeInterface>, notifications: NotificationDispatcher) -> Self {
        Self {
            node,
            notifications,
            cached_num_connections: 0,
            cached_num_blocks: 0,
            num_blocks_at_startup: None,
        }
    }

    pub fn notifications(&self) -> &NotificationDispatcher {
        &self.notifications
    }

    pub async fn num_connections(&self) -> Result<u32, FrontendError> {
        Ok(self.node.connection_count().await?)
    }

    pub async fn num_blocks(&self) -> Result<u32, FrontendError> {
        Ok(self.node.best_height().await?)
    }

    /// Height seen by the first call, kept for the rest of the session
    pub async fn num_blocks_at_startup(&mut self) -> Result<u32, FrontendError> {
        if let Some(height) = self.num_blocks_at_startup {
            return Ok(height);
        }
        let height = self.num_blocks().await?;
        self.num_blocks_at_startup = Some(height);
        Ok(height)
    }

    pub async fn last_block_date(&self) -> Result<DateTime<Utc>, FrontendError> {
        let time = self.node.best_block_time().await?;
        DateTime::<Utc>::from_timestamp(i64::from(time), 0)
            .ok_or_else(|| FrontendError::Generic(format!("Block time {} out of range", time)))
    }

    pub fn is_test_net(&self) -> bool {
        self.node.network() != Network::Bitcoin
    }

    pub async fn in_initial_block_download(&self) -> Result<bool, FrontendError> {
        Ok(self.node.is_initial_block_download().await?)
    }

    pub async fn num_blocks_of_peers(&self) -> Result<u32, FrontendError> {
        Ok(self.node.peer_median_height().await?)
    }

    pub fn status_bar_warnings(&self) -> String {
        String::new()
    }

    pub fn format_full_version(&self) -> String {
        format!("v{}", env!("CARGO_PKG_VERSION"))
    }

    /// Last polled connection count
    pub fn cached_num_connections(&self) -> u32 {
        self.cached_num_connections
    }

    /// Last polled best height
    pub fn cached_num_blocks(&self) -> u32 {
        self.cached_num_blocks
    }

    /// Poll the node and announce whatever changed since the last poll
    pub async fn update(&mut self) {
        let polled = async {
            let connections = self.node.connection_count().await?;
            let blocks = self.node.best_height().await?;
            Ok::<_, FrontendError>((connections, blocks))
        };

        let (connections, blocks) = match polled.await {
            Ok(values) => values,
            Err(e) => {
                log::warn!("Failed to poll node status: {}", e);
                return;
            }
        };

        if connections != self.cached_num_connections {
            self.notify(ClientNotification::NumConnectionsChanged(connections));
        }
        if blocks != self.cached_num_blocks {
            self.notify(ClientNotification::NumBlocksChanged(blocks));
        }

        self.cached_num_connections = connections;
        self.cached_num_blocks = blocks;
    }

    fn notify(&self, notification: ClientNotification) {
        if let Err(e) = self.notifications.dispatch(notification) {
            log::error!("Failed to dispatch client notification: {}", e);
        }
    }
}
