//! Change notifications from the models to whoever renders them

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use super::options::OptionId;
use super::units::Unit;
use crate::error::FrontendError;

#[derive(Clone, Debug, PartialEq)]
pub enum ClientNotification {
    NumConnectionsChanged(u32),
    NumBlocksChanged(u32),
    DisplayUnitChanged(Unit),
    OptionChanged(OptionId),
}

pub trait NotificationHandler: Send + Sync {
    fn handle_notification(&self, notification: &ClientNotification) -> Result<(), FrontendError>;
}

/// Registry of handlers; clones share the same registry
#[derive(Clone, Default)]
pub struct NotificationDispatcher {
    handlers: Arc<Mutex<Vec<Arc<dyn NotificationHandler>>>>,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_handler(&self, handler: Arc<dyn NotificationHandler>) -> Result<(), FrontendError> {
        let mut guard = self.handlers.lock().map_err(|e| {
            FrontendError::Generic(format!("Failed to acquire lock for registering handler: {}", e))
        })?;
        guard.push(handler);
        Ok(())
    }

    /// Deliver to every handler; a failing handler does not stop the others
    pub fn dispatch(&self, notification: ClientNotification) -> Result<(), FrontendError> {
        let handlers = {
            let guard = self.handlers.lock().map_err(|e| {
                FrontendError::Generic(format!("Failed to acquire lock for dispatching notification: {}", e))
            })?;
            guard.clone()
        };

        log::debug!("Dispatching {:?} to {} handler(s)", notification, handlers.len());
        for handler in handlers {
            if let Err(e) = handler.handle_notification(&notification) {
                log::error!("Failed to handle {:?}: {}", notification, e);
            }
        }
        Ok(())
    }
}

/// Forwards notifications into a channel, for a consumer running elsewhere
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<ClientNotification>,
}

impl ChannelHandler {
    pub fn new(tx: mpsc::UnboundedSender<ClientNotification>) -> Self {
        Self { tx }
    }
}

impl NotificationHandler for ChannelHandler {
    fn handle_notification(&self, notification: &ClientNotification) -> Result<(), FrontendError> {
        self.tx
            .send(notification.clone())
            .map_err(|e| FrontendError::Generic(format!("Notification receiver dropped: {}", e)))
    }
}

/// Wraps a closure as a handler
pub struct CallbackHandler<F> {
    callback: F,
}

impl<F> CallbackHandler<F>
where
    F: Fn(&ClientNotification) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> NotificationHandler for CallbackHandler<F>
where
    F: Fn(&ClientNotification) + Send + Sync,
{
    fn handle_notification(&self, notification: &ClientNotification) -> Result<(), FrontendError> {
        (self.callback)(notification);
        Ok(())
    }
}
