//! User preferences, editable row by row and persisted through a settings store.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use bitcoin::Amount;
use serde_json::{json, Value};

use super::notification::{ClientNotification, NotificationDispatcher};
use super::units::Unit;
use crate::wallet::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionId {
    StartAtStartup,
    MinimizeToTray,
    MapPortUpnp,
    MinimizeOnClose,
    ConnectSocks4,
    ProxyIp,
    ProxyPort,
    Fee,
    DisplayUnit,
    DisplayAddresses,
}

impl OptionId {
    pub const ALL: [OptionId; 10] = [
        OptionId::StartAtStartup,
        OptionId::MinimizeToTray,
        OptionId::MapPortUpnp,
        OptionId::MinimizeOnClose,
        OptionId::ConnectSocks4,
        OptionId::ProxyIp,
        OptionId::ProxyPort,
        OptionId::Fee,
        OptionId::DisplayUnit,
        OptionId::DisplayAddresses,
    ];

    pub fn from_row(row: usize) -> Option<OptionId> {
        Self::ALL.get(row).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl OptionValue {
    pub fn to_bool(&self) -> bool {
        match self {
            OptionValue::Bool(b) => *b,
            OptionValue::Int(n) => *n != 0,
            OptionValue::Text(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true"),
        }
    }

    pub fn to_int(&self) -> Option<i64> {
        match self {
            OptionValue::Bool(b) => Some(i64::from(*b)),
            OptionValue::Int(n) => Some(*n),
            OptionValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            OptionValue::Bool(b) => b.to_string(),
            OptionValue::Int(n) => n.to_string(),
            OptionValue::Text(s) => s.clone(),
        }
    }
}

/// Preferences the rest of the front-end reads
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub start_at_startup: bool,
    pub minimize_to_tray: bool,
    pub map_port_upnp: bool,
    pub minimize_on_close: bool,
    pub use_proxy: bool,
    pub proxy: SocketAddr,
    pub transaction_fee: Amount,
    pub display_unit: Unit,
    pub display_addresses: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            start_at_startup: false,
            minimize_to_tray: true,
            map_port_upnp: false,
            minimize_on_close: true,
            use_proxy: false,
            proxy: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9050),
            transaction_fee: Amount::ZERO,
            display_unit: Unit::Btc,
            display_addresses: false,
        }
    }
}

const KEY_MINIMIZE_TO_TRAY: &str = "minimize_to_tray";
const KEY_MAP_PORT_UPNP: &str = "map_port_upnp";
const KEY_MINIMIZE_ON_CLOSE: &str = "minimize_on_close";
const KEY_USE_PROXY: &str = "use_proxy";
const KEY_PROXY: &str = "proxy";
const KEY_TRANSACTION_FEE: &str = "transaction_fee";
const KEY_DISPLAY_UNIT: &str = "display_unit";
const KEY_DISPLAY_ADDRESSES: &str = "display_addresses";

pub struct OptionsModel {
    settings: Settings,
    store: Box<dyn SettingsStore>,
    notifications: NotificationDispatcher,
}

impl OptionsModel {
    /// Build the model from whatever the store already holds
    pub fn new(store: Box<dyn SettingsStore>, notifications: NotificationDispatcher) -> Self {
        let mut settings = Settings::default();
        let read_bool = |key: &str| store.read_setting(key).and_then(|v| v.as_bool());

        if let Some(v) = read_bool(KEY_MINIMIZE_TO_TRAY) {
            settings.minimize_to_tray = v;
        }
        if let Some(v) = read_bool(KEY_MAP_PORT_UPNP) {
            settings.map_port_upnp = v;
        }
        if let Some(v) = read_bool(KEY_MINIMIZE_ON_CLOSE) {
            settings.minimize_on_close = v;
        }
        if let Some(v) = read_bool(KEY_USE_PROXY) {
            settings.use_proxy = v;
        }
        if let Some(v) = read_bool(KEY_DISPLAY_ADDRESSES) {
            settings.display_addresses = v;
        }
        if let Some(proxy) = store
            .read_setting(KEY_PROXY)
            .and_then(|v| v.as_str().and_then(|s| s.parse::<SocketAddr>().ok()))
        {
            settings.proxy = proxy;
        }
        if let Some(fee) = store.read_setting(KEY_TRANSACTION_FEE).and_then(|v| v.as_u64()) {
            settings.transaction_fee = Amount::from_sat(fee);
        }
        if let Some(unit) = store
            .read_setting(KEY_DISPLAY_UNIT)
            .and_then(|v| v.as_i64())
            .and_then(Unit::from_index)
        {
            settings.display_unit = unit;
        }

        log::debug!("Loaded settings: {:?}", settings);
        Self {
            settings,
            store,
            notifications,
        }
    }

    pub fn row_count(&self) -> usize {
        OptionId::ALL.len()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data(&self, id: OptionId) -> OptionValue {
        let s = &self.settings;
        match id {
            OptionId::StartAtStartup => OptionValue::Bool(s.start_at_startup),
            OptionId::MinimizeToTray => OptionValue::Bool(s.minimize_to_tray),
            OptionId::MapPortUpnp => OptionValue::Bool(s.map_port_upnp),
            OptionId::MinimizeOnClose => OptionValue::Bool(s.minimize_on_close),
            OptionId::ConnectSocks4 => OptionValue::Bool(s.use_proxy),
            OptionId::ProxyIp => OptionValue::Text(s.proxy.ip().to_string()),
            OptionId::ProxyPort => OptionValue::Int(i64::from(s.proxy.port())),
            OptionId::Fee => OptionValue::Int(s.transaction_fee.to_sat() as i64),
            OptionId::DisplayUnit => OptionValue::Int(s.display_unit.index()),
            OptionId::DisplayAddresses => OptionValue::Bool(s.display_addresses),
        }
    }

    /// Apply one edited option; false when the value is rejected or cannot be stored
    pub fn set_data(&mut self, id: OptionId, value: OptionValue) -> bool {
        let previous = self.settings.clone();
        let successful = match id {
            OptionId::StartAtStartup => {
                log::warn!("Starting on system start-up is not supported on this platform");
                false
            }
            OptionId::MinimizeToTray => {
                self.settings.minimize_to_tray = value.to_bool();
                self.persist(KEY_MINIMIZE_TO_TRAY, json!(self.settings.minimize_to_tray))
            }
            OptionId::MapPortUpnp => {
                self.settings.map_port_upnp = value.to_bool();
                self.persist(KEY_MAP_PORT_UPNP, json!(self.settings.map_port_upnp))
            }
            OptionId::MinimizeOnClose => {
                self.settings.minimize_on_close = value.to_bool();
                self.persist(KEY_MINIMIZE_ON_CLOSE, json!(self.settings.minimize_on_close))
            }
            OptionId::ConnectSocks4 => {
                self.settings.use_proxy = value.to_bool();
                self.persist(KEY_USE_PROXY, json!(self.settings.use_proxy))
            }
            OptionId::ProxyIp => match value.to_text().trim().parse::<IpAddr>() {
                Ok(ip) => {
                    self.settings.proxy.set_ip(ip);
                    self.persist(KEY_PROXY, json!(self.settings.proxy.to_string()))
                }
                Err(e) => {
                    log::debug!("Rejected proxy address {:?}: {}", value, e);
                    false
                }
            },
            OptionId::ProxyPort => match value.to_int() {
                Some(port) if port > 0 && port < i64::from(u16::MAX) => {
                    self.settings.proxy.set_port(port as u16);
                    self.persist(KEY_PROXY, json!(self.settings.proxy.to_string()))
                }
                _ => false,
            },
            OptionId::Fee => match value.to_int() {
                Some(fee) if fee >= 0 => {
                    self.settings.transaction_fee = Amount::from_sat(fee as u64);
                    self.persist(KEY_TRANSACTION_FEE, json!(fee))
                }
                _ => false,
            },
            OptionId::DisplayUnit => match value.to_int().and_then(Unit::from_index) {
                Some(unit) => {
                    self.settings.display_unit = unit;
                    self.persist(KEY_DISPLAY_UNIT, json!(unit.index()))
                }
                None => false,
            },
            OptionId::DisplayAddresses => {
                self.settings.display_addresses = value.to_bool();
                self.persist(KEY_DISPLAY_ADDRESSES, json!(self.settings.display_addresses))
            }
        };

        if !successful {
            self.settings = previous;
            return false;
        }
        if id == OptionId::DisplayUnit {
            self.notify(ClientNotification::DisplayUnitChanged(self.settings.display_unit));
        }
        self.notify(ClientNotification::OptionChanged(id));
        true
    }

    fn persist(&mut self, key: &str, value: Value) -> bool {
        match self.store.write_setting(key, value) {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to store setting {}: {}", key, e);
                false
            }
        }
    }

    fn notify(&self, notification: ClientNotification) {
        if let Err(e) = self.notifications.dispatch(notification) {
            log::error!("Failed to dispatch option change: {}", e);
        }
    }

    pub fn transaction_fee(&self) -> Amount {
        self.settings.transaction_fee
    }

    pub fn minimize_to_tray(&self) -> bool {
        self.settings.minimize_to_tray
    }

    pub fn minimize_on_close(&self) -> bool {
        self.settings.minimize_on_close
    }

    pub fn display_unit(&self) -> Unit {
        self.settings.display_unit
    }

    pub fn display_addresses(&self) -> bool {
        self.settings.display_addresses
    }

    /// SOCKS proxy to route through, when enabled
    pub fn proxy(&self) -> Option<SocketAddr> {
        self.settings.use_proxy.then_some(self.settings.proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrontendError;
    use crate::model::notification::ChannelHandler;
    use crate::wallet::MemorySettingsStore;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn model() -> (OptionsModel, mpsc::UnboundedReceiver<ClientNotification>) {
        let notifications = NotificationDispatcher::new();
        let (tx, rx) = mpsc::unbounded_channel();
        notifications.register_handler(Arc::new(ChannelHandler::new(tx))).unwrap();
        (
            OptionsModel::new(Box::new(MemorySettingsStore::new()), notifications),
            rx,
        )
    }

    #[test]
    fn defaults_match_a_fresh_install() {
        let (model, _rx) = model();
        assert_eq!(model.row_count(), 10);
        assert_eq!(model.data(OptionId::MinimizeToTray), OptionValue::Bool(true));
        assert_eq!(model.data(OptionId::MinimizeOnClose), OptionValue::Bool(true));
        assert_eq!(model.data(OptionId::ConnectSocks4), OptionValue::Bool(false));
        assert_eq!(model.data(OptionId::ProxyIp), OptionValue::Text("127.0.0.1".to_string()));
        assert_eq!(model.data(OptionId::ProxyPort), OptionValue::Int(9050));
        assert_eq!(model.data(OptionId::Fee), OptionValue::Int(0));
        assert_eq!(model.data(OptionId::DisplayUnit), OptionValue::Int(0));
        assert!(model.proxy().is_none());
    }

    #[test]
    fn proxy_fields_are_validated() {
        let (mut model, _rx) = model();

        assert!(!model.set_data(OptionId::ProxyIp, OptionValue::Text("not an ip".into())));
        assert!(model.set_data(OptionId::ProxyIp, OptionValue::Text("10.0.0.5".into())));
        assert!(!model.set_data(OptionId::ProxyPort, OptionValue::Text("0".into())));
        assert!(!model.set_data(OptionId::ProxyPort, OptionValue::Int(65535)));
        assert!(!model.set_data(OptionId::ProxyPort, OptionValue::Text("socks".into())));
        assert!(model.set_data(OptionId::ProxyPort, OptionValue::Text("1080".into())));
        assert!(model.set_data(OptionId::ConnectSocks4, OptionValue::Bool(true)));

        assert_eq!(model.proxy(), Some("10.0.0.5:1080".parse().unwrap()));
    }

    #[test]
    fn display_unit_change_is_announced() {
        let (mut model, mut rx) = model();

        assert!(model.set_data(OptionId::DisplayUnit, OptionValue::Int(2)));
        assert_eq!(model.display_unit(), Unit::MicroBtc);
        assert_eq!(rx.try_recv().unwrap(), ClientNotification::DisplayUnitChanged(Unit::MicroBtc));
        assert_eq!(rx.try_recv().unwrap(), ClientNotification::OptionChanged(OptionId::DisplayUnit));

        // Changing the unit leaves the address column alone.
        assert!(!model.display_addresses());

        assert!(!model.set_data(OptionId::DisplayUnit, OptionValue::Int(7)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn start_at_startup_is_unsupported() {
        let (mut model, mut rx) = model();
        assert!(!model.set_data(OptionId::StartAtStartup, OptionValue::Bool(true)));
        assert_eq!(model.data(OptionId::StartAtStartup), OptionValue::Bool(false));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn negative_fee_is_rejected() {
        let (mut model, _rx) = model();
        assert!(!model.set_data(OptionId::Fee, OptionValue::Int(-1)));
        assert!(model.set_data(OptionId::Fee, OptionValue::Int(10_000)));
        assert_eq!(model.transaction_fee(), Amount::from_sat(10_000));
    }

    struct ReadOnlyStore;

    impl SettingsStore for ReadOnlyStore {
        fn read_setting(&self, _key: &str) -> Option<Value> {
            None
        }

        fn write_setting(&mut self, key: &str, _value: Value) -> Result<(), FrontendError> {
            Err(FrontendError::SettingsError(format!("{} is read-only", key)))
        }
    }

    #[test]
    fn unstored_change_is_rolled_back() {
        let notifications = NotificationDispatcher::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        notifications.register_handler(Arc::new(ChannelHandler::new(tx))).unwrap();
        let mut model = OptionsModel::new(Box::new(ReadOnlyStore), notifications);

        assert!(!model.set_data(OptionId::Fee, OptionValue::Int(10_000)));
        assert_eq!(model.transaction_fee(), Amount::ZERO);

        assert!(!model.set_data(OptionId::DisplayUnit, OptionValue::Int(1)));
        assert_eq!(model.display_unit(), Unit::Btc);

        assert!(!model.set_data(OptionId::ProxyPort, OptionValue::Int(1080)));
        assert_eq!(model.data(OptionId::ProxyPort), OptionValue::Int(9050));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn settings_reload_from_store() {
        let mut store = MemorySettingsStore::new();
        store.write_setting(KEY_DISPLAY_UNIT, json!(1)).unwrap();
        store.write_setting(KEY_DISPLAY_ADDRESSES, json!(true)).unwrap();
        store.write_setting(KEY_MINIMIZE_TO_TRAY, json!(false)).unwrap();
        store.write_setting(KEY_PROXY, json!("192.168.1.2:9150")).unwrap();
        store.write_setting(KEY_TRANSACTION_FEE, json!(500)).unwrap();

        let model = OptionsModel::new(Box::new(store), NotificationDispatcher::new());
        assert_eq!(model.display_unit(), Unit::MilliBtc);
        assert!(model.display_addresses());
        assert!(!model.minimize_to_tray());
        assert_eq!(model.settings().proxy, "192.168.1.2:9150".parse().unwrap());
        assert_eq!(model.transaction_fee(), Amount::from_sat(500));
    }

    #[test]
    fn option_rows_map_back_to_ids() {
        assert_eq!(OptionId::from_row(0), Some(OptionId::StartAtStartup));
        assert_eq!(OptionId::from_row(9), Some(OptionId::DisplayAddresses));
        assert_eq!(OptionId::from_row(10), None);
    }
}
