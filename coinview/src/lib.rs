pub mod app;
pub mod config;
pub mod error;
pub mod model;
pub mod rpc;
pub mod wallet;

pub use config::{build_command, Config};
pub use error::FrontendError;
