//! Provider Bridge Daemon Library
//!
//! Background host of the bridge, exposed as a library for testing.

pub mod api;
pub mod config;
pub mod event_manager;
pub mod ipc;
pub mod permission;

pub use api::{ApiHandler, RequestContext, RequestHandler, OPERATOR_ORIGIN};
pub use config::ConfigManager;
pub use event_manager::EventManager;
pub use ipc::{IpcServer, PortGate};
pub use permission::PermissionManager;
