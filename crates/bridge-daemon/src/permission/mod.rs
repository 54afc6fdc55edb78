pub mod manager;

pub use manager::{PermissionManager, PermissionManagerError};
