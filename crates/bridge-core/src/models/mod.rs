pub mod config;
pub mod eip1193;
pub mod envelope;
pub mod notification;
pub mod page;
pub mod permission;

pub use config::{
    BridgeConfig, ChannelConfig, DaemonConfig, PROVIDER_BRIDGE_TARGET, WINDOW_PROVIDER_TARGET,
};
pub use eip1193::{Eip1193ErrorCode, Eip1193ErrorPayload, ProviderError};
pub use envelope::{
    Correlated, PortRequestEvent, PortResponseEvent, RequestParams, RpcRequest,
    WindowRequestEvent, WindowResponseData, WindowResponseEvent, JSONRPC_VERSION,
};
pub use notification::{
    InternalNotification, TallyAccountPayload, TallyConfigPayload, INTERNAL_COMMUNICATION_ID,
};
pub use page::AllowedPage;
pub use permission::{PermissionRequest, PermissionState};
