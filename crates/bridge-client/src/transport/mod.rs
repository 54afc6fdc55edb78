//! Transport abstraction shared by window and port channels

pub mod listeners;
pub mod port;
pub mod window;

pub use listeners::{listener, Listener, ListenerSet};
pub use port::PortTransport;
pub use window::{WindowBus, WindowTransport};

use bridge_core::models::{InternalNotification, RpcRequest};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// A validated inbound message, ready for correlation
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Response { id: String, result: Value },
    Notification(InternalNotification),
}

/// Send/subscribe/unsubscribe plus an origin tag.
///
/// Correlation code is written once against this trait and never branches on
/// the kind of channel underneath. Connection lifecycle, retries and
/// backpressure are not part of it.
pub trait Transport: Send + Sync + 'static {
    /// What `post_message` accepts
    type Outbound: Serialize + Send;

    /// Origin used to decide which inbound messages are trusted
    fn origin(&self) -> &str;

    /// Fire-and-forget send
    fn post_message(&self, data: &Self::Outbound) -> Result<()>;

    /// Registering the same listener twice delivers once.
    fn add_event_listener(&self, listener: &Listener);

    /// Removing an unknown listener is a no-op.
    fn remove_event_listener(&self, listener: &Listener);

    /// Wrap a call into this channel's request envelope
    fn wrap_request(&self, id: String, request: RpcRequest) -> Result<Self::Outbound>;

    /// Gate raw inbound data. Anything that fails validation is `None`.
    fn accept(&self, raw: &Value) -> Option<Inbound>;
}
