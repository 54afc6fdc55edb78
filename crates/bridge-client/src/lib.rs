//! Provider Bridge Client Library
//!
//! Page-side half of the provider bridge: the window and port transports, the
//! content-script relay between them, and a client that correlates requests
//! with their responses.

pub mod client;
pub mod relay;
pub mod transport;

pub use client::{ClientError, ProviderClient};
pub use relay::Relay;
pub use transport::{
    listener, Inbound, Listener, ListenerSet, PortTransport, Transport, TransportError,
    WindowBus, WindowTransport,
};
