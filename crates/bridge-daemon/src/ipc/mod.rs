//! Port ingress and the Unix-socket port server

pub mod connection;
pub mod gate;
pub mod server;

pub use connection::{split, ConnectionError, MessageReader, MessageWriter};
pub use gate::{Attachment, PortGate};
pub use server::{IpcServer, IpcServerError};
