//! Extension-port transport

use bridge_core::models::{InternalNotification, PortRequestEvent, RpcRequest};
use bridge_core::validate;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::listeners::{spawn_mpsc_dispatch, Listener, ListenerSet};
use super::{Inbound, Result, Transport, TransportError};

/// One end of a connected port.
///
/// Port messages are untyped, so `post_message` takes any JSON value.
pub struct PortTransport {
    origin: String,
    sender_origin: String,
    tx: mpsc::UnboundedSender<Value>,
    listeners: Arc<ListenerSet>,
    dispatcher: JoinHandle<()>,
}

impl PortTransport {
    /// Connect two ends. The first end belongs to `origin_a`, the second to
    /// `origin_b`; each end reports the other's origin as its sender.
    pub fn pair(origin_a: impl Into<String>, origin_b: impl Into<String>) -> (Self, Self) {
        let origin_a = origin_a.into();
        let origin_b = origin_b.into();

        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        let a = Self::end(origin_a.clone(), origin_b.clone(), a_tx, a_rx);
        let b = Self::end(origin_b, origin_a, b_tx, b_rx);
        (a, b)
    }

    fn end(
        origin: String,
        sender_origin: String,
        tx: mpsc::UnboundedSender<Value>,
        rx: mpsc::UnboundedReceiver<Value>,
    ) -> Self {
        let listeners = Arc::new(ListenerSet::new());
        let dispatcher = spawn_mpsc_dispatch(rx, listeners.clone());
        Self {
            origin,
            sender_origin,
            tx,
            listeners,
            dispatcher,
        }
    }

    /// Origin of the script on the other end
    pub fn sender_origin(&self) -> &str {
        &self.sender_origin
    }

    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Resolves once the other end is gone
    pub async fn disconnected(&self) {
        self.tx.closed().await
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Transport for PortTransport {
    type Outbound = Value;

    fn origin(&self) -> &str {
        &self.origin
    }

    fn post_message(&self, data: &Value) -> Result<()> {
        self.tx
            .send(data.clone())
            .map_err(|_| TransportError::Closed)
    }

    fn add_event_listener(&self, listener: &Listener) {
        self.listeners.add(listener);
    }

    fn remove_event_listener(&self, listener: &Listener) {
        self.listeners.remove(listener);
    }

    fn wrap_request(&self, id: String, request: RpcRequest) -> Result<Value> {
        Ok(serde_json::to_value(PortRequestEvent { id, request })?)
    }

    fn accept(&self, raw: &Value) -> Option<Inbound> {
        if validate::is_internal_notification(raw) {
            return InternalNotification::parse(raw).map(Inbound::Notification);
        }

        validate::parse_port_response(raw).map(|event| Inbound::Response {
            id: event.id,
            result: event.result,
        })
    }
}

impl Drop for PortTransport {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
