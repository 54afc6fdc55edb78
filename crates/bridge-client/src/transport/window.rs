//! Window-channel transport

use bridge_core::models::{Correlated, InternalNotification, RpcRequest, WindowRequestEvent};
use bridge_core::validate;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::listeners::{spawn_broadcast_dispatch, Listener, ListenerSet};
use super::{Inbound, Result, Transport};

const WINDOW_CAPACITY: usize = 256;

/// The window shared by every script running on a page.
///
/// Posting wraps data in a message event `{origin, source, data}` and delivers
/// it to everyone subscribed, the poster included.
#[derive(Clone)]
pub struct WindowBus {
    origin: String,
    tx: broadcast::Sender<Value>,
}

impl WindowBus {
    pub fn new(origin: impl Into<String>) -> Self {
        let (tx, _) = broadcast::channel(WINDOW_CAPACITY);
        Self {
            origin: origin.into(),
            tx,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Post `data` as a message event sent by `source`
    pub fn post(&self, source: &str, data: Value) {
        self.dispatch_event(json!({
            "origin": self.origin,
            "source": source,
            "data": data,
        }));
    }

    /// Deliver a raw message event as-is. Other frames and hostile scripts
    /// can put anything here.
    pub fn dispatch_event(&self, event: Value) {
        // no subscribers is fine, postMessage does not care
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.tx.subscribe()
    }
}

/// Page-side end of a window channel
pub struct WindowTransport {
    bus: WindowBus,
    source: String,
    target: String,
    peer_target: String,
    listeners: Arc<ListenerSet>,
    dispatcher: JoinHandle<()>,
}

impl WindowTransport {
    /// `target` marks messages meant for this end, `peer_target` the ones
    /// this end sends.
    pub fn new(bus: WindowBus, target: impl Into<String>, peer_target: impl Into<String>) -> Self {
        let target = target.into();
        let listeners = Arc::new(ListenerSet::new());
        let dispatcher = spawn_broadcast_dispatch(bus.subscribe(), listeners.clone());

        Self {
            bus,
            source: target.clone(),
            target,
            peer_target: peer_target.into(),
            listeners,
            dispatcher,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Transport for WindowTransport {
    type Outbound = WindowRequestEvent;

    fn origin(&self) -> &str {
        self.bus.origin()
    }

    fn post_message(&self, data: &WindowRequestEvent) -> Result<()> {
        self.bus.post(&self.source, serde_json::to_value(data)?);
        Ok(())
    }

    fn add_event_listener(&self, listener: &Listener) {
        self.listeners.add(listener);
    }

    fn remove_event_listener(&self, listener: &Listener) {
        self.listeners.remove(listener);
    }

    fn wrap_request(&self, id: String, request: RpcRequest) -> Result<WindowRequestEvent> {
        Ok(WindowRequestEvent {
            id,
            target: self.peer_target.clone(),
            request,
        })
    }

    fn accept(&self, raw: &Value) -> Option<Inbound> {
        if raw.get("origin").and_then(Value::as_str) != Some(self.origin()) {
            return None;
        }

        let data = raw.get("data")?;
        if data.get("target").and_then(Value::as_str) != Some(self.target.as_str()) {
            return None;
        }

        if validate::is_internal_notification(data) {
            // routing marker, not part of the payload
            let mut payload = data.clone();
            if let Some(object) = payload.as_object_mut() {
                object.remove("target");
            }
            return InternalNotification::parse(&payload).map(Inbound::Notification);
        }

        validate::parse_window_response(raw).map(|event| Inbound::Response {
            id: event.id().to_string(),
            result: event.data.result,
        })
    }
}

impl Drop for WindowTransport {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
