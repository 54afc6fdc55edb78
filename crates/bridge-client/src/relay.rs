//! Content-script relay between the page window and the extension port

use bridge_core::models::{ChannelConfig, PortRequestEvent};
use bridge_core::validate;
use serde_json::{json, Value};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::transport::{listener, Listener, PortTransport, Transport, TransportError, WindowBus};

/// Forwards validated page requests to the port and validated port replies
/// back to the page. Everything else is dropped on the floor.
pub struct Relay {
    port: Arc<PortTransport>,
    port_listener: Listener,
    window_task: JoinHandle<()>,
}

impl Relay {
    pub fn new(bus: WindowBus, port: Arc<PortTransport>, channel: &ChannelConfig) -> Self {
        let window_task = tokio::spawn(forward_window_to_port(
            bus.subscribe(),
            bus.origin().to_string(),
            channel.provider_bridge_target.clone(),
            Arc::downgrade(&port),
        ));

        let source = channel.provider_bridge_target.clone();
        let page_target = channel.window_provider_target.clone();
        let port_listener = listener(move |raw| {
            if let Some(data) = port_to_window(&raw, &page_target) {
                bus.post(&source, data);
            } else {
                tracing::debug!("Relay dropped invalid port message");
            }
        });
        port.add_event_listener(&port_listener);

        Self {
            port,
            port_listener,
            window_task,
        }
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        self.window_task.abort();
        self.port.remove_event_listener(&self.port_listener);
    }
}

async fn forward_window_to_port(
    mut rx: broadcast::Receiver<Value>,
    origin: String,
    bridge_target: String,
    port: Weak<PortTransport>,
) {
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Relay lagged, {} window messages skipped", skipped);
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let Some(request) = window_to_port(&event, &origin, &bridge_target) else {
            continue;
        };

        let Some(port) = port.upgrade() else { break };
        let forwarded = serde_json::to_value(&request)
            .map_err(TransportError::from)
            .and_then(|value| port.post_message(&value));
        if let Err(e) = forwarded {
            tracing::warn!("Relay failed to forward request {}: {}", request.id, e);
        }
    }
    tracing::debug!("Relay window task stopped");
}

/// Window event → port request, if it is a valid request meant for the bridge
fn window_to_port(event: &Value, origin: &str, bridge_target: &str) -> Option<PortRequestEvent> {
    if event.get("origin").and_then(Value::as_str) != Some(origin) {
        return None;
    }

    let request = validate::parse_window_request(event.get("data")?)?;
    if request.target != bridge_target {
        return None;
    }

    Some(request.into())
}

/// Port message → window message data addressed to the page
fn port_to_window(raw: &Value, page_target: &str) -> Option<Value> {
    if validate::is_internal_notification(raw) {
        if !(validate::is_tally_config_payload(raw) || validate::is_tally_account_payload(raw)) {
            return None;
        }
        let mut data = raw.clone();
        data.as_object_mut()?
            .insert("target".to_string(), Value::String(page_target.to_string()));
        return Some(data);
    }

    let response = validate::parse_port_response(raw)?;
    Some(json!({
        "id": response.id,
        "target": page_target,
        "result": response.result,
    }))
}
