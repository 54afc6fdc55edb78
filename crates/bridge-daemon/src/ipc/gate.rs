//! Trust boundary on the background side of a port

use bridge_client::transport::{listener, Listener, PortTransport, Transport, TransportError};
use bridge_core::models::{InternalNotification, PortResponseEvent};
use bridge_core::validate;
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use crate::api::{RequestContext, RequestHandler};
use crate::event_manager::EventManager;

/// Validates raw port input before anything trusted sees it, and renders
/// whatever the handler returns as a port response.
pub struct PortGate {
    handler: Arc<dyn RequestHandler>,
}

impl PortGate {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { handler }
    }

    /// Handle one raw port message. `None` means the message was dropped.
    pub async fn process(&self, ctx: &RequestContext, raw: &Value) -> Option<PortResponseEvent> {
        let Some(event) = validate::parse_port_request(raw) else {
            tracing::debug!("Dropping invalid port message from {}", ctx.origin);
            return None;
        };

        tracing::debug!("{} -> {} ({})", ctx.origin, event.request.method, event.id);
        let result = match self.handler.handle(ctx, event.request).await {
            Ok(result) => result,
            Err(error) => error.to_value(),
        };

        Some(PortResponseEvent::new(event.id, result))
    }

    /// Serve requests arriving on `port` and push notifications from
    /// `events` to it until the returned [`Attachment`] is dropped.
    pub fn attach(
        self: &Arc<Self>,
        port: &Arc<PortTransport>,
        events: &EventManager,
    ) -> Attachment {
        let ctx = Arc::new(RequestContext::new(port.sender_origin()));
        let (shutdown, shutdown_rx) = watch::channel(());

        let gate = self.clone();
        let weak = Arc::downgrade(port);
        let on_message = listener(move |raw| {
            let gate = gate.clone();
            let ctx = ctx.clone();
            let port = weak.clone();
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(async move {
                tokio::select! {
                    response = gate.process(&ctx, &raw) => {
                        if let Some(response) = response {
                            respond(&port, response);
                        }
                    }
                    _ = shutdown.changed() => {}
                }
            });
        });
        port.add_event_listener(&on_message);

        let forwarder = forward_notifications(events.subscribe(), Arc::downgrade(port));
        tracing::info!("Port from {} attached", port.sender_origin());

        Attachment {
            port: port.clone(),
            listener: on_message,
            forwarder,
            _shutdown: shutdown,
        }
    }
}

fn respond(port: &Weak<PortTransport>, response: PortResponseEvent) {
    let Some(port) = port.upgrade() else {
        return;
    };

    let id = response.id.clone();
    let sent = serde_json::to_value(response)
        .map_err(TransportError::from)
        .and_then(|value| port.post_message(&value));
    if let Err(e) = sent {
        tracing::warn!("Failed to send response {}: {}", id, e);
    }
}

/// Push every notification to `port` until it goes away
pub fn forward_notifications(
    mut events: broadcast::Receiver<InternalNotification>,
    port: Weak<PortTransport>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let notification = match events.recv().await {
                Ok(notification) => notification,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Port lagged, {} notifications skipped", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            let Some(port) = port.upgrade() else { break };
            if let Err(e) = port.post_message(&notification.to_value()) {
                tracing::debug!("Notification forwarder stopping: {}", e);
                break;
            }
        }
    })
}

/// A port being served by a [`PortGate`]
pub struct Attachment {
    port: Arc<PortTransport>,
    listener: Listener,
    forwarder: JoinHandle<()>,
    // dropping the sender cancels requests still in flight
    _shutdown: watch::Sender<()>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.port.remove_event_listener(&self.listener);
        self.forwarder.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::models::{ProviderError, RpcRequest};
    use futures::future::BoxFuture;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Echoes the origin for `whoami`, rejects everything else
    struct Echo;

    impl RequestHandler for Echo {
        fn handle<'a>(
            &'a self,
            ctx: &'a RequestContext,
            request: RpcRequest,
        ) -> BoxFuture<'a, Result<Value, ProviderError>> {
            Box::pin(async move {
                match request.method.as_str() {
                    "whoami" => Ok(json!(ctx.origin)),
                    "never" => std::future::pending().await,
                    _ => Err(ProviderError::user_rejected()),
                }
            })
        }
    }

    fn collect(port: &PortTransport) -> (Listener, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let on_message = listener(move |raw| {
            let _ = tx.send(raw);
        });
        port.add_event_listener(&on_message);
        (on_message, rx)
    }

    #[tokio::test]
    async fn test_process_drops_invalid_input() {
        let gate = PortGate::new(Arc::new(Echo));
        let ctx = RequestContext::new("https://dapp.example");

        assert!(gate.process(&ctx, &json!("garbage")).await.is_none());
        assert!(gate
            .process(&ctx, &json!({"id": "1", "request": {"method": 5}}))
            .await
            .is_none());
        assert!(gate
            .process(&ctx, &json!({"request": {"method": "whoami"}}))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn test_process_renders_result_and_error() {
        let gate = PortGate::new(Arc::new(Echo));
        let ctx = RequestContext::new("https://dapp.example");

        let response = gate
            .process(&ctx, &json!({"id": "1", "request": {"method": "whoami"}}))
            .await
            .unwrap();
        assert_eq!(response, PortResponseEvent::new("1", json!("https://dapp.example")));

        let response = gate
            .process(&ctx, &json!({"id": "2", "request": {"method": "other", "params": {}}}))
            .await
            .unwrap();
        assert!(validate::is_eip1193_error(&response.result));
        assert_eq!(response.result["code"], 4001);
    }

    #[tokio::test]
    async fn test_attach_serves_port() {
        let events = EventManager::new();
        let gate = Arc::new(PortGate::new(Arc::new(Echo)));
        let (content, background) = PortTransport::pair("https://dapp.example", "wallet");
        let background = Arc::new(background);
        let (_collector, mut rx) = collect(&content);

        let attachment = gate.attach(&background, &events);

        content
            .post_message(&json!({"id": "1", "request": {"method": "whoami", "params": []}}))
            .unwrap();
        let reply = rx.recv().await.unwrap();
        assert!(validate::is_port_response(&reply));
        assert_eq!(reply["result"], "https://dapp.example");

        events.emit(InternalNotification::account_changed(vec!["0x1".to_string()]));
        let notification = rx.recv().await.unwrap();
        assert!(validate::is_tally_account_payload(&notification));

        drop(attachment);
        assert_eq!(background.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_detach_cancels_in_flight_requests() {
        let events = EventManager::new();
        let gate = Arc::new(PortGate::new(Arc::new(Echo)));
        let (content, background) = PortTransport::pair("https://dapp.example", "wallet");
        let background = Arc::new(background);
        let (_collector, mut rx) = collect(&content);

        let attachment = gate.attach(&background, &events);
        content
            .post_message(&json!({"id": "1", "request": {"method": "never"}}))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(attachment);

        let result = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err());
    }
}
