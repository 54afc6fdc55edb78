//! Page-side provider client
//!
//! Allocates request ids, posts requests through a [`Transport`] and matches
//! validated responses back to the call that is waiting for them.

use bridge_core::models::{InternalNotification, ProviderError, RequestParams, RpcRequest};
use bridge_core::validate;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{broadcast, oneshot};
use uuid::Uuid;

use crate::transport::{listener, Inbound, Listener, Transport, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid request: {0}")]
    InvalidRequest(#[from] bridge_core::Error),

    #[error("No response received")]
    NoResponse,
}

pub type Result<T> = std::result::Result<T, ClientError>;

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Value>>>>;

fn lock(pending: &PendingMap) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<Value>>> {
    pending
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Removes the pending entry when the waiting call finishes or is dropped
struct PendingGuard {
    pending: PendingMap,
    id: String,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

pub struct ProviderClient<T: Transport> {
    transport: Arc<T>,
    pending: PendingMap,
    notifications: broadcast::Sender<InternalNotification>,
    listener: Listener,
}

impl<T: Transport> ProviderClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let (notifications, _) = broadcast::channel(100);

        // weak, the transport owns the listener
        let weak: Weak<T> = Arc::downgrade(&transport);
        let pending_clone = pending.clone();
        let notif_tx = notifications.clone();
        let on_message = listener(move |raw| {
            let Some(transport) = weak.upgrade() else {
                return;
            };

            match transport.accept(&raw) {
                Some(Inbound::Response { id, result }) => {
                    let waiting = lock(&pending_clone).remove(&id);
                    match waiting {
                        Some(tx) => {
                            let _ = tx.send(result);
                        }
                        None => tracing::debug!("Dropping response for unknown request {}", id),
                    }
                }
                Some(Inbound::Notification(notification)) => {
                    tracing::debug!("Received {} notification", notification.method());
                    let _ = notif_tx.send(notification);
                }
                None => tracing::trace!("Ignoring message that is not for this client"),
            }
        });
        transport.add_event_listener(&on_message);

        Self {
            transport,
            pending,
            notifications,
            listener: on_message,
        }
    }

    /// Send a request and wait for the matching response.
    ///
    /// A result that is an EIP-1193 error payload comes back as
    /// [`ClientError::Provider`]. There is no timeout here; wrap the call in
    /// `tokio::time::timeout` where one is needed.
    pub async fn request(&self, request: RpcRequest) -> Result<Value> {
        request.validate()?;

        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), tx);
        let _guard = PendingGuard {
            pending: self.pending.clone(),
            id: id.clone(),
        };

        let envelope = self.transport.wrap_request(id.clone(), request)?;
        self.transport.post_message(&envelope)?;
        tracing::debug!("Posted request {}", id);

        let result = rx.await.map_err(|_| ClientError::NoResponse)?;

        if let Some(payload) = validate::parse_eip1193_error(&result) {
            return Err(ProviderError::from(payload).into());
        }

        Ok(result)
    }

    /// Convenience wrapper around [`ProviderClient::request`]
    pub async fn call(
        &self,
        method: impl Into<String>,
        params: impl Into<RequestParams>,
    ) -> Result<Value> {
        self.request(RpcRequest::new(method, params)?).await
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<InternalNotification> {
        self.notifications.subscribe()
    }

    /// Number of calls still waiting for a response
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }
}

impl<T: Transport> Drop for ProviderClient<T> {
    fn drop(&mut self) {
        self.transport.remove_event_listener(&self.listener);
    }
}
