//! Listener registry shared by the transports

use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Callback receiving raw, unvalidated inbound data
pub type Listener = Arc<dyn Fn(Value) + Send + Sync>;

/// Wrap a closure as a [`Listener`]
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Set of listeners keyed by identity.
///
/// Adding an already registered listener or removing an unknown one leaves
/// the set unchanged, so a listener is never delivered the same message twice.
#[derive(Default)]
pub struct ListenerSet {
    listeners: RwLock<Vec<Listener>>,
}

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the listener was not registered yet
    pub fn add(&self, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if listeners.iter().any(|l| same_listener(l, listener)) {
            return false;
        }
        listeners.push(listener.clone());
        true
    }

    /// Returns true if the listener was registered
    pub fn remove(&self, listener: &Listener) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let before = listeners.len();
        listeners.retain(|l| !same_listener(l, listener));
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `value` to every registered listener
    pub fn dispatch(&self, value: Value) {
        // snapshot so listeners may (un)register while being called
        let snapshot: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        for listener in snapshot {
            listener(value.clone());
        }
    }
}

/// Drive `listeners` from a broadcast receiver until the sender goes away
pub(crate) fn spawn_broadcast_dispatch(
    mut rx: broadcast::Receiver<Value>,
    listeners: Arc<ListenerSet>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(value) => listeners.dispatch(value),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Listener dispatch lagged, {} messages skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        tracing::debug!("Broadcast dispatcher stopped");
    })
}

/// Drive `listeners` from an mpsc receiver until the sender goes away
pub(crate) fn spawn_mpsc_dispatch(
    mut rx: mpsc::UnboundedReceiver<Value>,
    listeners: Arc<ListenerSet>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(value) = rx.recv().await {
            listeners.dispatch(value);
        }
        tracing::debug!("Port dispatcher stopped");
    })
}
