use bridge_client::transport::{listener, PortTransport, Transport, TransportError};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;

use super::connection::{split, ConnectionError};
use super::gate::PortGate;
use crate::api::OPERATOR_ORIGIN;
use crate::event_manager::EventManager;

/// Origin of the daemon's own end of every connection
pub const DAEMON_ORIGIN: &str = "bridged";

#[derive(Debug, thiserror::Error)]
pub enum IpcServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, IpcServerError>;

/// Serves every socket connection as a port.
///
/// A connection may open with `{"origin": "..."}` to say which page it
/// speaks for. Without it the connection gets [`OPERATOR_ORIGIN`].
pub struct IpcServer {
    socket_path: String,
    gate: Arc<PortGate>,
    event_manager: Arc<EventManager>,
}

impl IpcServer {
    pub fn new(
        socket_path: String,
        gate: Arc<PortGate>,
        event_manager: Arc<EventManager>,
    ) -> Self {
        Self {
            socket_path,
            gate,
            event_manager,
        }
    }

    pub fn socket_path(&self) -> &str {
        &self.socket_path
    }

    pub async fn start(self: Arc<Self>) -> Result<()> {
        let path = Path::new(&self.socket_path);
        if path.exists() {
            std::fs::remove_file(path)?;
        }

        let listener = UnixListener::bind(&self.socket_path)?;
        tracing::info!("IPC server listening on {}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let server = self.clone();
                    tokio::spawn(async move {
                        if let Err(e) = server.handle_connection(stream).await {
                            tracing::error!("Connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            }
        }
    }

    async fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let (mut reader, mut writer) = split(stream);

        let mut first = match reader.read_message().await {
            Ok(message) => Some(message),
            Err(ConnectionError::Closed) => return Ok(()),
            Err(ConnectionError::Json(e)) => {
                tracing::debug!("Skipping malformed line: {}", e);
                None
            }
            Err(e) => return Err(e.into()),
        };

        let origin = match first.as_ref().and_then(announced_origin) {
            Some(origin) => {
                first = None;
                origin
            }
            None => OPERATOR_ORIGIN.to_string(),
        };
        tracing::info!("New connection from {}", origin);

        let (host_end, socket_end) = PortTransport::pair(DAEMON_ORIGIN, origin.as_str());
        let host_end = Arc::new(host_end);
        let _attachment = self.gate.attach(&host_end, &self.event_manager);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Value>();
        let on_outgoing = listener(move |message| {
            let _ = out_tx.send(message);
        });
        socket_end.add_event_listener(&on_outgoing);

        if let Some(message) = first {
            socket_end.post_message(&message)?;
        }

        loop {
            tokio::select! {
                result = reader.read_message() => {
                    match result {
                        Ok(message) => socket_end.post_message(&message)?,
                        Err(ConnectionError::Json(e)) => {
                            tracing::debug!("Skipping malformed line: {}", e);
                        }
                        Err(ConnectionError::Closed) => {
                            tracing::debug!("Client {} disconnected", origin);
                            break;
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Some(message) = out_rx.recv() => {
                    if let Err(e) = writer.write_message(&message).await {
                        tracing::warn!("Failed to write to {}: {}", origin, e);
                        break;
                    }
                }
            }
        }

        socket_end.remove_event_listener(&on_outgoing);
        Ok(())
    }
}

/// `{"origin": "..."}` and nothing else. The operator origin cannot be
/// claimed this way.
fn announced_origin(message: &Value) -> Option<String> {
    let object = message.as_object()?;
    if object.len() != 1 {
        return None;
    }

    let origin = object.get("origin")?.as_str()?;
    if origin.trim().is_empty() || origin == OPERATOR_ORIGIN {
        return None;
    }
    Some(origin.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::create_handler;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_announced_origin() {
        assert_eq!(
            announced_origin(&json!({"origin": "https://dapp.example"})),
            Some("https://dapp.example".to_string())
        );
        assert_eq!(announced_origin(&json!({"origin": OPERATOR_ORIGIN})), None);
        assert_eq!(announced_origin(&json!({"origin": ""})), None);
        assert_eq!(
            announced_origin(&json!({"origin": "https://a", "id": "1"})),
            None
        );
        assert_eq!(
            announced_origin(&json!({"id": "1", "request": {"method": "eth_chainId"}})),
            None
        );
    }

    #[tokio::test]
    async fn test_server_creation() {
        let temp_dir = TempDir::new().unwrap();
        let socket_path = temp_dir
            .path()
            .join("test.sock")
            .to_str()
            .unwrap()
            .to_string();

        let gate = Arc::new(PortGate::new(Arc::new(create_handler(&temp_dir))));
        let server = IpcServer::new(socket_path.clone(), gate, Arc::new(EventManager::new()));
        assert_eq!(server.socket_path(), socket_path);
    }
}
