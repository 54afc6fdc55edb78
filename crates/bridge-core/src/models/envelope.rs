//! Wire envelopes carried across the page/extension boundary

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON-RPC version literal carried by port responses.
pub const JSONRPC_VERSION: &str = "2.0";

/// Argument list of a call. Both positional and named params are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestParams {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
}

impl Default for RequestParams {
    fn default() -> Self {
        Self::Positional(Vec::new())
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(params: Vec<Value>) -> Self {
        Self::Positional(params)
    }
}

impl From<Map<String, Value>> for RequestParams {
    fn from(params: Map<String, Value>) -> Self {
        Self::Named(params)
    }
}

/// One logical JSON-RPC shaped call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: RequestParams,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: impl Into<RequestParams>) -> Result<Self> {
        let request = Self {
            method: method.into(),
            params: params.into(),
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.method.is_empty() {
            return Err(Error::Validation("Method cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Anything that can be matched against an outstanding request.
///
/// Only the id participates in matching.
pub trait Correlated {
    fn id(&self) -> &str;

    fn matches(&self, request_id: &str) -> bool {
        self.id() == request_id
    }
}

/// Request posted from the page over a window channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowRequestEvent {
    pub id: String,
    pub target: String,
    pub request: RpcRequest,
}

/// Request sent over an extension port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortRequestEvent {
    pub id: String,
    pub request: RpcRequest,
}

/// Payload of a window response message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowResponseData {
    pub id: String,
    pub target: String,
    pub result: Value,
}

/// Response observed on a window channel, wrapped in a message event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WindowResponseEvent {
    pub origin: String,
    pub source: Value,
    pub data: WindowResponseData,
}

/// Response delivered over an extension port
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortResponseEvent {
    pub id: String,
    #[serde(default = "default_jsonrpc")]
    pub jsonrpc: String,
    pub result: Value,
}

fn default_jsonrpc() -> String {
    JSONRPC_VERSION.to_string()
}

impl PortResponseEvent {
    pub fn new(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            jsonrpc: JSONRPC_VERSION.to_string(),
            result,
        }
    }
}

impl From<WindowRequestEvent> for PortRequestEvent {
    fn from(event: WindowRequestEvent) -> Self {
        Self {
            id: event.id,
            request: event.request,
        }
    }
}

impl Correlated for WindowRequestEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Correlated for PortRequestEvent {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Correlated for WindowResponseEvent {
    fn id(&self) -> &str {
        &self.data.id
    }
}

impl Correlated for PortResponseEvent {
    fn id(&self) -> &str {
        &self.id
    }
}
