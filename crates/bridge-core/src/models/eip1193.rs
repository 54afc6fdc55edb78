//! EIP-1193 provider error bindings

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;

/// Closed set of standardized provider error codes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Eip1193ErrorCode {
    /// 4001
    UserRejectedRequest,
    /// 4100
    Unauthorized,
    /// 4200
    UnsupportedMethod,
    /// 4900, no chain is reachable.
    Disconnected,
    /// 4901, other chains may still be reachable.
    ChainDisconnected,
}

impl Eip1193ErrorCode {
    pub const ALL: [Self; 5] = [
        Self::UserRejectedRequest,
        Self::Unauthorized,
        Self::UnsupportedMethod,
        Self::Disconnected,
        Self::ChainDisconnected,
    ];

    /// Returns the numeric code
    pub const fn code(&self) -> i64 {
        match *self {
            Self::UserRejectedRequest => 4001,
            Self::Unauthorized => 4100,
            Self::UnsupportedMethod => 4200,
            Self::Disconnected => 4900,
            Self::ChainDisconnected => 4901,
        }
    }

    /// Returns the canonical message for the code
    pub const fn message(&self) -> &'static str {
        match *self {
            Self::UserRejectedRequest => "The user rejected the request.",
            Self::Unauthorized => {
                "The requested method and/or account has not been authorized by the user."
            }
            Self::UnsupportedMethod => "The Provider does not support the requested method.",
            Self::Disconnected => "The Provider is disconnected from all chains.",
            Self::ChainDisconnected => "The Provider is not connected to the requested chain.",
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub fn from_number(code: f64) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() as f64 == code)
    }
}

impl Serialize for Eip1193ErrorCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.code())
    }
}

impl<'de> Deserialize<'de> for Eip1193ErrorCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // page scripts only have doubles, so 4001.0 is the same code as 4001
        let code = f64::deserialize(deserializer)?;
        Self::from_number(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown EIP-1193 error code {code}")))
    }
}

/// Plain `{code, message, data?}` payload, the only error shape sent across
/// the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Eip1193ErrorPayload {
    pub code: Eip1193ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A standardized provider failure
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
#[error("{} ({})", .message, .code.code())]
pub struct ProviderError {
    code: Eip1193ErrorCode,
    message: Cow<'static, str>,
    data: Option<Value>,
}

impl ProviderError {
    pub const fn new(code: Eip1193ErrorCode) -> Self {
        Self {
            code,
            message: Cow::Borrowed(code.message()),
            data: None,
        }
    }

    pub const fn user_rejected() -> Self {
        Self::new(Eip1193ErrorCode::UserRejectedRequest)
    }

    pub const fn unauthorized() -> Self {
        Self::new(Eip1193ErrorCode::Unauthorized)
    }

    pub const fn unsupported_method() -> Self {
        Self::new(Eip1193ErrorCode::UnsupportedMethod)
    }

    pub const fn disconnected() -> Self {
        Self::new(Eip1193ErrorCode::Disconnected)
    }

    pub const fn chain_disconnected() -> Self {
        Self::new(Eip1193ErrorCode::ChainDisconnected)
    }

    /// Attach diagnostic data
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> Eip1193ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Render into the wire payload
    pub fn to_payload(&self) -> Eip1193ErrorPayload {
        Eip1193ErrorPayload {
            code: self.code,
            message: self.message.to_string(),
            data: self.data.clone(),
        }
    }

    /// Render into a JSON value suitable for a response `result`
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_payload()).unwrap_or(Value::Null)
    }
}

impl From<Eip1193ErrorCode> for ProviderError {
    fn from(code: Eip1193ErrorCode) -> Self {
        Self::new(code)
    }
}

impl From<Eip1193ErrorPayload> for ProviderError {
    fn from(payload: Eip1193ErrorPayload) -> Self {
        Self {
            code: payload.code,
            message: Cow::Owned(payload.message),
            data: payload.data,
        }
    }
}

impl Serialize for ProviderError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_payload().serialize(serializer)
    }
}
