//! Unsolicited notifications pushed from the wallet runtime to the page

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Field that tags a message as internal communication
pub const INTERNAL_COMMUNICATION_FIELD: &str = "id";

/// Sentinel value of [`INTERNAL_COMMUNICATION_FIELD`]
pub const INTERNAL_COMMUNICATION_ID: &str = "tallyHo";

pub const TALLY_GET_CONFIG: &str = "tally_getConfig";
pub const TALLY_ACCOUNT_CHANGED: &str = "tally_accountChanged";

/// Config change payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TallyConfigPayload {
    pub default_wallet: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_reload: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Account change payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TallyAccountPayload {
    pub address: Vec<String>,
}

/// Internal notification envelope, discriminated by `method`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum InternalNotification {
    #[serde(rename = "tally_getConfig")]
    Config(TallyConfigPayload),
    #[serde(rename = "tally_accountChanged")]
    AccountChanged(TallyAccountPayload),
}

impl InternalNotification {
    pub fn config(default_wallet: bool, chain_id: Option<String>) -> Self {
        Self::Config(TallyConfigPayload {
            default_wallet,
            chain_id,
            should_reload: None,
            extra: Map::new(),
        })
    }

    pub fn account_changed(address: Vec<String>) -> Self {
        Self::AccountChanged(TallyAccountPayload { address })
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Config(_) => TALLY_GET_CONFIG,
            Self::AccountChanged(_) => TALLY_ACCOUNT_CHANGED,
        }
    }

    /// Render the flattened wire envelope, discriminator included.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(object) = value.as_object_mut() {
            object.insert(
                INTERNAL_COMMUNICATION_FIELD.to_string(),
                Value::String(INTERNAL_COMMUNICATION_ID.to_string()),
            );
        }
        value
    }

    /// Parse an untrusted value. The discriminator is checked before the
    /// payload is looked at.
    pub fn parse(value: &Value) -> Option<Self> {
        if crate::validate::is_tally_config_payload(value)
            || crate::validate::is_tally_account_payload(value)
        {
            let mut object = value.as_object()?.clone();
            object.remove(INTERNAL_COMMUNICATION_FIELD);
            serde_json::from_value(Value::Object(object)).ok()
        } else {
            None
        }
    }
}
