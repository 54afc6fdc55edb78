//! Runtime validators for values arriving from untrusted sources.
//!
//! Every predicate is total: it takes any JSON value and answers `true` only
//! when every field needed to treat the value as the typed envelope is there
//! with the right shape. Nothing in here panics or coerces.
//!
//! Envelopes are described once as field schemas and checked by a single
//! structural walker. The `parse_*` helpers run the predicate before
//! deserializing, so typed values only ever come from validated input.

use serde_json::Value;

use crate::models::notification::{
    INTERNAL_COMMUNICATION_FIELD, INTERNAL_COMMUNICATION_ID, TALLY_ACCOUNT_CHANGED,
    TALLY_GET_CONFIG,
};
use crate::models::{
    Eip1193ErrorCode, Eip1193ErrorPayload, PortRequestEvent, PortResponseEvent,
    WindowRequestEvent, WindowResponseEvent, JSONRPC_VERSION,
};

#[derive(Debug, Clone, Copy)]
enum Shape {
    /// Key exists, any value (including `null`)
    Present,
    String,
    NonEmptyString,
    Bool,
    Literal(&'static str),
    StringArray,
    /// Object or array
    Params,
    ErrorCode,
    Object(&'static [Field]),
}

#[derive(Debug, Clone, Copy)]
struct Field {
    name: &'static str,
    shape: Shape,
    required: bool,
}

const fn required(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        shape,
        required: true,
    }
}

const fn optional(name: &'static str, shape: Shape) -> Field {
    Field {
        name,
        shape,
        required: false,
    }
}

const RPC_REQUEST: &[Field] = &[
    required("method", Shape::NonEmptyString),
    optional("params", Shape::Params),
];

const WINDOW_REQUEST: &[Field] = &[
    required("id", Shape::String),
    required("target", Shape::String),
    required("request", Shape::Object(RPC_REQUEST)),
];

const PORT_REQUEST: &[Field] = &[
    required("id", Shape::String),
    required("request", Shape::Object(RPC_REQUEST)),
];

const WINDOW_RESPONSE_DATA: &[Field] = &[
    required("id", Shape::String),
    required("target", Shape::String),
    required("result", Shape::Present),
];

const WINDOW_RESPONSE: &[Field] = &[
    required("origin", Shape::String),
    required("source", Shape::Present),
    required("data", Shape::Object(WINDOW_RESPONSE_DATA)),
];

const PORT_RESPONSE: &[Field] = &[
    required("id", Shape::String),
    required("result", Shape::Present),
];

const EIP1193_ERROR: &[Field] = &[
    required("code", Shape::ErrorCode),
    required("message", Shape::String),
];

const INTERNAL_COMMUNICATION: &[Field] = &[required(
    INTERNAL_COMMUNICATION_FIELD,
    Shape::Literal(INTERNAL_COMMUNICATION_ID),
)];

const TALLY_CONFIG: &[Field] = &[
    required("method", Shape::Literal(TALLY_GET_CONFIG)),
    required("defaultWallet", Shape::Bool),
    optional("chainId", Shape::String),
    optional("shouldReload", Shape::Bool),
];

const TALLY_ACCOUNT: &[Field] = &[
    required("method", Shape::Literal(TALLY_ACCOUNT_CHANGED)),
    required("address", Shape::StringArray),
];

fn conforms(value: &Value, schema: &[Field]) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    schema.iter().all(|field| match object.get(field.name) {
        Some(value) => matches_shape(value, field.shape),
        None => !field.required,
    })
}

fn matches_shape(value: &Value, shape: Shape) -> bool {
    match shape {
        Shape::Present => true,
        Shape::String => value.is_string(),
        Shape::NonEmptyString => value.as_str().is_some_and(|s| !s.is_empty()),
        Shape::Bool => value.is_boolean(),
        Shape::Literal(expected) => value.as_str() == Some(expected),
        Shape::StringArray => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        Shape::Params => value.is_object() || value.is_array(),
        Shape::ErrorCode => is_eip1193_error_code(value),
        Shape::Object(schema) => conforms(value, schema),
    }
}

/// True iff `value` is a number equal to one of the standardized codes.
pub fn is_eip1193_error_code(value: &Value) -> bool {
    value
        .as_f64()
        .and_then(Eip1193ErrorCode::from_number)
        .is_some()
}

/// True iff `value` is an object with a standardized `code` and a string `message`.
pub fn is_eip1193_error(value: &Value) -> bool {
    conforms(value, EIP1193_ERROR)
}

/// Message event carrying a response on a window channel
pub fn is_window_response(value: &Value) -> bool {
    conforms(value, WINDOW_RESPONSE)
}

pub fn is_port_response(value: &Value) -> bool {
    conforms(value, PORT_RESPONSE)
}

/// Params may be named (object) or positional (array), nothing else.
pub fn is_request_params(value: &Value) -> bool {
    matches_shape(value, Shape::Params)
}

pub fn is_rpc_request(value: &Value) -> bool {
    conforms(value, RPC_REQUEST)
}

pub fn is_window_request(value: &Value) -> bool {
    conforms(value, WINDOW_REQUEST)
}

pub fn is_port_request(value: &Value) -> bool {
    conforms(value, PORT_REQUEST)
}

pub fn is_internal_notification(value: &Value) -> bool {
    conforms(value, INTERNAL_COMMUNICATION)
}

pub fn is_tally_config_payload(value: &Value) -> bool {
    is_internal_notification(value) && conforms(value, TALLY_CONFIG)
}

pub fn is_tally_account_payload(value: &Value) -> bool {
    is_internal_notification(value) && conforms(value, TALLY_ACCOUNT)
}

pub fn parse_window_response(value: &Value) -> Option<WindowResponseEvent> {
    if !is_window_response(value) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

/// `jsonrpc` is not part of the check, the parsed event always carries "2.0".
pub fn parse_port_response(value: &Value) -> Option<PortResponseEvent> {
    if !is_port_response(value) {
        return None;
    }
    Some(PortResponseEvent {
        id: value.get("id")?.as_str()?.to_string(),
        jsonrpc: JSONRPC_VERSION.to_string(),
        result: value.get("result")?.clone(),
    })
}

pub fn parse_window_request(value: &Value) -> Option<WindowRequestEvent> {
    if !is_window_request(value) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

pub fn parse_port_request(value: &Value) -> Option<PortRequestEvent> {
    if !is_port_request(value) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}

pub fn parse_eip1193_error(value: &Value) -> Option<Eip1193ErrorPayload> {
    if !is_eip1193_error(value) {
        return None;
    }
    serde_json::from_value(value.clone()).ok()
}
