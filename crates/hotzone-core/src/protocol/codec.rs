//! JSON codec for the remote-control protocol.
//!
//! Wire format (one WebSocket text frame per message):
//! ```text
//! {"op": <u8>, "d": { ...camelCase fields... }}
//! ```
//!
//! Encoding builds the frame with [`serde_json::json!`] and cannot fail.
//! Decoding first validates the envelope (`op` present and numeric) and then
//! deserializes `d` into the typed message.  The codec performs no I/O and
//! holds no state.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::protocol::messages::{
    CommandMessage, HelloMessage, IdentifiedMessage, IdentifyMessage, InboundMessage, OpCode,
    RequestStatus,
};

/// Errors that can occur while decoding a received frame.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The text is not JSON, or a field has the wrong type.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// A required field is absent.
    #[error("frame is missing required field `{0}`")]
    MissingField(&'static str),

    /// The frame is well-formed but carries a different op code than expected.
    #[error("unexpected op code: expected {expected}, found {found}")]
    UnexpectedOpCode { expected: u8, found: u64 },
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Decodes the Hello frame the peer sends first on every connection.
///
/// Only the presence of `op` and `d.rpcVersion` is required; the op value
/// itself is not checked.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for invalid JSON or mistyped fields and
/// [`DecodeError::MissingField`] when `op`, `d` or `d.rpcVersion` is absent.
///
/// # Examples
///
/// ```rust
/// use hotzone_core::protocol::decode_hello;
///
/// let hello = decode_hello(r#"{"op":0,"d":{"obsWebSocketVersion":"5.1.0","rpcVersion":1}}"#).unwrap();
/// assert_eq!(hello.rpc_version, 1);
/// ```
pub fn decode_hello(text: &str) -> Result<HelloMessage, DecodeError> {
    let (_op, data) = parse_envelope(text)?;
    let data = require_data(data)?;
    if !data.contains_key("rpcVersion") {
        return Err(DecodeError::MissingField("d.rpcVersion"));
    }
    from_data(data)
}

/// Decodes the Identified frame that completes the handshake.
///
/// # Errors
///
/// Returns [`DecodeError::UnexpectedOpCode`] when `op` is not 2, and
/// [`DecodeError::MissingField`] when `d.negotiatedRpcVersion` is absent.
pub fn decode_identified(text: &str) -> Result<IdentifiedMessage, DecodeError> {
    let (op, data) = parse_envelope(text)?;
    let expected = OpCode::Identified.code();
    if op != u64::from(expected) {
        return Err(DecodeError::UnexpectedOpCode { expected, found: op });
    }
    let data = require_data(data)?;
    if !data.contains_key("negotiatedRpcVersion") {
        return Err(DecodeError::MissingField("d.negotiatedRpcVersion"));
    }
    from_data(data)
}

/// Classifies a frame received after the handshake.
///
/// # Errors
///
/// Returns [`DecodeError`] if the envelope is invalid or a RequestResponse /
/// Event frame lacks its identifying fields.
pub fn decode_inbound(text: &str) -> Result<InboundMessage, DecodeError> {
    let (op, data) = parse_envelope(text)?;

    match OpCode::try_from(op) {
        Ok(OpCode::RequestResponse) => {
            let response: ResponseData = from_data(require_data(data)?)?;
            Ok(InboundMessage::RequestResponse {
                request_type: response.request_type,
                request_id: response.request_id,
                status: response.request_status,
            })
        }
        Ok(OpCode::Event) => {
            let event: EventData = from_data(require_data(data)?)?;
            Ok(InboundMessage::Event {
                event_type: event.event_type,
            })
        }
        _ => Ok(InboundMessage::Other { op }),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    request_type: String,
    request_id: String,
    request_status: RequestStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventData {
    event_type: String,
}

/// Splits a frame into its op code and (optional) data object.
fn parse_envelope(text: &str) -> Result<(u64, Option<Value>), DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let Value::Object(mut envelope) = value else {
        return Err(DecodeError::Malformed("frame is not a JSON object".to_string()));
    };

    let op = envelope
        .get("op")
        .ok_or(DecodeError::MissingField("op"))?
        .as_u64()
        .ok_or_else(|| DecodeError::Malformed("`op` is not an unsigned integer".to_string()))?;

    Ok((op, envelope.remove("d")))
}

fn require_data(data: Option<Value>) -> Result<Map<String, Value>, DecodeError> {
    match data {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(DecodeError::Malformed("`d` is not a JSON object".to_string())),
        None => Err(DecodeError::MissingField("d")),
    }
}

fn from_data<T: DeserializeOwned>(data: Map<String, Value>) -> Result<T, DecodeError> {
    serde_json::from_value(Value::Object(data)).map_err(|e| DecodeError::Malformed(e.to_string()))
}

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Encodes the Identify reply.
///
/// ```rust
/// use hotzone_core::protocol::{encode_identify, IdentifyMessage};
///
/// let text = encode_identify(&IdentifyMessage { rpc_version: 1, event_subscriptions: 33 });
/// let value: serde_json::Value = serde_json::from_str(&text).unwrap();
/// assert_eq!(value, serde_json::json!({"op": 1, "d": {"rpcVersion": 1, "eventSubscriptions": 33}}));
/// ```
pub fn encode_identify(msg: &IdentifyMessage) -> String {
    json!({
        "op": OpCode::Identify.code(),
        "d": {
            "rpcVersion": msg.rpc_version,
            "eventSubscriptions": msg.event_subscriptions,
        },
    })
    .to_string()
}

/// Encodes a hotkey request.
pub fn encode_command(msg: &CommandMessage) -> String {
    json!({
        "op": OpCode::Request.code(),
        "d": {
            "requestType": msg.request_type,
            "requestId": msg.request_id.to_string(),
            "requestData": {
                "hotkeyName": msg.hotkey_name,
            },
        },
    })
    .to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
