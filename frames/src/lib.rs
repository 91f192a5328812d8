//! Wire model and codecs for the viewer command channel.
//!
//! This crate owns the representation shared by the viewer and whatever
//! application drives it. A command is a flat mapping with a required
//! `action` key; payload values stay as `serde_json::Value` until the viewer
//! converts them into typed commands. Two encodings are provided:
//! newline-delimited JSON for scripts and humans, and length-delimited
//! protobuf for compact binary transport.

use prost::Message;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flat key-value payload of a command.
pub type Data = Map<String, Value>;

/// Key holding the command name in every inbound message.
pub const ACTION_KEY: &str = "action";

/// Longest possible varint length prefix.
pub const MAX_DELIMITER_LEN: usize = 10;

/// Error returned by the codecs in this crate.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The raw bytes could not be decoded as a protobuf message.
    #[error("failed to decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),
    /// A length prefix could not be written.
    #[error("failed to encode protobuf message: {0}")]
    Encode(#[from] prost::EncodeError),
    /// The text could not be parsed as JSON.
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),
    /// The message decoded, but it is not a key-value mapping.
    #[error("command message is not a mapping")]
    NotAMapping,
    /// The mapping has no string `action` key.
    #[error("command message has no string `action` key")]
    MissingAction,
    /// The `kind` integer on the wire does not map to a [`Response`] variant.
    #[error("invalid response kind: {0}")]
    InvalidKind(i32),
}

/// Grepable error code and fatality flag for errors reported on the channel.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Whether the viewer must shut down after reporting this error.
    fn is_fatal(&self) -> bool {
        true
    }
}

impl ErrorCode for CodecError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_FRAME_ENCODE",
            Self::Json(_) => "E_JSON",
            Self::NotAMapping => "E_NOT_A_MAPPING",
            Self::MissingAction => "E_MISSING_ACTION",
            Self::InvalidKind(_) => "E_INVALID_KIND",
        }
    }
}

// =============================================================================
// FRAME
// =============================================================================

/// A single command message on the inbound channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Command name, e.g. `"drawRectangle"`.
    pub action: String,
    /// Every other key of the message.
    pub data: Data,
}

impl Frame {
    /// Create a frame with the given action and payload.
    pub fn new(action: impl Into<String>, data: Data) -> Self {
        Self { action: action.into(), data }
    }

    /// Create a frame with no payload, e.g. `Frame::bare("redraw")`.
    pub fn bare(action: impl Into<String>) -> Self {
        Self::new(action, Data::new())
    }

    /// Split a JSON mapping into its `action` and remaining payload.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NotAMapping`] for non-object values and
    /// [`CodecError::MissingAction`] when `action` is absent or not a string.
    pub fn from_value(value: Value) -> Result<Self, CodecError> {
        let Value::Object(mut data) = value else {
            return Err(CodecError::NotAMapping);
        };
        match data.remove(ACTION_KEY) {
            Some(Value::String(action)) => Ok(Self { action, data }),
            _ => Err(CodecError::MissingAction),
        }
    }

    /// The full message as a JSON mapping, `action` included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.data.clone();
        map.insert(ACTION_KEY.to_owned(), Value::String(self.action.clone()));
        Value::Object(map)
    }

    /// Look up a payload key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

/// A message on the outbound channel.
///
/// In JSON a DPI reply is the pair `[horizontal, vertical]` and a fatal
/// error is a plain string.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    /// Reply to a `dpi` query.
    Dpi(f64, f64),
    /// Fatal error notification sent right before the viewer shuts down.
    Error(String),
}

impl Response {
    /// Build the fatal error notification for `err`.
    pub fn fatal(err: &dyn ErrorCode) -> Self {
        Self::Error(format!("**ERROR {}: {err}", err.error_code()))
    }
}

// =============================================================================
// JSON CODEC
// =============================================================================

/// Decode one line of newline-delimited JSON into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Json`] for malformed text, otherwise the errors of
/// [`Frame::from_value`].
pub fn decode_json_line(line: &str) -> Result<Frame, CodecError> {
    let value: Value = serde_json::from_str(line)?;
    Frame::from_value(value)
}

/// Encode a response as one line of JSON (without the trailing newline).
///
/// # Errors
///
/// Returns [`CodecError::Json`] if a DPI component is not a finite number.
pub fn encode_json_response(response: &Response) -> Result<String, CodecError> {
    Ok(serde_json::to_string(response)?)
}

// =============================================================================
// PROTOBUF CODEC
// =============================================================================

/// Encode a frame into protobuf bytes (without length prefix).
#[must_use]
pub fn encode_frame(frame: &Frame) -> Vec<u8> {
    let wire = WireFrame {
        action: frame.action.clone(),
        data: Some(json_to_proto_struct(&frame.data)),
    };
    wire.encode_to_vec()
}

/// Decode protobuf bytes (without length prefix) into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::MissingAction`] for an empty action name.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let wire = WireFrame::decode(bytes)?;
    if wire.action.is_empty() {
        return Err(CodecError::MissingAction);
    }
    let data = wire
        .data
        .map_or_else(Data::new, |s| proto_struct_to_json(&s));
    Ok(Frame { action: wire.action, data })
}

/// Encode a response into protobuf bytes (without length prefix).
#[must_use]
pub fn encode_response(response: &Response) -> Vec<u8> {
    let wire = match response {
        Response::Dpi(horizontal, vertical) => WireResponse {
            kind: WireResponseKind::Dpi as i32,
            horizontal: *horizontal,
            vertical: *vertical,
            message: String::new(),
        },
        Response::Error(message) => WireResponse {
            kind: WireResponseKind::Error as i32,
            horizontal: 0.0,
            vertical: 0.0,
            message: message.clone(),
        },
    };
    wire.encode_to_vec()
}

/// Decode protobuf bytes (without length prefix) into a response.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed bytes and
/// [`CodecError::InvalidKind`] for an out-of-range kind.
pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    let wire = WireResponse::decode(bytes)?;
    match WireResponseKind::try_from(wire.kind) {
        Ok(WireResponseKind::Dpi) => Ok(Response::Dpi(wire.horizontal, wire.vertical)),
        Ok(WireResponseKind::Error) => Ok(Response::Error(wire.message)),
        Err(_) => Err(CodecError::InvalidKind(wire.kind)),
    }
}

/// Prefix a message body with its varint length.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] when the prefix cannot be written.
pub fn delimit(body: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(body.len() + MAX_DELIMITER_LEN);
    prost::encode_length_delimiter(body.len(), &mut out)?;
    out.extend_from_slice(body);
    Ok(out)
}

/// Decode a complete varint length prefix.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] when `prefix` is not a valid varint.
pub fn read_delimiter(prefix: &[u8]) -> Result<usize, CodecError> {
    Ok(prost::decode_length_delimiter(prefix)?)
}

fn json_to_proto_struct(data: &Data) -> prost_types::Struct {
    prost_types::Struct {
        fields: data
            .iter()
            .map(|(k, v)| (k.clone(), json_to_proto_value(v)))
            .collect(),
    }
}

fn proto_struct_to_json(data: &prost_types::Struct) -> Data {
    data.fields
        .iter()
        .map(|(k, v)| (k.clone(), proto_to_json_value(v)))
        .collect()
}

fn json_to_proto_value(value: &Value) -> prost_types::Value {
    let kind = match value {
        Value::Null => {
            prost_types::value::Kind::NullValue(prost_types::NullValue::NullValue as i32)
        }
        Value::Bool(v) => prost_types::value::Kind::BoolValue(*v),
        Value::Number(v) => prost_types::value::Kind::NumberValue(v.as_f64().unwrap_or(0.0)),
        Value::String(v) => prost_types::value::Kind::StringValue(v.clone()),
        Value::Array(v) => prost_types::value::Kind::ListValue(prost_types::ListValue {
            values: v.iter().map(json_to_proto_value).collect(),
        }),
        Value::Object(v) => prost_types::value::Kind::StructValue(json_to_proto_struct(v)),
    };

    prost_types::Value { kind: Some(kind) }
}

fn proto_to_json_value(value: &prost_types::Value) -> Value {
    let Some(kind) = &value.kind else {
        return Value::Null;
    };

    match kind {
        prost_types::value::Kind::NullValue(_) => Value::Null,
        prost_types::value::Kind::NumberValue(v) => {
            serde_json::Number::from_f64(*v).map_or(Value::Null, Value::Number)
        }
        prost_types::value::Kind::StringValue(v) => Value::String(v.clone()),
        prost_types::value::Kind::BoolValue(v) => Value::Bool(*v),
        prost_types::value::Kind::StructValue(v) => Value::Object(proto_struct_to_json(v)),
        prost_types::value::Kind::ListValue(v) => {
            Value::Array(v.values.iter().map(proto_to_json_value).collect())
        }
    }
}

#[derive(Clone, PartialEq, Message)]
struct WireFrame {
    #[prost(string, tag = "1")]
    action: String,
    #[prost(message, optional, tag = "2")]
    data: Option<prost_types::Struct>,
}

#[derive(Clone, PartialEq, Message)]
struct WireResponse {
    #[prost(enumeration = "WireResponseKind", tag = "1")]
    kind: i32,
    #[prost(double, tag = "2")]
    horizontal: f64,
    #[prost(double, tag = "3")]
    vertical: f64,
    #[prost(string, tag = "4")]
    message: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireResponseKind {
    Dpi = 0,
    Error = 1,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
