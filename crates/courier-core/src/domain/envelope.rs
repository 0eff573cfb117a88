//! Envelope - wire 上の外側のレコード
//!
//! ```text
//! { "correlationId": string (optional), "type": string, "data": <opaque> }
//! ```
//!
//! The codec never looks inside `data`: it is kept as raw JSON text and handed
//! to the message registry as-is.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::errors::FramingError;
use super::message_type::MessageType;
use crate::typed::codec::CodecError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Absent on the wire means empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation_id: String,

    /// Not validated here; resolution against the registry happens later.
    #[serde(rename = "type")]
    pub message_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Box<RawValue>>,
}

impl Envelope {
    pub fn new(
        correlation_id: impl Into<String>,
        message_type: MessageType,
        data: Box<RawValue>,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            message_type: message_type.as_str().to_string(),
            data: Some(data),
        }
    }

    /// Raw payload text; a missing `data` reads as `null`.
    pub fn payload(&self) -> &str {
        self.data.as_deref().map(RawValue::get).unwrap_or("null")
    }
}

/// Parse one inbound frame.
pub fn decode_envelope(frame: &[u8]) -> Result<Envelope, FramingError> {
    // serde の derive は配列からも struct を組み立ててしまうので先に弾く
    let first = frame.iter().find(|b| !b.is_ascii_whitespace());
    if first != Some(&b'{') {
        return Err(FramingError::NotAnObject);
    }
    serde_json::from_slice(frame).map_err(FramingError::Malformed)
}

pub fn encode_envelope(envelope: &Envelope) -> Result<String, CodecError> {
    serde_json::to_string(envelope).map_err(CodecError::Encode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn decodes_full_envelope_and_keeps_payload_verbatim() {
        let frame = br#"{"correlationId":"abc","type":"render.template.request","data":{"template": "Hi",  "variables":{}}}"#;
        let env = decode_envelope(frame).unwrap();
        assert_eq!(env.correlation_id, "abc");
        assert_eq!(env.message_type, "render.template.request");
        assert_eq!(env.payload(), r#"{"template": "Hi",  "variables":{}}"#);
    }

    #[test]
    fn missing_correlation_id_is_empty() {
        let env = decode_envelope(br#"{"type":"error","data":{"message":"x"}}"#).unwrap();
        assert_eq!(env.correlation_id, "");
    }

    #[test]
    fn missing_data_reads_as_null() {
        let env = decode_envelope(br#"{"type":"error"}"#).unwrap();
        assert_eq!(env.payload(), "null");
    }

    #[rstest]
    #[case::not_json(&b"Invalid"[..])]
    #[case::missing_type(&br#"{"correlationId":"a","data":{}}"#[..])]
    #[case::type_not_string(&br#"{"type":42,"data":{}}"#[..])]
    #[case::array(&br#"["a","error",{}]"#[..])]
    #[case::empty(&b""[..])]
    fn malformed_frames_are_framing_errors(#[case] frame: &[u8]) {
        let err = decode_envelope(frame).unwrap_err();
        assert!(err.to_string().starts_with("invalid envelope"));
    }

    #[test]
    fn encode_omits_empty_correlation_id() {
        let data = RawValue::from_string(r#"{"message":"x"}"#.to_string()).unwrap();
        let env = Envelope::new("", MessageType::Error, data);
        let text = encode_envelope(&env).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!({ "type": "error", "data": { "message": "x" } }));
    }

    #[test]
    fn encode_keeps_correlation_id() {
        let data = RawValue::from_string(r#"{"render":"Hello Ada"}"#.to_string()).unwrap();
        let env = Envelope::new("abc", MessageType::RenderTemplateResponse, data);
        assert_eq!(
            encode_envelope(&env).unwrap(),
            r#"{"correlationId":"abc","type":"render.template.response","data":{"render":"Hello Ada"}}"#
        );
    }
}
