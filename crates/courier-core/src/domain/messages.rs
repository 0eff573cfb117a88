//! Message variants of the reference protocol.
//!
//! Each payload struct maps 1:1 to a tag in [`MessageType`]; [`Message`] is the
//! closed sum over all of them. Field names follow the wire format
//! (`contentType` etc.), required fields stay required on decode.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use super::message_type::MessageType;
use crate::typed::codec::{CodecError, PayloadCodec};

/// Template variables (`map<string, any>`).
pub type Variables = serde_json::Map<String, serde_json::Value>;

/// `http.request`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestMessage {
    pub method: String,
    pub url: String,
    pub headers: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Variables>,
}

/// `http.response`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponseMessage {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// `render.template.request`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderTemplateRequestMessage {
    pub template: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Variables>,
}

/// `render.template.response`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderTemplateResponseMessage {
    pub render: String,
}

/// `error` - 失敗を人間向けの文字列で返す
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    HttpRequest(HttpRequestMessage),
    HttpResponse(HttpResponseMessage),
    RenderTemplateRequest(RenderTemplateRequestMessage),
    RenderTemplateResponse(RenderTemplateResponseMessage),
    Error(ErrorMessage),
}

impl Message {
    /// The tag this message is sent under.
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::HttpRequest(_) => MessageType::HttpRequest,
            Message::HttpResponse(_) => MessageType::HttpResponse,
            Message::RenderTemplateRequest(_) => MessageType::RenderTemplateRequest,
            Message::RenderTemplateResponse(_) => MessageType::RenderTemplateResponse,
            Message::Error(_) => MessageType::Error,
        }
    }

    pub fn encode_payload(&self) -> Result<Box<RawValue>, CodecError> {
        match self {
            Message::HttpRequest(m) => PayloadCodec::encode(m),
            Message::HttpResponse(m) => PayloadCodec::encode(m),
            Message::RenderTemplateRequest(m) => PayloadCodec::encode(m),
            Message::RenderTemplateResponse(m) => PayloadCodec::encode(m),
            Message::Error(m) => PayloadCodec::encode(m),
        }
    }
}
