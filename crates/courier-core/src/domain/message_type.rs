//! MessageType - envelope の `type` タグ
//!
//! The set of tags is closed: every tag the protocol understands is a variant
//! here, and anything else is rejected at the protocol boundary with
//! [`ProtocolError::UnknownType`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "http.request")]
    HttpRequest,
    #[serde(rename = "http.response")]
    HttpResponse,
    #[serde(rename = "render.template.request")]
    RenderTemplateRequest,
    #[serde(rename = "render.template.response")]
    RenderTemplateResponse,
    #[serde(rename = "error")]
    Error,
}

impl MessageType {
    pub const ALL: [MessageType; 5] = [
        MessageType::HttpRequest,
        MessageType::HttpResponse,
        MessageType::RenderTemplateRequest,
        MessageType::RenderTemplateResponse,
        MessageType::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::HttpRequest => "http.request",
            MessageType::HttpResponse => "http.response",
            MessageType::RenderTemplateRequest => "render.template.request",
            MessageType::RenderTemplateResponse => "render.template.response",
            MessageType::Error => "error",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ProtocolError::UnknownType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("http.request", MessageType::HttpRequest)]
    #[case("http.response", MessageType::HttpResponse)]
    #[case("render.template.request", MessageType::RenderTemplateRequest)]
    #[case("render.template.response", MessageType::RenderTemplateResponse)]
    #[case("error", MessageType::Error)]
    fn parses_known_tags(#[case] tag: &str, #[case] expected: MessageType) {
        assert_eq!(tag.parse::<MessageType>().unwrap(), expected);
        assert_eq!(expected.to_string(), tag);
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = "unknown.tag".parse::<MessageType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown message type: unknown.tag");
    }

    #[test]
    fn serde_name_matches_as_str() {
        for t in MessageType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }
}
