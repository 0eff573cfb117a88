//! Errors - プロトコル各層のエラー分類
//!
//! - FramingError: envelope 自体が壊れている（correlation できない）
//! - ProtocolError: type が未知 / payload の形が合わない
//! - HandlerError: handler collaborator が失敗した
//! - TransportError: 接続の読み書きが失敗した（これだけが致命的）

use std::time::Duration;

use thiserror::Error;

use super::message_type::MessageType;
use crate::template::TemplateError;
use crate::typed::codec::CodecError;

/// The top-level frame could not be parsed as an envelope.
#[derive(Debug, Error)]
pub enum FramingError {
    #[error("invalid envelope: expected a JSON object")]
    NotAnObject,

    #[error("invalid envelope: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// Failure to turn an envelope's `type` and `data` into a typed message.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown message type: {0}")]
    UnknownType(String),

    #[error("invalid payload for message type {message_type}: {source}")]
    Decode {
        message_type: MessageType,
        #[source]
        source: CodecError,
    },
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("no handler registered for message type: {0}")]
    NotRegistered(MessageType),

    #[error("handler for {expected} received a {actual} message")]
    UnexpectedMessage {
        expected: MessageType,
        actual: MessageType,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("http request failed: {0}")]
    Upstream(String),

    #[error("handler timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn other(message: impl Into<String>) -> Self {
        HandlerError::Other(message.into())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection read failed: {0}")]
    Read(String),

    #[error("connection write failed: {0}")]
    Write(String),

    #[error("connection closed")]
    Closed,
}
