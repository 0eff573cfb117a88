//! PayloadCodec - payload 構造体と raw JSON の相互変換
//!
//! The envelope carries `data` as raw JSON text. This is the only place that
//! turns that text into a concrete payload type and back.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Decode(serde_json::Error),
}

pub struct PayloadCodec;

impl PayloadCodec {
    pub fn encode<T: Serialize>(payload: &T) -> Result<Box<RawValue>, CodecError> {
        serde_json::value::to_raw_value(payload).map_err(CodecError::Encode)
    }

    pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CodecError> {
        serde_json::from_str(raw).map_err(CodecError::Decode)
    }
}
