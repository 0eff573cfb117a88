//! Payload trait - payload 型と type タグの対応付け
//!
//! # Trait Bounds
//! - `Serialize` / `DeserializeOwned`: envelope の `data` との変換のため
//! - `Default`: registry の zero-value factory のため
//! - `Send + Sync + 'static`: handling unit（tokio task）に渡すため

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::{
    ErrorMessage, HttpRequestMessage, HttpResponseMessage, Message, MessageType,
    RenderTemplateRequestMessage, RenderTemplateResponseMessage,
};

pub trait Payload: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Tag the payload is registered and sent under.
    const TYPE: MessageType;

    fn into_message(self) -> Message;

    /// `None` when `message` is a different variant.
    fn from_message(message: Message) -> Option<Self>;
}

/// A payload a client sends to get work done; `Response` is what comes back.
pub trait RequestPayload: Payload {
    type Response: Payload;
}

macro_rules! impl_payload {
    ($ty:ty, $variant:ident) => {
        impl Payload for $ty {
            const TYPE: MessageType = MessageType::$variant;

            fn into_message(self) -> Message {
                Message::$variant(self)
            }

            fn from_message(message: Message) -> Option<Self> {
                match message {
                    Message::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_payload!(HttpRequestMessage, HttpRequest);
impl_payload!(HttpResponseMessage, HttpResponse);
impl_payload!(RenderTemplateRequestMessage, RenderTemplateRequest);
impl_payload!(RenderTemplateResponseMessage, RenderTemplateResponse);
impl_payload!(ErrorMessage, Error);

impl RequestPayload for HttpRequestMessage {
    type Response = HttpResponseMessage;
}

impl RequestPayload for RenderTemplateRequestMessage {
    type Response = RenderTemplateResponseMessage;
}
