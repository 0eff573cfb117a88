//! MessageRegistry - type タグ → zero-value factory / decoder
//!
//! Built once at startup and then only read, so it can be shared behind an
//! `Arc` without any locking.
//!
//! # 使用例
//! ```ignore
//! let registry = MessageRegistry::standard();
//! registry.verify()?;
//! let message = registry.decode("render.template.request", r#"{"template":"Hi"}"#)?;
//! ```

use std::collections::HashMap;

use super::codec::{CodecError, PayloadCodec};
use super::payload::Payload;
use crate::domain::{
    ErrorMessage, HttpRequestMessage, HttpResponseMessage, Message, MessageType, ProtocolError,
    RenderTemplateRequestMessage, RenderTemplateResponseMessage,
};

pub type ZeroFactory = fn() -> Message;
pub type Decoder = fn(&str) -> Result<Message, CodecError>;

#[derive(Clone, Copy)]
struct Entry {
    zero: ZeroFactory,
    decode: Decoder,
}

fn zero_of<P: Payload>() -> Message {
    P::default().into_message()
}

fn decode_as<P: Payload>(raw: &str) -> Result<Message, CodecError> {
    PayloadCodec::decode::<P>(raw).map(P::into_message)
}

#[derive(Debug, thiserror::Error)]
pub enum MessageRegistryError {
    #[error("message type '{0}' is already registered")]
    AlreadyRegistered(MessageType),

    #[error("message type '{registered}' is registered with a factory reporting '{reported}'")]
    TagMismatch {
        registered: MessageType,
        reported: MessageType,
    },
}

#[derive(Default)]
pub struct MessageRegistry {
    entries: HashMap<MessageType, Entry>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registry with every variant of the reference protocol.
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        entries.insert(HttpRequestMessage::TYPE, Self::entry::<HttpRequestMessage>());
        entries.insert(HttpResponseMessage::TYPE, Self::entry::<HttpResponseMessage>());
        entries.insert(
            RenderTemplateRequestMessage::TYPE,
            Self::entry::<RenderTemplateRequestMessage>(),
        );
        entries.insert(
            RenderTemplateResponseMessage::TYPE,
            Self::entry::<RenderTemplateResponseMessage>(),
        );
        entries.insert(ErrorMessage::TYPE, Self::entry::<ErrorMessage>());
        Self { entries }
    }

    fn entry<P: Payload>() -> Entry {
        Entry {
            zero: zero_of::<P>,
            decode: decode_as::<P>,
        }
    }

    pub fn register<P: Payload>(&mut self) -> Result<(), MessageRegistryError> {
        self.register_factory(P::TYPE, zero_of::<P>, decode_as::<P>)
    }

    /// Lower-level registration with explicit functions. `register::<P>()` is
    /// preferred; this exists for payloads that are not `Payload` types.
    pub fn register_factory(
        &mut self,
        message_type: MessageType,
        zero: ZeroFactory,
        decode: Decoder,
    ) -> Result<(), MessageRegistryError> {
        if self.entries.contains_key(&message_type) {
            return Err(MessageRegistryError::AlreadyRegistered(message_type));
        }
        self.entries.insert(message_type, Entry { zero, decode });
        Ok(())
    }

    pub fn resolve(&self, tag: &str) -> Result<MessageType, ProtocolError> {
        let message_type: MessageType = tag.parse()?;
        if self.entries.contains_key(&message_type) {
            Ok(message_type)
        } else {
            Err(ProtocolError::UnknownType(tag.to_string()))
        }
    }

    /// Fresh zero-value message for a registered tag.
    pub fn zero_value(&self, message_type: MessageType) -> Option<Message> {
        self.entries.get(&message_type).map(|e| (e.zero)())
    }

    pub fn decode(&self, tag: &str, raw: &str) -> Result<Message, ProtocolError> {
        let message_type = self.resolve(tag)?;
        let entry = self
            .entries
            .get(&message_type)
            .ok_or_else(|| ProtocolError::UnknownType(tag.to_string()))?;
        (entry.decode)(raw).map_err(|source| ProtocolError::Decode {
            message_type,
            source,
        })
    }

    pub fn registered_types(&self) -> Vec<MessageType> {
        let mut types: Vec<MessageType> = self.entries.keys().copied().collect();
        types.sort();
        types
    }

    /// Startup self-check: every factory must report the tag it is registered
    /// under.
    pub fn verify(&self) -> Result<(), MessageRegistryError> {
        for (&registered, entry) in &self.entries {
            let reported = (entry.zero)().message_type();
            if reported != registered {
                return Err(MessageRegistryError::TagMismatch {
                    registered,
                    reported,
                });
            }
        }
        Ok(())
    }
}
