//! Domain model: tags, messages, envelope, errors.

pub mod envelope;
pub mod errors;
pub mod ids;
pub mod message_type;
pub mod messages;

pub use self::envelope::{Envelope, decode_envelope, encode_envelope};
pub use self::errors::{FramingError, HandlerError, ProtocolError, TransportError};
pub use self::ids::ConnectionId;
pub use self::message_type::MessageType;
pub use self::messages::{
    ErrorMessage, HttpRequestMessage, HttpResponseMessage, Message,
    RenderTemplateRequestMessage, RenderTemplateResponseMessage, Variables,
};
