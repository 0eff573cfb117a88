//! Typed - 型付き Message API
//!
//! このモジュールは type タグの typo を型で排除し、
//! payload 型と handler の対応付けを静的に保証します。
//!
//! # 二層構造
//! - **表層（Typed）**: `Payload` trait, `Handler<M>` trait - 型安全
//! - **内部（Dyn）**: `DynHandler` trait, `MessageRegistry` - タグで引く

pub mod codec;
pub mod handler;
pub mod message_registry;
pub mod payload;
pub mod registry;

pub use self::codec::{CodecError, PayloadCodec};
pub use self::handler::{DynHandler, FnHandler, Handler, TypedHandler};
pub use self::message_registry::{MessageRegistry, MessageRegistryError};
pub use self::payload::{Payload, RequestPayload};
pub use self::registry::{HandlerRegistry, RegistryError};
