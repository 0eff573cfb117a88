//! HandlerRegistry - request タグ → handler collaborator
//!
//! # 内部実装
//! - `register::<M, H>(handler)` で登録
//! - 内部的に `TypedHandler` でラップして `DynHandler` に変換
//! - `HashMap<MessageType, Arc<dyn DynHandler>>` で管理
//!
//! Mutable while the app is being built, read-only once it is shared with
//! connections.

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::payload::RequestPayload;
use crate::domain::MessageType;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for message type '{0}' is already registered")]
    AlreadyRegistered(MessageType),
}

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<MessageType, Arc<dyn DynHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<M: RequestPayload, H: Handler<M> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(&M::TYPE) {
            return Err(RegistryError::AlreadyRegistered(M::TYPE));
        }
        let typed_handler = TypedHandler::<M, H>::new(handler);
        self.handlers.insert(M::TYPE, Arc::new(typed_handler));
        Ok(())
    }

    pub fn get(&self, message_type: MessageType) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(&message_type).cloned()
    }

    pub fn registered_types(&self) -> Vec<MessageType> {
        let mut types: Vec<MessageType> = self.handlers.keys().copied().collect();
        types.sort();
        types
    }
}
