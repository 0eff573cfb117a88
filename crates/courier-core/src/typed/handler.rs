//! Handler trait - request payload を処理して response payload を返す
//!
//! # 二層構造
//! - `Handler<M>`: typed, one implementation per request payload type
//! - `DynHandler`: object-safe, stored in the `HandlerRegistry` keyed by tag
//!
//! `TypedHandler<M, H>` bridges the two by unwrapping the [`Message`] variant
//! before calling the typed handler and wrapping the response afterwards.

use std::marker::PhantomData;

use async_trait::async_trait;

use super::payload::{Payload, RequestPayload};
use crate::domain::{HandlerError, Message, MessageType};

/// # 使用例
/// ```ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Handler<RenderTemplateRequestMessage> for Echo {
///     async fn handle(
///         &self,
///         request: RenderTemplateRequestMessage,
///     ) -> Result<RenderTemplateResponseMessage, HandlerError> {
///         Ok(RenderTemplateResponseMessage { render: request.template })
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M: RequestPayload>: Send + Sync {
    async fn handle(&self, request: M) -> Result<M::Response, HandlerError>;
}

#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, message: Message) -> Result<Message, HandlerError>;
    fn message_type(&self) -> MessageType;
}

pub struct TypedHandler<M: RequestPayload, H: Handler<M>> {
    handler: H,
    _marker: PhantomData<M>,
}

impl<M: RequestPayload, H: Handler<M>> TypedHandler<M, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M: RequestPayload, H: Handler<M>> DynHandler for TypedHandler<M, H> {
    async fn handle_dyn(&self, message: Message) -> Result<Message, HandlerError> {
        let actual = message.message_type();
        let request = M::from_message(message).ok_or(HandlerError::UnexpectedMessage {
            expected: M::TYPE,
            actual,
        })?;
        let response = self.handler.handle(request).await?;
        Ok(response.into_message())
    }

    fn message_type(&self) -> MessageType {
        M::TYPE
    }
}

/// Adapts a plain synchronous function into a [`Handler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<M, F> Handler<M> for FnHandler<F>
where
    M: RequestPayload,
    F: Fn(M) -> Result<M::Response, HandlerError> + Send + Sync,
{
    async fn handle(&self, request: M) -> Result<M::Response, HandlerError> {
        (self.0)(request)
    }
}
