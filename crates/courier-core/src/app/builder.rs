//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_types()` で期待される request タグを登録
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - `build()` 時に MessageRegistry の self-check も走らせる

use std::sync::Arc;
use std::time::Duration;

use super::dispatch::{DispatchLoop, DispatchOptions, DispatchSummary};
use super::response_writer::SharedWriter;
use crate::domain::{ConnectionId, MessageType};
use crate::ports::{FrameSink, FrameSource};
use crate::typed::{
    Handler, HandlerRegistry, MessageRegistry, MessageRegistryError, RegistryError,
    RequestPayload,
};

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .register::<RenderTemplateRequestMessage, _>(RenderTemplateHandler)?
///     .expect_types(&[MessageType::RenderTemplateRequest])
///     .build()?;
/// ```
pub struct AppBuilder {
    registry: MessageRegistry,
    handlers: HandlerRegistry,
    expected_types: Option<Vec<MessageType>>,
    options: DispatchOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing handlers for message types: {0:?}. These types were expected but not registered.")]
    MissingMessageTypes(Vec<MessageType>),

    #[error("Handler registered for message type '{0}', which the message registry cannot decode")]
    UndecodableHandler(MessageType),

    #[error(transparent)]
    Registry(#[from] MessageRegistryError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            registry: MessageRegistry::standard(),
            handlers: HandlerRegistry::new(),
            expected_types: None,
            options: DispatchOptions::default(),
        }
    }

    /// Replace the standard message registry.
    pub fn with_registry(mut self, registry: MessageRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn register<M: RequestPayload, H: Handler<M> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.handlers.register::<M, H>(handler)?;
        Ok(self)
    }

    pub fn expect_types(mut self, message_types: &[MessageType]) -> Self {
        self.expected_types = Some(message_types.to_vec());
        self
    }

    pub fn with_options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.options.max_in_flight = Some(limit);
        self
    }

    pub fn handler_timeout(mut self, timeout: Duration) -> Self {
        self.options.handler_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        self.registry.verify()?;

        let registered = self.handlers.registered_types();
        if let Some(expected) = &self.expected_types {
            let missing: Vec<MessageType> = expected
                .iter()
                .filter(|t| !registered.contains(t))
                .copied()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingMessageTypes(missing));
            }
        }

        let decodable = self.registry.registered_types();
        if let Some(&orphan) = registered.iter().find(|t| !decodable.contains(t)) {
            return Err(BuildError::UndecodableHandler(orphan));
        }

        Ok(App {
            registry: Arc::new(self.registry),
            handlers: Arc::new(self.handlers),
            options: self.options,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable after `build()`; share it between connections with `Arc`.
pub struct App {
    registry: Arc<MessageRegistry>,
    handlers: Arc<HandlerRegistry>,
    options: DispatchOptions,
}

impl App {
    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    pub fn handlers(&self) -> &HandlerRegistry {
        &self.handlers
    }

    pub fn options(&self) -> DispatchOptions {
        self.options
    }

    /// Wire a new connection to a dispatch loop without running it.
    pub fn dispatch_loop<S, K>(&self, source: S, sink: K) -> DispatchLoop<S>
    where
        S: FrameSource,
        K: FrameSink + 'static,
    {
        let writer = SharedWriter::new(ConnectionId::new(), sink);
        DispatchLoop::new(
            source,
            Arc::new(writer),
            self.registry.clone(),
            self.handlers.clone(),
            self.options,
        )
    }

    /// Serve one connection until it closes.
    pub async fn serve_connection<S, K>(&self, source: S, sink: K) -> DispatchSummary
    where
        S: FrameSource,
        K: FrameSink + 'static,
    {
        self.dispatch_loop(source, sink).run().await
    }
}
