//! Impls - ports の実装と標準 handler
//!
//! # 含まれる実装
//! - **websocket**: 本番用 transport（tokio-tungstenite）
//! - **memory**: テスト・組み込み用の channel transport
//! - **http**: `http.request` handler（reqwest）
//! - **render**: `render.template.request` handler

pub mod http;
pub mod memory;
pub mod render;
pub mod websocket;

pub use self::http::HttpRequestHandler;
pub use self::render::RenderTemplateHandler;
pub use self::websocket::{WebSocketServer, WebSocketSink, WebSocketSource};

use crate::app::{App, AppBuilder, BuildError};
use crate::config::ServerConfig;
use crate::domain::{HttpRequestMessage, MessageType, RenderTemplateRequestMessage};
use crate::typed::RegistryError;

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Builder with both standard handlers registered and expected.
pub fn default_builder(config: &ServerConfig) -> Result<AppBuilder, SetupError> {
    let builder = AppBuilder::new()
        .with_options(config.dispatch_options())
        .register::<HttpRequestMessage, _>(HttpRequestHandler::new(config.http_timeout)?)?
        .register::<RenderTemplateRequestMessage, _>(RenderTemplateHandler)?
        .expect_types(&[MessageType::HttpRequest, MessageType::RenderTemplateRequest]);
    Ok(builder)
}

pub fn default_app(config: &ServerConfig) -> Result<App, SetupError> {
    Ok(default_builder(config)?.build()?)
}
