//! courier-core
//!
//! Correlated request/response messaging over a persistent connection.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（message_type, messages, envelope, ids, errors）
//! - **typed**: 型付き Message API（Payload trait, Handler trait, MessageRegistry, HandlerRegistry）
//! - **ports**: 抽象化レイヤー（FrameSource, FrameSink）
//! - **app**: アプリケーションロジック（builder, dispatch, response_writer）
//! - **impls**: 実装（websocket, memory transport, http / render handler）
//! - **template**: `{{.Field}}` 形式の最小テンプレートエンジン
//! - **config**: 起動設定（`COURIER_*` 環境変数）
//! - **observability**: tracing-subscriber の初期化

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod template;
pub mod typed;
