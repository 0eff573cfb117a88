//! App - アプリケーション層
//!
//! # 主要コンポーネント
//! - **AppBuilder**: handler の登録と起動時検証
//! - **DispatchLoop**: 接続ごとの読み取り + handling unit の spawn
//! - **ResponseWriter**: correlation 付きの 1 回限りの書き込み

pub mod builder;
pub mod dispatch;
pub mod response_writer;

pub use self::builder::{App, AppBuilder, BuildError};
pub use self::dispatch::{
    CloseReason, ConnectionState, DispatchLoop, DispatchOptions, DispatchSummary,
};
pub use self::response_writer::{CorrelationContext, ResponseWriter, SharedWriter};
