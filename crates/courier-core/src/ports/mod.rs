//! Ports - 抽象化レイヤー
//!
//! 接続（transport）へのインターフェースを提供し、実装の詳細を隠蔽します。
//! Handler collaborators are the other seam; they live in `typed::handler`.

pub mod connection;

pub use self::connection::{FrameSink, FrameSource};
