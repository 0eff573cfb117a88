//! Connection ports - 1 本の双方向接続を読み側と書き側に分けたもの
//!
//! The dispatch engine only needs discrete frames in and discrete frames out;
//! WebSocket, in-memory channels, or anything else can sit behind these.

use async_trait::async_trait;

use crate::domain::TransportError;

/// The read half. Owned exclusively by one `DispatchLoop`.
#[async_trait]
pub trait FrameSource: Send {
    /// Next inbound frame. `Ok(None)` means the peer closed the connection.
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// The write half. Callers serialize access through `SharedWriter`.
#[async_trait]
pub trait FrameSink: Send {
    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError>;

    async fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
