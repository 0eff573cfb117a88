//! In-memory connection - tokio mpsc で作ったループバック接続
//!
//! Used by the tests and by anything that wants to drive the dispatch engine
//! in-process without a socket.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::TransportError;
use crate::ports::{FrameSink, FrameSource};

/// Create a connected (client, source, sink) triple.
pub fn connection() -> (MemoryClient, MemorySource, MemorySink) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    (
        MemoryClient {
            inbound: Some(inbound_tx),
            outbound: outbound_rx,
        },
        MemorySource::new(inbound_rx),
        MemorySink::new(outbound_tx),
    )
}

pub struct MemorySource {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl MemorySource {
    pub fn new(rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self { rx }
    }
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

pub struct MemorySink {
    tx: Option<mpsc::UnboundedSender<String>>,
}

impl MemorySink {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError> {
        let tx = self.tx.as_ref().ok_or(TransportError::Closed)?;
        tx.send(frame)
            .map_err(|_| TransportError::Write("receiver dropped".into()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.tx = None;
        Ok(())
    }
}

/// The peer's end of a memory connection.
pub struct MemoryClient {
    inbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
    outbound: mpsc::UnboundedReceiver<String>,
}

impl MemoryClient {
    /// Returns false once the inbound side is closed or the source is gone.
    pub fn send_raw(&self, frame: impl Into<Vec<u8>>) -> bool {
        self.inbound
            .as_ref()
            .is_some_and(|tx| tx.send(frame.into()).is_ok())
    }

    pub fn send_json(&self, value: &Value) -> bool {
        self.send_raw(value.to_string())
    }

    /// Simulate the peer closing its side.
    pub fn close_inbound(&mut self) {
        self.inbound = None;
    }

    pub async fn recv_raw(&mut self) -> Option<String> {
        self.outbound.recv().await
    }

    /// Next outbound frame parsed as JSON. `None` once the sink is closed.
    pub async fn recv_json(&mut self) -> Option<Value> {
        let frame = self.recv_raw().await?;
        serde_json::from_str(&frame).ok()
    }
}
