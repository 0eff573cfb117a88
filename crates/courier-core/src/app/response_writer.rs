//! ResponseWriter - 1 inbound message につき 1 outbound envelope
//!
//! - `SharedWriter`: the connection's write half behind a mutex. Every frame
//!   is written while holding the lock, so concurrent handling units can never
//!   interleave partial frames.
//! - `CorrelationContext`: correlation id + shared writer, one per inbound
//!   message.
//! - `ResponseWriter`: consumes the context on write, so a context can produce
//!   at most one response.

use std::fmt::Display;
use std::sync::Arc;

use serde_json::value::RawValue;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, warn};

use crate::domain::{
    ConnectionId, Envelope, ErrorMessage, Message, MessageType, TransportError, encode_envelope,
};
use crate::ports::FrameSink;
use crate::typed::Payload;

pub struct SharedWriter {
    connection_id: ConnectionId,
    sink: Mutex<Box<dyn FrameSink>>,
    /// `true` once closed; the read loop waits on it.
    closed: watch::Sender<bool>,
}

impl SharedWriter {
    pub fn new(connection_id: ConnectionId, sink: impl FrameSink + 'static) -> Self {
        Self {
            connection_id,
            sink: Mutex::new(Box::new(sink)),
            closed: watch::Sender::new(false),
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once the writer is closed, by `close()` or by a failed write.
    pub async fn closed(&self) {
        let mut rx = self.closed.subscribe();
        // sender は self が持っているので Err にはならない
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Write one complete frame. A failed write closes the writer for good.
    pub async fn write_frame(&self, frame: String) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut sink = self.sink.lock().await;
        // close() が lock 待ちの間に走っている可能性がある
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let result = sink.send_frame(frame).await;
        if result.is_err() {
            self.closed.send_replace(true);
        }
        result
    }

    /// Stop accepting writes and close the underlying sink. Idempotent.
    pub async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(err) = sink.close().await {
            debug!(connection = %self.connection_id, error = %err, "sink close failed");
        }
    }
}

/// Per-message state: who to answer and where to write.
pub struct CorrelationContext {
    correlation_id: String,
    writer: Arc<SharedWriter>,
}

impl CorrelationContext {
    pub fn new(correlation_id: impl Into<String>, writer: Arc<SharedWriter>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            writer,
        }
    }

    /// Context for a frame that could not be tied to any request.
    pub fn uncorrelated(writer: Arc<SharedWriter>) -> Self {
        Self::new(String::new(), writer)
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn into_writer(self) -> ResponseWriter {
        ResponseWriter { context: self }
    }
}

pub struct ResponseWriter {
    context: CorrelationContext,
}

impl ResponseWriter {
    pub fn new(context: CorrelationContext) -> Self {
        Self { context }
    }

    pub fn correlation_id(&self) -> &str {
        self.context.correlation_id()
    }

    /// Send `message` tagged with its own type. Failures are logged, not
    /// returned.
    pub async fn write_success(self, message: Message) {
        let message_type = message.message_type();
        match message.encode_payload() {
            Ok(data) => self.write(message_type, data).await,
            Err(err) => {
                error!(
                    connection = %self.context.writer.connection_id(),
                    correlation_id = %self.context.correlation_id,
                    message_type = %message_type,
                    error = %err,
                    "response payload could not be encoded"
                );
                self.write_error(err).await;
            }
        }
    }

    /// Send an `error` envelope carrying `err`'s description.
    pub async fn write_error(self, err: impl Display) {
        let payload = ErrorMessage::new(err.to_string());
        match crate::typed::PayloadCodec::encode(&payload) {
            Ok(data) => self.write(ErrorMessage::TYPE, data).await,
            Err(err) => error!(
                connection = %self.context.writer.connection_id(),
                correlation_id = %self.context.correlation_id,
                error = %err,
                "error payload could not be encoded"
            ),
        }
    }

    async fn write(&self, message_type: MessageType, data: Box<RawValue>) {
        let CorrelationContext {
            correlation_id,
            writer,
        } = &self.context;
        let envelope = Envelope::new(correlation_id.as_str(), message_type, data);
        let frame = match encode_envelope(&envelope) {
            Ok(frame) => frame,
            Err(err) => {
                error!(connection = %writer.connection_id(), %correlation_id, error = %err, "envelope encode failed");
                return;
            }
        };

        match writer.write_frame(frame).await {
            Ok(()) => debug!(
                connection = %writer.connection_id(),
                %correlation_id,
                %message_type,
                "response written"
            ),
            Err(TransportError::Closed) => debug!(
                connection = %writer.connection_id(),
                %correlation_id,
                %message_type,
                "connection closed; response dropped"
            ),
            Err(err) => warn!(
                connection = %writer.connection_id(),
                %correlation_id,
                %message_type,
                error = %err,
                "error writing response"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HandlerError, RenderTemplateResponseMessage};
    use crate::impls::memory::MemorySink;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use tokio::sync::mpsc;

    fn writer() -> (Arc<SharedWriter>, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = SharedWriter::new(ConnectionId::new(), MemorySink::new(tx));
        (Arc::new(writer), rx)
    }

    fn parse(frame: &str) -> Value {
        serde_json::from_str(frame).unwrap()
    }

    #[tokio::test]
    async fn success_is_tagged_with_correlation_id_and_message_type() {
        let (shared, mut rx) = writer();
        let ctx = CorrelationContext::new("abc", shared);
        ctx.into_writer()
            .write_success(Message::RenderTemplateResponse(RenderTemplateResponseMessage {
                render: "Hello Ada".into(),
            }))
            .await;

        let frame = rx.recv().await.unwrap();
        assert_eq!(
            parse(&frame),
            json!({ "correlationId": "abc", "type": "render.template.response", "data": { "render": "Hello Ada" } })
        );
    }

    #[tokio::test]
    async fn error_uses_error_description() {
        let (shared, mut rx) = writer();
        ResponseWriter::new(CorrelationContext::new("x-1", shared))
            .write_error(HandlerError::other("boom"))
            .await;

        let frame = rx.recv().await.unwrap();
        assert_eq!(
            parse(&frame),
            json!({ "correlationId": "x-1", "type": "error", "data": { "message": "boom" } })
        );
    }

    #[tokio::test]
    async fn uncorrelated_error_omits_correlation_id() {
        let (shared, mut rx) = writer();
        CorrelationContext::uncorrelated(shared)
            .into_writer()
            .write_error("invalid envelope: expected a JSON object")
            .await;

        let frame = rx.recv().await.unwrap();
        assert_eq!(
            parse(&frame),
            json!({ "type": "error", "data": { "message": "invalid envelope: expected a JSON object" } })
        );
    }

    #[tokio::test]
    async fn closed_writer_drops_writes() {
        let (shared, mut rx) = writer();
        shared.close().await;
        assert!(shared.is_closed());
        CorrelationContext::new("late", shared.clone())
            .into_writer()
            .write_error("too late")
            .await;
        assert!(rx.recv().await.is_none());
    }

    struct FailingSink;

    #[async_trait]
    impl FrameSink for FailingSink {
        async fn send_frame(&mut self, _frame: String) -> Result<(), TransportError> {
            Err(TransportError::Write("broken pipe".into()))
        }
    }

    #[tokio::test]
    async fn failed_write_closes_writer_without_panicking() {
        let shared = Arc::new(SharedWriter::new(ConnectionId::new(), FailingSink));
        CorrelationContext::new("a", shared.clone())
            .into_writer()
            .write_error("x")
            .await;
        assert!(shared.is_closed());
        let err = shared.write_frame("{}".into()).await.unwrap_err();
        assert!(matches!(err, TransportError::Closed));
    }

    #[tokio::test]
    async fn closed_signal_fires_on_write_failure() {
        let shared = Arc::new(SharedWriter::new(ConnectionId::new(), FailingSink));
        let waiter = tokio::spawn({
            let shared = shared.clone();
            async move { shared.closed().await }
        });
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        assert!(shared.write_frame("{}".into()).await.is_err());
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }
}
