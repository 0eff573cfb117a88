//! DispatchLoop - 接続ごとの唯一の読み取りループ
//!
//! # フロー
//! 1. FrameSource から 1 frame 読む（ここだけで待つ）
//! 2. envelope を decode（失敗 → uncorrelated error を書いて次へ）
//! 3. MessageRegistry で type を解決して payload を decode
//!    （失敗 → correlationId 付き error を書いて次へ）
//! 4. handling unit を spawn して、完了を待たずに 1 に戻る
//!
//! Read errors, orderly close and failed writes end the loop. A failed write
//! wakes the loop even while it is waiting for a frame or a permit. After that
//! the shared writer is closed and late responses from still-running units are
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{Instrument, debug, info, info_span, trace, warn};

use super::response_writer::{CorrelationContext, ResponseWriter, SharedWriter};
use crate::domain::{ConnectionId, HandlerError, Message, decode_envelope};
use crate::ports::FrameSource;
use crate::typed::{HandlerRegistry, MessageRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    ReadingFrame,
    Decoding,
    Dispatching,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The peer closed the connection.
    PeerClosed,
    ReadFailed(String),
    /// A write failed, which is as fatal as a failed read.
    WriteFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub frames: u64,
    pub dispatched: u64,
    pub rejected: u64,
    pub close_reason: CloseReason,
}

/// Knobs for the per-connection concurrency model. Both off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Upper bound on concurrently running handling units. When reached, the
    /// loop stops reading until a unit finishes.
    pub max_in_flight: Option<usize>,
    /// Handlers running longer than this are aborted and answered with an
    /// error.
    pub handler_timeout: Option<Duration>,
}

pub struct DispatchLoop<S: FrameSource> {
    connection_id: ConnectionId,
    source: S,
    writer: Arc<SharedWriter>,
    registry: Arc<MessageRegistry>,
    handlers: Arc<HandlerRegistry>,
    limiter: Option<Arc<Semaphore>>,
    handler_timeout: Option<Duration>,
    state: ConnectionState,
}

impl<S: FrameSource> DispatchLoop<S> {
    pub fn new(
        source: S,
        writer: Arc<SharedWriter>,
        registry: Arc<MessageRegistry>,
        handlers: Arc<HandlerRegistry>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            connection_id: writer.connection_id(),
            source,
            writer,
            registry,
            handlers,
            limiter: options
                .max_in_flight
                .map(|n| Arc::new(Semaphore::new(n.max(1)))),
            handler_timeout: options.handler_timeout,
            state: ConnectionState::Open,
        }
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    fn transition(&mut self, next: ConnectionState) {
        trace!(from = ?self.state, to = ?next, "connection state");
        self.state = next;
    }

    /// Run until the connection closes.
    pub async fn run(mut self) -> DispatchSummary {
        let span = info_span!("connection", connection = %self.connection_id);
        async move {
            let mut frames = 0;
            let mut dispatched = 0;
            let mut rejected = 0;

            let close_reason = loop {
                if self.writer.is_closed() {
                    break CloseReason::WriteFailed;
                }

                self.transition(ConnectionState::ReadingFrame);
                // 書き込み失敗は読み取り待ちの最中でも接続を閉じる
                let next = tokio::select! {
                    biased;
                    _ = self.writer.closed() => break CloseReason::WriteFailed,
                    next = self.source.next_frame() => next,
                };
                let frame = match next {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break CloseReason::PeerClosed,
                    Err(err) => {
                        warn!(error = %err, "read failed; closing connection");
                        break CloseReason::ReadFailed(err.to_string());
                    }
                };
                frames += 1;

                self.transition(ConnectionState::Decoding);
                let envelope = match decode_envelope(&frame) {
                    Ok(envelope) => envelope,
                    Err(err) => {
                        warn!(error = %err, "rejecting malformed frame");
                        rejected += 1;
                        CorrelationContext::uncorrelated(self.writer.clone())
                            .into_writer()
                            .write_error(err)
                            .await;
                        continue;
                    }
                };

                let message = match self
                    .registry
                    .decode(&envelope.message_type, envelope.payload())
                {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(
                            correlation_id = %envelope.correlation_id,
                            message_type = %envelope.message_type,
                            error = %err,
                            "rejecting message"
                        );
                        rejected += 1;
                        CorrelationContext::new(envelope.correlation_id, self.writer.clone())
                            .into_writer()
                            .write_error(err)
                            .await;
                        continue;
                    }
                };

                self.transition(ConnectionState::Dispatching);
                let permit = tokio::select! {
                    biased;
                    _ = self.writer.closed() => break CloseReason::WriteFailed,
                    permit = self.acquire_permit() => permit,
                };
                let context = CorrelationContext::new(envelope.correlation_id, self.writer.clone());
                debug!(
                    correlation_id = %context.correlation_id(),
                    message_type = %message.message_type(),
                    "dispatching"
                );
                spawn_handling_unit(
                    self.handlers.clone(),
                    message,
                    context.into_writer(),
                    self.handler_timeout,
                    permit,
                );
                dispatched += 1;
            };

            self.transition(ConnectionState::Closed);
            self.writer.close().await;

            let summary = DispatchSummary {
                frames,
                dispatched,
                rejected,
                close_reason,
            };
            info!(
                frames = summary.frames,
                dispatched = summary.dispatched,
                rejected = summary.rejected,
                reason = ?summary.close_reason,
                "connection closed"
            );
            summary
        }
        .instrument(span)
        .await
    }

    async fn acquire_permit(&self) -> Option<OwnedSemaphorePermit> {
        let limiter = self.limiter.as_ref()?;
        // semaphore は close しないので Err にはならない
        limiter.clone().acquire_owned().await.ok()
    }
}

/// Launch one handling unit. The caller does not wait for it.
fn spawn_handling_unit(
    handlers: Arc<HandlerRegistry>,
    message: Message,
    writer: ResponseWriter,
    handler_timeout: Option<Duration>,
    permit: Option<OwnedSemaphorePermit>,
) {
    let span = info_span!(
        "handling_unit",
        correlation_id = %writer.correlation_id(),
        message_type = %message.message_type()
    );
    tokio::spawn(
        async move {
            let _permit = permit;
            match run_handler(&handlers, message, handler_timeout).await {
                Ok(response) => writer.write_success(response).await,
                Err(err) => {
                    warn!(error = %err, "handler failed");
                    writer.write_error(err).await;
                }
            }
        }
        .instrument(span),
    );
}

async fn run_handler(
    handlers: &HandlerRegistry,
    message: Message,
    handler_timeout: Option<Duration>,
) -> Result<Message, HandlerError> {
    let message_type = message.message_type();
    let handler = handlers
        .get(message_type)
        .ok_or(HandlerError::NotRegistered(message_type))?;

    // 別 task で走らせて panic も 1 件の error response に変える
    let mut call = tokio::spawn(async move { handler.handle_dyn(message).await });
    let joined = match handler_timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut call).await {
            Ok(joined) => joined,
            Err(_) => {
                call.abort();
                return Err(HandlerError::Timeout(limit));
            }
        },
        None => call.await,
    };

    joined.unwrap_or_else(|err| {
        Err(HandlerError::other(format!(
            "handler for {message_type} aborted: {err}"
        )))
    })
}
