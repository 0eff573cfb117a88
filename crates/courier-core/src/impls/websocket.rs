//! WebSocket transport - tokio-tungstenite
//!
//! One TCP listener, one task per accepted connection. Each upgraded socket is
//! split in two: the read half becomes the connection's `FrameSource`, the
//! write half the `FrameSink` behind the shared writer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};
use tracing::{Instrument, debug, info, info_span, warn};

use crate::app::App;
use crate::domain::TransportError;
use crate::ports::{FrameSink, FrameSource};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebSocketSource {
    stream: SplitStream<WebSocketStream<TcpStream>>,
}

#[async_trait]
impl FrameSource for WebSocketSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(Ok(message)) => message,
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) => return Ok(None),
                Some(Err(err)) => return Err(TransportError::Read(err.to_string())),
            };
            match message {
                WsMessage::Text(text) => return Ok(Some(text.into_bytes())),
                WsMessage::Binary(data) => return Ok(Some(data)),
                WsMessage::Close(_) => return Ok(None),
                // ping への pong は tungstenite が返す
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
            }
        }
    }
}

pub struct WebSocketSink {
    sink: SplitSink<WebSocketStream<TcpStream>, WsMessage>,
}

#[async_trait]
impl FrameSink for WebSocketSink {
    async fn send_frame(&mut self, frame: String) -> Result<(), TransportError> {
        self.sink
            .send(WsMessage::Text(frame))
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.sink
            .close()
            .await
            .map_err(|e| TransportError::Write(e.to_string()))
    }
}

/// Split an upgraded socket into the two connection halves.
pub fn split(ws: WebSocketStream<TcpStream>) -> (WebSocketSource, WebSocketSink) {
    let (sink, stream) = ws.split();
    (WebSocketSource { stream }, WebSocketSink { sink })
}

pub struct WebSocketServer {
    listener: TcpListener,
    path: String,
}

impl WebSocketServer {
    /// Bind the listener. Upgrades are only accepted on `path`.
    pub async fn bind(addr: SocketAddr, path: impl Into<String>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::from_listener(listener, path))
    }

    pub fn from_listener(listener: TcpListener, path: impl Into<String>) -> Self {
        Self {
            listener,
            path: path.into(),
        }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections forever, one task per connection.
    pub async fn serve(self, app: Arc<App>) {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };
            let app = app.clone();
            let path = self.path.clone();
            tokio::spawn(
                async move {
                    let ws = match upgrade(stream, path).await {
                        Ok(ws) => ws,
                        Err(err) => {
                            debug!(error = %err, "websocket upgrade failed");
                            return;
                        }
                    };
                    info!("websocket connected");
                    let (source, sink) = split(ws);
                    app.serve_connection(source, sink).await;
                }
                .instrument(info_span!("peer", %peer)),
            );
        }
    }
}

async fn upgrade(stream: TcpStream, path: String) -> Result<WebSocketStream<TcpStream>, WsError> {
    let check_path = move |request: &Request, response: Response| {
        if request.uri().path() == path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };
    timeout(HANDSHAKE_TIMEOUT, accept_hdr_async(stream, check_path))
        .await
        .map_err(|_| WsError::Io(io::Error::new(io::ErrorKind::TimedOut, "handshake timed out")))?
}
