//! tandem-transport-websocket: WebSocket transport for the tandem RPC core.
//!
//! Frames travel as WebSocket binary messages, one envelope per message;
//! the WebSocket layer supplies the framing, so no extra length prefix is
//! needed.

#![forbid(unsafe_op_in_unsafe_fn)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::Mutex as AsyncMutex;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::{self, Message};

use tandem_core::{RpcError, Service, Transport, TransportError};

/// WebSocket-based transport.
///
/// Works with any WebSocket stream (TCP, TLS, in-process duplex). The send
/// half is serialized by the service's write queue; the receive half is
/// meant to be drained by a single read loop, typically [`drive`].
pub struct WebSocketTransport<S> {
    inner: Arc<WebSocketInner<S>>,
}

impl<S> Clone for WebSocketTransport<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

struct WebSocketInner<S> {
    /// Write half (async mutex: held across awaits).
    sink: AsyncMutex<SplitSink<WebSocketStream<S>, Message>>,
    /// Read half (async mutex: held across awaits).
    stream: AsyncMutex<SplitStream<WebSocketStream<S>>>,
    closed: AtomicBool,
}

impl<S> WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established WebSocket stream.
    pub fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        Self {
            inner: Arc::new(WebSocketInner {
                sink: AsyncMutex::new(sink),
                stream: AsyncMutex::new(stream),
                closed: AtomicBool::new(false),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Receive the next data frame, typically to feed `Service::dispatch`.
    ///
    /// Control frames are skipped; a close frame or a closed socket yields
    /// [`TransportError::Closed`].
    pub async fn recv(&self) -> Result<Bytes, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut stream = self.inner.stream.lock().await;
        loop {
            let message = match stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(err)) => return Err(map_ws_error(err)),
                None => {
                    self.inner.closed.store(true, Ordering::Release);
                    return Err(TransportError::Closed);
                }
            };

            match message {
                Message::Binary(data) => return Ok(data),
                Message::Text(text) => return Ok(Bytes::from(text.as_str().to_owned())),
                Message::Close(_) => {
                    self.inner.closed.store(true, Ordering::Release);
                    return Err(TransportError::Closed);
                }
                // Ping/pong bookkeeping happens inside tungstenite.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    /// Send a close frame and stop accepting traffic.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.inner.closed.store(true, Ordering::Release);
        let mut sink = self.inner.sink.lock().await;
        sink.close().await.map_err(map_ws_error)
    }
}

impl WebSocketTransport<tokio::io::DuplexStream> {
    /// Connected pair over an in-process duplex stream, with a real
    /// WebSocket handshake. For tests.
    pub async fn pair() -> (Self, Self) {
        let (client_stream, server_stream) = tokio::io::duplex(64 * 1024);

        let (ws_client, ws_server) = tokio::join!(
            async {
                tokio_tungstenite::client_async("ws://localhost/", client_stream)
                    .await
                    .expect("client handshake failed")
                    .0
            },
            async {
                tokio_tungstenite::accept_async(server_stream)
                    .await
                    .expect("server handshake failed")
            }
        );

        (Self::new(ws_client), Self::new(ws_server))
    }
}

impl<S> Transport for WebSocketTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut sink = self.inner.sink.lock().await;
        sink.send(Message::Binary(frame)).await.map_err(|err| {
            self.inner.closed.store(true, Ordering::Release);
            map_ws_error(err)
        })
    }
}

fn map_ws_error(err: tungstenite::Error) -> TransportError {
    match err {
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            TransportError::Closed
        }
        tungstenite::Error::Io(io) => TransportError::Io(io),
        other => TransportError::Io(std::io::Error::other(other)),
    }
}

/// Read loop: feed every inbound frame into `service` until the peer hangs
/// up or dispatch fails.
///
/// On a transport read error the session is aborted so outstanding calls
/// fail promptly instead of waiting for their next write.
pub async fn drive<S>(
    transport: WebSocketTransport<S>,
    service: Service<WebSocketTransport<S>>,
) -> Result<(), RpcError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static,
{
    loop {
        let frame = match transport.recv().await {
            Ok(frame) => frame,
            Err(TransportError::Closed) => {
                tracing::debug!("websocket closed, read loop done");
                return Ok(());
            }
            Err(err) => {
                let err = RpcError::from(err);
                tracing::warn!(error = %err, "websocket read failed, aborting session");
                service.abort(err.clone());
                return Err(err);
            }
        };
        service.dispatch(&frame)?;
    }
}
