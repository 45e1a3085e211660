//! Transport seam: one message-framed duplex byte stream.

use std::future::Future;

use bytes::Bytes;

use crate::TransportError;

mod mem;

pub use mem::MemTransport;

/// A message-framed duplex byte stream, typically a WebSocket.
///
/// Transports are responsible for delivering whole frames reliably and in
/// order. They are NOT responsible for RPC semantics, connection
/// establishment, or teardown; those belong to their owner.
///
/// The service owns write sequencing: `send` is never invoked again until
/// the previous send's future has resolved.
pub trait Transport: Send + Sync + 'static {
    /// Submit one frame to the peer.
    fn send(&self, frame: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;
}
