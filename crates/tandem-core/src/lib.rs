//! tandem-core: the per-connection core of the tandem RPC runtime.
//!
//! Two peers on one message-framed duplex stream (typically a WebSocket)
//! each hold a [`Service`]. Both sides call and serve at the same time,
//! with many concurrent in-flight requests multiplexed through a compact
//! self-describing envelope and a per-connection session table.
//!
//! This crate defines:
//! - The wire envelope ([`Envelope`], [`Direction`])
//! - The schema facility ([`SchemaFile`], [`MessageDescriptor`],
//!   [`SchemaMessage`], [`schema_file!`])
//! - The per-connection service ([`Service`]): handler registry, session
//!   table, dispatch engine, and single-writer outbound queue
//! - The transport seam ([`Transport`]) and an in-memory transport
//!   ([`MemTransport`]) for tests and demos
//! - The error taxonomy ([`RpcError`], [`TransportError`])
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tandem_core::{MemTransport, Service};
//!
//! let (left, right) = MemTransport::pair();
//! let (left, right) = (Arc::new(left), Arc::new(right));
//! let alice = Service::new(left.clone());
//! let bob = Service::new(right.clone());
//!
//! // Bob serves Ping; the owner of each connection runs the read loop.
//! bob.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce);
//! tokio::spawn({
//!     let (right, bob) = ((*right).clone(), bob.clone());
//!     async move {
//!         while let Ok(frame) = right.recv().await {
//!             if bob.dispatch(&frame).is_err() {
//!                 break;
//!             }
//!         }
//!     }
//! });
//!
//! let pong: Pong = alice.call(&Ping { nonce: 42 }).await?;
//! ```

#![forbid(unsafe_op_in_unsafe_fn)]

mod calls;
mod envelope;
mod error;
mod queue;
mod registry;
mod schema;
mod service;
mod transport;

pub use envelope::{Direction, Envelope};
pub use error::{RpcError, TransportError};
pub use schema::{MessageDescriptor, SchemaFile, SchemaMessage};
pub use service::Service;
pub use transport::{MemTransport, Transport};
