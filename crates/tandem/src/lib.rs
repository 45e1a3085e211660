//! tandem: bidirectional typed RPC over a single duplex connection.
//!
//! Both peers on one connection act as caller and callee at the same time.
//! Each side holds a [`Service`], binds handlers for the requests it serves,
//! and awaits [`Service::call`] for the requests it makes; many calls may be
//! in flight at once over the same connection.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tandem::prelude::*;
//! use tandem::MemTransport;
//!
//! #[derive(Clone, PartialEq, prost::Message)]
//! struct Ping {
//!     #[prost(uint64, tag = "1")]
//!     nonce: u64,
//! }
//!
//! #[derive(Clone, PartialEq, prost::Message)]
//! struct Pong {
//!     #[prost(uint64, tag = "1")]
//!     nonce: u64,
//! }
//!
//! schema_file! {
//!     static GREETER: "demo.greeter" {
//!         Ping = "demo.greeter.Ping",
//!         Pong = "demo.greeter.Pong",
//!     }
//! }
//!
//! let (left, right) = MemTransport::pair();
//! let service = Service::new(Arc::new(left));
//! service.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce);
//! // Feed inbound frames to `service.dispatch(..)` from your read loop,
//! // then: let pong: Pong = service.call(&Ping { nonce: 42 }).await?;
//! ```
//!
//! # Transports
//!
//! The core speaks to any [`Transport`]; implementations ship separately:
//!
//! - [`MemTransport`] (built in): in-process pair for tests and demos
//! - `WebSocketTransport` (feature `websocket`): one envelope per binary
//!   WebSocket message

#![forbid(unsafe_op_in_unsafe_fn)]

pub use tandem_core::{
    Direction, Envelope, MemTransport, MessageDescriptor, RpcError, SchemaFile, SchemaMessage,
    Service, Transport, TransportError, schema_file,
};

/// Transport implementations.
pub mod transport {
    pub use tandem_core::MemTransport;

    #[cfg(feature = "websocket")]
    pub use tandem_transport_websocket::{WebSocketTransport, drive};
}

#[cfg(feature = "websocket")]
pub use tandem_transport_websocket::WebSocketTransport;

/// Convenient imports for the common case.
pub mod prelude {
    pub use crate::schema_file;
    pub use crate::{RpcError, SchemaMessage, Service, Transport, TransportError};
}
