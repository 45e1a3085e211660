//! The wire envelope wrapping every frame.
//!
//! One transport message carries exactly one envelope, in protobuf canonical
//! form:
//!
//! ```text
//! Envelope {
//!   direction : enum { caller = 0, callee = 1 }   // field 1
//!   session   : uint32                            // field 2
//!   message   : string, fully-qualified type name // field 3
//!   payload   : bytes, serialized `message` value // field 4
//! }
//! ```
//!
//! All four fields are required. An inbound envelope that is missing any of
//! them, or that carries an unknown direction tag, does not parse.

use bytes::Bytes;
use prost::Message;

use crate::RpcError;

/// Whether an envelope invokes the peer or answers an earlier invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Direction {
    /// "I am invoking you": `session` is the caller's freshly issued slot id.
    Caller = 0,
    /// "I am replying": `session` echoes the original caller session.
    Callee = 1,
}

/// Raw wire form. Fields are modeled as optional so presence can be checked
/// after decode; the schema treats all four as required.
#[derive(Clone, PartialEq, Message)]
struct WireEnvelope {
    #[prost(enumeration = "Direction", optional, tag = "1")]
    direction: Option<i32>,
    #[prost(uint32, optional, tag = "2")]
    session: Option<u32>,
    #[prost(string, optional, tag = "3")]
    message: Option<String>,
    #[prost(bytes = "bytes", optional, tag = "4")]
    payload: Option<Bytes>,
}

/// One validated frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Caller or callee path.
    pub direction: Direction,
    /// Slot id of the call this frame belongs to.
    pub session: u32,
    /// Fully-qualified schema name of the payload type.
    pub message: String,
    /// Serialized payload, passed through opaquely.
    pub payload: Bytes,
}

impl Envelope {
    /// Serialize to the canonical wire form.
    pub fn encode(&self) -> Bytes {
        let wire = WireEnvelope {
            direction: Some(self.direction as i32),
            session: Some(self.session),
            message: Some(self.message.clone()),
            payload: Some(self.payload.clone()),
        };
        wire.encode_to_vec().into()
    }

    /// Parse and validate one frame.
    pub fn decode(frame: &[u8]) -> Result<Self, RpcError> {
        let wire = WireEnvelope::decode(frame).map_err(|_| RpcError::ParseEnvelopeFailed)?;
        let (Some(direction), Some(session), Some(message), Some(payload)) =
            (wire.direction, wire.session, wire.message, wire.payload)
        else {
            return Err(RpcError::ParseEnvelopeFailed);
        };
        let direction =
            Direction::try_from(direction).map_err(|_| RpcError::ParseEnvelopeFailed)?;
        Ok(Self {
            direction,
            session,
            message,
            payload,
        })
    }
}
