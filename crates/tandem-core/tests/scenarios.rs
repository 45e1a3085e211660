//! End-to-end dispatch scenarios against a frame-capturing transport.

use std::sync::Arc;

use bytes::Bytes;
use prost::Message;
use tokio::sync::mpsc;

use tandem_core::{Direction, Envelope, RpcError, Service, Transport, TransportError};

#[derive(Clone, PartialEq, prost::Message)]
struct Ping {
    #[prost(uint64, tag = "1")]
    nonce: u64,
}

#[derive(Clone, PartialEq, prost::Message)]
struct Pong {
    #[prost(uint64, tag = "1")]
    nonce: u64,
}

tandem_core::schema_file! {
    static WIRE_TEST: "tandem.test.wire" {
        Ping = "tandem.test.wire.Ping",
        Pong = "tandem.test.wire.Pong",
    }
}

/// Parks every sent frame on a channel for the test to inspect.
struct SinkTransport {
    tx: mpsc::UnboundedSender<Bytes>,
}

impl SinkTransport {
    fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl Transport for SinkTransport {
    async fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        self.tx.send(frame).map_err(|_| TransportError::Closed)
    }
}

fn echo_service() -> (Service<SinkTransport>, mpsc::UnboundedReceiver<Bytes>) {
    let (transport, outbound) = SinkTransport::new();
    let service = Service::new(transport);
    service.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce);
    (service, outbound)
}

fn pong_reply(session: u32, nonce: u64) -> Bytes {
    Envelope {
        direction: Direction::Callee,
        session,
        message: "tandem.test.wire.Pong".to_owned(),
        payload: Pong { nonce }.encode_to_vec().into(),
    }
    .encode()
}

#[tokio::test]
async fn handshake_call_and_session_recycling() {
    let (service, mut outbound) = echo_service();

    let caller = service.clone();
    let call =
        tokio::spawn(async move { caller.call::<Ping, Pong>(&Ping { nonce: 42 }).await });

    let frame = outbound.recv().await.unwrap();
    let envelope = Envelope::decode(&frame).unwrap();
    assert_eq!(envelope.direction, Direction::Caller);
    assert_eq!(envelope.session, 0);
    assert_eq!(envelope.message, "tandem.test.wire.Ping");
    let sent = Ping::decode(envelope.payload.as_ref()).unwrap();
    assert_eq!(sent.nonce, 42);

    // Feed back the reply the peer would produce.
    let reply = pong_reply(0, 42);
    assert_eq!(service.dispatch(&reply).unwrap(), reply.len());

    let pong = call.await.unwrap().unwrap();
    assert_eq!(pong.nonce, 42);
    assert_eq!(service.free_sessions(), vec![0]);

    // The very next call reuses the freed id instead of growing the table.
    let caller = service.clone();
    let call =
        tokio::spawn(async move { caller.call::<Ping, Pong>(&Ping { nonce: 7 }).await });

    let frame = outbound.recv().await.unwrap();
    let envelope = Envelope::decode(&frame).unwrap();
    assert_eq!(envelope.session, 0);

    service.dispatch(&pong_reply(0, 7)).unwrap();
    assert_eq!(call.await.unwrap().unwrap().nonce, 7);
    assert!(service.pending_sessions().is_empty());
}

#[tokio::test]
async fn unknown_method_aborts_outstanding_calls() {
    let (service, mut outbound) = echo_service();

    let caller = service.clone();
    let call =
        tokio::spawn(async move { caller.call::<Ping, Pong>(&Ping { nonce: 1 }).await });
    outbound.recv().await.unwrap();

    let request = Envelope {
        direction: Direction::Caller,
        session: 3,
        message: "tandem.test.wire.DoesNotExist".to_owned(),
        payload: Bytes::new(),
    };
    let err = service.dispatch(&request.encode()).unwrap_err();
    assert!(matches!(err, RpcError::UnknownProtocolDescriptor));

    // The outstanding call fails with the same error.
    let result = call.await.unwrap();
    assert!(matches!(result, Err(RpcError::UnknownProtocolDescriptor)));
    assert!(service.pending_sessions().is_empty());
}

#[tokio::test]
async fn malformed_request_payload_aborts() {
    let (service, _outbound) = echo_service();

    let request = Envelope {
        direction: Direction::Caller,
        session: 0,
        message: "tandem.test.wire.Ping".to_owned(),
        // Field header with no value.
        payload: Bytes::from_static(&[0x08]),
    };
    let err = service.dispatch(&request.encode()).unwrap_err();
    assert!(matches!(err, RpcError::ParsePayloadFailed));
}

#[tokio::test]
async fn stale_session_is_out_of_range() {
    let (service, _outbound) = echo_service();

    let err = service.dispatch(&pong_reply(999, 0)).unwrap_err();
    assert!(matches!(err, RpcError::SessionOutOfRange));
}

#[tokio::test]
async fn reply_to_completed_session_is_invalid() {
    let (service, mut outbound) = echo_service();

    let caller = service.clone();
    let call =
        tokio::spawn(async move { caller.call::<Ping, Pong>(&Ping { nonce: 9 }).await });
    outbound.recv().await.unwrap();
    service.dispatch(&pong_reply(0, 9)).unwrap();
    call.await.unwrap().unwrap();

    // Session 0 exists but was recycled; answering it again is a protocol
    // violation.
    let err = service.dispatch(&pong_reply(0, 9)).unwrap_err();
    assert!(matches!(err, RpcError::InvalidSession));
}

#[tokio::test]
async fn malformed_reply_payload_fails_that_call_and_aborts() {
    let (service, mut outbound) = echo_service();

    let first = service.clone();
    let first = tokio::spawn(async move { first.call::<Ping, Pong>(&Ping { nonce: 1 }).await });
    let second = service.clone();
    let second =
        tokio::spawn(async move { second.call::<Ping, Pong>(&Ping { nonce: 2 }).await });
    outbound.recv().await.unwrap();
    outbound.recv().await.unwrap();

    let broken = Envelope {
        direction: Direction::Callee,
        session: 0,
        message: "tandem.test.wire.Pong".to_owned(),
        payload: Bytes::from_static(&[0x08]),
    };
    let err = service.dispatch(&broken.encode()).unwrap_err();
    assert!(matches!(err, RpcError::ParsePayloadFailed));

    // Both the addressed call and the unrelated one complete with the error.
    assert!(matches!(
        first.await.unwrap(),
        Err(RpcError::ParsePayloadFailed)
    ));
    assert!(matches!(
        second.await.unwrap(),
        Err(RpcError::ParsePayloadFailed)
    ));
}

#[tokio::test]
async fn locally_emitted_envelopes_round_trip_through_dispatch() {
    let (service, mut outbound) = echo_service();

    let caller = service.clone();
    let call =
        tokio::spawn(async move { caller.call::<Ping, Pong>(&Ping { nonce: 5 }).await });

    // Feed our own request back in: the bound handler answers it.
    let request = outbound.recv().await.unwrap();
    service.dispatch(&request).unwrap();

    let reply = outbound.recv().await.unwrap();
    let envelope = Envelope::decode(&reply).unwrap();
    assert_eq!(envelope.direction, Direction::Callee);
    assert_eq!(envelope.session, 0);
    assert_eq!(envelope.message, "tandem.test.wire.Pong");
    let pong = Pong::decode(envelope.payload.as_ref()).unwrap();
    assert_eq!(pong.nonce, 5);

    // And the reply completes our own call.
    service.dispatch(&reply).unwrap();
    assert_eq!(call.await.unwrap().unwrap().nonce, 5);
}
