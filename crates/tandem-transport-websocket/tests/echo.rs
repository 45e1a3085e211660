//! RPC end to end over a real WebSocket handshake.

use std::sync::Arc;

use tandem_core::Service;
use tandem_transport_websocket::{WebSocketTransport, drive};

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
    static WS_TEST: "tandem.test.websocket" {
        Ping = "tandem.test.websocket.Ping",
        Pong = "tandem.test.websocket.Pong",
    }
}

type WsService = Service<WebSocketTransport<tokio::io::DuplexStream>>;

async fn connected_pair() -> (WsService, WsService) {
    let (client, server) = WebSocketTransport::pair().await;
    let (client, server) = (Arc::new(client), Arc::new(server));
    let alice = Service::new(client.clone());
    let bob = Service::new(server.clone());
    tokio::spawn(drive((*client).clone(), alice.clone()));
    tokio::spawn(drive((*server).clone(), bob.clone()));
    (alice, bob)
}

#[tokio::test]
async fn call_over_websocket() {
    let (alice, bob) = connected_pair().await;
    bob.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce + 1);

    let pong: Pong = alice.call(&Ping { nonce: 41 }).await.unwrap();
    assert_eq!(pong.nonce, 42);
}

#[tokio::test]
async fn both_directions_over_one_socket() {
    let (alice, bob) = connected_pair().await;
    alice.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce * 3);
    bob.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce + 1);

    let from_bob: Pong = alice.call(&Ping { nonce: 1 }).await.unwrap();
    let from_alice: Pong = bob.call(&Ping { nonce: 2 }).await.unwrap();
    assert_eq!(from_bob.nonce, 2);
    assert_eq!(from_alice.nonce, 6);

    let interleaved: Vec<_> = (0..8u64)
        .map(|nonce| {
            let alice = alice.clone();
            tokio::spawn(async move { alice.call::<Ping, Pong>(&Ping { nonce }).await })
        })
        .collect();
    for (nonce, call) in interleaved.into_iter().enumerate() {
        assert_eq!(call.await.unwrap().unwrap().nonce, nonce as u64 + 1);
    }
}

#[tokio::test]
async fn peer_hangup_closes_the_read_loop() {
    let (client, server) = WebSocketTransport::pair().await;
    let (client, server) = (Arc::new(client), Arc::new(server));
    let alice = Service::new(client.clone());
    let reader = tokio::spawn(drive((*client).clone(), alice.clone()));

    server.close().await.unwrap();
    drop(server);

    assert!(reader.await.unwrap().is_ok());
}
