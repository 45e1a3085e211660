//! Two in-process peers calling each other over the memory transport.
//!
//! Run with `cargo run --example echo`.

use std::sync::Arc;

use tandem::MemTransport;
use tandem::prelude::*;

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

schema_file! {
    static ECHO: "tandem.examples.echo" {
        Ping = "tandem.examples.echo.Ping",
        Pong = "tandem.examples.echo.Pong",
    }
}

/// Owner-side read loop: every inbound frame goes to dispatch.
async fn pump(transport: MemTransport, service: Service<MemTransport>) {
    while let Ok(frame) = transport.recv().await {
        if service.dispatch(&frame).is_err() {
            break;
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let (left, right) = MemTransport::pair();
    let (left, right) = (Arc::new(left), Arc::new(right));
    let alice = Service::new(left.clone());
    let bob = Service::new(right.clone());

    // Both sides serve Ping, each with its own flavor.
    alice.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce * 2);
    bob.bind(|ping: &Ping, pong: &mut Pong| pong.nonce = ping.nonce + 1);

    tokio::spawn(pump((*left).clone(), alice.clone()));
    tokio::spawn(pump((*right).clone(), bob.clone()));

    let pong: Pong = alice.call(&Ping { nonce: 41 }).await.expect("call bob");
    println!("alice asked 41, bob answered {}", pong.nonce);

    let pong: Pong = bob.call(&Ping { nonce: 21 }).await.expect("call alice");
    println!("bob asked 21, alice answered {}", pong.nonce);
}
