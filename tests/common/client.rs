//! Test client.
//!
//! Speaks the framed envelope protocol to a node or the registry and keeps a
//! Lamport clock of its own, the way a real client would.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use meshchat_proto::{Request, Response, Wire, frame_codec};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

/// A test client connected to one gateway.
pub struct TestClient {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    clock: u64,
}

impl TestClient {
    /// Connect to a gateway.
    pub async fn connect(addr: SocketAddr) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self {
            framed: Framed::new(stream, frame_codec()),
            clock: 0,
        })
    }

    /// Current client clock.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    /// Advance the client clock and return the new value.
    pub fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    /// Send one raw frame.
    pub async fn send_raw(&mut self, bytes: Vec<u8>) -> anyhow::Result<()> {
        self.framed.send(Bytes::from(bytes)).await?;
        Ok(())
    }

    /// Send a request.
    pub async fn send(&mut self, request: Request) -> anyhow::Result<()> {
        self.send_raw(request.encode()?).await
    }

    /// Receive a single reply.
    pub async fn recv(&mut self) -> anyhow::Result<Response> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a reply with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Response> {
        let frame = timeout(dur, self.framed.next())
            .await?
            .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
        let response = Response::decode(&frame)?;
        self.clock = self.clock.max(response.clock()) + 1;
        Ok(response)
    }

    /// Send a request built from a fresh clock tick and wait for the reply.
    pub async fn call<F>(&mut self, build: F) -> anyhow::Result<Response>
    where
        F: FnOnce(u64) -> Request,
    {
        let request = build(self.tick());
        self.send(request).await?;
        self.recv().await
    }
}
