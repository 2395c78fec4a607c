//! Clients for the membership registry.
//!
//! A node talks to the registry through [`RegistryClient`]: in-process via a
//! [`ServiceHandle`] when the daemon embeds the registry, or over TCP with
//! [`TcpRegistryClient`] when the registry runs elsewhere.

use crate::error::ClientError;
use crate::sync::service::ServiceHandle;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use meshchat_proto::{Request, Response, Wire, frame_codec};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, warn};

/// Request/response access to the registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, ClientError>;
}

#[async_trait]
impl RegistryClient for ServiceHandle {
    async fn call(&self, request: Request) -> Result<Response, ClientError> {
        ServiceHandle::call(self, request).await
    }
}

type FramedStream = Framed<TcpStream, LengthDelimitedCodec>;

/// Registry client over one TCP connection.
///
/// Calls are serialized on the connection. After a transport error the
/// connection is dropped and the next call reconnects.
pub struct TcpRegistryClient {
    addr: SocketAddr,
    conn: Mutex<Option<FramedStream>>,
}

impl TcpRegistryClient {
    /// Create a client. No connection is made until the first call.
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            conn: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn exchange(stream: &mut FramedStream, bytes: Vec<u8>) -> Result<Response, ClientError> {
        stream.send(Bytes::from(bytes)).await?;
        let frame = stream.next().await.ok_or(ClientError::Disconnected)??;
        Ok(Response::decode(&frame)?)
    }
}

#[async_trait]
impl RegistryClient for TcpRegistryClient {
    async fn call(&self, request: Request) -> Result<Response, ClientError> {
        let bytes = request.encode()?;
        let mut conn = self.conn.lock().await;

        if conn.is_none() {
            let stream = TcpStream::connect(self.addr).await?;
            stream.set_nodelay(true)?;
            debug!(addr = %self.addr, "Connected to registry");
            *conn = Some(Framed::new(stream, frame_codec()));
        }
        let Some(stream) = conn.as_mut() else {
            return Err(ClientError::Disconnected);
        };

        match Self::exchange(stream, bytes).await {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!(addr = %self.addr, error = %e, "Registry call failed, dropping connection");
                *conn = None;
                Err(e)
            }
        }
    }
}
