//! Connection - serves one framed peer.
//!
//! Each inbound frame holds one request envelope. The connection decodes it,
//! queues it on the component's request loop and writes the reply back as one
//! frame. Frames that do not decode are logged and dropped; the connection
//! keeps reading.

use crate::error::ClientError;
use crate::sync::service::ServiceHandle;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use meshchat_proto::{Request, Wire, frame_codec};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// One accepted peer.
pub struct Connection {
    id: String,
    addr: SocketAddr,
    stream: TcpStream,
    handle: ServiceHandle,
}

impl Connection {
    pub fn new(id: String, stream: TcpStream, addr: SocketAddr, handle: ServiceHandle) -> Self {
        Self {
            id,
            addr,
            stream,
            handle,
        }
    }

    /// Serve requests until the peer hangs up, the component stops, or
    /// shutdown is signalled.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> anyhow::Result<()> {
        self.stream.set_nodelay(true)?;
        let mut framed = Framed::new(self.stream, frame_codec());
        info!("Peer connected");

        loop {
            let frame = tokio::select! {
                _ = shutdown.recv() => {
                    debug!("Connection closing for shutdown");
                    break;
                }
                frame = framed.next() => frame,
            };

            let bytes = match frame {
                Some(Ok(bytes)) => bytes,
                Some(Err(e)) => {
                    // Framing errors leave the stream position unknown.
                    warn!(error = %e, "Frame read failed, closing connection");
                    crate::metrics::record_dropped_frame("framing");
                    break;
                }
                None => {
                    debug!("Peer closed the connection");
                    break;
                }
            };

            let request = match Request::decode(&bytes) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, len = bytes.len(), "Dropping undecodable frame");
                    crate::metrics::record_dropped_frame(e.error_code());
                    continue;
                }
            };

            let response = match self.handle.call(request).await {
                Ok(response) => response,
                Err(ClientError::Closed) => {
                    debug!("Request loop stopped, closing connection");
                    break;
                }
                Err(e) => return Err(e.into()),
            };

            let encoded = match response.encode() {
                Ok(encoded) => encoded,
                Err(e) => {
                    warn!(error = %e, service = %response.service, "Failed to encode reply");
                    crate::metrics::record_dropped_frame(e.error_code());
                    continue;
                }
            };
            framed.send(Bytes::from(encoded)).await?;
        }

        info!(id = %self.id, addr = %self.addr, "Peer disconnected");
        Ok(())
    }
}
