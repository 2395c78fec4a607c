//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds a socket in front of one component (a node or the
//! registry) and spawns a [`Connection`] task for every peer.

use crate::network::Connection;
use crate::sync::service::ServiceHandle;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{Instrument, error, info};

/// Accepts peers for one component.
pub struct Gateway {
    listener: TcpListener,
    handle: ServiceHandle,
    label: String,
}

impl Gateway {
    /// Bind the gateway to `addr`. Port 0 picks a free port.
    pub async fn bind(
        addr: SocketAddr,
        handle: ServiceHandle,
        label: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let label = label.into();
        info!(address = %listener.local_addr()?, component = %label, "Listener bound");
        Ok(Self {
            listener,
            handle,
            label,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => {
                    info!(component = %self.label, "Gateway shutting down");
                    break;
                }
                accepted = self.listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    let id = uuid::Uuid::new_v4().to_string();
                    let span = crate::telemetry::spans::connection(&id, &addr.to_string());
                    let connection = Connection::new(id, stream, addr, self.handle.clone());
                    let shutdown = shutdown.resubscribe();

                    tokio::spawn(
                        async move {
                            if let Err(e) = connection.run(shutdown).await {
                                error!(%addr, error = %e, "Connection error");
                            }
                        }
                        .instrument(span),
                    );
                }
                Err(e) => {
                    error!(component = %self.label, error = %e, "Failed to accept connection");
                }
            }
        }
    }
}
