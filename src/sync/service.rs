//! Serial request loops.
//!
//! Each component (a node or the registry) answers requests one at a time:
//! the next request is not taken off the queue until the current reply has
//! been produced. Callers hold a [`ServiceHandle`] and await the reply.

use crate::error::ClientError;
use crate::telemetry::{RequestTimer, spans};
use meshchat_proto::{Request, Response};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info};

/// Requests queued ahead of the loop before callers start waiting.
const REQUEST_QUEUE_CAPACITY: usize = 1024;

/// A component that answers requests.
pub trait Service: Send + Sync + 'static {
    /// Component label for metrics and logs.
    fn component(&self) -> &'static str;

    /// Handle one request and produce its reply.
    fn handle(&self, request: Request) -> Response;
}

struct Call {
    request: Request,
    reply: oneshot::Sender<Response>,
}

/// Cloneable entry point into a running request loop.
#[derive(Clone)]
pub struct ServiceHandle {
    tx: mpsc::Sender<Call>,
}

impl ServiceHandle {
    /// Queue a request and wait for its reply.
    pub async fn call(&self, request: Request) -> Result<Response, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Call { request, reply })
            .await
            .map_err(|_| ClientError::Closed)?;
        rx.await.map_err(|_| ClientError::Closed)
    }

    /// Whether the loop behind this handle has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Spawn the request loop for `service`.
///
/// The loop ends on shutdown or once every handle has been dropped.
pub fn spawn_request_loop<S: Service>(
    service: Arc<S>,
    mut shutdown: broadcast::Receiver<()>,
    span: Span,
) -> (ServiceHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<Call>(REQUEST_QUEUE_CAPACITY);

    let task = tokio::spawn(
        async move {
            info!("Request loop started");
            loop {
                tokio::select! {
                    _ = shutdown.recv() => {
                        info!("Request loop shutting down");
                        break;
                    }
                    call = rx.recv() => {
                        let Some(Call { request, reply }) = call else {
                            debug!("All handles dropped, request loop exiting");
                            break;
                        };
                        let response = {
                            let span = spans::request(request.service(), request.clock());
                            let _guard = span.enter();
                            let _timer = RequestTimer::new(service.component(), request.service());
                            service.handle(request)
                        };
                        // The caller may have given up; that is not our problem.
                        let _ = reply.send(response);
                    }
                }
            }
        }
        .instrument(span),
    );

    (ServiceHandle { tx }, task)
}
