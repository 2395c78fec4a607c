//! Application-server request handlers.
//!
//! Handlers run with the node state locked and borrowed through a
//! [`Context`]. A handler either returns the success reply or a
//! [`ServiceError`], which [`dispatch`] turns into a structured error reply.
//! Every reply carries a fresh clock tick.

mod channel;
mod messaging;
mod session;

use crate::db::Store;
use crate::error::{ServiceError, ServiceResult};
use crate::state::NodeState;
use crate::sync::fabric::EventBus;
use meshchat_proto::{Request, Response, SharedClock};
use tracing::debug;

/// Everything a handler may touch while the node state is locked.
pub struct Context<'a> {
    /// Name of the node handling the request.
    pub node: &'a str,
    pub state: &'a mut NodeState,
    pub clock: &'a SharedClock,
    pub store: &'a dyn Store,
    pub bus: &'a dyn EventBus,
}

/// Route a request to its handler and build the reply.
///
/// The caller has already observed the request clock.
pub fn dispatch(ctx: &mut Context<'_>, request: Request) -> Response {
    let service = request.service().to_string();

    let result: ServiceResult<Response> = match request {
        Request::Login(req) => session::login(ctx, req),
        Request::Users(_) => Ok(session::users(ctx)),
        Request::Channel(req) => channel::create(ctx, req),
        Request::Channels(_) => Ok(channel::list(ctx)),
        Request::Publish(req) => messaging::publish(ctx, req),
        Request::Message(req) => messaging::message(ctx, req),
        Request::Rank(_) | Request::Heartbeat(_) | Request::List(_) | Request::Unknown(_) => {
            Err(ServiceError::UnknownService)
        }
    };

    result.unwrap_or_else(|e| {
        debug!(node = %ctx.node, service = %service, error = %e, "Request rejected");
        crate::metrics::record_request_error("node", &service, e.error_code());
        Response::error(service, e.to_string(), ctx.clock.tick())
    })
}

/// The client-supplied timestamp, or now when the client sent none.
fn timestamp_or_now(timestamp: f64) -> f64 {
    if timestamp > 0.0 {
        timestamp
    } else {
        meshchat_proto::unix_timestamp()
    }
}
