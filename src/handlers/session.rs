//! Login and user listing.

use super::{Context, timestamp_or_now};
use crate::db::{self, Collection};
use crate::error::{ServiceError, ServiceResult};
use crate::state::LoginRecord;
use meshchat_proto::{LoginRequest, Response, Status};
use tracing::info;

/// `login`: claim a username on this node.
pub(super) fn login(ctx: &mut Context<'_>, req: LoginRequest) -> ServiceResult<Response> {
    if req.user.is_empty() {
        return Err(ServiceError::UsernameRequired);
    }
    if ctx.state.users.contains(&req.user) {
        return Err(ServiceError::UserExists);
    }

    ctx.state.users.insert(req.user.clone());
    ctx.state.logins.push(LoginRecord {
        user: req.user.clone(),
        timestamp: timestamp_or_now(req.timestamp),
    });
    db::save(ctx.store, Collection::Users, &ctx.state.users);
    db::save(ctx.store, Collection::Logins, &ctx.state.logins);

    info!(node = %ctx.node, user = %req.user, "User logged in");
    Ok(Response::status("login", Status::Success, ctx.clock.tick()))
}

/// `users`: every username known locally, in first-seen order.
pub(super) fn users(ctx: &mut Context<'_>) -> Response {
    Response::users(ctx.state.users.to_vec(), ctx.clock.tick())
}
