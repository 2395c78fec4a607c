//! Messaging handlers.
//!
//! Handles `publish` (channel posts) and `message` (point-to-point). On
//! success the stored record, the emitted event and the reply all carry the
//! same clock tick, taken while the node state is locked.

use super::{Context, timestamp_or_now};
use crate::db::{self, Collection};
use crate::error::{ServiceError, ServiceResult};
use meshchat_proto::{
    DirectMessage, Event, MessageRequest, Publication, PublishRequest, Response, Status,
};
use tracing::debug;

/// `publish`: post to a channel known on this node.
pub(super) fn publish(ctx: &mut Context<'_>, req: PublishRequest) -> ServiceResult<Response> {
    if !ctx.state.channels.contains(&req.channel) {
        return Err(ServiceError::NoSuchChannel);
    }

    let clock = ctx.clock.tick();
    let publication = Publication {
        user: req.user,
        channel: req.channel,
        message: req.message,
        timestamp: timestamp_or_now(req.timestamp),
        clock,
    };

    ctx.state.publications.push(publication.clone());
    db::save(ctx.store, Collection::Publications, &ctx.state.publications);

    debug!(node = %ctx.node, channel = %publication.channel, user = %publication.user, clock, "Publishing to channel");
    let topic = publication.channel.clone();
    ctx.bus.publish(&topic, Event::Publish(publication));

    Ok(Response::status("publish", Status::Ok, clock))
}

/// `message`: deliver to a user known on this node.
pub(super) fn message(ctx: &mut Context<'_>, req: MessageRequest) -> ServiceResult<Response> {
    if !ctx.state.users.contains(&req.dst) {
        return Err(ServiceError::NoSuchUser);
    }

    let clock = ctx.clock.tick();
    let message = DirectMessage {
        src: req.src,
        dst: req.dst,
        message: req.message,
        timestamp: timestamp_or_now(req.timestamp),
        clock,
    };

    ctx.state.messages.push(message.clone());
    db::save(ctx.store, Collection::Messages, &ctx.state.messages);

    debug!(node = %ctx.node, src = %message.src, dst = %message.dst, clock, "Delivering message");
    let topic = message.dst.clone();
    ctx.bus.publish(&topic, Event::Message(message));

    Ok(Response::status("message", Status::Ok, clock))
}
