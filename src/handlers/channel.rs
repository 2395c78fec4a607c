//! Channel creation and listing.

use super::Context;
use crate::db::{self, Collection};
use crate::error::{ServiceError, ServiceResult};
use meshchat_proto::{ChannelRequest, Response, Status};
use tracing::info;

/// `channel`: create a channel on this node.
pub(super) fn create(ctx: &mut Context<'_>, req: ChannelRequest) -> ServiceResult<Response> {
    if req.channel.is_empty() {
        return Err(ServiceError::ChannelNameRequired);
    }
    if ctx.state.channels.contains(&req.channel) {
        return Err(ServiceError::ChannelExists);
    }

    ctx.state.channels.insert(req.channel.clone());
    db::save(ctx.store, Collection::Channels, &ctx.state.channels);

    info!(node = %ctx.node, channel = %req.channel, "Channel created");
    Ok(Response::status("channel", Status::Success, ctx.clock.tick()))
}

/// `channels`: every channel known locally, in first-seen order.
pub(super) fn list(ctx: &mut Context<'_>) -> Response {
    Response::channels(ctx.state.channels.to_vec(), ctx.clock.tick())
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use meshchat_proto::{Reply, Request, Status};

    #[test]
    fn test_create_and_list() {
        let mut h = Harness::new();
        let created = h.run(Request::channel("general", 0));
        assert_eq!(created.service, "channel");
        assert_eq!(created.status_code(), Some(Status::Success));

        h.run(Request::channel("random", 0));
        let listing = h.run(Request::channels(0));
        match listing.data {
            Reply::Channels(reply) => assert_eq!(reply.channels, vec!["general", "random"]),
            other => panic!("expected channels reply, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_channel_is_rejected() {
        let mut h = Harness::new();
        h.run(Request::channel("general", 0));
        let response = h.run(Request::channel("general", 0));

        assert_eq!(response.description(), Some("channel already exists"));
        assert_eq!(h.state.channels.len(), 1);
    }

    #[test]
    fn test_empty_channel_name_is_rejected() {
        let mut h = Harness::new();
        let response = h.run(Request::channel("", 0));

        assert_eq!(response.description(), Some("channel name required"));
        assert!(h.state.channels.is_empty());
    }
}
