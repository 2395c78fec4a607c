//! Multi-node behaviour: registration, gossip convergence and persistence.

mod common;

use common::{TestCluster, wait_until};
use meshchat_proto::{ElectionAnnouncement, Event, Reply, Request, SERVERS_TOPIC, Status};
use meshchatd::sync::fabric::EventBus;
use tempfile::TempDir;

#[tokio::test]
async fn test_nodes_register_in_start_order() {
    let cluster = TestCluster::start(&["alpha", "beta", "gamma"]).await.unwrap();

    assert_eq!(cluster.node("alpha").rank(), Some(1));
    assert_eq!(cluster.node("beta").rank(), Some(2));
    assert_eq!(cluster.node("gamma").rank(), Some(3));

    let registry = cluster.cluster.registry.as_ref().unwrap();
    let names: Vec<_> = registry.service.active().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["alpha", "beta", "gamma"]);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_gossip_makes_users_and_channels_visible_everywhere() {
    let cluster = TestCluster::start(&["alpha", "beta"]).await.unwrap();
    let mut on_alpha = cluster.client("alpha").await.unwrap();
    let mut on_beta = cluster.client("beta").await.unwrap();

    let r = on_alpha.call(|c| Request::login("alice", c)).await.unwrap();
    assert_eq!(r.status_code(), Some(Status::Success));
    let r = on_beta.call(|c| Request::login("bob", c)).await.unwrap();
    assert_eq!(r.status_code(), Some(Status::Success));
    let r = on_beta.call(|c| Request::channel("general", c)).await.unwrap();
    assert_eq!(r.status_code(), Some(Status::Success));

    // Before gossip, alpha cannot publish to beta's channel.
    let r = on_alpha
        .call(|c| Request::publish("alice", "general", "hello", c))
        .await
        .unwrap();
    assert_eq!(r.description(), Some("channel does not exist"));

    cluster.broadcast_all();

    let alpha = cluster.node("alpha").clone();
    let beta = cluster.node("beta").clone();
    assert!(
        wait_until(|| alpha.users().len() == 2 && beta.users().len() == 2).await,
        "users did not converge"
    );
    assert!(wait_until(|| alpha.channels() == vec!["general"]).await);

    let mut alpha_users = alpha.users();
    alpha_users.sort();
    assert_eq!(alpha_users, vec!["alice", "bob"]);

    // A replicated user cannot log in again on the other node.
    let r = on_alpha.call(|c| Request::login("bob", c)).await.unwrap();
    assert_eq!(r.description(), Some("user already exists"));

    let r = on_alpha
        .call(|c| Request::publish("alice", "general", "hello", c))
        .await
        .unwrap();
    assert_eq!(r.status_code(), Some(Status::Ok));

    let r = on_alpha
        .call(|c| Request::message("alice", "bob", "hi bob", c))
        .await
        .unwrap();
    assert_eq!(r.status_code(), Some(Status::Ok));
    assert_eq!(alpha.messages().len(), 1);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_timer_driven_replication_converges() {
    let dir = TempDir::new().unwrap();
    let cluster = TestCluster::start_in(dir.path(), &["alpha", "beta"], 1)
        .await
        .unwrap();

    let mut on_alpha = cluster.client("alpha").await.unwrap();
    on_alpha.call(|c| Request::channel("lobby", c)).await.unwrap();

    let beta = cluster.node("beta").clone();
    assert!(
        wait_until(|| beta.channels() == vec!["lobby"]).await,
        "periodic snapshot never reached beta"
    );

    // The broadcaster refreshes the peer list from the registry first.
    let alpha = cluster.node("alpha").clone();
    assert!(wait_until(|| alpha.peers().len() == 2).await);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_publish_reaches_channel_subscribers() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut sub = cluster.bus.subscribe(&["general"]);
    let mut client = cluster.client("alpha").await.unwrap();

    client.call(|c| Request::channel("general", c)).await.unwrap();
    let reply = client
        .call(|c| Request::publish("alice", "general", "hi all", c))
        .await
        .unwrap();

    let (topic, event) = tokio::time::timeout(std::time::Duration::from_secs(5), sub.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(topic, "general");
    match event {
        Event::Publish(p) => {
            assert_eq!(p.message, "hi all");
            assert_eq!(p.clock, reply.clock());
        }
        other => panic!("expected publication, got {other:?}"),
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_election_announcement_updates_every_node() {
    let cluster = TestCluster::start(&["alpha", "beta"]).await.unwrap();

    cluster.bus.publish(
        SERVERS_TOPIC,
        Event::Election(ElectionAnnouncement {
            coordinator: "beta".into(),
            timestamp: 0.0,
            clock: 50,
        }),
    );

    let alpha = cluster.node("alpha").clone();
    let beta = cluster.node("beta").clone();
    assert!(
        wait_until(|| {
            alpha.coordinator().current().as_deref() == Some("beta")
                && beta.coordinator().current().as_deref() == Some("beta")
        })
        .await
    );
    assert!(alpha.clock().value() > 50);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    {
        let cluster = TestCluster::start_in(dir.path(), &["alpha"], 3600)
            .await
            .unwrap();
        let mut client = cluster.client("alpha").await.unwrap();
        client.call(|c| Request::login("alice", c)).await.unwrap();
        client.call(|c| Request::channel("general", c)).await.unwrap();
        client
            .call(|c| Request::publish("alice", "general", "persisted", c))
            .await
            .unwrap();
        cluster.shutdown().await;
    }

    let cluster = TestCluster::start_in(dir.path(), &["alpha"], 3600)
        .await
        .unwrap();
    let alpha = cluster.node("alpha");
    assert_eq!(alpha.users(), vec!["alice"]);
    assert_eq!(alpha.channels(), vec!["general"]);
    assert_eq!(alpha.publications().len(), 1);
    assert_eq!(alpha.publications()[0].message, "persisted");

    let mut client = cluster.client("alpha").await.unwrap();
    let reply = client.call(Request::users).await.unwrap();
    match reply.data {
        Reply::Users(u) => assert_eq!(u.users, vec!["alice"]),
        other => panic!("expected users reply, got {other:?}"),
    }

    cluster.shutdown().await;
}
