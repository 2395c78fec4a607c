//! Request/response behaviour over TCP, for nodes and the registry.

mod common;

use common::{TestClient, TestCluster};
use meshchat_proto::{Reply, Request, Status};
use meshchatd::sync::client::{RegistryClient, TcpRegistryClient};
use serde_json::json;

#[tokio::test]
async fn test_login_then_users() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = cluster.client("alpha").await.unwrap();

    let reply = client.call(|c| Request::login("alice", c)).await.unwrap();
    assert_eq!(reply.service, "login");
    assert_eq!(reply.status_code(), Some(Status::Success));

    let reply = client.call(|c| Request::login("alice", c)).await.unwrap();
    assert!(reply.is_error());
    assert_eq!(reply.description(), Some("user already exists"));

    let reply = client.call(|c| Request::login("", c)).await.unwrap();
    assert_eq!(reply.description(), Some("username required"));

    let reply = client.call(Request::users).await.unwrap();
    match reply.data {
        Reply::Users(u) => assert_eq!(u.users, vec!["alice"]),
        other => panic!("expected users reply, got {other:?}"),
    }

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_reply_clock_is_past_request_clock() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = cluster.client("alpha").await.unwrap();

    client.send(Request::channels(1000)).await.unwrap();
    let reply = client.recv().await.unwrap();
    assert!(reply.clock() > 1000);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_unknown_service_gets_structured_error() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = cluster.client("alpha").await.unwrap();

    let frame = rmp_serde::to_vec_named(&json!({
        "service": "frobnicate",
        "data": { "clock": 7 }
    }))
    .unwrap();
    client.send_raw(frame).await.unwrap();

    let reply = client.recv().await.unwrap();
    assert_eq!(reply.service, "frobnicate");
    assert_eq!(reply.description(), Some("service not recognized"));
    assert!(reply.clock() > 7);

    // Registry services are not served by nodes either.
    let reply = client.call(|c| Request::rank("alpha", c)).await.unwrap();
    assert_eq!(reply.description(), Some("service not recognized"));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_bad_frame_is_dropped_and_connection_survives() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = cluster.client("alpha").await.unwrap();

    client.send_raw(b"definitely not msgpack".to_vec()).await.unwrap();
    let malformed = rmp_serde::to_vec_named(&json!({
        "service": "login",
        "data": { "user": 42 }
    }))
    .unwrap();
    client.send_raw(malformed).await.unwrap();

    // Neither frame gets a reply; the next real request is answered.
    let reply = client.call(Request::channels).await.unwrap();
    assert_eq!(reply.service, "channels");

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_requests_on_one_connection_are_answered_in_order() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = cluster.client("alpha").await.unwrap();

    for name in ["a", "b", "c"] {
        let clock = client.tick();
        client.send(Request::channel(name, clock)).await.unwrap();
    }
    let mut clocks = Vec::new();
    for _ in 0..3 {
        let reply = client.recv().await.unwrap();
        assert_eq!(reply.status_code(), Some(Status::Success));
        clocks.push(reply.clock());
    }
    assert!(clocks.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(cluster.node("alpha").channels(), vec!["a", "b", "c"]);

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_registry_over_tcp() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let mut client = TestClient::connect(cluster.registry_addr()).await.unwrap();

    let reply = client.call(|c| Request::rank("outsider", c)).await.unwrap();
    match reply.data {
        Reply::Rank(r) => assert_eq!(r.rank, 2),
        other => panic!("expected rank reply, got {other:?}"),
    }

    let reply = client.call(|c| Request::heartbeat("outsider", c)).await.unwrap();
    assert_eq!(reply.service, "heartbeat");
    assert_eq!(reply.status_code(), Some(Status::Ok));

    let reply = client.call(|c| Request::heartbeat("nobody", c)).await.unwrap();
    assert_eq!(reply.description(), Some("server not registered"));

    let reply = client.call(Request::list).await.unwrap();
    match reply.data {
        Reply::Servers(list) => {
            let ranks: Vec<_> = list.list.iter().map(|s| (s.name.as_str(), s.rank)).collect();
            assert_eq!(ranks, vec![("alpha", 1), ("outsider", 2)]);
        }
        other => panic!("expected server list, got {other:?}"),
    }

    let reply = client.call(|c| Request::login("alice", c)).await.unwrap();
    assert_eq!(reply.description(), Some("service not recognized"));

    cluster.shutdown().await;
}

#[tokio::test]
async fn test_tcp_registry_client() {
    let cluster = TestCluster::start(&["alpha"]).await.unwrap();
    let registry = TcpRegistryClient::new(cluster.registry_addr());

    let reply = registry.call(Request::rank("alpha", 0)).await.unwrap();
    match reply.data {
        Reply::Rank(r) => assert_eq!(r.rank, 1),
        other => panic!("expected rank reply, got {other:?}"),
    }
    let reply = registry.call(Request::heartbeat("alpha", 0)).await.unwrap();
    assert_eq!(reply.status_code(), Some(Status::Ok));

    cluster.shutdown().await;
}
