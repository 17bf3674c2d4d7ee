//! E2E tests for the friend-request workflow

mod common;

use common::TestServer;
use serde_json::json;

#[tokio::test]
async fn test_send_accept_and_list_friends() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;

    let (status, sent) = server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "bob" }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(sent["request_id"], 1);
    assert_eq!(sent["sender"], "alice");
    assert_eq!(sent["recipient"], "bob");
    assert_eq!(sent["status"], "pending");
    assert_eq!(
        sent["payload"]["friend_request_from_alice"],
        "accept_or_reject"
    );

    let (status, listing) = server.get_json(&bob, "/api/v1/friend_requests").await;
    assert_eq!(status, 200);
    assert_eq!(listing["total_received"], 1);
    assert_eq!(listing["received"][0]["sender_handle"], "alice");

    let (status, outcome) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["previous_status"], "pending");
    assert_eq!(outcome["new_status"], "accepted");
    assert_eq!(outcome["friendship_changed"], true);
    assert_eq!(outcome["friendship_result"], "added");
    assert_eq!(outcome["your_friends_count"], 1);
    assert_eq!(outcome["their_friends_count"], 1);

    let (status, friends) = server.get_json(&alice, "/api/v1/friends").await;
    assert_eq!(status, 200);
    assert_eq!(friends["user_id"], "U01");
    assert_eq!(friends["total_friends"], 1);
    assert_eq!(friends["friends"][0]["friend_id"], "U02");
    assert_eq!(friends["friends"][0]["friend_handle"], "bob");
}

#[tokio::test]
async fn test_send_failures_map_to_statuses() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;

    let (status, body) = server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "self_request");

    let (status, body) = server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "zed" }))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "unknown_recipient");

    let (status, body) = server
        .post_json(&alice, "/api/v1/friend_requests", json!({}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "missing_handle");

    server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "bob" }))
        .await;
    let (status, body) = server
        .post_json(&bob, "/api/v1/friend_requests", json!({ "username": "alice" }))
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "request_already_pending");
}

#[tokio::test]
async fn test_reject_then_resend_and_accept() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;

    server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "bob" }))
        .await;

    let (status, outcome) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "reject" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["friendship_result"], "none");
    assert_eq!(outcome["friendship_changed"], false);

    let (_, listing) = server.get_json(&alice, "/api/v1/friend_requests").await;
    assert_eq!(listing["sent"][0]["status"], "rejected");

    let (status, sent) = server
        .post_json(&alice, "/api/v1/friend_requests", json!({ "username": "bob" }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(sent["request_id"], 1);

    let (status, outcome) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "Accept" }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(outcome["action"], "accept");

    let (status, body) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "reject" }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["kind"], "already_friends");
}

#[tokio::test]
async fn test_respond_failures_map_to_statuses() {
    let server = TestServer::new().await;
    let _alice = server.create_user("alice").await;
    let bob = server.create_user("bob").await;

    let (status, body) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "maybe" }),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["kind"], "invalid_action");

    let (status, body) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "alice", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "no_such_request");

    let (status, body) = server
        .post_json(
            &bob,
            "/api/v1/friend_requests/respond",
            json!({ "username": "ghost", "action": "accept" }),
        )
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["kind"], "unknown_sender");
}

#[tokio::test]
async fn test_malformed_friend_request_body_is_validation_error() {
    let server = TestServer::new().await;
    let alice = server.create_user("alice").await;

    let response = server
        .client
        .post(server.url("/api/v1/friend_requests"))
        .bearer_auth(&alice)
        .header("content-type", "application/json")
        .body(r#"{ "username": 42 }"#)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "validation");
}
