mod common;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn kinds(body: &Value) -> Vec<String> {
    body["data"]
        .as_array()
        .map(|notes| notes.iter().filter_map(|n| n["kind"].as_str().map(str::to_string)).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn ticket_creation_notifies_managers_but_not_the_author() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Notify Org", "owner@notify.test").await?;
    let manager = server.add_member(&owner, "manager@notify.test", "manager", None).await?;

    server.create(&owner, "tickets", json!({ "title": "Elevator stuck", "priority": "urgent" })).await?;

    let (status, body) = server.get("/api/notifications", &manager.token).await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(kinds(&body), vec!["ticket_created"]);
    assert_eq!(body["data"][0]["read"], false);

    let (_, body) = server.get("/api/notifications", &owner.token).await?;
    assert!(kinds(&body).is_empty(), "author should not be notified: {}", body);

    Ok(())
}

#[tokio::test]
async fn read_state_is_tracked_per_user() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Read Org", "owner@read.test").await?;
    let manager = server.add_member(&owner, "manager@read.test", "manager", None).await?;

    server.create(&owner, "tickets", json!({ "title": "Noisy pipes" })).await?;
    server.create(&owner, "tickets", json!({ "title": "Broken window" })).await?;

    let (_, body) = server.get("/api/notifications/unread-count", &manager.token).await?;
    assert_eq!(body["data"]["count"], 2);

    let (_, inbox) = server.get("/api/notifications", &manager.token).await?;
    let first = inbox["data"][0]["id"].as_str().context("missing notification id")?.to_string();

    let (status, body) = server
        .put(&format!("/api/notifications/{}/read", first), &manager.token, json!({}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["read"], true);

    let (_, body) = server.get("/api/notifications?unread=true", &manager.token).await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    // Not a recipient
    let (status, _) = server
        .put(&format!("/api/notifications/{}/read", first), &owner.token, json!({}))
        .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = server.put("/api/notifications/read-all", &manager.token, json!({})).await?;
    assert_eq!(body["data"]["updated"], 1);

    let (_, body) = server.get("/api/notifications/unread-count", &manager.token).await?;
    assert_eq!(body["data"]["count"], 0);

    Ok(())
}

#[tokio::test]
async fn messaging_needs_a_paid_plan() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Message Org", "owner@message.test").await?;
    let staff = server.add_member(&owner, "staff@message.test", "staff", None).await?;

    let message = json!({ "recipient_id": staff.user_id, "body": "Please check suite 4" });
    let (status, body) = server.post("/api/data/messages", &owner.token, message.clone()).await?;
    assert_eq!(status, StatusCode::FORBIDDEN, "{}", body);
    assert_eq!(body["code"], "PLAN_UPGRADE_REQUIRED");
    assert_eq!(body["feature"], "messaging");

    let (status, _) = server.put("/api/organization/plan", &owner.token, json!({ "plan": "starter" })).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = server.post("/api/data/messages", &owner.token, message).await?;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["sender_id"], owner.user_id.as_str());
    assert_eq!(body["data"]["read"], false);
    let message_id = body["data"]["id"].as_str().unwrap_or_default().to_string();

    let (_, body) = server.get("/api/notifications", &staff.token).await?;
    assert_eq!(kinds(&body), vec!["message_created"]);

    // The read flag is server-owned even for admins
    let (status, body) = server
        .put(
            &format!("/api/data/messages/{}", message_id),
            &owner.token,
            json!({ "body": "Please check suite 4 today", "read": true }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["body"], "Please check suite 4 today");
    assert_eq!(body["data"]["read"], false);

    Ok(())
}

#[tokio::test]
async fn stream_relays_new_notifications() -> Result<()> {
    let server = common::spawn_server().await?;
    let owner = server.register("Stream Org", "owner@stream.test").await?;
    let manager = server.add_member(&owner, "manager@stream.test", "manager", None).await?;

    let mut stream = server
        .client
        .get(format!("{}/api/notifications/stream", server.base_url))
        .bearer_auth(&manager.token)
        .send()
        .await?;
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(stream
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream")));

    server.create(&owner, "tickets", json!({ "title": "Fire alarm test" })).await?;

    let received = tokio::time::timeout(Duration::from_secs(5), async {
        let mut buffer = String::new();
        while let Some(chunk) = stream.chunk().await? {
            buffer.push_str(&String::from_utf8_lossy(&chunk));
            if buffer.contains("ticket_created") {
                return Ok::<_, anyhow::Error>(buffer);
            }
        }
        anyhow::bail!("stream ended before a notification arrived")
    })
    .await
    .context("timed out waiting for notification")??;

    assert!(received.contains("event: notification"), "{}", received);
    assert!(received.contains("Fire alarm test"), "{}", received);

    Ok(())
}
