mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;

use common::*;
use threadline_llm::StreamEvent;
use threadline_persist::{MessageStatus, PersistenceClient, SharedChat};

async fn run_turn(app: &TestApp, thread_id: &str, suffix: &str) {
    let mut body = chat_body("llama-3.3-70b-versatile", "hello there");
    body["threadId"] = json!(thread_id);
    body["userMessageId"] = json!(format!("user-{}", suffix));
    body["assistantMessageId"] = json!(format!("assistant-{}", suffix));
    body["attachments"] = json!([{
        "name": "cat.png",
        "url": "memory://uploads/user_1/cat.png",
        "type": "image/png",
        "size": 3,
        "key": "uploads/user_1/cat.png"
    }]);

    let response = app
        .send(json_request(Method::POST, "/api/chat", Some(USER), body))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_text(response).await;
}

#[tokio::test]
async fn test_list_and_get_threads() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;
    run_turn(&app, "t-2", "2").await;

    let response = app
        .send(empty_request(Method::GET, "/api/threads?limit=1", Some(USER)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let threads = body_json(response).await;
    assert_eq!(threads.as_array().unwrap().len(), 1);
    assert_eq!(threads[0]["threadId"], "t-2");
    assert_eq!(threads[0]["status"], "completed");

    let response = app
        .send(empty_request(Method::GET, "/api/threads/t-1", Some(USER)))
        .await;
    assert_eq!(body_json(response).await["title"], "New Chat");

    let response = app
        .send(empty_request(Method::GET, "/api/threads/t-1", Some("intruder")))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_messages_come_with_attachments() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(empty_request(Method::GET, "/api/threads/t-1/messages", Some(USER)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let messages = body_json(response).await;
    let messages = messages.as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["attachments"][0]["name"], "cat.png");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["content"], "Hi");
    assert_eq!(messages[1]["status"], "completed");
}

#[tokio::test]
async fn test_delete_thread_cascades() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;
    run_turn(&app, "t-2", "2").await;

    let response = app
        .send(empty_request(Method::DELETE, "/api/threads/t-1", Some(USER)))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    assert!(app.persist.get_thread(USER, "t-1").await.unwrap().is_none());
    assert!(app.persist.get_messages(USER, "t-1").await.unwrap().is_empty());
    assert!(app
        .persist
        .get_attachments(USER, &["user-1".to_string()])
        .await
        .unwrap()
        .is_empty());

    // The other thread is untouched
    assert_eq!(app.persist.get_messages(USER, "t-2").await.unwrap().len(), 2);

    let response = app
        .send(empty_request(Method::DELETE, "/api/threads/t-1", Some(USER)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cannot_delete_someone_elses_thread() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(empty_request(Method::DELETE, "/api/threads/t-1", Some("intruder")))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.persist.get_thread(USER, "t-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_reused_ids_cannot_touch_another_users_messages() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    // Same thread id and assistant id as user_1's turn
    app.provider.set_reply(Reply::Stream(vec![
        StreamEvent::Message {
            content: "overwritten".to_string(),
        },
        StreamEvent::Done {
            finish_reason: Some("stop".to_string()),
        },
    ]));
    let mut body = chat_body("llama-3.3-70b-versatile", "what did they ask?");
    body["userId"] = json!("intruder");
    body["threadId"] = json!("t-1");
    body["userMessageId"] = json!("intruder-user-1");
    body["assistantMessageId"] = json!("assistant-1");

    let response = app
        .send(json_request(Method::POST, "/api/chat", Some("intruder"), body))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["error"], "FORBIDDEN");

    let victim = app
        .persist
        .get_message(USER, "assistant-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(victim.content, "Hi");
    assert_eq!(victim.status, MessageStatus::Completed);

    // The intruder's own thread row shows only the intruder's messages
    let response = app
        .send(empty_request(Method::GET, "/api/threads/t-1/messages", Some("intruder")))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let messages = body_json(response).await;
    let messages = messages.as_array().unwrap();
    assert!(messages
        .iter()
        .all(|m| m["messageId"] != "user-1" && m["messageId"] != "assistant-1"));
    assert!(messages.iter().all(|m| m["content"] != "hello there"));

    // user_1 still sees exactly their own turn
    let response = app
        .send(empty_request(Method::GET, "/api/threads/t-1/messages", Some(USER)))
        .await;
    let messages = body_json(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 2);
    assert_eq!(messages[1]["content"], "Hi");
}

#[tokio::test]
async fn test_public_share_is_readable_without_session() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shares",
            Some(USER),
            json!({"threadId": "t-1", "expiresInHours": 24}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let share = body_json(response).await;
    assert_eq!(share["isPublic"], true);
    assert_eq!(share["title"], "New Chat");
    let share_id = share["shareId"].as_str().unwrap().to_string();

    let response = app
        .send(empty_request(Method::GET, &format!("/api/shares/{}", share_id), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let view = body_json(response).await;
    assert_eq!(view["share"]["threadId"], "t-1");
    assert_eq!(view["messages"].as_array().unwrap().len(), 2);

    let response = app
        .send(empty_request(Method::GET, "/api/shares", Some(USER)))
        .await;
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_private_share_only_for_owner() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shares",
            Some(USER),
            json!({"threadId": "t-1", "isPublic": false, "title": "Design notes"}),
        ))
        .await;
    let share_id = body_json(response).await["shareId"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/shares/{}", share_id);

    let response = app.send(empty_request(Method::GET, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .send(empty_request(Method::GET, &uri, Some("intruder")))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(empty_request(Method::GET, &uri, Some(USER))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["share"]["title"], "Design notes");
}

#[tokio::test]
async fn test_expired_share_is_not_found() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    app.persist
        .create_shared_chat(SharedChat {
            share_id: "expired".to_string(),
            thread_id: "t-1".to_string(),
            owner_id: USER.to_string(),
            title: "Old".to_string(),
            is_public: true,
            created_at: Utc::now() - Duration::days(2),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        })
        .await
        .unwrap();

    let response = app
        .send(empty_request(Method::GET, "/api/shares/expired", Some(USER)))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_share_keeps_thread() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shares",
            Some(USER),
            json!({"threadId": "t-1"}),
        ))
        .await;
    let share_id = body_json(response).await["shareId"]
        .as_str()
        .unwrap()
        .to_string();
    let uri = format!("/api/shares/{}", share_id);

    let response = app
        .send(empty_request(Method::DELETE, &uri, Some("intruder")))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.send(empty_request(Method::DELETE, &uri, Some(USER))).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.send(empty_request(Method::GET, &uri, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.persist.get_thread(USER, "t-1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_share_rejects_bad_expiry() {
    let app = TestApp::new();
    run_turn(&app, "t-1", "1").await;

    let response = app
        .send(json_request(
            Method::POST,
            "/api/shares",
            Some(USER),
            json!({"threadId": "t-1", "expiresInHours": 0}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_and_openapi() {
    let app = TestApp::new();

    let response = app.send(empty_request(Method::GET, "/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["database"], "connected");

    let response = app
        .send(empty_request(Method::GET, "/api/openapi.json", None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert!(doc["paths"]["/api/chat"].is_object());
    assert!(doc["paths"]["/api/upload"]["post"]["requestBody"]["content"]["multipart/form-data"]
        .is_object());
}
