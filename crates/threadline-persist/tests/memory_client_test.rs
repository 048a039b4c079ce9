use std::sync::Arc;

use chrono::{Duration, Utc};
use threadline_persist::{
    Attachment, MemoryPersistenceClient, Message, MessagePatch, MessageRole, MessageStatus,
    NewThread, PersistError, PersistenceClient, SharedChat, ThreadStatus,
};

fn attachment(id: &str, message_id: &str) -> Attachment {
    Attachment {
        attachment_id: id.to_string(),
        user_id: "user-1".to_string(),
        message_id: message_id.to_string(),
        attachment_url: format!("https://bucket.example/{}", id),
        file_name: format!("{}.png", id),
        file_type: "image/png".to_string(),
        file_size: 42,
        file_key: format!("uploads/user-1/{}", id),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_ensure_thread_is_idempotent() {
    let client = MemoryPersistenceClient::new();

    let first = client
        .ensure_thread(NewThread::new("user-1", "thread-1", "gemma2-9b-it"))
        .await
        .unwrap();
    assert_eq!(first.title, "New Chat");
    assert_eq!(first.status, ThreadStatus::Generating);

    let second = client
        .ensure_thread(NewThread::new("user-1", "thread-1", "other-model").with_title("ignored"))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(client.thread_count().await, 1);
}

#[tokio::test]
async fn test_concurrent_ensure_thread_creates_one_row() {
    let client = Arc::new(MemoryPersistenceClient::new());

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .ensure_thread(NewThread::new("user-1", "thread-race", "m"))
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(client.thread_count().await, 1);
}

#[tokio::test]
async fn test_same_thread_id_for_different_users() {
    let client = MemoryPersistenceClient::new();
    client.ensure_thread(NewThread::new("alice", "t", "m")).await.unwrap();
    client.ensure_thread(NewThread::new("bob", "t", "m")).await.unwrap();

    assert_eq!(client.thread_count().await, 2);
    assert!(client.get_thread("alice", "t").await.unwrap().is_some());
    assert!(client.get_thread("carol", "t").await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_message_id_is_noop() {
    let client = MemoryPersistenceClient::new();

    let original = Message::new("m1", "t1", "user-1", MessageRole::User, "m").with_content("first");
    client.add_message(original).await.unwrap();

    let dup = Message::new("m1", "t1", "user-1", MessageRole::User, "m").with_content("second");
    client.add_message(dup).await.unwrap();

    let messages = client.get_messages("user-1", "t1").await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content, "first");
}

#[tokio::test]
async fn test_message_id_of_another_owner_conflicts() {
    let client = MemoryPersistenceClient::new();
    client
        .add_message(Message::new("m1", "t1", "alice", MessageRole::Assistant, "m").with_content("mine"))
        .await
        .unwrap();

    let err = client
        .add_message(Message::new("m1", "t1", "bob", MessageRole::Assistant, "m"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::MessageConflict(id) if id == "m1"));

    let err = client
        .add_message(Message::new("m1", "t2", "alice", MessageRole::Assistant, "m"))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::MessageConflict(_)));

    assert_eq!(client.get_messages("alice", "t1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_messages_are_scoped_to_their_owner() {
    let client = MemoryPersistenceClient::new();
    client
        .add_message(
            Message::new("a1", "t1", "alice", MessageRole::Assistant, "m")
                .with_status(MessageStatus::Thinking)
                .with_content("secret"),
        )
        .await
        .unwrap();
    client
        .add_message(Message::new("b1", "t1", "bob", MessageRole::User, "m"))
        .await
        .unwrap();

    let bobs: Vec<String> = client
        .get_messages("bob", "t1")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message_id)
        .collect();
    assert_eq!(bobs, vec!["b1"]);
    assert!(client.get_message("bob", "a1").await.unwrap().is_none());

    let err = client
        .patch_message("bob", "a1", MessagePatch::status(MessageStatus::Completed).content("x"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let alices = client.get_message("alice", "a1").await.unwrap().unwrap();
    assert_eq!(alices.content, "secret");
    assert_eq!(alices.status, MessageStatus::Thinking);
}

#[tokio::test]
async fn test_open_guard_on_finished_message() {
    let client = MemoryPersistenceClient::new();
    client
        .add_message(
            Message::new("a1", "t1", "user-1", MessageRole::Assistant, "m")
                .with_status(MessageStatus::Completed)
                .with_content("final"),
        )
        .await
        .unwrap();

    let err = client
        .patch_message("user-1", "a1", MessagePatch::status(MessageStatus::Error).if_open())
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let msg = client.get_message("user-1", "a1").await.unwrap().unwrap();
    assert_eq!(msg.status, MessageStatus::Completed);
    assert_eq!(msg.content, "final");
}

#[tokio::test]
async fn test_patch_message() {
    let client = MemoryPersistenceClient::new();
    client
        .add_message(
            Message::new("a1", "t1", "user-1", MessageRole::Assistant, "m")
                .with_status(MessageStatus::Thinking),
        )
        .await
        .unwrap();

    let patched = client
        .patch_message(
            "user-1",
            "a1",
            MessagePatch::status(MessageStatus::Completed)
                .content("Hello there")
                .model_response(Some("greeting".to_string())),
        )
        .await
        .unwrap();

    assert_eq!(patched.status, MessageStatus::Completed);
    assert_eq!(patched.content, "Hello there");

    // Stable on re-read
    let reread = client.get_message("user-1", "a1").await.unwrap().unwrap();
    assert_eq!(reread, patched);
}

#[tokio::test]
async fn test_patch_missing_message() {
    let client = MemoryPersistenceClient::new();
    let err = client
        .patch_message("user-1", "nope", MessagePatch::status(MessageStatus::Error))
        .await
        .unwrap_err();
    assert!(matches!(err, PersistError::MessageNotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_messages_in_creation_order() {
    let client = MemoryPersistenceClient::new();
    for i in 0..5 {
        client
            .add_message(Message::new(format!("m{}", i), "t1", "u", MessageRole::User, "m"))
            .await
            .unwrap();
    }
    client
        .add_message(Message::new("other", "t2", "u", MessageRole::User, "m"))
        .await
        .unwrap();

    let ids: Vec<String> = client
        .get_messages("u", "t1")
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.message_id)
        .collect();
    assert_eq!(ids, vec!["m0", "m1", "m2", "m3", "m4"]);
}

#[tokio::test]
async fn test_delete_thread_cascades() {
    let client = MemoryPersistenceClient::new();
    client.ensure_thread(NewThread::new("user-1", "t1", "m")).await.unwrap();
    client
        .add_message(Message::new("u1", "t1", "user-1", MessageRole::User, "m"))
        .await
        .unwrap();
    client
        .add_message(Message::new("a1", "t1", "user-1", MessageRole::Assistant, "m"))
        .await
        .unwrap();
    client.add_attachment(attachment("att-1", "u1")).await.unwrap();
    client.add_attachment(attachment("att-keep", "elsewhere")).await.unwrap();

    client.delete_thread("user-1", "t1").await.unwrap();

    assert!(client.get_thread("user-1", "t1").await.unwrap().is_none());
    assert!(client.get_messages("user-1", "t1").await.unwrap().is_empty());
    assert!(client
        .get_attachments("user-1", &["u1".to_string()])
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        client
            .get_attachments("user-1", &["elsewhere".to_string()])
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn test_delete_thread_of_other_user_is_not_found() {
    let client = MemoryPersistenceClient::new();
    client.ensure_thread(NewThread::new("alice", "t1", "m")).await.unwrap();

    let err = client.delete_thread("mallory", "t1").await.unwrap_err();
    assert!(err.is_not_found());
    assert!(client.get_thread("alice", "t1").await.unwrap().is_some());
}

#[tokio::test]
async fn test_thread_title_and_status_updates() {
    let client = MemoryPersistenceClient::new();
    client.ensure_thread(NewThread::new("u", "t", "m")).await.unwrap();

    client.update_thread_title("u", "t", "Rust lifetimes").await.unwrap();
    client
        .update_thread_status("u", "t", ThreadStatus::Completed)
        .await
        .unwrap();

    let thread = client.get_thread("u", "t").await.unwrap().unwrap();
    assert_eq!(thread.title, "Rust lifetimes");
    assert_eq!(thread.status, ThreadStatus::Completed);

    assert!(matches!(
        client.update_thread_title("u", "missing", "x").await,
        Err(PersistError::ThreadNotFound(_))
    ));
}

#[tokio::test]
async fn test_list_threads_newest_first_with_limit() {
    let client = MemoryPersistenceClient::new();
    for id in ["t1", "t2", "t3"] {
        client.ensure_thread(NewThread::new("u", id, "m")).await.unwrap();
    }
    client.update_thread_title("u", "t1", "bumped").await.unwrap();

    let threads = client.list_threads("u", Some(2)).await.unwrap();
    assert_eq!(threads.len(), 2);
    assert_eq!(threads[0].thread_id, "t1");
}

#[tokio::test]
async fn test_stale_placeholders() {
    let client = MemoryPersistenceClient::new();
    client
        .add_message(
            Message::new("stuck", "t", "u", MessageRole::Assistant, "m")
                .with_status(MessageStatus::Thinking),
        )
        .await
        .unwrap();
    client
        .add_message(
            Message::new("done", "t", "u", MessageRole::Assistant, "m")
                .with_status(MessageStatus::Completed),
        )
        .await
        .unwrap();
    client
        .add_message(
            Message::new("user", "t", "u", MessageRole::User, "m")
                .with_status(MessageStatus::Completed),
        )
        .await
        .unwrap();

    let future_cutoff = Utc::now() + Duration::seconds(5);
    let stale = client.find_stale_placeholders(future_cutoff).await.unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].message_id, "stuck");

    let past_cutoff = Utc::now() - Duration::hours(1);
    assert!(client.find_stale_placeholders(past_cutoff).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_shared_chats() {
    let client = MemoryPersistenceClient::new();
    let share = SharedChat {
        share_id: "s1".to_string(),
        thread_id: "t1".to_string(),
        owner_id: "alice".to_string(),
        title: "Shared".to_string(),
        is_public: true,
        created_at: Utc::now(),
        expires_at: None,
    };
    client.create_shared_chat(share.clone()).await.unwrap();

    assert_eq!(client.get_shared_chat("s1").await.unwrap(), Some(share));
    assert_eq!(client.list_shared_chats("alice").await.unwrap().len(), 1);
    assert!(client.list_shared_chats("bob").await.unwrap().is_empty());

    assert!(matches!(
        client.delete_shared_chat("bob", "s1").await,
        Err(PersistError::ShareNotFound(_))
    ));
    client.delete_shared_chat("alice", "s1").await.unwrap();
    assert!(client.get_shared_chat("s1").await.unwrap().is_none());
}
