//! Repository tests against a throwaway SQLite file.

use chrono::{Duration, Utc};
use parley_config::DatabaseConfig;
use parley_database::{
    initialize_database, Conversation, ConversationRepository, CreateAttachmentRequest,
    CreateMessageRequest, CreateUserRequest, DatabaseError, MessageRepository, UserRepository,
    UserStatus,
};
use sqlx::SqlitePool;
use tempfile::TempDir;

async fn setup() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().expect("temp dir");
    let config = DatabaseConfig {
        url: format!("sqlite://{}", temp_dir.path().join("repo.db").display()),
        max_connections: 4,
    };
    let pool = initialize_database(&config).await.expect("database");
    (pool, temp_dir)
}

fn direct(id: &str, a: &str, b: &str) -> Conversation {
    let now = Utc::now();
    Conversation {
        id: id.to_string(),
        participants: vec![a.to_string(), b.to_string()],
        is_group: false,
        group_name: None,
        created_by: a.to_string(),
        last_message_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn group(id: &str, creator: &str, others: &[&str]) -> Conversation {
    let now = Utc::now();
    let mut participants = vec![creator.to_string()];
    participants.extend(others.iter().map(|s| s.to_string()));
    Conversation {
        id: id.to_string(),
        participants,
        is_group: true,
        group_name: Some("Team".to_string()),
        created_by: creator.to_string(),
        last_message_id: None,
        created_at: now,
        updated_at: now,
    }
}

fn message(id: &str, conversation_id: &str, sender: &str, content: Option<&str>) -> CreateMessageRequest {
    CreateMessageRequest {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        sender_id: sender.to_string(),
        content: content.map(str::to_string),
        attachments: Vec::new(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn users_are_created_and_found_by_username_and_ids() {
    let (pool, _dir) = setup().await;
    let users = UserRepository::new(pool);

    let alice = users
        .create(&CreateUserRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            profile_picture: Some("/avatars/alice.png".into()),
        })
        .await
        .unwrap();
    let bob = users
        .create(&CreateUserRequest {
            username: "bob".into(),
            email: "bob@example.com".into(),
            profile_picture: None,
        })
        .await
        .unwrap();

    assert_eq!(alice.status, UserStatus::Offline);

    let found = users.find_by_username("alice").await.unwrap().unwrap();
    assert_eq!(found.id, alice.id);
    assert!(users.find_by_username("mallory").await.unwrap().is_none());

    let batch = users
        .find_by_ids(&[bob.id.clone(), "missing".into(), alice.id.clone()])
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);

    assert!(users.find_by_ids(&[]).await.unwrap().is_empty());
    assert_eq!(users.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn duplicate_username_is_reported_as_duplicate() {
    let (pool, _dir) = setup().await;
    let users = UserRepository::new(pool);
    let request = CreateUserRequest {
        username: "alice".into(),
        email: "alice@example.com".into(),
        profile_picture: None,
    };

    users.create(&request).await.unwrap();
    let error = users
        .create(&CreateUserRequest {
            email: "other@example.com".into(),
            ..request
        })
        .await
        .unwrap_err();

    assert!(error.is_duplicate());
}

#[tokio::test]
async fn direct_pair_is_unique_regardless_of_order() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool);

    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();
    let error = conversations
        .insert(&direct("c2", "bob", "alice"))
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::Duplicate(_)));

    let found = conversations.find_direct("bob", "alice").await.unwrap().unwrap();
    assert_eq!(found.id, "c1");
    assert_eq!(found.participants, vec!["alice", "bob"]);
    assert!(conversations.find_by_id("c2").await.unwrap().is_none());
}

#[tokio::test]
async fn participants_keep_insertion_order_with_set_semantics() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool);
    conversations
        .insert(&group("g1", "carol", &["alice", "bob"]))
        .await
        .unwrap();

    let later = Utc::now() + Duration::seconds(5);
    let updated = conversations
        .add_participants("g1", &["dave".into(), "alice".into(), "erin".into()], later)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.participants, vec!["carol", "alice", "bob", "dave", "erin"]);
    assert_eq!(updated.updated_at.timestamp_micros(), later.timestamp_micros());

    let removed = conversations
        .remove_participant("g1", "bob", later + Duration::seconds(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.participants, vec!["carol", "alice", "dave", "erin"]);

    assert!(conversations
        .add_participants("missing", &["x".into()], later)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn list_for_user_orders_by_most_recent_update() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool);

    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();
    conversations.insert(&direct("c2", "alice", "carol")).await.unwrap();
    conversations
        .add_participants("c1", &[], Utc::now() + Duration::seconds(10))
        .await
        .unwrap();

    let listed: Vec<String> = conversations
        .list_for_user("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(listed, vec!["c1", "c2"]);

    assert_eq!(conversations.list_for_user("carol").await.unwrap().len(), 1);
    assert!(conversations.list_for_user("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn messages_get_consecutive_sequences_and_keep_attachments() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool.clone());
    let messages = MessageRepository::new(pool);
    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();

    let first = messages
        .create(&message("m1", "c1", "alice", Some("hi")))
        .await
        .unwrap();
    let mut with_file = message("m2", "c1", "bob", None);
    with_file.attachments = vec![
        CreateAttachmentRequest {
            url: "/uploads/a.png".into(),
            name: "a.png".into(),
            media_type: "image/png".into(),
        },
        CreateAttachmentRequest {
            url: "/uploads/b.pdf".into(),
            name: "b.pdf".into(),
            media_type: "application/pdf".into(),
        },
    ];
    let second = messages.create(&with_file).await.unwrap();

    assert_eq!(first.seq, 1);
    assert_eq!(second.seq, 2);

    let history = messages.list_for_conversation("c1").await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content.as_deref(), Some("hi"));
    assert_eq!(history[1].attachments.len(), 2);
    assert_eq!(history[1].attachments[0].name, "a.png");

    let latest = messages.latest_for_conversation("c1").await.unwrap().unwrap();
    assert_eq!(latest.id, "m2");
    assert_eq!(messages.find_by_id("m2").await.unwrap().unwrap().attachments.len(), 2);
}

#[tokio::test]
async fn message_for_unknown_conversation_is_not_found() {
    let (pool, _dir) = setup().await;
    let messages = MessageRepository::new(pool);

    let error = messages
        .create(&message("m1", "ghost", "alice", Some("hello?")))
        .await
        .unwrap_err();
    assert!(matches!(error, DatabaseError::NotFound(_)));
}

#[tokio::test]
async fn concurrent_appends_receive_distinct_gap_free_sequences() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool.clone());
    let messages = MessageRepository::new(pool);
    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let messages = messages.clone();
        handles.push(tokio::spawn(async move {
            messages
                .create(&message(&format!("m{i}"), "c1", "alice", Some("ping")))
                .await
        }));
    }

    let mut seqs = Vec::new();
    for handle in handles {
        seqs.push(handle.await.unwrap().unwrap().seq);
    }
    seqs.sort_unstable();
    assert_eq!(seqs, (1..=8).collect::<Vec<i64>>());
}

#[tokio::test]
async fn last_message_pointer_never_moves_backwards() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool.clone());
    let messages = MessageRepository::new(pool);
    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();

    let first = messages.create(&message("m1", "c1", "alice", Some("one"))).await.unwrap();
    let second = messages.create(&message("m2", "c1", "bob", Some("two"))).await.unwrap();

    assert!(conversations
        .set_last_message("c1", &second.id, second.seq, second.created_at)
        .await
        .unwrap());
    assert!(!conversations
        .set_last_message("c1", &first.id, first.seq, first.created_at)
        .await
        .unwrap());

    let stored = conversations.find_by_id("c1").await.unwrap().unwrap();
    assert_eq!(stored.last_message_id.as_deref(), Some("m2"));
}

#[tokio::test]
async fn delete_all_cascades_to_messages() {
    let (pool, _dir) = setup().await;
    let conversations = ConversationRepository::new(pool.clone());
    let messages = MessageRepository::new(pool);
    conversations.insert(&direct("c1", "alice", "bob")).await.unwrap();
    messages.create(&message("m1", "c1", "alice", Some("bye"))).await.unwrap();

    assert_eq!(conversations.delete_all().await.unwrap(), 1);
    assert!(messages.find_by_id("m1").await.unwrap().is_none());
    assert!(conversations.list_all().await.unwrap().is_empty());
}
