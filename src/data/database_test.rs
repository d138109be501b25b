//! Database tests

use super::*;
use chrono::{Duration, Utc};
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

async fn create_user(db: &Database, username: &str) -> User {
    let user = User {
        id: EntityId::new().0,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "not-a-real-hash".to_string(),
        created_at: Utc::now(),
    };
    db.create_user_with_profile(&user).await.unwrap();
    user
}

fn new_message(sender: &User, receiver: &User, content: &str) -> NewMessage {
    NewMessage {
        id: EntityId::new().0,
        sender_id: sender.id.clone(),
        receiver_id: receiver.id.clone(),
        content: content.to_string(),
        image_key: None,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
}

#[tokio::test]
async fn test_user_is_created_with_profile() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    let profile = db.get_profile(&alice.id).await.unwrap();
    assert!(profile.is_some());
    assert!(profile.unwrap().bio.is_none());

    let summary = db
        .get_profile_summary_by_username("ALICE")
        .await
        .unwrap()
        .expect("lookup is case-insensitive");
    assert_eq!(summary.user_id, alice.id);
}

#[tokio::test]
async fn test_duplicate_username_is_conflict() {
    let (db, _temp_dir) = create_test_db().await;
    create_user(&db, "alice").await;

    let duplicate = User {
        id: EntityId::new().0,
        username: "Alice".to_string(),
        email: "other@example.com".to_string(),
        password_hash: "x".to_string(),
        created_at: Utc::now(),
    };
    let error = db.create_user_with_profile(&duplicate).await.unwrap_err();
    assert!(matches!(error, crate::error::AppError::Conflict(_)));
    assert!(db.get_user(&duplicate.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_follow_operations() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    assert!(db.insert_follow(&alice.id, &bob.id, Utc::now()).await.unwrap());
    assert!(!db.insert_follow(&alice.id, &bob.id, Utc::now()).await.unwrap());

    assert!(db.is_following(&alice.id, &bob.id).await.unwrap());
    assert!(!db.is_following(&bob.id, &alice.id).await.unwrap());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 1);
    assert_eq!(db.count_following(&alice.id).await.unwrap(), 1);
    assert_eq!(db.count_followers(&alice.id).await.unwrap(), 0);

    let followers = db.get_followers(&bob.id).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].username, "alice");
    let following = db.get_following(&alice.id).await.unwrap();
    assert_eq!(following[0].username, "bob");

    assert!(db.delete_follow(&alice.id, &bob.id).await.unwrap());
    assert!(!db.delete_follow(&alice.id, &bob.id).await.unwrap());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_toggle_follow_is_its_own_inverse() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    assert!(db.toggle_follow(&alice.id, &bob.id, Utc::now()).await.unwrap());
    assert!(db.is_following(&alice.id, &bob.id).await.unwrap());
    assert!(!db.toggle_follow(&alice.id, &bob.id, Utc::now()).await.unwrap());
    assert!(!db.is_following(&alice.id, &bob.id).await.unwrap());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_self_follow_violates_schema() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    assert!(db.insert_follow(&alice.id, &alice.id, Utc::now()).await.is_err());
    assert_eq!(db.count_followers(&alice.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_toggles_never_lose_updates() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let db = std::sync::Arc::new(db);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let db = db.clone();
        let (a, b) = (alice.id.clone(), bob.id.clone());
        handles.push(tokio::spawn(async move {
            db.toggle_follow(&a, &b, Utc::now()).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // An even number of serialized toggles ends where it started.
    assert!(!db.is_following(&alice.id, &bob.id).await.unwrap());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_thread_orders_by_time_then_insertion() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;

    let same_instant = Utc::now();
    for (i, (from, to)) in [(&alice, &bob), (&bob, &alice), (&alice, &bob)]
        .into_iter()
        .enumerate()
    {
        let mut message = new_message(from, to, &format!("m{i}"));
        message.created_at = same_instant;
        db.insert_message(&message).await.unwrap();
    }
    let mut earlier = new_message(&bob, &alice, "first");
    earlier.created_at = same_instant - Duration::seconds(5);
    db.insert_message(&earlier).await.unwrap();
    db.insert_message(&new_message(&alice, &carol, "elsewhere"))
        .await
        .unwrap();

    let thread = db.get_thread(&bob.id, &alice.id).await.unwrap();
    let contents: Vec<_> = thread.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "m0", "m1", "m2"]);
    assert_eq!(db.count_thread_messages(&alice.id, &bob.id).await.unwrap(), 4);
}

#[tokio::test]
async fn test_mark_thread_read_only_touches_received_messages() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    db.insert_message(&new_message(&alice, &bob, "hi")).await.unwrap();
    db.insert_message(&new_message(&alice, &bob, "there")).await.unwrap();
    db.insert_message(&new_message(&bob, &alice, "hey")).await.unwrap();

    assert_eq!(db.count_unread_messages(&bob.id).await.unwrap(), 2);
    assert_eq!(db.count_unread_messages(&alice.id).await.unwrap(), 1);

    assert_eq!(db.mark_thread_read(&bob.id, &alice.id).await.unwrap(), 2);
    assert_eq!(db.mark_thread_read(&bob.id, &alice.id).await.unwrap(), 0);

    assert_eq!(db.count_unread_messages(&bob.id).await.unwrap(), 0);
    // Bob's own message to Alice stays unread for Alice.
    assert_eq!(db.count_unread_messages(&alice.id).await.unwrap(), 1);
}

#[tokio::test]
async fn test_self_message_violates_schema() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    assert!(db.insert_message(&new_message(&alice, &alice, "me")).await.is_err());
}

#[tokio::test]
async fn test_post_likes_and_comments() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    let post = Post {
        id: EntityId::new().0,
        author_id: alice.id.clone(),
        caption: "sunset".to_string(),
        body: String::new(),
        image_key: None,
        created_at: Utc::now(),
    };
    db.insert_post(&post).await.unwrap();

    assert!(db.toggle_like(&post.id, &bob.id, Utc::now()).await.unwrap());
    assert!(db.is_liked(&post.id, &bob.id).await.unwrap());
    assert_eq!(db.count_likes(&post.id).await.unwrap(), 1);

    let comment = Comment {
        id: EntityId::new().0,
        post_id: post.id.clone(),
        author_id: bob.id.clone(),
        author_username: bob.username.clone(),
        content: "nice".to_string(),
        created_at: Utc::now(),
    };
    db.insert_comment(&comment).await.unwrap();

    let record = db.get_post(&post.id).await.unwrap().unwrap();
    assert_eq!(record.author_username, "alice");
    assert_eq!(record.like_count, 1);
    assert_eq!(record.comment_count, 1);

    let comments = db.get_comments(&post.id).await.unwrap();
    assert_eq!(comments[0].author_username, "bob");

    assert!(!db.toggle_like(&post.id, &bob.id, Utc::now()).await.unwrap());
    assert_eq!(db.count_likes(&post.id).await.unwrap(), 0);

    assert!(db.delete_post(&post.id).await.unwrap());
    assert!(db.get_comments(&post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feed_includes_self_and_followed_with_cursor() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;
    let carol = create_user(&db, "carol").await;
    db.insert_follow(&alice.id, &bob.id, Utc::now()).await.unwrap();

    let base = Utc::now();
    let mut ids = Vec::new();
    for (i, author) in [&alice, &bob, &carol, &bob].into_iter().enumerate() {
        let post = Post {
            id: EntityId::new().0,
            author_id: author.id.clone(),
            caption: format!("post {i}"),
            body: String::new(),
            image_key: None,
            created_at: base + Duration::seconds(i as i64),
        };
        db.insert_post(&post).await.unwrap();
        ids.push(post.id);
    }

    let feed = db.get_feed(&alice.id, 10, None).await.unwrap();
    let captions: Vec<_> = feed.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, vec!["post 3", "post 1", "post 0"]);

    let page = db.get_feed(&alice.id, 10, Some(&ids[3])).await.unwrap();
    let captions: Vec<_> = page.iter().map(|p| p.caption.as_str()).collect();
    assert_eq!(captions, vec!["post 1", "post 0"]);

    let limited = db.get_feed(&alice.id, 1, None).await.unwrap();
    assert_eq!(limited.len(), 1);

    let by_bob = db.get_posts_by_author(&bob.id, 10, None).await.unwrap();
    assert_eq!(by_bob.len(), 2);
    assert_eq!(db.count_posts_by_author(&bob.id).await.unwrap(), 2);
}

#[tokio::test]
async fn test_delete_user_cascades() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    let bob = create_user(&db, "bob").await;

    db.insert_follow(&alice.id, &bob.id, Utc::now()).await.unwrap();
    db.insert_follow(&bob.id, &alice.id, Utc::now()).await.unwrap();
    db.insert_message(&new_message(&alice, &bob, "hi")).await.unwrap();
    db.insert_message(&new_message(&bob, &alice, "yo")).await.unwrap();
    db.update_avatar_key_if_matches(&alice.id, None, Some("avatars/a.webp"), Utc::now())
        .await
        .unwrap();

    assert_eq!(
        db.get_owned_blob_keys(&alice.id).await.unwrap(),
        vec!["avatars/a.webp".to_string()]
    );

    assert!(db.delete_user(&alice.id).await.unwrap());

    assert!(db.get_profile(&alice.id).await.unwrap().is_none());
    assert_eq!(db.count_followers(&bob.id).await.unwrap(), 0);
    assert_eq!(db.count_following(&bob.id).await.unwrap(), 0);
    assert!(db.get_messages_involving(&bob.id).await.unwrap().is_empty());
    assert_eq!(db.count_unread_messages(&bob.id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_avatar_key_compare_and_swap() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;

    assert!(
        db.update_avatar_key_if_matches(&alice.id, None, Some("one"), Utc::now())
            .await
            .unwrap()
    );
    // Stale expectation loses.
    assert!(
        !db.update_avatar_key_if_matches(&alice.id, None, Some("two"), Utc::now())
            .await
            .unwrap()
    );
    assert!(
        db.update_avatar_key_if_matches(&alice.id, Some("one"), None, Utc::now())
            .await
            .unwrap()
    );
    assert!(db.get_profile(&alice.id).await.unwrap().unwrap().avatar_key.is_none());
}

#[tokio::test]
async fn test_update_profile_fields() {
    let (db, _temp_dir) = create_test_db().await;
    let alice = create_user(&db, "alice").await;
    create_user(&db, "bob").await;

    assert!(
        db.update_profile_fields(&alice.id, Some(Some("hello")), Some("alicia"), None, Utc::now())
            .await
            .unwrap()
    );
    let summary = db.get_profile_summary_by_username("alicia").await.unwrap().unwrap();
    assert_eq!(summary.bio.as_deref(), Some("hello"));

    let error = db
        .update_profile_fields(&alice.id, Some(None), Some("bob"), None, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(error, crate::error::AppError::Conflict(_)));
    // The failed transaction left the bio untouched.
    let summary = db.get_profile_summary_by_username("alicia").await.unwrap().unwrap();
    assert_eq!(summary.bio.as_deref(), Some("hello"));

    assert!(
        !db.update_profile_fields("missing", Some(None), None, None, Utc::now())
            .await
            .unwrap()
    );
}
