//! E2E tests for posts, likes, comments and the feed

mod common;

use common::TestServer;
use serde_json::{Value, json};

async fn create_post(server: &TestServer, token: &str, caption: &str) -> Value {
    let form = reqwest::multipart::Form::new()
        .text("caption", caption.to_string())
        .text("body", "body text");

    let response = server
        .client
        .post(server.url("/api/v1/posts"))
        .bearer_auth(token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_create_and_fetch_post() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;

    let part = reqwest::multipart::Part::bytes(common::tiny_png())
        .file_name("photo.png")
        .mime_str("image/png")
        .unwrap();
    let form = reqwest::multipart::Form::new()
        .text("caption", "sunset")
        .text("body", "at the beach")
        .part("image", part);

    let body: Value = server
        .client
        .post(server.url("/api/v1/posts"))
        .bearer_auth(&alice)
        .multipart(form)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["caption"], "sunset");
    assert_eq!(body["data"]["author_username"], "alice");
    let image_url = body["data"]["image_url"].as_str().unwrap();
    assert!(image_url.starts_with("http://localhost/media/posts/"));

    let id = body["data"]["id"].as_str().unwrap();
    let response = server
        .client
        .get(server.url(&format!("/api/v1/posts/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let detail: Value = response.json().await.unwrap();
    assert_eq!(detail["caption"], "sunset");
    assert_eq!(detail["like_count"], 0);
    assert!(detail["liked"].is_null());
}

#[tokio::test]
async fn test_blank_caption_is_a_form_error() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;

    let body = create_post(&server, &alice, "   ").await;
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Caption cannot be empty");
}

#[tokio::test]
async fn test_like_toggle_and_comment() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;

    let post = create_post(&server, &alice, "hello").await;
    let id = post["data"]["id"].as_str().unwrap().to_string();

    let like: Value = server
        .client
        .post(server.url(&format!("/api/v1/posts/{id}/like")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(like["liked"], true);
    assert_eq!(like["like_count"], 1);

    let comment: Value = server
        .client
        .post(server.url(&format!("/api/v1/posts/{id}/comments")))
        .bearer_auth(&bob)
        .json(&json!({ "content": "nice shot" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comment["ok"], true);
    assert_eq!(comment["data"]["author_username"], "bob");

    let blank: Value = server
        .client
        .post(server.url(&format!("/api/v1/posts/{id}/comments")))
        .bearer_auth(&bob)
        .json(&json!({ "content": " " }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(blank["ok"], false);

    let detail: Value = server
        .client
        .get(server.url(&format!("/api/v1/posts/{id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(detail["liked"], true);
    assert_eq!(detail["comment_count"], 1);
    assert_eq!(detail["comments"][0]["content"], "nice shot");

    // Liking again removes the like
    let like: Value = server
        .client
        .post(server.url(&format!("/api/v1/posts/{id}/like")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(like["liked"], false);
    assert_eq!(like["like_count"], 0);
}

#[tokio::test]
async fn test_only_author_may_edit_or_delete() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;

    let post = create_post(&server, &alice, "mine").await;
    let id = post["data"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/v1/posts/{id}");

    let response = server
        .client
        .patch(server.url(&path))
        .bearer_auth(&bob)
        .json(&json!({ "caption": "stolen" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .delete(server.url(&path))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = server
        .client
        .patch(server.url(&path))
        .bearer_auth(&alice)
        .json(&json!({ "caption": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let edited: Value = response.json().await.unwrap();
    assert_eq!(edited["caption"], "edited");

    let response = server
        .client
        .delete(server.url(&path))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = server.client.get(server.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unknown_post_is_404() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;

    let response = server
        .client
        .post(server.url("/api/v1/posts/01ARZ3NDEKTSV4RRFFQ69G5FAV/like"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_feed_shows_own_and_followed_posts_newest_first() {
    let server = TestServer::new().await;
    let alice = server.signup("alice").await;
    let bob = server.signup("bob").await;
    let carol = server.signup("carol").await;
    server.follow(&alice, "bob").await;

    create_post(&server, &alice, "alice one").await;
    create_post(&server, &bob, "bob one").await;
    create_post(&server, &carol, "carol one").await;
    create_post(&server, &bob, "bob two").await;

    let feed: Vec<Value> = server
        .client
        .get(server.url("/api/v1/feed"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let captions: Vec<&str> = feed
        .iter()
        .map(|post| post["caption"].as_str().unwrap())
        .collect();
    assert_eq!(captions, ["bob two", "bob one", "alice one"]);

    let page: Vec<Value> = server
        .client
        .get(server.url("/api/v1/feed?limit=2"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page.len(), 2);

    let max_id = page[1]["id"].as_str().unwrap();
    let rest: Vec<Value> = server
        .client
        .get(server.url(&format!("/api/v1/feed?limit=2&max_id={max_id}")))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0]["caption"], "alice one");
}
