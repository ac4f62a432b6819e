//! Live HTTP flows against a running instance. These need a deployed server
//! with a fresh store, so they are ignored by default:
//!
//!     STARGAZE_BASE_URL=http://127.0.0.1:5000 cargo test -- --ignored

use serde_json::json;
use std::sync::Mutex;

static TEST_LOCK: Mutex<()> = Mutex::new(());

fn base_url() -> String {
    std::env::var("STARGAZE_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:5000".to_string())
}

fn lock_test() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap()
}

async fn register_user(client: &reqwest::Client) -> (String, String, String) {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let username = format!("it_{}", &suffix[..12]);
    let body = json!({
        "username": username,
        "email": format!("{}@example.com", username),
        "password": "observatory",
    });

    let resp = client
        .post(format!("{}/api/v1/auth/register", base_url()))
        .json(&body)
        .send()
        .await
        .expect("Failed to register user");

    assert_eq!(resp.status(), 201);
    let payload = resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(payload["success"], true);

    let token = payload["token"].as_str().unwrap().to_string();
    let user_id = payload["data"]["id"].as_str().unwrap().to_string();
    (user_id, username, token)
}

#[ignore]
#[tokio::test]
async fn register_login_post_and_feed_flow() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (user_id, username, token) = register_user(&client).await;

    // Login with the same credentials.
    let login_resp = client
        .post(format!("{}/api/v1/auth/login", base_url()))
        .json(&json!({
            "email": format!("{}@example.com", username),
            "password": "observatory",
        }))
        .send()
        .await
        .expect("Failed to login");
    assert_eq!(login_resp.status(), 200);

    // Create a public post.
    let post_resp = client
        .post(format!("{}/api/v1/posts", base_url()))
        .header("Authorization", format!("Bearer {}", token))
        .json(&json!({ "content": "Saturn at opposition tonight!" }))
        .send()
        .await
        .expect("Failed to create post");
    assert_eq!(post_resp.status(), 201);
    let post = post_resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(post["data"]["author"]["id"], json!(user_id));

    // A public post from the author shows up in their own feed.
    let feed_resp = client
        .get(format!("{}/api/v1/feed?page=1&limit=10", base_url()))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .expect("Failed to fetch feed");
    assert_eq!(feed_resp.status(), 200);
    let feed = feed_resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(feed["success"], true);
    assert!(feed["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["id"] == post["data"]["id"]));
}

#[ignore]
#[tokio::test]
async fn follow_is_symmetric_and_double_follow_rejected() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (follower_id, _, follower_token) = register_user(&client).await;
    let (target_id, _, _) = register_user(&client).await;

    let follow_resp = client
        .post(format!("{}/api/v1/users/{}/follow", base_url(), target_id))
        .header("Authorization", format!("Bearer {}", follower_token))
        .send()
        .await
        .expect("Failed to follow");
    assert_eq!(follow_resp.status(), 200);
    let payload = follow_resp.json::<serde_json::Value>().await.unwrap();
    assert_eq!(payload["data"]["follower_count"], json!(1));

    // Both sides of the relationship are readable.
    let followers = client
        .get(format!("{}/api/v1/users/{}/followers", base_url(), target_id))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(followers["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["id"] == json!(follower_id)));

    let following = client
        .get(format!(
            "{}/api/v1/users/{}/following",
            base_url(),
            follower_id
        ))
        .send()
        .await
        .unwrap()
        .json::<serde_json::Value>()
        .await
        .unwrap();
    assert!(following["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|u| u["id"] == json!(target_id)));

    // Following again is a state conflict.
    let again = client
        .post(format!("{}/api/v1/users/{}/follow", base_url(), target_id))
        .header("Authorization", format!("Bearer {}", follower_token))
        .send()
        .await
        .expect("Failed to re-follow");
    assert_eq!(again.status(), 400);

    // Self-follow is invalid.
    let self_follow = client
        .post(format!("{}/api/v1/users/{}/follow", base_url(), follower_id))
        .header("Authorization", format!("Bearer {}", follower_token))
        .send()
        .await
        .expect("Failed self-follow request");
    assert_eq!(self_follow.status(), 400);
}

#[ignore]
#[tokio::test]
async fn like_unlike_round_trip_over_http() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let (_, _, author_token) = register_user(&client).await;
    let (_, _, liker_token) = register_user(&client).await;

    let post_resp = client
        .post(format!("{}/api/v1/posts", base_url()))
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&json!({ "content": "M31 with 4 hours of integration." }))
        .send()
        .await
        .expect("Failed to create post");
    assert_eq!(post_resp.status(), 201);
    let post = post_resp.json::<serde_json::Value>().await.unwrap();
    let post_id = post["data"]["id"].as_str().unwrap().to_string();

    let like = client
        .post(format!("{}/api/v1/posts/{}/like", base_url(), post_id))
        .header("Authorization", format!("Bearer {}", liker_token))
        .send()
        .await
        .expect("Failed to like");
    assert_eq!(like.status(), 200);
    let payload = like.json::<serde_json::Value>().await.unwrap();
    assert_eq!(payload["data"]["like_count"], json!(1));
    assert_eq!(payload["data"]["liked"], json!(true));

    // Second like from the same actor must not stack.
    let double = client
        .post(format!("{}/api/v1/posts/{}/like", base_url(), post_id))
        .header("Authorization", format!("Bearer {}", liker_token))
        .send()
        .await
        .expect("Failed to double-like");
    assert_eq!(double.status(), 400);

    let unlike = client
        .delete(format!("{}/api/v1/posts/{}/like", base_url(), post_id))
        .header("Authorization", format!("Bearer {}", liker_token))
        .send()
        .await
        .expect("Failed to unlike");
    assert_eq!(unlike.status(), 200);
    let payload = unlike.json::<serde_json::Value>().await.unwrap();
    assert_eq!(payload["data"]["like_count"], json!(0));
    assert_eq!(payload["data"]["liked"], json!(false));
}

#[ignore]
#[tokio::test]
async fn feed_requires_auth() {
    let _lock = lock_test();
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/v1/feed", base_url()))
        .send()
        .await
        .expect("Failed to make request");

    assert_eq!(resp.status(), 401);
}
