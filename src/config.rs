// Limits mirror the validation rules enforced at the API boundary.
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_LOCATION_LENGTH: usize = 100;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MIN_COMMUNITY_NAME_LENGTH: usize = 3;
pub const MAX_COMMUNITY_NAME_LENGTH: usize = 50;
pub const MAX_COMMUNITY_DESCRIPTION_LENGTH: usize = 1000;
pub const MAX_EVENT_DESCRIPTION_LENGTH: usize = 2000;
pub const MAX_SHOP_NAME_LENGTH: usize = 100;
pub const MAX_SHOP_DESCRIPTION_LENGTH: usize = 500;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;
pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const DEFAULT_SUGGESTED_LIMIT: usize = 5;
pub const DEFAULT_UPCOMING_LIMIT: usize = 10;
pub const NOTIFICATIONS_PAGE_SIZE: usize = 50;

// Duplicate share notifications to the same recipient are rejected inside
// this window.
pub const SHARE_DEDUP_SECONDS: i64 = 60;

// === KV index keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const POSTS_LIST_KEY: &str = "posts_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const COMMUNITIES_LIST_KEY: &str = "communities_list";
pub const SHOP_ITEMS_LIST_KEY: &str = "shop_items_list";
pub const EVENTS_LIST_KEY: &str = "events_list";

// === KV document keys ===
pub fn user_key(id: &str) -> String {
    format!("user:{}", id)
}

pub fn post_key(id: &str) -> String {
    format!("post:{}", id)
}

pub fn comment_key(id: &str) -> String {
    format!("comment:{}", id)
}

pub fn community_key(id: &str) -> String {
    format!("community:{}", id)
}

pub fn shop_item_key(id: &str) -> String {
    format!("shop_item:{}", id)
}

pub fn event_key(id: &str) -> String {
    format!("event:{}", id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn notification_key(id: &str) -> String {
    format!("notification:{}", id)
}

// Per-user index of notification ids, newest first.
pub fn notifications_key(user_id: &str) -> String {
    format!("notifications:{}", user_id)
}

// === Environment overrides ===
pub fn token_expiration_hours() -> i64 {
    std::env::var("STARGAZE_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(168)
}

pub fn listen_port() -> u16 {
    std::env::var("STARGAZE_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(5000)
}

pub fn demo_seed_enabled() -> bool {
    std::env::var("STARGAZE_SEED_DEMO")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn default_avatar_url(username: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=8b5cf6&color=fff&size=200",
        urlencoding::encode(username)
    )
}
