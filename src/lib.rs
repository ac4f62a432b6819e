use spin_sdk::http::Response;
#[cfg(target_arch = "wasm32")]
use spin_sdk::http::{IntoResponse, Request};
#[cfg(not(target_arch = "wasm32"))]
use spin_sdk::http::Request;
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;

pub mod auth;
pub mod comments;
pub mod communities;
pub mod config;
pub mod events;
pub mod feed;
pub mod notifications;
pub mod posts;
pub mod shop;
pub mod social;
pub mod stats;
pub mod users;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod helpers;
    pub mod query_params;
    pub mod static_server;
}

pub mod models {
    pub mod models;
}

use crate::core::errors::ApiError;
use crate::core::helpers::{now_iso, ok_json, store};

fn health() -> anyhow::Result<Response> {
    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Stargaze API is running",
        "timestamp": now_iso(),
    })))
}

// Wipes the store so a demo or test deployment can start over. Hidden unless
// demo seeding is switched on.
fn reset_store(req: Request) -> anyhow::Result<Response> {
    if !config::demo_seed_enabled() {
        return Ok(ApiError::NotFound("Route not found".to_string()).into());
    }
    if let Err(err) = auth::require_admin(&req) {
        return Ok(err.into());
    }

    core::db::reset_db_data(&store())?;
    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Store reset",
    })))
}

/// Dispatch a request to its handler. Shared by the spin component and the
/// native adapter binary.
pub fn route(req: Request) -> anyhow::Result<Response> {
    if config::demo_seed_enabled() {
        let _ = core::db::init_demo_data(&store());
    }

    let method = req.method().to_string();
    let path = req.path().to_string();
    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

    match (method.as_str(), segments.as_slice()) {
        ("GET", ["api", "v1", "health"]) => health(),

        // Auth & account
        ("POST", ["api", "v1", "auth", "register"]) => auth::register(req),
        ("POST", ["api", "v1", "auth", "login"]) => auth::login(req),
        ("POST", ["api", "v1", "auth", "logout"]) => auth::logout(req),
        ("GET", ["api", "v1", "auth", "me"]) => auth::me(req),
        ("GET", ["api", "v1", "auth", "check-username"]) => auth::check_username(req),
        ("PUT", ["api", "v1", "auth", "update-details"]) => auth::update_details(req),
        ("PUT", ["api", "v1", "auth", "update-password"]) => auth::update_password(req),

        // Users & social graph
        ("GET", ["api", "v1", "users", "search"]) => users::search_users(req),
        ("GET", ["api", "v1", "users", "suggested"]) => users::suggested_users(req),
        ("GET", ["api", "v1", "users", "all"]) => users::get_all_users(req),
        ("POST", ["api", "v1", "users", id, "follow"]) => social::handle_follow(req, id),
        ("DELETE", ["api", "v1", "users", id, "follow"]) => social::handle_unfollow(req, id),
        ("GET", ["api", "v1", "users", id, "followers"]) => social::get_followers(id),
        ("GET", ["api", "v1", "users", id, "following"]) => social::get_following(id),
        ("GET", ["api", "v1", "users", username]) => users::get_user_profile(username),
        ("DELETE", ["api", "v1", "users", id]) => users::delete_user(req, id),

        // Feed
        ("GET", ["api", "v1", "feed"]) => feed::get_feed(req),

        // Posts
        ("POST", ["api", "v1", "posts"]) => posts::create_post(req),
        ("GET", ["api", "v1", "posts"]) => posts::list_posts(req),
        ("GET", ["api", "v1", "posts", "user", id]) => posts::get_user_posts(req, id),
        ("GET", ["api", "v1", "posts", id, "comments"]) => comments::list_comments(id),
        ("POST", ["api", "v1", "posts", id, "comments"]) => comments::create_comment(req, id),
        ("POST", ["api", "v1", "posts", id, "like"]) => posts::like_post(req, id),
        ("DELETE", ["api", "v1", "posts", id, "like"]) => posts::unlike_post(req, id),
        ("POST", ["api", "v1", "posts", id, "share"]) => posts::share_post(req, id),
        ("GET", ["api", "v1", "posts", id]) => posts::get_post(id),
        ("PUT", ["api", "v1", "posts", id]) => posts::update_post(req, id),
        ("DELETE", ["api", "v1", "posts", id]) => posts::delete_post(req, id),

        // Comments
        ("POST", ["api", "v1", "comments", id, "like"]) => comments::like_comment(req, id),
        ("DELETE", ["api", "v1", "comments", id, "like"]) => comments::unlike_comment(req, id),
        ("PUT", ["api", "v1", "comments", id]) => comments::update_comment(req, id),
        ("DELETE", ["api", "v1", "comments", id]) => comments::delete_comment(req, id),

        // Communities
        ("GET", ["api", "v1", "communities"]) => communities::list_communities(req),
        ("POST", ["api", "v1", "communities"]) => communities::create_community(req),
        ("POST", ["api", "v1", "communities", id, "join"]) => communities::join_community(req, id),
        ("POST", ["api", "v1", "communities", id, "leave"]) => {
            communities::leave_community(req, id)
        }
        ("GET", ["api", "v1", "communities", slug]) => communities::get_community(slug),

        // Shop catalog
        ("GET", ["api", "v1", "shop"]) => shop::list_items(req),
        ("POST", ["api", "v1", "shop"]) => shop::create_item(req),
        ("GET", ["api", "v1", "shop", id]) => shop::get_item(id),
        ("PUT", ["api", "v1", "shop", id]) => shop::update_item(req, id),
        ("DELETE", ["api", "v1", "shop", id]) => shop::delete_item(req, id),

        // Celestial events
        ("GET", ["api", "v1", "events"]) => events::list_events(req),
        ("POST", ["api", "v1", "events"]) => events::create_event(req),
        ("GET", ["api", "v1", "events", "upcoming"]) => events::upcoming_events(req),
        ("GET", ["api", "v1", "events", "range"]) => events::events_in_range(req),
        ("GET", ["api", "v1", "events", "pending"]) => events::pending_events(req),
        ("PUT", ["api", "v1", "events", id, "approve"]) => events::approve_event(req, id),
        ("PUT", ["api", "v1", "events", id, "reject"]) => events::reject_event(req, id),
        ("GET", ["api", "v1", "events", id]) => events::get_event(id),
        ("PUT", ["api", "v1", "events", id]) => events::update_event(req, id),
        ("DELETE", ["api", "v1", "events", id]) => events::delete_event(req, id),

        // Notifications
        ("GET", ["api", "v1", "notifications"]) => notifications::list_notifications(req),
        ("PUT", ["api", "v1", "notifications", "read"]) => notifications::mark_all_read(req),
        ("PUT", ["api", "v1", "notifications", id, "read"]) => notifications::mark_read(req, id),

        // Platform
        ("GET", ["api", "v1", "stats"]) => stats::get_stats(),
        ("POST", ["api", "v1", "admin", "reset"]) => reset_store(req),

        ("GET", [""]) | ("GET", ["index.html"]) => core::static_server::serve_static(&path),

        _ => Ok(ApiError::NotFound("Route not found".to_string()).into()),
    }
}

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    route(req)
}
