use crate::config::*;
use crate::core::helpers::{ok_json, store};
use crate::models::models::{Community, Post};
use spin_sdk::http::Response;

/// Platform-wide counts, all derived from the live collections.
pub fn get_stats() -> anyhow::Result<Response> {
    let store = store();

    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    let communities: Vec<String> = store.get_json(COMMUNITIES_LIST_KEY)?.unwrap_or_default();

    let mut total_members = 0usize;
    for id in &communities {
        if let Some(community) = store.get_json::<Community>(&community_key(id))? {
            total_members += community.member_count();
        }
    }

    let mut total_images = 0usize;
    for id in &posts {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            total_images += post.images.len();
        }
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": {
            "users": users.len(),
            "posts": posts.len(),
            "communities": communities.len(),
            "total_members": total_members,
            "total_images": total_images,
        },
    })))
}
