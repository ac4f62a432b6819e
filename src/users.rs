use crate::auth::{current_user, invalidate_user_tokens, require_admin};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{ok_json, store, validate_uuid};
use crate::core::query_params::{get_int, get_string, page_params, parse_query_params};
use crate::models::models::{Comment, Post, User};
use ammonia::Builder;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

/// Strip all HTML from user-supplied text.
pub fn sanitize_text(text: &str) -> String {
    Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}

// === Lookups ===

pub fn load_user(store: &Store, id: &str) -> anyhow::Result<Option<User>> {
    store.get_json::<User>(&user_key(id))
}

pub fn all_user_ids(store: &Store) -> anyhow::Result<Vec<String>> {
    Ok(store.get_json(USERS_LIST_KEY)?.unwrap_or_default())
}

pub fn find_user_by_username(store: &Store, username: &str) -> anyhow::Result<Option<User>> {
    for id in all_user_ids(store)? {
        if let Some(user) = load_user(store, &id)? {
            if user.username.eq_ignore_ascii_case(username) {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

pub fn find_user_by_email(store: &Store, email: &str) -> anyhow::Result<Option<User>> {
    for id in all_user_ids(store)? {
        if let Some(user) = load_user(store, &id)? {
            if user.email.eq_ignore_ascii_case(email) {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

// === JSON projections (never include the password hash) ===

pub fn build_user_summary(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "profile_picture": user.profile_picture,
        "bio": user.bio,
    })
}

pub fn build_user_profile(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "profile_picture": user.profile_picture,
        "bio": user.bio,
        "location": user.location,
        "interests": user.interests,
        "equipment": user.equipment,
        "role": user.role,
        "follower_count": user.follower_count(),
        "following_count": user.following_count(),
        "created_at": user.created_at,
    })
}

// === Handlers ===

pub fn get_user_profile(username: &str) -> anyhow::Result<Response> {
    let store = store();
    let user = match find_user_by_username(&store, username)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    // Post count is cheaper to compute than to keep consistent.
    let post_ids: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    let mut post_count = 0usize;
    for id in &post_ids {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            if post.author == user.id {
                post_count += 1;
            }
        }
    }

    let mut data = build_user_profile(&user);
    data["post_count"] = serde_json::json!(post_count);

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": data,
    })))
}

pub fn search_users(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let query = match get_string(&params, "q") {
        Some(q) => q.to_lowercase(),
        None => {
            return Ok(ApiError::BadRequest("Search query is required".to_string()).into());
        }
    };
    let limit = get_int(&params, "limit", DEFAULT_SEARCH_LIMIT);

    let store = store();
    let mut matches = Vec::new();
    for id in all_user_ids(&store)? {
        if matches.len() >= limit {
            break;
        }
        if let Some(user) = load_user(&store, &id)? {
            if user.username.to_lowercase().contains(&query)
                || user.email.to_lowercase().contains(&query)
            {
                matches.push(build_user_summary(&user));
            }
        }
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": matches.len(),
        "data": matches,
    })))
}

/// Accounts the caller does not follow yet, most-followed first.
pub fn suggested_users(req: Request) -> anyhow::Result<Response> {
    let current = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let params = parse_query_params(req.uri());
    let limit = get_int(&params, "limit", DEFAULT_SUGGESTED_LIMIT);

    let store = store();
    let mut candidates = Vec::new();
    for id in all_user_ids(&store)? {
        if id == current.id || current.following.iter().any(|f| f == &id) {
            continue;
        }
        if let Some(user) = load_user(&store, &id)? {
            candidates.push(user);
        }
    }

    candidates.sort_by(|a, b| b.follower_count().cmp(&a.follower_count()));

    let data: Vec<serde_json::Value> = candidates
        .iter()
        .take(limit)
        .map(|user| {
            let mut summary = build_user_summary(user);
            summary["follower_count"] = serde_json::json!(user.follower_count());
            summary
        })
        .collect();

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": data,
    })))
}

pub fn get_all_users(req: Request) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);

    let store = store();
    let mut users = Vec::new();
    for id in all_user_ids(&store)? {
        if let Some(user) = load_user(&store, &id)? {
            users.push(user);
        }
    }

    users.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let total = users.len();
    let pages = total.div_ceil(limit);
    let data: Vec<serde_json::Value> = users
        .iter()
        .skip((page - 1) * limit)
        .take(limit)
        .map(|user| {
            serde_json::json!({
                "id": user.id,
                "username": user.username,
                "email": user.email,
                "role": user.role,
                "profile_picture": user.profile_picture,
                "created_at": user.created_at,
            })
        })
        .collect();

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "page": page,
        "pages": pages,
        "data": data,
    })))
}

/// Admin-only hard delete. Cascades to the user's posts (and those posts'
/// comments), purges the user from every follower/following set, and drops
/// their notifications and sessions.
pub fn delete_user(req: Request, target_id: &str) -> anyhow::Result<Response> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(err) => return Ok(err.into()),
    };

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }
    if target_id == admin.id {
        return Ok(
            ApiError::BadRequest("You cannot delete your own account".to_string()).into(),
        );
    }

    let store = store();
    if load_user(&store, target_id)?.is_none() {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    // Posts authored by the target, with their comment trees.
    let post_ids: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    let mut kept_posts = Vec::with_capacity(post_ids.len());
    for id in post_ids {
        match store.get_json::<Post>(&post_key(&id))? {
            Some(post) if post.author == target_id => {
                for comment_id in &post.comments {
                    if let Some(comment) = store.get_json::<Comment>(&comment_key(comment_id))? {
                        for reply_id in &comment.replies {
                            store.delete(&comment_key(reply_id))?;
                        }
                    }
                    store.delete(&comment_key(comment_id))?;
                }
                store.delete(&post_key(&id))?;
            }
            _ => kept_posts.push(id),
        }
    }
    store.set_json(POSTS_LIST_KEY, &kept_posts)?;

    // Purge the target from everyone else's graph edges.
    for id in all_user_ids(&store)? {
        if id == target_id {
            continue;
        }
        if let Some(mut user) = load_user(&store, &id)? {
            let before = user.followers.len() + user.following.len();
            user.followers.retain(|f| f != target_id);
            user.following.retain(|f| f != target_id);
            if user.followers.len() + user.following.len() != before {
                store.set_json(&user_key(&id), &user)?;
            }
        }
    }

    invalidate_user_tokens(&store, target_id)?;
    store.delete(&notifications_key(target_id))?;
    store.delete(&user_key(target_id))?;

    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    let kept: Vec<String> = users.into_iter().filter(|id| id != target_id).collect();
    store.set_json(USERS_LIST_KEY, &kept)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "User deleted successfully",
    })))
}
