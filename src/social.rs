//! Follow relationships and like sets.
//!
//! The follow relationship is stored on both sides (`following` on the
//! follower, `followers` on the target) and must never be one-sided after a
//! completed operation. The pure mutation functions here enforce the
//! membership invariants; the store-level functions put the two document
//! writes behind a compensating rollback since the KV store has no multi-key
//! transaction.

use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{ok_json, store, validate_uuid};
use crate::models::models::User;
use crate::users::{build_user_summary, load_user};
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum GraphError {
    SelfFollow,
    UserNotFound,
    AlreadyFollowing,
    NotFollowing,
    AlreadyLiked,
    NotLiked,
    Storage(String),
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::SelfFollow => write!(f, "You cannot follow yourself"),
            GraphError::UserNotFound => write!(f, "User not found"),
            GraphError::AlreadyFollowing => write!(f, "You are already following this user"),
            GraphError::NotFollowing => write!(f, "You are not following this user"),
            GraphError::AlreadyLiked => write!(f, "Already liked"),
            GraphError::NotLiked => write!(f, "Not liked yet"),
            GraphError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        let message = err.to_string();
        match err {
            GraphError::UserNotFound => ApiError::NotFound(message),
            GraphError::Storage(_) => ApiError::InternalError(message),
            _ => ApiError::BadRequest(message),
        }
    }
}

fn storage(err: impl fmt::Display) -> GraphError {
    GraphError::Storage(err.to_string())
}

// === Pure graph mutations ===

/// Link `follower` -> `target`. Returns the target's new follower count.
pub fn link_follow(follower: &mut User, target: &mut User) -> Result<usize, GraphError> {
    if follower.id == target.id {
        return Err(GraphError::SelfFollow);
    }
    if follower.following.iter().any(|id| id == &target.id) {
        return Err(GraphError::AlreadyFollowing);
    }

    follower.following.push(target.id.clone());
    // Add-if-absent keeps a previously half-written pair from doubling up.
    if !target.followers.iter().any(|id| id == &follower.id) {
        target.followers.push(follower.id.clone());
    }
    Ok(target.followers.len())
}

/// Unlink `follower` -> `target`, removing both sides. Returns the target's
/// new follower count.
pub fn unlink_follow(follower: &mut User, target: &mut User) -> Result<usize, GraphError> {
    if !follower.following.iter().any(|id| id == &target.id) {
        return Err(GraphError::NotFollowing);
    }

    follower.following.retain(|id| id != &target.id);
    target.followers.retain(|id| id != &follower.id);
    Ok(target.followers.len())
}

/// Add `actor` to a like set. Returns the new cardinality.
pub fn add_like(likes: &mut Vec<String>, actor: &str) -> Result<usize, GraphError> {
    if likes.iter().any(|id| id == actor) {
        return Err(GraphError::AlreadyLiked);
    }
    likes.push(actor.to_string());
    Ok(likes.len())
}

/// Remove `actor` from a like set. Returns the new cardinality.
pub fn remove_like(likes: &mut Vec<String>, actor: &str) -> Result<usize, GraphError> {
    let before = likes.len();
    likes.retain(|id| id != actor);
    if likes.len() == before {
        return Err(GraphError::NotLiked);
    }
    Ok(likes.len())
}

// === Store-level operations ===

pub fn follow_user(store: &Store, follower_id: &str, target_id: &str) -> Result<usize, GraphError> {
    let mut target: User = store
        .get_json(&user_key(target_id))
        .map_err(storage)?
        .ok_or(GraphError::UserNotFound)?;
    let mut follower: User = store
        .get_json(&user_key(follower_id))
        .map_err(storage)?
        .ok_or(GraphError::UserNotFound)?;
    let follower_preimage = follower.clone();

    let count = link_follow(&mut follower, &mut target)?;

    store
        .set_json(&user_key(follower_id), &follower)
        .map_err(storage)?;
    if let Err(err) = store.set_json(&user_key(target_id), &target) {
        // Restore the follower side so the relationship never ends up
        // one-sided.
        let _ = store.set_json(&user_key(follower_id), &follower_preimage);
        return Err(storage(err));
    }
    Ok(count)
}

pub fn unfollow_user(
    store: &Store,
    follower_id: &str,
    target_id: &str,
) -> Result<usize, GraphError> {
    let mut target: User = store
        .get_json(&user_key(target_id))
        .map_err(storage)?
        .ok_or(GraphError::UserNotFound)?;
    let mut follower: User = store
        .get_json(&user_key(follower_id))
        .map_err(storage)?
        .ok_or(GraphError::UserNotFound)?;
    let follower_preimage = follower.clone();

    let count = unlink_follow(&mut follower, &mut target)?;

    store
        .set_json(&user_key(follower_id), &follower)
        .map_err(storage)?;
    if let Err(err) = store.set_json(&user_key(target_id), &target) {
        let _ = store.set_json(&user_key(follower_id), &follower_preimage);
        return Err(storage(err));
    }
    Ok(count)
}

// === HTTP handlers ===

pub fn handle_follow(req: Request, target_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }

    let store = store();
    match follow_user(&store, &user_id, target_id) {
        Ok(count) => Ok(ok_json(serde_json::json!({
            "success": true,
            "message": "User followed successfully",
            "data": { "following": true, "follower_count": count },
        }))),
        Err(err) => Ok(ApiError::from(err).into()),
    }
}

pub fn handle_unfollow(req: Request, target_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if target_id.is_empty() || !validate_uuid(target_id) {
        return Ok(ApiError::BadRequest("Invalid target user".to_string()).into());
    }

    let store = store();
    match unfollow_user(&store, &user_id, target_id) {
        Ok(count) => Ok(ok_json(serde_json::json!({
            "success": true,
            "message": "User unfollowed successfully",
            "data": { "following": false, "follower_count": count },
        }))),
        Err(err) => Ok(ApiError::from(err).into()),
    }
}

/// Resolve a list of user ids into summaries, dropping ids that no longer
/// point at a live user (repair pass over stale graph edges).
fn resolve_members(store: &Store, ids: &[String]) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut resolved = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(user) = load_user(store, id)? {
            resolved.push(build_user_summary(&user));
        }
    }
    Ok(resolved)
}

pub fn get_followers(user_id: &str) -> anyhow::Result<Response> {
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    let user = match load_user(&store, user_id)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let followers = resolve_members(&store, &user.followers)?;
    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": followers.len(),
        "data": followers,
    })))
}

pub fn get_following(user_id: &str) -> anyhow::Result<Response> {
    if user_id.is_empty() || !validate_uuid(user_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let store = store();
    let user = match load_user(&store, user_id)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let following = resolve_members(&store, &user.following)?;
    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": following.len(),
        "data": following,
    })))
}
