use crate::auth::{current_user, validate_token};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{created_json, now_iso, ok_json, store, validate_uuid};
use crate::models::models::{Comment, Post};
use crate::social::{self, GraphError};
use crate::users::{build_user_summary, load_user, sanitize_text};
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

fn build_comment_json(store: &Store, comment: &Comment) -> anyhow::Result<serde_json::Value> {
    let author = load_user(store, &comment.author)?.map(|u| build_user_summary(&u));
    Ok(serde_json::json!({
        "id": comment.id,
        "post": comment.post,
        "author": author,
        "content": comment.content,
        "likes": comment.likes,
        "like_count": comment.like_count(),
        "reply_count": comment.reply_count(),
        "parent_comment": comment.parent_comment,
        "is_edited": comment.is_edited,
        "created_at": comment.created_at,
        "updated_at": comment.updated_at,
    }))
}

/// Top-level comments on a post, newest first, replies populated inline.
pub fn list_comments(post_id: &str) -> anyhow::Result<Response> {
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let mut comments = Vec::with_capacity(post.comments.len());
    for id in &post.comments {
        if let Some(comment) = store.get_json::<Comment>(&comment_key(id))? {
            comments.push(comment);
        }
    }
    comments.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let mut data = Vec::with_capacity(comments.len());
    for comment in &comments {
        let mut entry = build_comment_json(&store, comment)?;
        let mut replies = Vec::with_capacity(comment.replies.len());
        for reply_id in &comment.replies {
            if let Some(reply) = store.get_json::<Comment>(&comment_key(reply_id))? {
                replies.push(build_comment_json(&store, &reply)?);
            }
        }
        entry["replies"] = serde_json::Value::Array(replies);
        data.push(entry);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub fn create_comment(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let mut post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let content = sanitize_text(value["content"].as_str().unwrap_or("").trim());
    if content.is_empty() {
        return Ok(ApiError::BadRequest("Comment cannot be empty".to_string()).into());
    }
    if content.len() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Comment too long (max 2000 chars)".to_string()).into());
    }

    // A reply must point at a comment on the same post.
    let parent_comment = match value["parent_comment"].as_str() {
        Some(parent_id) => match store.get_json::<Comment>(&comment_key(parent_id))? {
            Some(parent) if parent.post == post_id => Some(parent),
            Some(_) => {
                return Ok(ApiError::BadRequest(
                    "Parent comment belongs to a different post".to_string(),
                )
                .into())
            }
            None => {
                return Ok(ApiError::NotFound("Parent comment not found".to_string()).into())
            }
        },
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    let comment = Comment {
        id: id.clone(),
        post: post_id.to_string(),
        author: user_id,
        content,
        likes: Vec::new(),
        parent_comment: parent_comment.as_ref().map(|p| p.id.clone()),
        replies: Vec::new(),
        is_edited: false,
        created_at: now_iso(),
        updated_at: None,
    };
    store.set_json(&comment_key(&id), &comment)?;

    match parent_comment {
        Some(mut parent) => {
            parent.replies.push(id.clone());
            store.set_json(&comment_key(&parent.id), &parent)?;
        }
        None => {
            post.comments.push(id.clone());
            store.set_json(&post_key(post_id), &post)?;
        }
    }

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": "Comment added successfully",
        "data": build_comment_json(&store, &comment)?,
    })))
}

pub fn update_comment(req: Request, comment_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if comment_id.is_empty() || !validate_uuid(comment_id) {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    }

    let store = store();
    let mut comment = match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if comment.author != user_id {
        return Ok(ApiError::Forbidden.into());
    }

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let content = sanitize_text(value["content"].as_str().unwrap_or("").trim());
    if content.is_empty() {
        return Ok(ApiError::BadRequest("Comment cannot be empty".to_string()).into());
    }
    if content.len() > MAX_COMMENT_LENGTH {
        return Ok(ApiError::BadRequest("Comment too long (max 2000 chars)".to_string()).into());
    }

    comment.content = content;
    comment.is_edited = true;
    comment.updated_at = Some(now_iso());
    store.set_json(&comment_key(comment_id), &comment)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Comment updated successfully",
        "data": build_comment_json(&store, &comment)?,
    })))
}

pub fn delete_comment(req: Request, comment_id: &str) -> anyhow::Result<Response> {
    let actor = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if comment_id.is_empty() || !validate_uuid(comment_id) {
        return Ok(ApiError::BadRequest("Comment ID required".to_string()).into());
    }

    let store = store();
    let comment = match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    if comment.author != actor.id && !actor.role.is_admin() {
        return Ok(ApiError::Forbidden.into());
    }

    // Detach from the post or the parent, then drop the replies.
    match &comment.parent_comment {
        Some(parent_id) => {
            if let Some(mut parent) = store.get_json::<Comment>(&comment_key(parent_id))? {
                parent.replies.retain(|id| id != comment_id);
                store.set_json(&comment_key(parent_id), &parent)?;
            }
        }
        None => {
            if let Some(mut post) = store.get_json::<Post>(&post_key(&comment.post))? {
                post.comments.retain(|id| id != comment_id);
                store.set_json(&post_key(&comment.post), &post)?;
            }
        }
    }

    for reply_id in &comment.replies {
        store.delete(&comment_key(reply_id))?;
    }
    store.delete(&comment_key(comment_id))?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Comment deleted successfully",
    })))
}

pub fn like_comment(req: Request, comment_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut comment = match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    match social::add_like(&mut comment.likes, &user_id) {
        Ok(count) => {
            store.set_json(&comment_key(comment_id), &comment)?;
            Ok(ok_json(serde_json::json!({
                "success": true,
                "message": "Comment liked",
                "data": { "like_count": count, "liked": true },
            })))
        }
        Err(GraphError::AlreadyLiked) => {
            Ok(ApiError::BadRequest("You already liked this comment".to_string()).into())
        }
        Err(err) => Ok(ApiError::from(err).into()),
    }
}

pub fn unlike_comment(req: Request, comment_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut comment = match store.get_json::<Comment>(&comment_key(comment_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Comment not found".to_string()).into()),
    };

    match social::remove_like(&mut comment.likes, &user_id) {
        Ok(count) => {
            store.set_json(&comment_key(comment_id), &comment)?;
            Ok(ok_json(serde_json::json!({
                "success": true,
                "message": "Comment unliked",
                "data": { "like_count": count, "liked": false },
            })))
        }
        Err(GraphError::NotLiked) => {
            Ok(ApiError::BadRequest("You have not liked this comment".to_string()).into())
        }
        Err(err) => Ok(ApiError::from(err).into()),
    }
}
