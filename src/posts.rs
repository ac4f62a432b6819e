use crate::auth::{current_user, validate_token};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{created_json, now_iso, ok_json, store, validate_uuid};
use crate::core::query_params::{get_string, page_params, parse_query_params};
use crate::models::models::{
    AstronomyData, Comment, Community, Notification, Post, PostImage, Visibility,
};
use crate::notifications::push_notification;
use crate::social::{self, GraphError};
use crate::users::{build_user_summary, find_user_by_username, load_user};
use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use std::sync::OnceLock;
use uuid::Uuid;

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

/// Sanitize post content and turn bare URLs into links.
fn render_content(content: &str) -> String {
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}

fn parse_visibility(value: &serde_json::Value) -> Result<Visibility, ApiError> {
    match value.as_str() {
        None => Ok(Visibility::Public),
        Some("public") => Ok(Visibility::Public),
        Some("followers") => Ok(Visibility::Followers),
        Some("private") => Ok(Visibility::Private),
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unknown visibility '{}'",
            other
        ))),
    }
}

fn parse_tags(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.as_str())
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// === Loading & projection ===

pub fn load_posts(store: &Store) -> anyhow::Result<Vec<Post>> {
    let ids: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    let mut posts = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(post) = store.get_json::<Post>(&post_key(&id))? {
            posts.push(post);
        }
    }
    Ok(posts)
}

pub fn build_post_json(store: &Store, post: &Post) -> anyhow::Result<serde_json::Value> {
    let author = load_user(store, &post.author)?.map(|u| build_user_summary(&u));
    let community = match &post.community {
        Some(id) => store
            .get_json::<Community>(&community_key(id))?
            .map(|c| serde_json::json!({ "id": c.id, "name": c.name, "slug": c.slug })),
        None => None,
    };

    Ok(serde_json::json!({
        "id": post.id,
        "author": author,
        "content": post.content,
        "images": post.images,
        "astronomy_data": post.astronomy_data,
        "tags": post.tags,
        "likes": post.likes,
        "like_count": post.like_count(),
        "comment_count": post.comment_count(),
        "visibility": post.visibility,
        "community": community,
        "created_at": post.created_at,
        "updated_at": post.updated_at,
    }))
}

fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

// === Handlers ===

pub fn create_post(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let content = value["content"].as_str().unwrap_or("").trim().to_string();
    let images: Vec<PostImage> = match value.get("images") {
        Some(v) => match serde_json::from_value(v.clone()) {
            Ok(images) => images,
            Err(_) => {
                return Ok(ApiError::BadRequest("Invalid images payload".to_string()).into())
            }
        },
        None => Vec::new(),
    };

    if content.is_empty() && images.is_empty() {
        return Ok(ApiError::BadRequest(
            "Post must have either content or at least one image".to_string(),
        )
        .into());
    }
    if content.len() > MAX_POST_LENGTH {
        return Ok(ApiError::BadRequest("Content too long (max 5000 chars)".to_string()).into());
    }

    let visibility = match parse_visibility(&value["visibility"]) {
        Ok(v) => v,
        Err(err) => return Ok(err.into()),
    };

    let community = match value["community"].as_str() {
        Some(id) => {
            if store.get_json::<Community>(&community_key(id))?.is_none() {
                return Ok(ApiError::NotFound("Community not found".to_string()).into());
            }
            Some(id.to_string())
        }
        None => None,
    };

    let astronomy_data: AstronomyData = value
        .get("astronomy_data")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    let id = Uuid::new_v4().to_string();
    let post = Post {
        id: id.clone(),
        author: user_id,
        content: render_content(&content),
        images,
        astronomy_data,
        tags: parse_tags(&value["tags"]),
        likes: Vec::new(),
        comments: Vec::new(),
        visibility,
        community,
        created_at: now_iso(),
        updated_at: None,
    };

    store.set_json(&post_key(&id), &post)?;

    let mut posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    posts.insert(0, id); // newest first
    store.set_json(POSTS_LIST_KEY, &posts)?;

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": "Post created successfully",
        "data": build_post_json(&store, &post)?,
    })))
}

/// Public post listing with author/community/tag/search filters.
pub fn list_posts(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);
    let author = get_string(&params, "author");
    let community = get_string(&params, "community");
    let tag = get_string(&params, "tag").map(|t| t.to_lowercase());
    let search = get_string(&params, "search").map(|s| s.to_lowercase());

    let store = store();
    let mut posts: Vec<Post> = load_posts(&store)?
        .into_iter()
        .filter(|post| post.visibility == Visibility::Public)
        .filter(|post| author.as_deref().map_or(true, |a| post.author == a))
        .filter(|post| {
            community
                .as_deref()
                .map_or(true, |c| post.community.as_deref() == Some(c))
        })
        .filter(|post| tag.as_deref().map_or(true, |t| post.tags.iter().any(|x| x == t)))
        .filter(|post| {
            search.as_deref().map_or(true, |needle| {
                post.content.to_lowercase().contains(needle)
                    || post
                        .astronomy_data
                        .object_name
                        .as_deref()
                        .map_or(false, |name| name.to_lowercase().contains(needle))
            })
        })
        .collect();

    sort_newest_first(&mut posts);

    let total = posts.len();
    let pages = total.div_ceil(limit);

    let mut data = Vec::new();
    for post in posts.iter().skip((page - 1) * limit).take(limit) {
        data.push(build_post_json(&store, post)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "page": page,
        "pages": pages,
        "data": data,
    })))
}

pub fn get_post(post_id: &str) -> anyhow::Result<Response> {
    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": build_post_json(&store, &post)?,
    })))
}

pub fn update_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let actor = match current_user(&req) {
        Some(u) => u,
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

    if post.author != actor.id && !actor.role.is_admin() {
        return Ok(ApiError::Forbidden.into());
    }

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(content) = value["content"].as_str() {
        let content = content.trim();
        if content.is_empty() && post.images.is_empty() {
            return Ok(ApiError::BadRequest(
                "Post must have either content or at least one image".to_string(),
            )
            .into());
        }
        if content.len() > MAX_POST_LENGTH {
            return Ok(
                ApiError::BadRequest("Content too long (max 5000 chars)".to_string()).into(),
            );
        }
        post.content = render_content(content);
    }

    if value.get("tags").is_some() {
        post.tags = parse_tags(&value["tags"]);
    }

    if value.get("visibility").is_some() {
        post.visibility = match parse_visibility(&value["visibility"]) {
            Ok(v) => v,
            Err(err) => return Ok(err.into()),
        };
    }

    if let Some(v) = value.get("astronomy_data") {
        if let Ok(data) = serde_json::from_value::<AstronomyData>(v.clone()) {
            post.astronomy_data = data;
        }
    }

    post.updated_at = Some(now_iso());
    store.set_json(&post_key(post_id), &post)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Post updated successfully",
        "data": build_post_json(&store, &post)?,
    })))
}

pub fn delete_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let actor = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if post_id.is_empty() || !validate_uuid(post_id) {
        return Ok(ApiError::BadRequest("Post ID required".to_string()).into());
    }

    let store = store();
    let post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    if post.author != actor.id && !actor.role.is_admin() {
        return Ok(ApiError::Forbidden.into());
    }

    // Comments and their replies go with the post.
    for comment_id in &post.comments {
        if let Some(comment) = store.get_json::<Comment>(&comment_key(comment_id))? {
            for reply_id in &comment.replies {
                store.delete(&comment_key(reply_id))?;
            }
        }
        store.delete(&comment_key(comment_id))?;
    }

    store.delete(&post_key(post_id))?;
    let posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    let kept: Vec<String> = posts.into_iter().filter(|id| id != post_id).collect();
    store.set_json(POSTS_LIST_KEY, &kept)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Post deleted successfully",
    })))
}

pub fn like_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    match social::add_like(&mut post.likes, &user_id) {
        Ok(count) => {
            store.set_json(&post_key(post_id), &post)?;
            Ok(ok_json(serde_json::json!({
                "success": true,
                "message": "Post liked",
                "data": { "like_count": count, "liked": true },
            })))
        }
        Err(GraphError::AlreadyLiked) => {
            Ok(ApiError::BadRequest("You already liked this post".to_string()).into())
        }
        Err(err) => Ok(ApiError::from(err).into()),
    }
}

pub fn unlike_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut post = match store.get_json::<Post>(&post_key(post_id))? {
        Some(p) => p,
        None => return Ok(ApiError::NotFound("Post not found".to_string()).into()),
    };

    match social::remove_like(&mut post.likes, &user_id) {
        Ok(count) => {
            store.set_json(&post_key(post_id), &post)?;
            Ok(ok_json(serde_json::json!({
                "success": true,
                "message": "Post unliked",
                "data": { "like_count": count, "liked": false },
            })))
        }
        Err(GraphError::NotLiked) => {
            Ok(ApiError::BadRequest("You have not liked this post".to_string()).into())
        }
        Err(err) => Ok(ApiError::from(err).into()),
    }
}

/// Share a post with another user via an in-app notification.
pub fn share_post(req: Request, post_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let recipient_username = value["recipient_username"].as_str().unwrap_or("").trim();
    if recipient_username.is_empty() {
        return Ok(ApiError::BadRequest("Recipient username is required".to_string()).into());
    }

    if store.get_json::<Post>(&post_key(post_id))?.is_none() {
        return Ok(ApiError::NotFound("Post not found".to_string()).into());
    }

    let recipient = match find_user_by_username(&store, recipient_username)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };
    if recipient.id == user_id {
        return Ok(
            ApiError::BadRequest("You cannot share a post with yourself".to_string()).into(),
        );
    }

    // Reject rapid-fire duplicates of the same share.
    let now = chrono::Utc::now();
    let recent_ids: Vec<String> = store
        .get_json(&notifications_key(&recipient.id))?
        .unwrap_or_default();
    for id in &recent_ids {
        if let Some(existing) = store.get_json::<Notification>(&notification_key(id))? {
            if existing.kind == "share_post"
                && existing.sender == user_id
                && existing.post.as_deref() == Some(post_id)
            {
                if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&existing.created_at) {
                    let age = (now - created.with_timezone(&chrono::Utc)).num_seconds();
                    if age < SHARE_DEDUP_SECONDS {
                        return Ok(ApiError::BadRequest(
                            "You already shared this post with that user recently".to_string(),
                        )
                        .into());
                    }
                }
            }
        }
    }

    let notification = Notification {
        id: Uuid::new_v4().to_string(),
        recipient: recipient.id.clone(),
        sender: user_id,
        kind: "share_post".to_string(),
        post: Some(post_id.to_string()),
        read: false,
        created_at: now_iso(),
    };
    push_notification(&store, &notification)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": format!("Post shared with {}", recipient.username),
    })))
}

/// Posts by a single author, filtered to what the requester may see: the
/// author sees everything, followers additionally see followers-only posts,
/// anyone sees public ones.
pub fn get_user_posts(req: Request, author_id: &str) -> anyhow::Result<Response> {
    if author_id.is_empty() || !validate_uuid(author_id) {
        return Ok(ApiError::BadRequest("User ID required".to_string()).into());
    }

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);

    let store = store();
    if load_user(&store, author_id)?.is_none() {
        return Ok(ApiError::NotFound("User not found".to_string()).into());
    }

    let viewer = validate_token(&req);
    let viewer_follows = match &viewer {
        Some(viewer_id) => load_user(&store, viewer_id)?
            .map(|u| u.following.iter().any(|id| id == author_id))
            .unwrap_or(false),
        None => false,
    };

    let mut posts: Vec<Post> = load_posts(&store)?
        .into_iter()
        .filter(|post| post.author == author_id)
        .filter(|post| match post.visibility {
            Visibility::Public => true,
            Visibility::Followers => viewer.as_deref() == Some(author_id) || viewer_follows,
            Visibility::Private => viewer.as_deref() == Some(author_id),
        })
        .collect();

    sort_newest_first(&mut posts);

    let total = posts.len();
    let pages = total.div_ceil(limit);

    let mut data = Vec::new();
    for post in posts.iter().skip((page - 1) * limit).take(limit) {
        data.push(build_post_json(&store, post)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "total": total,
        "page": page,
        "pages": pages,
        "data": data,
    })))
}
