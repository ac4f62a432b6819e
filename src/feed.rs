//! Personalized feed composition.
//!
//! A post is visible to a viewer when its author is followed by the viewer or
//! the post is public. The check is a single predicate over one scan of the
//! post collection, so a public post from a followed author is counted once.
//! Note the viewer's own `followers`/`private` posts are not special-cased:
//! they stay out of the viewer's feed unless the viewer follows themselves,
//! which the graph forbids.

use crate::auth::validate_token;
use crate::core::errors::ApiError;
use crate::core::helpers::{ok_json, store};
use crate::core::query_params::{page_params, parse_query_params};
use crate::models::models::{Post, Visibility};
use crate::posts::{build_post_json, load_posts};
use crate::users::load_user;
use spin_sdk::http::{Request, Response};

pub struct FeedPage {
    pub posts: Vec<Post>,
    pub total: usize,
    pub page: usize,
    pub pages: usize,
}

/// Compose page `page` (1-indexed, `limit` entries) of the posts visible to a
/// viewer with the given following set, newest first. Page and limit clamp to
/// a minimum of 1. Posts sharing a timestamp order by id descending so
/// pagination stays deterministic.
pub fn compose_feed(following: &[String], posts: Vec<Post>, page: usize, limit: usize) -> FeedPage {
    let page = page.max(1);
    let limit = limit.max(1);

    let mut visible: Vec<Post> = posts
        .into_iter()
        .filter(|post| {
            following.iter().any(|id| id == &post.author) || post.visibility == Visibility::Public
        })
        .collect();

    visible.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });

    let total = visible.len();
    let pages = total.div_ceil(limit);
    let posts = visible
        .into_iter()
        .skip((page - 1) * limit)
        .take(limit)
        .collect();

    FeedPage {
        posts,
        total,
        page,
        pages,
    }
}

pub fn get_feed(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let user = match load_user(&store, &user_id)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);

    let feed = compose_feed(&user.following, load_posts(&store)?, page, limit);

    let mut data = Vec::with_capacity(feed.posts.len());
    for post in &feed.posts {
        data.push(build_post_json(&store, post)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "total": feed.total,
        "page": feed.page,
        "pages": feed.pages,
        "data": data,
    })))
}
