use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{ok_json, store};
use crate::models::models::{Notification, Post};
use crate::users::{build_user_summary, load_user};
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;

/// Store a notification and prepend it to the recipient's index.
pub fn push_notification(store: &Store, notification: &Notification) -> anyhow::Result<()> {
    store.set_json(&notification_key(&notification.id), notification)?;

    let index_key = notifications_key(&notification.recipient);
    let mut ids: Vec<String> = store.get_json(&index_key)?.unwrap_or_default();
    ids.insert(0, notification.id.clone());
    store.set_json(&index_key, &ids)?;

    Ok(())
}

fn build_notification_json(
    store: &Store,
    notification: &Notification,
) -> anyhow::Result<serde_json::Value> {
    let sender = load_user(store, &notification.sender)?.map(|u| build_user_summary(&u));
    let post = match &notification.post {
        Some(id) => store
            .get_json::<Post>(&post_key(id))?
            .map(|p| serde_json::json!({ "id": p.id, "content": p.content, "images": p.images })),
        None => None,
    };

    Ok(serde_json::json!({
        "id": notification.id,
        "sender": sender,
        "type": notification.kind,
        "post": post,
        "read": notification.read,
        "created_at": notification.created_at,
    }))
}

// === Handlers ===

pub fn list_notifications(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let ids: Vec<String> = store
        .get_json(&notifications_key(&user_id))?
        .unwrap_or_default();

    let mut data = Vec::new();
    for id in ids.iter().take(NOTIFICATIONS_PAGE_SIZE) {
        if let Some(notification) = store.get_json::<Notification>(&notification_key(id))? {
            data.push(build_notification_json(&store, &notification)?);
        }
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub fn mark_all_read(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let ids: Vec<String> = store
        .get_json(&notifications_key(&user_id))?
        .unwrap_or_default();

    for id in &ids {
        if let Some(mut notification) = store.get_json::<Notification>(&notification_key(id))? {
            if !notification.read {
                notification.read = true;
                store.set_json(&notification_key(id), &notification)?;
            }
        }
    }

    Ok(ok_json(serde_json::json!({ "success": true })))
}

pub fn mark_read(req: Request, notification_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let mut notification =
        match store.get_json::<Notification>(&notification_key(notification_id))? {
            Some(n) if n.recipient == user_id => n,
            _ => return Ok(ApiError::NotFound("Notification not found".to_string()).into()),
        };

    notification.read = true;
    store.set_json(&notification_key(notification_id), &notification)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": build_notification_json(&store, &notification)?,
    })))
}
