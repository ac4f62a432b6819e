use crate::auth::validate_token;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{created_json, now_iso, ok_json, store, validate_uuid};
use crate::core::query_params::{get_string, parse_query_params};
use crate::models::models::{Community, CommunityPrivacy};
use crate::users::{build_user_summary, load_user, sanitize_text};
use regex::Regex;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use std::sync::OnceLock;
use uuid::Uuid;

pub const CATEGORIES: &[&str] = &[
    "Deep Sky Objects",
    "Planetary Imaging",
    "Astrophotography",
    "Solar System",
    "Wide Field",
    "Equipment & Gear",
    "Beginners",
    "Image Processing",
    "Observing",
    "General Discussion",
    "Other",
];

fn slug_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("Regex should compile"))
}

pub fn slugify(name: &str) -> String {
    slug_regex()
        .replace_all(&name.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

fn build_community_json(store: &Store, community: &Community) -> anyhow::Result<serde_json::Value> {
    let admin = load_user(store, &community.admin)?.map(|u| build_user_summary(&u));
    Ok(serde_json::json!({
        "id": community.id,
        "name": community.name,
        "slug": community.slug,
        "description": community.description,
        "category": community.category,
        "admin": admin,
        "privacy": community.privacy,
        "member_count": community.member_count(),
        "created_at": community.created_at,
    }))
}

fn load_communities(store: &Store) -> anyhow::Result<Vec<Community>> {
    let ids: Vec<String> = store.get_json(COMMUNITIES_LIST_KEY)?.unwrap_or_default();
    let mut communities = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(community) = store.get_json::<Community>(&community_key(&id))? {
            communities.push(community);
        }
    }
    Ok(communities)
}

// === Handlers ===

pub fn list_communities(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let category = get_string(&params, "category");
    let search = get_string(&params, "search").map(|s| s.to_lowercase());

    let store = store();
    let mut communities: Vec<Community> = load_communities(&store)?
        .into_iter()
        .filter(|c| category.as_deref().map_or(true, |cat| c.category == cat))
        .filter(|c| {
            search.as_deref().map_or(true, |needle| {
                c.name.to_lowercase().contains(needle)
                    || c.description.to_lowercase().contains(needle)
            })
        })
        .collect();

    communities.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let mut data = Vec::with_capacity(communities.len());
    for community in &communities {
        data.push(build_community_json(&store, community)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub fn get_community(slug: &str) -> anyhow::Result<Response> {
    let store = store();
    let community = load_communities(&store)?
        .into_iter()
        .find(|c| c.slug == slug);

    match community {
        Some(community) => {
            let mut data = build_community_json(&store, &community)?;
            // Member summaries, skipping ids that no longer resolve.
            let mut members = Vec::with_capacity(community.members.len());
            for id in &community.members {
                if let Some(user) = load_user(&store, id)? {
                    members.push(build_user_summary(&user));
                }
            }
            data["members"] = serde_json::Value::Array(members);
            Ok(ok_json(serde_json::json!({ "success": true, "data": data })))
        }
        None => Ok(ApiError::NotFound("Community not found".to_string()).into()),
    }
}

pub fn create_community(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let name = sanitize_text(value["name"].as_str().unwrap_or("").trim());
    let description = sanitize_text(value["description"].as_str().unwrap_or("").trim());
    let category = value["category"].as_str().unwrap_or("").trim().to_string();

    if name.len() < MIN_COMMUNITY_NAME_LENGTH || name.len() > MAX_COMMUNITY_NAME_LENGTH {
        return Ok(
            ApiError::BadRequest("Community name must be 3-50 characters".to_string()).into(),
        );
    }
    if description.is_empty() || description.len() > MAX_COMMUNITY_DESCRIPTION_LENGTH {
        return Ok(ApiError::BadRequest(
            "Description is required (max 1000 chars)".to_string(),
        )
        .into());
    }
    if !CATEGORIES.contains(&category.as_str()) {
        return Ok(ApiError::BadRequest(format!("Unknown category '{}'", category)).into());
    }

    let slug = slugify(&name);
    if slug.is_empty() {
        return Ok(ApiError::BadRequest("Community name must contain letters or digits".to_string()).into());
    }
    if load_communities(&store)?
        .iter()
        .any(|c| c.slug == slug || c.name.eq_ignore_ascii_case(&name))
    {
        return Ok(ApiError::Conflict("Community already exists".to_string()).into());
    }

    let privacy = match value["privacy"].as_str() {
        None | Some("public") => CommunityPrivacy::Public,
        Some("private") => CommunityPrivacy::Private,
        Some(other) => {
            return Ok(ApiError::BadRequest(format!("Unknown privacy '{}'", other)).into())
        }
    };

    let id = Uuid::new_v4().to_string();
    let community = Community {
        id: id.clone(),
        name,
        slug,
        description,
        category,
        admin: user_id.clone(),
        // The creator runs and belongs to the community from the start.
        moderators: vec![user_id.clone()],
        members: vec![user_id],
        privacy,
        created_at: now_iso(),
    };

    store.set_json(&community_key(&id), &community)?;
    let mut communities: Vec<String> = store.get_json(COMMUNITIES_LIST_KEY)?.unwrap_or_default();
    communities.push(id);
    store.set_json(COMMUNITIES_LIST_KEY, &communities)?;

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": "Community created successfully",
        "data": build_community_json(&store, &community)?,
    })))
}

pub fn join_community(req: Request, community_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if community_id.is_empty() || !validate_uuid(community_id) {
        return Ok(ApiError::BadRequest("Community ID required".to_string()).into());
    }

    let store = store();
    let mut community = match store.get_json::<Community>(&community_key(community_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Community not found".to_string()).into()),
    };

    if community.privacy == CommunityPrivacy::Private {
        return Ok(ApiError::Forbidden.into());
    }
    if community.members.iter().any(|id| id == &user_id) {
        return Ok(
            ApiError::BadRequest("You are already a member of this community".to_string()).into(),
        );
    }

    community.members.push(user_id);
    store.set_json(&community_key(community_id), &community)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Joined community",
        "data": { "member_count": community.member_count() },
    })))
}

pub fn leave_community(req: Request, community_id: &str) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    if community_id.is_empty() || !validate_uuid(community_id) {
        return Ok(ApiError::BadRequest("Community ID required".to_string()).into());
    }

    let store = store();
    let mut community = match store.get_json::<Community>(&community_key(community_id))? {
        Some(c) => c,
        None => return Ok(ApiError::NotFound("Community not found".to_string()).into()),
    };

    if community.admin == user_id {
        return Ok(
            ApiError::BadRequest("Community admin cannot leave the community".to_string()).into(),
        );
    }
    if !community.members.iter().any(|id| id == &user_id) {
        return Ok(
            ApiError::BadRequest("You are not a member of this community".to_string()).into(),
        );
    }

    community.members.retain(|id| id != &user_id);
    community.moderators.retain(|id| id != &user_id);
    store.set_json(&community_key(community_id), &community)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Left community",
        "data": { "member_count": community.member_count() },
    })))
}
