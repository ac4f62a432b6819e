use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{
    created_json, hash_password, now_iso, ok_json, store, verify_password,
};
use crate::models::models::{Equipment, Role, TokenData, User};
use crate::users::{
    build_user_profile, find_user_by_email, find_user_by_username, load_user, sanitize_text,
};
use regex::Regex;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use std::sync::OnceLock;
use uuid::Uuid;

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("Regex should compile"))
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile"))
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(
            "Username must be 3-30 characters".to_string(),
        ));
    }
    if !username_regex().is_match(username) {
        return Err(ApiError::BadRequest(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if !email_regex().is_match(email) {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

// === Tokens ===

pub fn issue_token(store: &Store, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

/// Delete every session token belonging to `user_id`.
pub fn invalidate_user_tokens(store: &Store, user_id: &str) -> anyhow::Result<()> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut kept = Vec::with_capacity(tokens.len());

    for token in tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => {
                store.delete(&key)?;
            }
            Some(_) => kept.push(token),
            None => {}
        }
    }

    store.set_json(TOKENS_LIST_KEY, &kept)?;
    Ok(())
}

pub fn validate_token(req: &Request) -> Option<String> {
    let store = store();
    let auth_header = req.header("Authorization")?.as_str().unwrap_or_default();
    if !auth_header.starts_with("Bearer ") {
        return None;
    }
    let token = auth_header.strip_prefix("Bearer ").unwrap();
    let data = store.get_json::<TokenData>(&token_key(token)).ok()??;

    // Expired tokens are treated as absent.
    if let Ok(created) = chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        let age_hours = (chrono::Utc::now() - created.with_timezone(&chrono::Utc)).num_hours();
        if age_hours > token_expiration_hours() {
            return None;
        }
    }

    // The account may have been deleted since the token was issued.
    if store.get_json::<User>(&user_key(&data.user_id)).ok()?.is_none() {
        return None;
    }
    Some(data.user_id)
}

pub fn current_user(req: &Request) -> Option<User> {
    let user_id = validate_token(req)?;
    let store = store();
    store.get_json::<User>(&user_key(&user_id)).ok()?
}

pub fn require_admin(req: &Request) -> Result<User, ApiError> {
    let user = current_user(req).ok_or(ApiError::Unauthorized)?;
    if user.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(user)
}

// === Handlers ===

pub fn register(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let username = value["username"].as_str().unwrap_or("").trim().to_string();
    let email = value["email"]
        .as_str()
        .unwrap_or("")
        .trim()
        .to_lowercase();
    let password = value["password"].as_str().unwrap_or("");

    if let Err(err) = validate_username(&username) {
        return Ok(err.into());
    }
    if let Err(err) = validate_email(&email) {
        return Ok(err.into());
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Ok(
            ApiError::BadRequest("Password must be at least 6 characters".to_string()).into(),
        );
    }

    if find_user_by_username(&store, &username)?.is_some() {
        return Ok(ApiError::Conflict("Username already taken".to_string()).into());
    }
    if find_user_by_email(&store, &email)?.is_some() {
        return Ok(ApiError::Conflict("Email already registered".to_string()).into());
    }

    let id = Uuid::new_v4().to_string();
    let user = User {
        id: id.clone(),
        profile_picture: default_avatar_url(&username),
        username,
        email,
        password: hash_password(password)?,
        bio: None,
        location: None,
        interests: Vec::new(),
        equipment: Equipment::default(),
        followers: Vec::new(),
        following: Vec::new(),
        role: Role::User,
        created_at: now_iso(),
        last_active: now_iso(),
    };

    store.set_json(&user_key(&id), &user)?;
    let mut users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    users.push(id.clone());
    store.set_json(USERS_LIST_KEY, &users)?;

    let token = issue_token(&store, &id)?;

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": "User registered successfully",
        "token": token,
        "data": build_user_profile(&user),
    })))
}

pub fn login(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let email = value["email"].as_str().unwrap_or("").trim().to_lowercase();
    let password = value["password"].as_str().unwrap_or("");

    if email.is_empty() || password.is_empty() {
        return Ok(
            ApiError::BadRequest("Please provide an email and password".to_string()).into(),
        );
    }

    let mut user = match find_user_by_email(&store, &email)? {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };
    if !verify_password(password, &user.password) {
        return Ok(ApiError::Unauthorized.into());
    }

    user.last_active = now_iso();
    store.set_json(&user_key(&user.id), &user)?;

    let token = issue_token(&store, &user.id)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Login successful",
        "token": token,
        "data": build_user_profile(&user),
    })))
}

pub fn logout(req: Request) -> anyhow::Result<Response> {
    let store = store();
    let auth_header = req
        .header("Authorization")
        .and_then(|h| h.as_str())
        .unwrap_or_default();

    if !auth_header.starts_with("Bearer ") {
        return Ok(ApiError::Unauthorized.into());
    }

    let token = auth_header.strip_prefix("Bearer ").unwrap();
    store.delete(&token_key(token))?;

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let kept: Vec<String> = tokens.into_iter().filter(|t| t != token).collect();
    store.set_json(TOKENS_LIST_KEY, &kept)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Logged out successfully",
    })))
}

pub fn me(req: Request) -> anyhow::Result<Response> {
    let user = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let mut data = build_user_profile(&user);
    data["email"] = serde_json::Value::String(user.email.clone());
    data["last_active"] = serde_json::Value::String(user.last_active.clone());

    Ok(ok_json(serde_json::json!({
        "success": true,
        "data": data,
    })))
}

pub fn check_username(req: Request) -> anyhow::Result<Response> {
    let params = crate::core::query_params::parse_query_params(req.uri());
    let username = params
        .get("username")
        .map(|u| u.trim().to_string())
        .unwrap_or_default();

    if username.len() < MIN_USERNAME_LENGTH {
        return Ok(ApiError::BadRequest("Username too short".to_string()).into());
    }

    let store = store();
    let available = find_user_by_username(&store, &username)?.is_none();

    Ok(ok_json(serde_json::json!({
        "success": true,
        "available": available,
    })))
}

pub fn update_details(req: Request) -> anyhow::Result<Response> {
    let mut user = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(username) = value["username"].as_str() {
        let username = username.trim();
        if username != user.username {
            if let Err(err) = validate_username(username) {
                return Ok(err.into());
            }
            if find_user_by_username(&store, username)?.is_some() {
                return Ok(ApiError::Conflict("Username already taken".to_string()).into());
            }
            user.username = username.to_string();
        }
    }

    if let Some(email) = value["email"].as_str() {
        let email = email.trim().to_lowercase();
        if email != user.email {
            if let Err(err) = validate_email(&email) {
                return Ok(err.into());
            }
            if find_user_by_email(&store, &email)?.is_some() {
                return Ok(ApiError::Conflict("Email already registered".to_string()).into());
            }
            user.email = email;
        }
    }

    if let Some(bio) = value["bio"].as_str() {
        if bio.len() > MAX_BIO_LENGTH {
            return Ok(ApiError::BadRequest("Bio too long (max 500 chars)".to_string()).into());
        }
        let sanitized = sanitize_text(bio);
        user.bio = if sanitized.is_empty() {
            None
        } else {
            Some(sanitized)
        };
    }

    if let Some(location) = value["location"].as_str() {
        if location.len() > MAX_LOCATION_LENGTH {
            return Ok(
                ApiError::BadRequest("Location too long (max 100 chars)".to_string()).into(),
            );
        }
        let sanitized = sanitize_text(location);
        user.location = if sanitized.is_empty() {
            None
        } else {
            Some(sanitized)
        };
    }

    if let Some(interests) = value["interests"].as_array() {
        user.interests = interests
            .iter()
            .filter_map(|v| v.as_str())
            .map(sanitize_text)
            .filter(|s| !s.is_empty())
            .collect();
    }

    if value.get("equipment").is_some() {
        user.equipment = Equipment {
            telescope: value["equipment"]["telescope"].as_str().map(sanitize_text),
            camera: value["equipment"]["camera"].as_str().map(sanitize_text),
            mount: value["equipment"]["mount"].as_str().map(sanitize_text),
            other: value["equipment"]["other"].as_str().map(sanitize_text),
        };
    }

    store.set_json(&user_key(&user.id), &user)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Profile updated successfully",
        "data": build_user_profile(&user),
    })))
}

pub fn update_password(req: Request) -> anyhow::Result<Response> {
    let user_id = match validate_token(&req) {
        Some(uid) => uid,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let current_password = value["current_password"].as_str().unwrap_or("");
    let new_password = value["new_password"].as_str().unwrap_or("");

    if current_password.is_empty() || new_password.is_empty() {
        return Ok(ApiError::BadRequest(
            "Please provide current and new password".to_string(),
        )
        .into());
    }
    if new_password.len() < MIN_PASSWORD_LENGTH {
        return Ok(
            ApiError::BadRequest("Password must be at least 6 characters".to_string()).into(),
        );
    }

    let mut user = match load_user(&store, &user_id)? {
        Some(u) => u,
        None => return Ok(ApiError::NotFound("User not found".to_string()).into()),
    };

    if !verify_password(current_password, &user.password) {
        return Ok(ApiError::Unauthorized.into());
    }

    user.password = hash_password(new_password)?;
    store.set_json(&user_key(&user.id), &user)?;

    // Every other session for this account is now stale.
    invalidate_user_tokens(&store, &user.id)?;
    let token = issue_token(&store, &user.id)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Password updated successfully",
        "token": token,
        "data": build_user_profile(&user),
    })))
}
