use crate::auth::{current_user, require_admin};
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{created_json, now_iso, ok_json, store, validate_uuid};
use crate::core::query_params::{get_bool_flag, get_int, get_string, page_params, parse_query_params};
use crate::models::models::{CelestialEvent, EventStatus};
use crate::users::{build_user_summary, load_user, sanitize_text};
use chrono::{DateTime, Utc};
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

pub const EVENT_TYPES: &[&str] = &[
    "Meteor Shower",
    "Lunar Eclipse",
    "Solar Eclipse",
    "Planetary Conjunction",
    "Transit",
    "Occultation",
    "Comet",
    "Moon Phase",
    "Planet Visibility",
    "ISS Pass",
    "Satellite",
    "Other",
];

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

fn load_events(store: &Store) -> anyhow::Result<Vec<CelestialEvent>> {
    let ids: Vec<String> = store.get_json(EVENTS_LIST_KEY)?.unwrap_or_default();
    let mut events = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(event) = store.get_json::<CelestialEvent>(&event_key(&id))? {
            events.push(event);
        }
    }
    Ok(events)
}

fn build_event_json(store: &Store, event: &CelestialEvent) -> anyhow::Result<serde_json::Value> {
    let created_by = load_user(store, &event.created_by)?.map(|u| build_user_summary(&u));
    let mut data = serde_json::to_value(event)?;
    data["created_by"] = created_by.unwrap_or(serde_json::Value::Null);
    Ok(data)
}

fn is_admin(req: &Request) -> bool {
    current_user(req).map(|u| u.role.is_admin()).unwrap_or(false)
}

fn parse_status(value: &str) -> Option<EventStatus> {
    match value {
        "pending" => Some(EventStatus::Pending),
        "approved" => Some(EventStatus::Approved),
        "rejected" => Some(EventStatus::Rejected),
        _ => None,
    }
}

// === Handlers ===

pub fn list_events(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let (page, limit) = page_params(&params);
    let kind = get_string(&params, "type");
    let status = get_string(&params, "status");
    let upcoming_only = get_bool_flag(&params, "upcoming");
    let admin = is_admin(&req);

    let now = Utc::now();
    let store = store();
    let mut events: Vec<CelestialEvent> = load_events(&store)?
        .into_iter()
        .filter(|e| kind.as_deref().map_or(true, |k| e.kind == k))
        .filter(|e| {
            // Non-admins only ever see approved events; admins may filter by
            // any status.
            match (admin, status.as_deref().and_then(parse_status)) {
                (true, Some(wanted)) => e.status == wanted,
                _ => e.status == EventStatus::Approved,
            }
        })
        .filter(|e| {
            !upcoming_only
                || parse_date(&e.start_date)
                    .map(|start| start >= now)
                    .unwrap_or(false)
        })
        .collect();

    events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));

    let total = events.len();
    let pages = total.div_ceil(limit);

    let mut data = Vec::new();
    for event in events.iter().skip((page - 1) * limit).take(limit) {
        data.push(build_event_json(&store, event)?);
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

pub fn upcoming_events(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let limit = get_int(&params, "limit", DEFAULT_UPCOMING_LIMIT);
    let admin = is_admin(&req);

    let now = Utc::now();
    let store = store();
    let mut events: Vec<CelestialEvent> = load_events(&store)?
        .into_iter()
        .filter(|e| admin || e.status == EventStatus::Approved)
        .filter(|e| {
            parse_date(&e.start_date)
                .map(|start| start >= now)
                .unwrap_or(false)
        })
        .collect();

    events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
    events.truncate(limit);

    let mut data = Vec::new();
    for event in &events {
        data.push(build_event_json(&store, event)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub fn events_in_range(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let (start_raw, end_raw) = match (get_string(&params, "start"), get_string(&params, "end")) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            return Ok(
                ApiError::BadRequest("Please provide start and end dates".to_string()).into(),
            )
        }
    };

    let (range_start, range_end) = match (parse_date(&start_raw), parse_date(&end_raw)) {
        (Some(s), Some(e)) => (s, e),
        _ => return Ok(ApiError::BadRequest("Invalid date format".to_string()).into()),
    };

    let admin = is_admin(&req);
    let store = store();
    let mut events: Vec<CelestialEvent> = load_events(&store)?
        .into_iter()
        .filter(|e| admin || e.status == EventStatus::Approved)
        .filter(|e| {
            let start = match parse_date(&e.start_date) {
                Some(d) => d,
                None => return false,
            };
            let end = e.end_date.as_deref().and_then(parse_date).unwrap_or(start);
            // Overlap: the event touches the window from either side or spans
            // it entirely.
            (start >= range_start && start <= range_end)
                || (end >= range_start && end <= range_end)
                || (start <= range_start && end >= range_end)
        })
        .collect();

    events.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));

    let mut data = Vec::new();
    for event in &events {
        data.push(build_event_json(&store, event)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}

pub fn get_event(event_id: &str) -> anyhow::Result<Response> {
    if event_id.is_empty() || !validate_uuid(event_id) {
        return Ok(ApiError::BadRequest("Event ID required".to_string()).into());
    }

    let store = store();
    match store.get_json::<CelestialEvent>(&event_key(event_id))? {
        Some(event) => Ok(ok_json(serde_json::json!({
            "success": true,
            "data": build_event_json(&store, &event)?,
        }))),
        None => Ok(ApiError::NotFound("Event not found".to_string()).into()),
    }
}

pub fn create_event(req: Request) -> anyhow::Result<Response> {
    let user = match current_user(&req) {
        Some(u) => u,
        None => return Ok(ApiError::Unauthorized.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let name = sanitize_text(value["name"].as_str().unwrap_or("").trim());
    let kind = value["type"].as_str().unwrap_or("").to_string();
    let description = sanitize_text(value["description"].as_str().unwrap_or("").trim());
    let start_date = value["start_date"].as_str().unwrap_or("").to_string();

    if name.is_empty() {
        return Ok(ApiError::BadRequest("Please add an event name".to_string()).into());
    }
    if !EVENT_TYPES.contains(&kind.as_str()) {
        return Ok(ApiError::BadRequest(format!("Unknown event type '{}'", kind)).into());
    }
    if description.is_empty() || description.len() > MAX_EVENT_DESCRIPTION_LENGTH {
        return Ok(ApiError::BadRequest(
            "Description is required (max 2000 chars)".to_string(),
        )
        .into());
    }
    if parse_date(&start_date).is_none() {
        return Ok(ApiError::BadRequest("Invalid start date".to_string()).into());
    }
    for field in ["end_date", "peak_time"] {
        if let Some(raw) = value[field].as_str() {
            if parse_date(raw).is_none() {
                return Ok(ApiError::BadRequest(format!("Invalid {}", field)).into());
            }
        }
    }

    // Admin submissions go live immediately; everyone else queues for review.
    let admin = user.role.is_admin();
    let id = Uuid::new_v4().to_string();
    let event = CelestialEvent {
        id: id.clone(),
        name,
        kind,
        description,
        start_date,
        end_date: value["end_date"].as_str().map(|s| s.to_string()),
        peak_time: value["peak_time"].as_str().map(|s| s.to_string()),
        visibility_region: value["visibility_region"]
            .as_str()
            .unwrap_or("Global")
            .to_string(),
        magnitude: value["magnitude"].as_f64(),
        constellation: value["constellation"].as_str().map(sanitize_text),
        tips: value["tips"]
            .as_array()
            .map(|tips| {
                tips.iter()
                    .filter_map(|t| t.as_str())
                    .map(sanitize_text)
                    .collect()
            })
            .unwrap_or_default(),
        source: value["source"].as_str().unwrap_or("NASA").to_string(),
        status: if admin {
            EventStatus::Approved
        } else {
            EventStatus::Pending
        },
        rejection_reason: None,
        created_by: user.id.clone(),
        approved_by: admin.then(|| user.id.clone()),
        approved_at: admin.then(now_iso),
        created_at: now_iso(),
    };

    store.set_json(&event_key(&id), &event)?;
    let mut events: Vec<String> = store.get_json(EVENTS_LIST_KEY)?.unwrap_or_default();
    events.push(id);
    store.set_json(EVENTS_LIST_KEY, &events)?;

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": if admin { "Event created and approved" } else { "Event submitted for approval" },
        "data": build_event_json(&store, &event)?,
    })))
}

pub fn update_event(req: Request, event_id: &str) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    if event_id.is_empty() || !validate_uuid(event_id) {
        return Ok(ApiError::BadRequest("Event ID required".to_string()).into());
    }

    let store = store();
    let mut event = match store.get_json::<CelestialEvent>(&event_key(event_id))? {
        Some(e) => e,
        None => return Ok(ApiError::NotFound("Event not found".to_string()).into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(name) = value["name"].as_str() {
        let name = sanitize_text(name.trim());
        if name.is_empty() {
            return Ok(ApiError::BadRequest("Please add an event name".to_string()).into());
        }
        event.name = name;
    }
    if let Some(kind) = value["type"].as_str() {
        if !EVENT_TYPES.contains(&kind) {
            return Ok(ApiError::BadRequest(format!("Unknown event type '{}'", kind)).into());
        }
        event.kind = kind.to_string();
    }
    if let Some(description) = value["description"].as_str() {
        let description = sanitize_text(description.trim());
        if description.is_empty() || description.len() > MAX_EVENT_DESCRIPTION_LENGTH {
            return Ok(ApiError::BadRequest(
                "Description is required (max 2000 chars)".to_string(),
            )
            .into());
        }
        event.description = description;
    }
    if let Some(start_date) = value["start_date"].as_str() {
        if parse_date(start_date).is_none() {
            return Ok(ApiError::BadRequest("Invalid start date".to_string()).into());
        }
        event.start_date = start_date.to_string();
    }
    for (field, slot) in [
        ("end_date", &mut event.end_date),
        ("peak_time", &mut event.peak_time),
    ] {
        if let Some(raw) = value[field].as_str() {
            if parse_date(raw).is_none() {
                return Ok(ApiError::BadRequest(format!("Invalid {}", field)).into());
            }
            *slot = Some(raw.to_string());
        }
    }
    if let Some(region) = value["visibility_region"].as_str() {
        event.visibility_region = region.to_string();
    }
    if let Some(magnitude) = value["magnitude"].as_f64() {
        event.magnitude = Some(magnitude);
    }
    if let Some(constellation) = value["constellation"].as_str() {
        event.constellation = Some(sanitize_text(constellation));
    }

    store.set_json(&event_key(event_id), &event)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Event updated successfully",
        "data": build_event_json(&store, &event)?,
    })))
}

pub fn delete_event(req: Request, event_id: &str) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    if event_id.is_empty() || !validate_uuid(event_id) {
        return Ok(ApiError::BadRequest("Event ID required".to_string()).into());
    }

    let store = store();
    if store
        .get_json::<CelestialEvent>(&event_key(event_id))?
        .is_none()
    {
        return Ok(ApiError::NotFound("Event not found".to_string()).into());
    }

    store.delete(&event_key(event_id))?;
    let events: Vec<String> = store.get_json(EVENTS_LIST_KEY)?.unwrap_or_default();
    let kept: Vec<String> = events.into_iter().filter(|id| id != event_id).collect();
    store.set_json(EVENTS_LIST_KEY, &kept)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Event deleted successfully",
    })))
}

pub fn approve_event(req: Request, event_id: &str) -> anyhow::Result<Response> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(err) => return Ok(err.into()),
    };

    let store = store();
    let mut event = match store.get_json::<CelestialEvent>(&event_key(event_id))? {
        Some(e) => e,
        None => return Ok(ApiError::NotFound("Event not found".to_string()).into()),
    };

    if event.status == EventStatus::Approved {
        return Ok(ApiError::BadRequest("Event is already approved".to_string()).into());
    }

    event.status = EventStatus::Approved;
    event.rejection_reason = None;
    event.approved_by = Some(admin.id);
    event.approved_at = Some(now_iso());
    store.set_json(&event_key(event_id), &event)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Event approved successfully",
        "data": build_event_json(&store, &event)?,
    })))
}

pub fn reject_event(req: Request, event_id: &str) -> anyhow::Result<Response> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(err) => return Ok(err.into()),
    };

    let store = store();
    let mut event = match store.get_json::<CelestialEvent>(&event_key(event_id))? {
        Some(e) => e,
        None => return Ok(ApiError::NotFound("Event not found".to_string()).into()),
    };

    let value: serde_json::Value = serde_json::from_slice(req.body()).unwrap_or_default();
    let reason = value["reason"]
        .as_str()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or("No reason provided");

    event.status = EventStatus::Rejected;
    event.rejection_reason = Some(reason.to_string());
    event.approved_by = Some(admin.id);
    event.approved_at = Some(now_iso());
    store.set_json(&event_key(event_id), &event)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Event rejected",
        "data": build_event_json(&store, &event)?,
    })))
}

pub fn pending_events(req: Request) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    let store = store();
    let mut events: Vec<CelestialEvent> = load_events(&store)?
        .into_iter()
        .filter(|e| e.status == EventStatus::Pending)
        .collect();

    events.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    let mut data = Vec::new();
    for event in &events {
        data.push(build_event_json(&store, event)?);
    }

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": data.len(),
        "data": data,
    })))
}
