use crate::auth::require_admin;
use crate::config::*;
use crate::core::errors::ApiError;
use crate::core::helpers::{created_json, now_iso, ok_json, store, validate_uuid};
use crate::core::query_params::{get_bool_flag, get_string, parse_query_params};
use crate::models::models::ShopItem;
use crate::users::sanitize_text;
use spin_sdk::http::{Request, Response};
use spin_sdk::key_value::Store;
use uuid::Uuid;

pub const CATEGORIES: &[&str] = &[
    "telescopes",
    "cameras",
    "accessories",
    "books",
    "software",
    "other",
];

fn load_items(store: &Store) -> anyhow::Result<Vec<ShopItem>> {
    let ids: Vec<String> = store.get_json(SHOP_ITEMS_LIST_KEY)?.unwrap_or_default();
    let mut items = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(item) = store.get_json::<ShopItem>(&shop_item_key(&id))? {
            items.push(item);
        }
    }
    Ok(items)
}

pub fn list_items(req: Request) -> anyhow::Result<Response> {
    let params = parse_query_params(req.uri());
    let category = get_string(&params, "category").filter(|c| c != "all");
    let search = get_string(&params, "search").map(|s| s.to_lowercase());
    let in_stock_only = get_bool_flag(&params, "in_stock");

    let store = store();
    let mut items: Vec<ShopItem> = load_items(&store)?
        .into_iter()
        .filter(|item| category.as_deref().map_or(true, |c| item.category == c))
        .filter(|item| {
            search.as_deref().map_or(true, |needle| {
                item.name.to_lowercase().contains(needle)
                    || item.description.to_lowercase().contains(needle)
            })
        })
        .filter(|item| !in_stock_only || item.in_stock)
        .collect();

    items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));

    Ok(ok_json(serde_json::json!({
        "success": true,
        "count": items.len(),
        "data": items,
    })))
}

pub fn get_item(item_id: &str) -> anyhow::Result<Response> {
    if item_id.is_empty() || !validate_uuid(item_id) {
        return Ok(ApiError::BadRequest("Item ID required".to_string()).into());
    }

    let store = store();
    match store.get_json::<ShopItem>(&shop_item_key(item_id))? {
        Some(item) => Ok(ok_json(serde_json::json!({
            "success": true,
            "data": item,
        }))),
        None => Ok(ApiError::NotFound("Shop item not found".to_string()).into()),
    }
}

fn validate_item_fields(
    name: &str,
    description: &str,
    price: f64,
    category: &str,
) -> Result<(), ApiError> {
    if name.is_empty() || name.len() > MAX_SHOP_NAME_LENGTH {
        return Err(ApiError::BadRequest(
            "Product name is required (max 100 chars)".to_string(),
        ));
    }
    if description.is_empty() || description.len() > MAX_SHOP_DESCRIPTION_LENGTH {
        return Err(ApiError::BadRequest(
            "Description is required (max 500 chars)".to_string(),
        ));
    }
    if !price.is_finite() || price < 0.0 {
        return Err(ApiError::BadRequest("Price cannot be negative".to_string()));
    }
    if !CATEGORIES.contains(&category) {
        return Err(ApiError::BadRequest(format!(
            "Unknown category '{}'",
            category
        )));
    }
    Ok(())
}

pub fn create_item(req: Request) -> anyhow::Result<Response> {
    let admin = match require_admin(&req) {
        Ok(u) => u,
        Err(err) => return Ok(err.into()),
    };

    let store = store();
    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    let name = sanitize_text(value["name"].as_str().unwrap_or("").trim());
    let description = sanitize_text(value["description"].as_str().unwrap_or("").trim());
    let price = value["price"].as_f64().unwrap_or(-1.0);
    let category = value["category"].as_str().unwrap_or("").to_string();

    if let Err(err) = validate_item_fields(&name, &description, price, &category) {
        return Ok(err.into());
    }

    let id = Uuid::new_v4().to_string();
    let item = ShopItem {
        id: id.clone(),
        name,
        description,
        price,
        category,
        image: value["image"].as_str().map(|s| s.to_string()),
        in_stock: value["in_stock"].as_bool().unwrap_or(true),
        stock: value["stock"].as_u64().unwrap_or(0) as u32,
        featured: value["featured"].as_bool().unwrap_or(false),
        created_by: admin.id,
        created_at: now_iso(),
    };

    store.set_json(&shop_item_key(&id), &item)?;
    let mut items: Vec<String> = store.get_json(SHOP_ITEMS_LIST_KEY)?.unwrap_or_default();
    items.push(id);
    store.set_json(SHOP_ITEMS_LIST_KEY, &items)?;

    Ok(created_json(serde_json::json!({
        "success": true,
        "message": "Shop item created successfully",
        "data": item,
    })))
}

pub fn update_item(req: Request, item_id: &str) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    if item_id.is_empty() || !validate_uuid(item_id) {
        return Ok(ApiError::BadRequest("Item ID required".to_string()).into());
    }

    let store = store();
    let mut item = match store.get_json::<ShopItem>(&shop_item_key(item_id))? {
        Some(i) => i,
        None => return Ok(ApiError::NotFound("Shop item not found".to_string()).into()),
    };

    let value: serde_json::Value = match serde_json::from_slice(req.body()) {
        Ok(v) => v,
        Err(_) => return Ok(ApiError::BadRequest("Invalid JSON body".to_string()).into()),
    };

    if let Some(name) = value["name"].as_str() {
        item.name = sanitize_text(name.trim());
    }
    if let Some(description) = value["description"].as_str() {
        item.description = sanitize_text(description.trim());
    }
    if let Some(price) = value["price"].as_f64() {
        item.price = price;
    }
    if let Some(category) = value["category"].as_str() {
        item.category = category.to_string();
    }
    if let Some(image) = value["image"].as_str() {
        item.image = Some(image.to_string());
    }
    if let Some(in_stock) = value["in_stock"].as_bool() {
        item.in_stock = in_stock;
    }
    if let Some(stock) = value["stock"].as_u64() {
        item.stock = stock as u32;
    }
    if let Some(featured) = value["featured"].as_bool() {
        item.featured = featured;
    }

    if let Err(err) = validate_item_fields(&item.name, &item.description, item.price, &item.category)
    {
        return Ok(err.into());
    }

    store.set_json(&shop_item_key(item_id), &item)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Shop item updated successfully",
        "data": item,
    })))
}

pub fn delete_item(req: Request, item_id: &str) -> anyhow::Result<Response> {
    if let Err(err) = require_admin(&req) {
        return Ok(err.into());
    }

    if item_id.is_empty() || !validate_uuid(item_id) {
        return Ok(ApiError::BadRequest("Item ID required".to_string()).into());
    }

    let store = store();
    if store.get_json::<ShopItem>(&shop_item_key(item_id))?.is_none() {
        return Ok(ApiError::NotFound("Shop item not found".to_string()).into());
    }

    store.delete(&shop_item_key(item_id))?;
    let items: Vec<String> = store.get_json(SHOP_ITEMS_LIST_KEY)?.unwrap_or_default();
    let kept: Vec<String> = items.into_iter().filter(|id| id != item_id).collect();
    store.set_json(SHOP_ITEMS_LIST_KEY, &kept)?;

    Ok(ok_json(serde_json::json!({
        "success": true,
        "message": "Shop item deleted successfully",
    })))
}
