use crate::config::*;
use crate::core::helpers::{hash_password, now_iso};
use crate::models::models::{
    AstronomyData, CelestialEvent, Community, CommunityPrivacy, Equipment, EventStatus, Post,
    Role, ShopItem, User, Visibility,
};
use crate::social::link_follow;
use spin_sdk::key_value::Store;
use uuid::Uuid;

fn make_user(username: &str, email: &str, role: Role, bio: &str) -> anyhow::Result<User> {
    Ok(User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        password: hash_password(username)?,
        profile_picture: default_avatar_url(username),
        bio: Some(bio.to_string()),
        location: None,
        interests: vec!["Deep Sky".to_string(), "Astrophotography".to_string()],
        equipment: Equipment::default(),
        followers: Vec::new(),
        following: Vec::new(),
        role,
        created_at: now_iso(),
        last_active: now_iso(),
    })
}

fn make_post(author: &str, content: &str, visibility: Visibility) -> Post {
    Post {
        id: Uuid::new_v4().to_string(),
        author: author.to_string(),
        content: content.to_string(),
        images: Vec::new(),
        astronomy_data: AstronomyData::default(),
        tags: vec!["demo".to_string()],
        likes: Vec::new(),
        comments: Vec::new(),
        visibility,
        community: None,
        created_at: now_iso(),
        updated_at: None,
    }
}

/// Populate the store with a small demo dataset. Safe to call on every
/// request: it is a no-op once the demo users exist.
pub fn init_demo_data(store: &Store) -> anyhow::Result<()> {
    let user_ids: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &user_ids {
        if let Some(user) = store.get_json::<User>(&user_key(id))? {
            if user.username == "stella" {
                return Ok(()); // Already seeded
            }
        }
    }

    let mut stella = make_user(
        "stella",
        "stella@stargaze.example",
        Role::Admin,
        "Resident admin. Imaging nebulae since 2014.",
    )?;
    let mut orion = make_user(
        "orion",
        "orion@stargaze.example",
        Role::User,
        "Planetary imaging and the occasional comet.",
    )?;
    let luna = make_user(
        "luna",
        "luna@stargaze.example",
        Role::User,
        "Lunar photography, every phase.",
    )?;

    // stella follows orion; both sides of the edge are written.
    let _ = link_follow(&mut stella, &mut orion);

    let mut users = user_ids;
    let mut posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();

    for post in [
        make_post(
            &orion.id,
            "First light with the new planetary camera. Jupiter's bands came out crisp!",
            Visibility::Public,
        ),
        make_post(
            &orion.id,
            "Processing notes for followers: stacking 20% of 10k frames worked best.",
            Visibility::Followers,
        ),
        make_post(
            &luna.id,
            "Waxing gibbous over the ridge tonight. Clear skies for once.",
            Visibility::Public,
        ),
    ] {
        store.set_json(&post_key(&post.id), &post)?;
        posts.insert(0, post.id.clone());
    }

    for user in [&stella, &orion, &luna] {
        store.set_json(&user_key(&user.id), user)?;
        users.push(user.id.clone());
    }
    store.set_json(USERS_LIST_KEY, &users)?;
    store.set_json(POSTS_LIST_KEY, &posts)?;

    let community = Community {
        id: Uuid::new_v4().to_string(),
        name: "Deep Sky Imaging".to_string(),
        slug: "deep-sky-imaging".to_string(),
        description: "Galaxies, nebulae, and the gear that captures them.".to_string(),
        category: "Deep Sky Objects".to_string(),
        admin: stella.id.clone(),
        moderators: vec![stella.id.clone()],
        members: vec![stella.id.clone(), orion.id.clone()],
        privacy: CommunityPrivacy::Public,
        created_at: now_iso(),
    };
    store.set_json(&community_key(&community.id), &community)?;
    store.set_json(COMMUNITIES_LIST_KEY, &vec![community.id.clone()])?;

    let item = ShopItem {
        id: Uuid::new_v4().to_string(),
        name: "8\" Dobsonian Telescope".to_string(),
        description: "A forgiving first scope with serious aperture.".to_string(),
        price: 429.0,
        category: "telescopes".to_string(),
        image: None,
        in_stock: true,
        stock: 12,
        featured: true,
        created_by: stella.id.clone(),
        created_at: now_iso(),
    };
    store.set_json(&shop_item_key(&item.id), &item)?;
    store.set_json(SHOP_ITEMS_LIST_KEY, &vec![item.id.clone()])?;

    let event = CelestialEvent {
        id: Uuid::new_v4().to_string(),
        name: "Perseid Meteor Shower Peak".to_string(),
        kind: "Meteor Shower".to_string(),
        description: "Up to 100 meteors per hour under dark skies.".to_string(),
        start_date: "2026-08-11T21:00:00+00:00".to_string(),
        end_date: Some("2026-08-13T05:00:00+00:00".to_string()),
        peak_time: Some("2026-08-12T03:00:00+00:00".to_string()),
        visibility_region: "Northern Hemisphere".to_string(),
        magnitude: None,
        constellation: Some("Perseus".to_string()),
        tips: vec!["Find dark skies away from city lights".to_string()],
        source: "NASA".to_string(),
        status: EventStatus::Approved,
        rejection_reason: None,
        created_by: stella.id.clone(),
        approved_by: Some(stella.id.clone()),
        approved_at: Some(now_iso()),
        created_at: now_iso(),
    };
    store.set_json(&event_key(&event.id), &event)?;
    store.set_json(EVENTS_LIST_KEY, &vec![event.id.clone()])?;

    Ok(())
}

/// Wipe every document and index the demo (or a test run) created.
pub fn reset_db_data(store: &Store) -> anyhow::Result<()> {
    let users: Vec<String> = store.get_json(USERS_LIST_KEY)?.unwrap_or_default();
    for id in &users {
        store.delete(&user_key(id))?;
        store.delete(&notifications_key(id))?;
    }

    let posts: Vec<String> = store.get_json(POSTS_LIST_KEY)?.unwrap_or_default();
    for id in &posts {
        if let Some(post) = store.get_json::<Post>(&post_key(id))? {
            for comment_id in &post.comments {
                if let Some(comment) =
                    store.get_json::<crate::models::models::Comment>(&comment_key(comment_id))?
                {
                    for reply_id in &comment.replies {
                        store.delete(&comment_key(reply_id))?;
                    }
                }
                store.delete(&comment_key(comment_id))?;
            }
        }
        store.delete(&post_key(id))?;
    }

    for key in [COMMUNITIES_LIST_KEY, SHOP_ITEMS_LIST_KEY, EVENTS_LIST_KEY] {
        let ids: Vec<String> = store.get_json(key)?.unwrap_or_default();
        for id in &ids {
            match key {
                COMMUNITIES_LIST_KEY => store.delete(&community_key(id))?,
                SHOP_ITEMS_LIST_KEY => store.delete(&shop_item_key(id))?,
                _ => store.delete(&event_key(id))?,
            }
        }
        store.delete(key)?;
    }

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in &tokens {
        store.delete(&token_key(token))?;
    }

    store.delete(USERS_LIST_KEY)?;
    store.delete(POSTS_LIST_KEY)?;
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}
