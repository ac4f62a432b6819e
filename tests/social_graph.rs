use stargaze::models::models::{Equipment, Role, User};
use stargaze::social::{add_like, link_follow, remove_like, unlink_follow, GraphError};

fn user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        email: format!("{}@example.com", username),
        password: String::new(),
        profile_picture: String::new(),
        bio: None,
        location: None,
        interests: Vec::new(),
        equipment: Equipment::default(),
        followers: Vec::new(),
        following: Vec::new(),
        role: Role::User,
        created_at: "2026-08-01T10:00:00+00:00".to_string(),
        last_active: "2026-08-01T10:00:00+00:00".to_string(),
    }
}

#[test]
fn follow_links_both_sides() {
    let mut alice = user("a", "alice");
    let mut bob = user("b", "bob");

    let count = link_follow(&mut alice, &mut bob).unwrap();

    assert_eq!(count, 1);
    assert!(alice.following.contains(&"b".to_string()));
    assert!(bob.followers.contains(&"a".to_string()));
    assert!(alice.followers.is_empty());
    assert!(bob.following.is_empty());
}

#[test]
fn self_follow_is_rejected() {
    let mut alice = user("a", "alice");
    let mut also_alice = user("a", "alice");

    let err = link_follow(&mut alice, &mut also_alice).unwrap_err();

    assert_eq!(err, GraphError::SelfFollow);
    assert!(alice.following.is_empty());
    assert!(also_alice.followers.is_empty());
}

#[test]
fn double_follow_is_rejected_and_state_unchanged() {
    let mut alice = user("a", "alice");
    let mut bob = user("b", "bob");

    link_follow(&mut alice, &mut bob).unwrap();
    let following_before = alice.following.clone();
    let followers_before = bob.followers.clone();

    let err = link_follow(&mut alice, &mut bob).unwrap_err();

    assert_eq!(err, GraphError::AlreadyFollowing);
    assert_eq!(alice.following, following_before);
    assert_eq!(bob.followers, followers_before);
}

#[test]
fn unfollow_removes_both_sides() {
    let mut alice = user("a", "alice");
    let mut bob = user("b", "bob");

    link_follow(&mut alice, &mut bob).unwrap();
    let count = unlink_follow(&mut alice, &mut bob).unwrap();

    assert_eq!(count, 0);
    assert!(!alice.following.contains(&"b".to_string()));
    assert!(!bob.followers.contains(&"a".to_string()));
}

#[test]
fn unfollow_without_relationship_is_rejected() {
    let mut alice = user("a", "alice");
    let mut bob = user("b", "bob");

    let err = unlink_follow(&mut alice, &mut bob).unwrap_err();

    assert_eq!(err, GraphError::NotFollowing);
}

#[test]
fn follower_count_tracks_multiple_followers() {
    let mut alice = user("a", "alice");
    let mut carol = user("c", "carol");
    let mut bob = user("b", "bob");

    assert_eq!(link_follow(&mut alice, &mut bob).unwrap(), 1);
    assert_eq!(link_follow(&mut carol, &mut bob).unwrap(), 2);
    assert_eq!(bob.follower_count(), 2);

    assert_eq!(unlink_follow(&mut alice, &mut bob).unwrap(), 1);
    assert_eq!(bob.follower_count(), 1);
}

#[test]
fn like_then_unlike_round_trips() {
    let mut likes = vec!["someone-else".to_string()];
    let before = likes.clone();

    assert_eq!(add_like(&mut likes, "actor").unwrap(), 2);
    assert_eq!(remove_like(&mut likes, "actor").unwrap(), 1);
    assert_eq!(likes, before);
}

#[test]
fn double_like_is_rejected_and_count_grows_once() {
    let mut likes = Vec::new();

    assert_eq!(add_like(&mut likes, "actor").unwrap(), 1);
    assert_eq!(add_like(&mut likes, "actor").unwrap_err(), GraphError::AlreadyLiked);
    assert_eq!(likes.len(), 1);
}

#[test]
fn unlike_without_like_is_rejected() {
    let mut likes = vec!["someone-else".to_string()];

    assert_eq!(remove_like(&mut likes, "actor").unwrap_err(), GraphError::NotLiked);
    assert_eq!(likes.len(), 1);
}

#[test]
fn likes_from_distinct_actors_accumulate() {
    let mut likes = Vec::new();

    assert_eq!(add_like(&mut likes, "a").unwrap(), 1);
    assert_eq!(add_like(&mut likes, "b").unwrap(), 2);
    assert_eq!(add_like(&mut likes, "c").unwrap(), 3);
    assert_eq!(remove_like(&mut likes, "b").unwrap(), 2);
    assert_eq!(likes, vec!["a".to_string(), "c".to_string()]);
}
