use stargaze::feed::compose_feed;
use stargaze::models::models::{AstronomyData, Post, Visibility};

fn post(id: &str, author: &str, visibility: Visibility, created_at: &str) -> Post {
    Post {
        id: id.to_string(),
        author: author.to_string(),
        content: format!("post {}", id),
        images: Vec::new(),
        astronomy_data: AstronomyData::default(),
        tags: Vec::new(),
        likes: Vec::new(),
        comments: Vec::new(),
        visibility,
        community: None,
        created_at: created_at.to_string(),
        updated_at: None,
    }
}

fn following(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|id| id.to_string()).collect()
}

#[test]
fn mixed_visibility_feed_includes_followed_and_public() {
    // Viewer follows a and b. a has 3 public posts, b has 2 followers-only
    // posts, c (not followed) has 1 public post: all 6 are visible.
    let posts = vec![
        post("p1", "a", Visibility::Public, "2026-08-01T10:00:00+00:00"),
        post("p2", "a", Visibility::Public, "2026-08-01T11:00:00+00:00"),
        post("p3", "a", Visibility::Public, "2026-08-01T12:00:00+00:00"),
        post("p4", "b", Visibility::Followers, "2026-08-01T13:00:00+00:00"),
        post("p5", "b", Visibility::Followers, "2026-08-01T14:00:00+00:00"),
        post("p6", "c", Visibility::Public, "2026-08-01T15:00:00+00:00"),
    ];

    let page = compose_feed(&following(&["a", "b"]), posts, 1, 10);

    assert_eq!(page.total, 6);
    assert_eq!(page.pages, 1);
    let ids: Vec<&str> = page.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p6", "p5", "p4", "p3", "p2", "p1"]);
}

#[test]
fn empty_following_degenerates_to_public_only() {
    let posts = vec![
        post("p1", "a", Visibility::Public, "2026-08-01T10:00:00+00:00"),
        post("p2", "a", Visibility::Followers, "2026-08-01T11:00:00+00:00"),
        post("p3", "b", Visibility::Private, "2026-08-01T12:00:00+00:00"),
        post("p4", "b", Visibility::Public, "2026-08-01T13:00:00+00:00"),
    ];

    let page = compose_feed(&[], posts, 1, 10);

    let ids: Vec<&str> = page.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p4", "p1"]);
    assert_eq!(page.total, 2);
}

#[test]
fn followed_author_public_post_is_not_double_counted() {
    let posts = vec![post(
        "p1",
        "a",
        Visibility::Public,
        "2026-08-01T10:00:00+00:00",
    )];

    let page = compose_feed(&following(&["a"]), posts, 1, 10);

    assert_eq!(page.total, 1);
    assert_eq!(page.posts.len(), 1);
}

#[test]
fn own_non_public_posts_stay_out_of_own_feed() {
    // The viewer does not follow themselves, so only their public posts make
    // it into their own feed.
    let posts = vec![
        post("p1", "me", Visibility::Public, "2026-08-01T10:00:00+00:00"),
        post("p2", "me", Visibility::Followers, "2026-08-01T11:00:00+00:00"),
        post("p3", "me", Visibility::Private, "2026-08-01T12:00:00+00:00"),
    ];

    let page = compose_feed(&following(&["someone"]), posts, 1, 10);

    let ids: Vec<&str> = page.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p1"]);
}

#[test]
fn page_count_is_total_over_limit_rounded_up() {
    let posts: Vec<Post> = (0..25)
        .map(|i| {
            post(
                &format!("p{:02}", i),
                "a",
                Visibility::Public,
                &format!("2026-08-01T{:02}:{:02}:00+00:00", 10 + i / 60, i % 60),
            )
        })
        .collect();

    let first = compose_feed(&[], posts.clone(), 1, 10);
    assert_eq!(first.total, 25);
    assert_eq!(first.pages, 3);
    assert_eq!(first.posts.len(), 10);

    let last = compose_feed(&[], posts.clone(), 3, 10);
    assert_eq!(last.posts.len(), 5);

    // One past the end is an empty page, not an error.
    let beyond = compose_feed(&[], posts, 4, 10);
    assert_eq!(beyond.posts.len(), 0);
    assert_eq!(beyond.total, 25);
    assert_eq!(beyond.pages, 3);
}

#[test]
fn empty_result_has_zero_pages() {
    let page = compose_feed(&[], Vec::new(), 1, 10);

    assert_eq!(page.total, 0);
    assert_eq!(page.pages, 0);
    assert!(page.posts.is_empty());
}

#[test]
fn zero_page_and_limit_clamp_to_one() {
    let posts = vec![
        post("p1", "a", Visibility::Public, "2026-08-01T10:00:00+00:00"),
        post("p2", "a", Visibility::Public, "2026-08-01T11:00:00+00:00"),
    ];

    let page = compose_feed(&[], posts, 0, 0);

    assert_eq!(page.page, 1);
    assert_eq!(page.posts.len(), 1);
    assert_eq!(page.pages, 2);
    assert_eq!(page.posts[0].id, "p2");
}

#[test]
fn identical_timestamps_order_by_id_descending() {
    let same = "2026-08-01T10:00:00+00:00";
    let posts = vec![
        post("p1", "a", Visibility::Public, same),
        post("p3", "a", Visibility::Public, same),
        post("p2", "a", Visibility::Public, same),
    ];

    let page = compose_feed(&[], posts, 1, 10);

    let ids: Vec<&str> = page.posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["p3", "p2", "p1"]);
}

#[test]
fn tie_broken_pagination_never_repeats_or_skips() {
    let same = "2026-08-01T10:00:00+00:00";
    let posts: Vec<Post> = (0..7)
        .map(|i| post(&format!("p{}", i), "a", Visibility::Public, same))
        .collect();

    let mut seen = Vec::new();
    for page_number in 1..=3 {
        let page = compose_feed(&[], posts.clone(), page_number, 3);
        seen.extend(page.posts.into_iter().map(|p| p.id));
    }

    let mut sorted = seen.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(seen.len(), 7);
    assert_eq!(sorted.len(), 7);
}
