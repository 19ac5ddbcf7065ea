use std::thread;

use vidnest::{
    ErrorKind, comments, likes,
    model::{Id, MediaRef, NewUser, NewVideo, User, Video},
    pipeline::{ListParams, PageLimits, PageRequest},
    resolver::ContentRef,
    store::Store,
    subscriptions,
    toggle::ToggleState,
    users, videos,
};

fn register(store: &Store, name: &str) -> User {
    users::register_user(
        store,
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: name.to_string(),
            avatar: MediaRef::new(format!("https://cdn.test/{name}.png"), format!("avatar-{name}")),
            cover_image: None,
            password_hash: "hash".to_string(),
        },
    )
    .unwrap()
}

fn upload(store: &Store, owner: Id, title: &str) -> Video {
    let video = videos::publish_video(
        store,
        owner,
        NewVideo {
            media: MediaRef::new("https://cdn.test/v.mp4", format!("media-{title}")),
            thumbnail: MediaRef::new("https://cdn.test/v.jpg", format!("thumb-{title}")),
            title: title.to_string(),
            description: format!("about {title}"),
            duration: 10.0,
        },
    )
    .unwrap();
    videos::toggle_publish_status(store, owner, video.id).unwrap()
}

fn page(page: u32, size: u32) -> ListParams {
    ListParams::new(PageRequest::new(page, size, &PageLimits::default()))
}

#[test]
fn like_then_unlike_leaves_no_likes_on_detail() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    let video = upload(&store, alice.id, "intro");
    let target = ContentRef::video(video.id);

    let first = likes::toggle_like(&store, bob.id, &target).unwrap();
    assert_eq!(first.state, ToggleState::Created);
    let detail = videos::get_video(&store, video.id, Some(bob.id)).unwrap();
    assert_eq!(detail.video.likes_count, 1);
    assert!(detail.video.is_liked);

    let second = likes::toggle_like(&store, bob.id, &target).unwrap();
    assert_eq!(second.state, ToggleState::Removed);
    let detail = videos::get_video(&store, video.id, Some(bob.id)).unwrap();
    assert_eq!(detail.video.likes_count, 0);
    assert!(!detail.video.is_liked);
    assert_eq!(detail.video.views, 2);
}

#[test]
fn concurrent_subscriptions_leave_consistent_state() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || subscriptions::toggle_subscription(&store, bob.id, alice.id))
        })
        .collect();

    let mut created = 0;
    let mut removed = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(result) if result.state == ToggleState::Created => created += 1,
            Ok(_) => removed += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::Conflict),
        }
    }

    let subscribers =
        subscriptions::list_channel_subscribers(&store, alice.id, &ListParams::default()).unwrap();
    assert_eq!(subscribers.total_items, created - removed);
    assert!(subscribers.total_items == 0 || subscribers.total_items == 1);
}

#[test]
fn comments_need_exactly_one_existing_parent() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    let video = upload(&store, alice.id, "intro");

    let none = comments::create_comment(&store, alice.id, &ContentRef::default(), "hi");
    assert_eq!(none.unwrap_err().kind(), ErrorKind::InvalidInput);

    let both = ContentRef {
        video_id: Some(video.id.to_string()),
        tweet_id: Some(Id::new().to_string()),
        comment_id: None,
    };
    let both = comments::create_comment(&store, alice.id, &both, "hi");
    assert_eq!(both.unwrap_err().kind(), ErrorKind::InvalidInput);

    let unknown = comments::create_comment(&store, alice.id, &ContentRef::comment("c1"), "hi");
    assert_eq!(unknown.unwrap_err().kind(), ErrorKind::NotFound);

    let top = comments::create_comment(&store, alice.id, &ContentRef::video(video.id), "top").unwrap();
    assert_eq!(top.video(), Some(video.id));

    let reply =
        comments::create_comment(&store, alice.id, &ContentRef::comment(top.id), "reply").unwrap();
    assert_eq!(reply.comment(), Some(top.id));
    assert_eq!(reply.video(), None);
    assert_eq!(reply.tweet(), None);

    let thread =
        comments::list_comments(&store, &ContentRef::video(video.id), &ListParams::default())
            .unwrap();
    assert_eq!(thread.total_items, 1);
    assert_eq!(thread.items[0].replies_count, 1);
}

#[test]
fn pages_cover_every_video_exactly_once() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    for n in 0..15 {
        upload(&store, alice.id, &format!("clip {n}"));
    }

    let second = videos::list_user_videos(&store, "alice", None, &page(2, 10)).unwrap();
    assert_eq!(second.items_on_page, 5);
    assert_eq!(second.total_items, 15);

    let mut seen = Vec::new();
    for n in 1..=4 {
        let current = videos::list_user_videos(&store, "alice", None, &page(n, 4)).unwrap();
        assert_eq!(current.total_items, 15);
        seen.extend(current.items.into_iter().map(|card| card.id));
    }
    assert_eq!(seen.len(), 15);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 15);
}

#[test]
fn channel_listing_edges() {
    let store = Store::open_in_memory().unwrap();
    register(&store, "alice");

    let empty = videos::list_user_videos(&store, "alice", None, &ListParams::default()).unwrap();
    assert_eq!(empty.items_on_page, 0);
    assert_eq!(empty.total_items, 0);

    let missing = videos::list_user_videos(&store, "nobody", None, &ListParams::default());
    assert_eq!(missing.unwrap_err().kind(), ErrorKind::NotFound);
}

#[test]
fn file_backed_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("vidnest.db");

    let alice_id = {
        let store = Store::open(&path).unwrap();
        let alice = register(&store, "alice");
        upload(&store, alice.id, "kept");
        alice.id
    };

    let store = Store::open(&path).unwrap();
    assert_eq!(users::get_user(&store, alice_id).unwrap().username, "alice");
    let listed = videos::list_user_videos(&store, "alice", None, &ListParams::default()).unwrap();
    assert_eq!(listed.total_items, 1);
    assert_eq!(listed.items[0].title, "kept");
}

#[test]
fn drafts_stay_hidden_from_other_users() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    let bob = register(&store, "bob");
    let draft = videos::publish_video(
        &store,
        alice.id,
        NewVideo {
            media: MediaRef::new("https://cdn.test/d.mp4", "media-draft"),
            thumbnail: MediaRef::new("https://cdn.test/d.jpg", "thumb-draft"),
            title: "Draft".to_string(),
            description: "work in progress".to_string(),
            duration: 5.0,
        },
    )
    .unwrap();
    let target = ContentRef::video(draft.id);
    let as_bob = ListParams::default().with_viewer(Some(bob.id));

    let not_found = |kind: ErrorKind| assert_eq!(kind, ErrorKind::NotFound);
    not_found(videos::get_video(&store, draft.id, Some(bob.id)).unwrap_err().kind());
    not_found(comments::create_comment(&store, bob.id, &target, "hi").unwrap_err().kind());
    not_found(likes::toggle_like(&store, bob.id, &target).unwrap_err().kind());
    not_found(comments::list_comments(&store, &target, &as_bob).unwrap_err().kind());
}

#[test]
fn search_requires_matching_first_letter_for_typos() {
    let store = Store::open_in_memory().unwrap();
    let alice = register(&store, "alice");
    upload(&store, alice.id, "Rust basics");

    for query in ["just", "must", "dust", "bust"] {
        let page = videos::search_videos(&store, &ListParams::default().with_search(query)).unwrap();
        assert_eq!(page.total_items, 0, "{query}");
    }
    let page = videos::search_videos(&store, &ListParams::default().with_search("rusk")).unwrap();
    assert_eq!(page.total_items, 1);
}
