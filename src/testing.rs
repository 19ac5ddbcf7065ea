//! Fixtures shared by unit tests.

use crate::model::{Id, MediaRef, NewUser, NewVideo, User, Video};
use crate::store::{Collection, Store};

pub(crate) fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        email: format!("{name}@example.com"),
        display_name: name.to_uppercase(),
        avatar: MediaRef::new(format!("https://cdn.test/{name}.png"), format!("avatar-{name}")),
        cover_image: None,
        password_hash: "$argon2id$stub".to_string(),
    }
}

pub(crate) fn seed_user(store: &Store, name: &str) -> User {
    store.insert_user(&new_user(name)).unwrap()
}

pub(crate) fn new_video(title: &str, description: &str) -> NewVideo {
    let slug = title.to_lowercase().replace(' ', "-");
    NewVideo {
        media: MediaRef::new(format!("https://cdn.test/{slug}.mp4"), format!("media-{slug}")),
        thumbnail: MediaRef::new(format!("https://cdn.test/{slug}.jpg"), format!("thumb-{slug}")),
        title: title.to_string(),
        description: description.to_string(),
        duration: 42.5,
    }
}

/// Inserts a published video.
pub(crate) fn seed_video(store: &Store, owner: Id, title: &str, description: &str) -> Video {
    let video = store
        .insert_video(owner, &new_video(title, description))
        .unwrap();
    store
        .set_published(Collection::Videos, video.id, true)
        .unwrap();
    store.get(video.id).unwrap()
}
