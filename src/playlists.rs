//! Playlists: owner-curated, ordered sets of videos.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::{ensure_owner, require_caller};
use crate::model::{Id, OwnerSummary, Playlist, required};
use crate::pipeline::{
    Field, ListParams, ListSpec, Page, PageRequest, PlaylistCard, PlaylistEntry, list_page,
};
use crate::resolver::visible_video;
use crate::store::{Changes, Collection, Store};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Playlist page: metadata, owner and the ordered video ids.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistDetail {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub is_published: bool,
    pub owner: OwnerSummary,
    pub total_videos: i64,
    pub videos: Vec<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn create_playlist(
    store: &Store,
    caller: Id,
    name: &str,
    description: &str,
    initial_video: Option<Id>,
) -> Result<Playlist> {
    require_caller(store, caller)?;
    let name = required(name, "name")?;
    if let Some(video) = initial_video {
        visible_video(store, video, Some(caller))?;
    }

    let playlist = store.insert_playlist(caller, &name, description.trim())?;
    if let Some(video) = initial_video {
        store.playlist_add(playlist.id, video)?;
    }
    tracing::debug!(playlist = %playlist.id, owner = %caller, "playlist created");
    load_playlist(store, playlist.id)
}

pub fn update_playlist(
    store: &Store,
    caller: Id,
    id: Id,
    update: PlaylistUpdate,
) -> Result<Playlist> {
    let playlist = load_playlist(store, id)?;
    ensure_owner(caller, playlist.owner, "playlist")?;

    let mut changes = Changes::new();
    if let Some(name) = update.name.as_deref() {
        changes = changes.set("name", required(name, "name")?);
    }
    if let Some(description) = update.description {
        changes = changes.set("description", description.trim().to_string());
    }
    if changes.is_empty() {
        return Err(Error::invalid("name or description is required"));
    }

    store.update_by_id(Collection::Playlists, id, &changes)?;
    load_playlist(store, id)
}

pub fn delete_playlist(store: &Store, caller: Id, id: Id) -> Result<()> {
    let playlist = load_playlist(store, id)?;
    ensure_owner(caller, playlist.owner, "playlist")?;
    if !store.delete_by_id(Collection::Playlists, id)? {
        return Err(Error::not_found(format!("playlist {id} not found")));
    }
    Ok(())
}

pub fn toggle_playlist_publish(store: &Store, caller: Id, id: Id) -> Result<Playlist> {
    let playlist = load_playlist(store, id)?;
    ensure_owner(caller, playlist.owner, "playlist")?;
    store
        .flip_published(Collection::Playlists, id)?
        .ok_or_else(|| Error::not_found(format!("playlist {id} not found")))?;
    load_playlist(store, id)
}

/// Appends `video`, which must be published or the caller's own draft.
/// Adding a video that is already present changes nothing.
pub fn add_video(store: &Store, caller: Id, playlist: Id, video: Id) -> Result<Playlist> {
    let current = load_playlist(store, playlist)?;
    ensure_owner(caller, current.owner, "playlist")?;
    visible_video(store, video, Some(caller))?;
    store.playlist_add(playlist, video)?;
    load_playlist(store, playlist)
}

pub fn remove_video(store: &Store, caller: Id, playlist: Id, video: Id) -> Result<Playlist> {
    let current = load_playlist(store, playlist)?;
    ensure_owner(caller, current.owner, "playlist")?;
    if !store.playlist_remove(playlist, video)? {
        return Err(Error::not_found(format!(
            "video {video} is not in playlist {playlist}"
        )));
    }
    load_playlist(store, playlist)
}

/// Unpublished playlists are visible to their owner only.
pub fn get_playlist(store: &Store, id: Id, viewer: Option<Id>) -> Result<PlaylistDetail> {
    let spec = ListSpec::new(PageRequest::default()).filter(Field::Id, id);
    let card = list_page::<PlaylistCard>(store, &spec)?
        .items
        .into_iter()
        .next()
        .filter(|card| card.is_published || viewer == Some(card.owner.id))
        .ok_or_else(|| Error::not_found(format!("playlist {id} not found")))?;
    let playlist = load_playlist(store, id)?;

    Ok(PlaylistDetail {
        id: card.id,
        name: card.name,
        description: card.description,
        is_published: card.is_published,
        owner: card.owner,
        total_videos: card.videos_count,
        videos: playlist.videos,
        created_at: card.created_at,
        updated_at: card.updated_at,
    })
}

/// Videos of a visible playlist in playlist order. Non-owners only see
/// published videos.
pub fn list_playlist_videos(
    store: &Store,
    id: Id,
    params: &ListParams,
) -> Result<Page<PlaylistEntry>> {
    let playlist = load_playlist(store, id)?;
    let is_owner = params.viewer == Some(playlist.owner);
    if !playlist.is_published && !is_owner {
        return Err(Error::not_found(format!("playlist {id} not found")));
    }
    let spec = params
        .spec()
        .filter(Field::Playlist, id)
        .filter_opt(Field::Published, (!is_owner).then_some(true));
    list_page(store, &spec)
}

pub fn list_user_playlists(
    store: &Store,
    user: Id,
    params: &ListParams,
) -> Result<Page<PlaylistCard>> {
    if !store.exists(Collection::Users, user)? {
        return Err(Error::not_found(format!("user {user} not found")));
    }
    let spec = params
        .spec()
        .filter(Field::Owner, user)
        .filter_opt(Field::Published, (params.viewer != Some(user)).then_some(true));
    list_page(store, &spec)
}

fn load_playlist(store: &Store, id: Id) -> Result<Playlist> {
    store
        .find_playlist(id)?
        .ok_or_else(|| Error::not_found(format!("playlist {id} not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{new_video, seed_user, seed_video};

    #[test]
    fn create_with_initial_video_and_idempotent_add() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let first = seed_video(&store, alice.id, "First", "a");
        let second = seed_video(&store, alice.id, "Second", "b");

        let playlist = create_playlist(&store, alice.id, "Mix", "", Some(first.id)).unwrap();
        assert_eq!(playlist.videos, vec![first.id]);

        add_video(&store, alice.id, playlist.id, second.id).unwrap();
        let again = add_video(&store, alice.id, playlist.id, first.id).unwrap();
        assert_eq!(again.videos, vec![first.id, second.id]);

        let removed = remove_video(&store, alice.id, playlist.id, first.id).unwrap();
        assert_eq!(removed.videos, vec![second.id]);
        assert_eq!(
            remove_video(&store, alice.id, playlist.id, first.id)
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn owner_only_mutations() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let video = seed_video(&store, alice.id, "Clip", "a");
        let playlist = create_playlist(&store, alice.id, "Mix", "", None).unwrap();

        let rename = PlaylistUpdate {
            name: Some("Bob's".to_string()),
            description: None,
        };
        assert_eq!(
            update_playlist(&store, bob.id, playlist.id, rename.clone())
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthorized
        );
        assert!(add_video(&store, bob.id, playlist.id, video.id).is_err());
        assert!(toggle_playlist_publish(&store, bob.id, playlist.id).is_err());
        assert!(delete_playlist(&store, bob.id, playlist.id).is_err());

        assert_eq!(
            update_playlist(&store, alice.id, playlist.id, PlaylistUpdate::default())
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
        let renamed = update_playlist(&store, alice.id, playlist.id, rename).unwrap();
        assert_eq!(renamed.name, "Bob's");

        delete_playlist(&store, alice.id, playlist.id).unwrap();
        assert_eq!(
            get_playlist(&store, playlist.id, Some(alice.id))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn visibility_follows_publication_flag() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let video = seed_video(&store, alice.id, "Clip", "a");
        let playlist = create_playlist(&store, alice.id, "Mix", "", Some(video.id)).unwrap();

        assert!(get_playlist(&store, playlist.id, Some(bob.id)).is_err());
        let own = get_playlist(&store, playlist.id, Some(alice.id)).unwrap();
        assert_eq!(own.total_videos, 1);
        assert_eq!(own.videos, vec![video.id]);

        let as_bob = ListParams::default().with_viewer(Some(bob.id));
        assert_eq!(
            list_user_playlists(&store, alice.id, &as_bob).unwrap().total_items,
            0
        );

        let published = toggle_playlist_publish(&store, alice.id, playlist.id).unwrap();
        assert!(published.is_published);
        assert_eq!(
            list_user_playlists(&store, alice.id, &as_bob).unwrap().total_items,
            1
        );
        let entries = list_playlist_videos(&store, playlist.id, &as_bob).unwrap();
        assert_eq!(entries.total_items, 1);
        assert_eq!(entries.items[0].video.id, video.id);
    }

    #[test]
    fn deleting_a_video_drops_it_from_playlists() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let video = seed_video(&store, alice.id, "Clip", "a");
        let playlist = create_playlist(&store, alice.id, "Mix", "", Some(video.id)).unwrap();

        crate::videos::delete_video(&store, alice.id, video.id).unwrap();
        let detail = get_playlist(&store, playlist.id, Some(alice.id)).unwrap();
        assert_eq!(detail.total_videos, 0);
        assert!(detail.videos.is_empty());
    }

    #[test]
    fn other_users_drafts_cannot_be_added() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let draft = store.insert_video(alice.id, &new_video("Draft", "wip")).unwrap();
        let mix = create_playlist(&store, bob.id, "Mix", "", None).unwrap();

        assert_eq!(
            add_video(&store, bob.id, mix.id, draft.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            create_playlist(&store, bob.id, "Other", "", Some(draft.id))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        let entries = list_playlist_videos(
            &store,
            mix.id,
            &ListParams::default().with_viewer(Some(bob.id)),
        )
        .unwrap();
        assert_eq!(entries.total_items, 0);

        let own = create_playlist(&store, alice.id, "Drafts", "", None).unwrap();
        let own = add_video(&store, alice.id, own.id, draft.id).unwrap();
        assert_eq!(own.videos, vec![draft.id]);
    }

    #[test]
    fn deleting_a_missing_playlist_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let mix = create_playlist(&store, alice.id, "Mix", "", None).unwrap();

        delete_playlist(&store, alice.id, mix.id).unwrap();
        assert_eq!(
            delete_playlist(&store, alice.id, mix.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
