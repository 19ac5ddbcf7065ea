//! Video publishing, detail views, search and per-channel listings.

use crate::error::{Error, Result};
use crate::identity::{ensure_owner, require_caller};
use crate::model::{Id, NewVideo, Supersede, Video, VideoUpdate, required};
use crate::pipeline::{Field, ListParams, ListSpec, Page, PageRequest, VideoCard, VideoDetail, list_page};
use crate::resolver::visible_video;
use crate::store::{Changes, Collection, Store};
use crate::users::find_by_username;

pub fn publish_video(store: &Store, caller: Id, new: NewVideo) -> Result<Video> {
    require_caller(store, caller)?;
    new.media.validate("video file")?;
    new.thumbnail.validate("thumbnail")?;
    let title = required(&new.title, "title")?;
    let description = required(&new.description, "description")?;
    if !new.duration.is_finite() || new.duration <= 0.0 {
        return Err(Error::invalid("duration must be a positive number of seconds"));
    }

    store.insert_video(
        caller,
        &NewVideo {
            title,
            description,
            ..new
        },
    )
}

/// Counts a view and returns the detail page. Unpublished videos are only
/// visible to their owner.
pub fn get_video(store: &Store, id: Id, viewer: Option<Id>) -> Result<VideoDetail> {
    visible_video(store, id, viewer)?;
    if !store.increment_views(id)? {
        return Err(Error::not_found(format!("video {id} not found")));
    }

    let spec = ListSpec::new(PageRequest::default())
        .filter(Field::Id, id)
        .viewer(viewer);
    list_page::<VideoDetail>(store, &spec)?
        .items
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("video {id} not found")))
}

/// Owner-only edit of title, description and optionally the thumbnail.
/// Replacing the thumbnail yields the stale asset to delete.
pub fn update_video(
    store: &Store,
    caller: Id,
    id: Id,
    update: VideoUpdate,
) -> Result<(Video, Option<Supersede>)> {
    let video: Video = store.get(id)?;
    ensure_owner(caller, video.owner, "video")?;

    let mut changes = Changes::new()
        .set("title", required(&update.title, "title")?)
        .set("description", required(&update.description, "description")?);
    let mut supersede = None;
    if let Some(thumbnail) = update.thumbnail {
        thumbnail.validate("thumbnail")?;
        supersede = Supersede::replaced(&video.thumbnail, &thumbnail);
        changes = changes
            .set("thumbnail_url", thumbnail.url)
            .set("thumbnail_provider_id", thumbnail.provider_id);
    }

    if !store.update_by_id(Collection::Videos, id, &changes)? {
        return Err(Error::not_found(format!("video {id} not found")));
    }
    Ok((store.get(id)?, supersede))
}

/// Owner-only delete. Comments, likes and playlist entries go with the
/// video; the returned instructions name the media assets to drop.
pub fn delete_video(store: &Store, caller: Id, id: Id) -> Result<Vec<Supersede>> {
    let video: Video = store.get(id)?;
    ensure_owner(caller, video.owner, "video")?;
    if !store.delete_by_id(Collection::Videos, id)? {
        return Err(Error::not_found(format!("video {id} not found")));
    }
    tracing::info!(video = %id, owner = %caller, "video deleted");
    Ok(vec![
        Supersede {
            provider_id: video.media.provider_id,
        },
        Supersede {
            provider_id: video.thumbnail.provider_id,
        },
    ])
}

pub fn toggle_publish_status(store: &Store, caller: Id, id: Id) -> Result<Video> {
    let video: Video = store.get(id)?;
    ensure_owner(caller, video.owner, "video")?;
    let published = store
        .flip_published(Collection::Videos, id)?
        .ok_or_else(|| Error::not_found(format!("video {id} not found")))?;
    tracing::debug!(video = %id, published, "publication toggled");
    store.get(id)
}

/// Full-text search over published videos. A blank query is rejected.
pub fn search_videos(store: &Store, params: &ListParams) -> Result<Page<VideoCard>> {
    if params.search.as_deref().is_none_or(|term| term.trim().is_empty()) {
        return Err(Error::invalid("search query is required"));
    }
    let spec = params.spec().filter(Field::Published, true);
    list_page(store, &spec)
}

/// Videos of one channel. Other viewers only ever see published videos;
/// the owner may filter on the flag.
pub fn list_user_videos(
    store: &Store,
    username: &str,
    published: Option<bool>,
    params: &ListParams,
) -> Result<Page<VideoCard>> {
    let owner = find_by_username(store, username)?;
    let published = if params.viewer == Some(owner.id) {
        published
    } else {
        Some(true)
    };
    let spec = params
        .spec()
        .filter(Field::Owner, owner.id)
        .filter_opt(Field::Published, published);
    list_page(store, &spec)
}
