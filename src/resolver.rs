//! Resolution of caller-supplied content references.
//!
//! Comments and likes point at exactly one of several content kinds. The
//! caller sends up to three optional ids; this module is the only path from
//! that shape to a [`CommentParent`] or [`LikeTarget`], and it checks that
//! the referenced entity exists and, for drafts, that the caller owns it.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::model::{CommentParent, Id, LikeTarget, Video};
use crate::store::{Collection, Store};

/// Raw reference as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub tweet_id: Option<String>,
    #[serde(default)]
    pub comment_id: Option<String>,
}

impl ContentRef {
    pub fn video(id: impl ToString) -> Self {
        Self {
            video_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn tweet(id: impl ToString) -> Self {
        Self {
            tweet_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    pub fn comment(id: impl ToString) -> Self {
        Self {
            comment_id: Some(id.to_string()),
            ..Self::default()
        }
    }

    /// The single non-blank reference, or `InvalidInput`.
    fn only(&self) -> Result<(Collection, &str)> {
        let supplied: Vec<(Collection, &str)> = [
            (Collection::Videos, self.video_id.as_deref()),
            (Collection::Tweets, self.tweet_id.as_deref()),
            (Collection::Comments, self.comment_id.as_deref()),
        ]
        .into_iter()
        .filter_map(|(collection, raw)| {
            raw.filter(|raw| !raw.trim().is_empty())
                .map(|raw| (collection, raw))
        })
        .collect();

        match supplied.as_slice() {
            [single] => Ok(*single),
            [] => Err(Error::invalid(
                "one of videoId, tweetId or commentId is required",
            )),
            _ => Err(Error::invalid(
                "only one of videoId, tweetId or commentId may be given",
            )),
        }
    }
}

pub fn resolve_comment_parent(
    store: &Store,
    reference: &ContentRef,
    viewer: Option<Id>,
) -> Result<CommentParent> {
    let (collection, raw) = reference.only()?;
    let id = require_visible(store, collection, raw, viewer)?;
    Ok(match collection {
        Collection::Videos => CommentParent::Video(id),
        Collection::Tweets => CommentParent::Tweet(id),
        _ => CommentParent::Comment(id),
    })
}

pub fn resolve_like_target(
    store: &Store,
    reference: &ContentRef,
    viewer: Option<Id>,
) -> Result<LikeTarget> {
    let (collection, raw) = reference.only()?;
    let id = require_visible(store, collection, raw, viewer)?;
    Ok(match collection {
        Collection::Videos => LikeTarget::Video(id),
        Collection::Tweets => LikeTarget::Tweet(id),
        _ => LikeTarget::Comment(id),
    })
}

/// Parses `raw` and checks a record with that id exists in `collection`.
/// Both a malformed and an unknown id are `NotFound`.
pub fn require_existing(store: &Store, collection: Collection, raw: &str) -> Result<Id> {
    let id = Id::parse_for(raw, collection.label())?;
    if !store.exists(collection, id)? {
        return Err(Error::not_found(format!(
            "{} {id} not found",
            collection.label()
        )));
    }
    Ok(id)
}

/// Loads a video `viewer` may see: published, or owned by `viewer`. A draft
/// is `NotFound` to everyone else so its existence does not leak.
pub fn visible_video(store: &Store, id: Id, viewer: Option<Id>) -> Result<Video> {
    match store.find_by_id::<Video>(id)? {
        Some(video) if video.is_published || viewer == Some(video.owner) => Ok(video),
        _ => Err(Error::not_found(format!("video {id} not found"))),
    }
}

fn require_visible(
    store: &Store,
    collection: Collection,
    raw: &str,
    viewer: Option<Id>,
) -> Result<Id> {
    match collection {
        Collection::Videos => {
            let id = Id::parse_for(raw, collection.label())?;
            visible_video(store, id, viewer).map(|video| video.id)
        }
        _ => require_existing(store, collection, raw),
    }
}
