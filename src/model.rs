//! Domain records.
//!
//! These structs mirror the rows persisted by [`crate::store::Store`] and are
//! what the core hands back to the HTTP layer. Polymorphic references are
//! tagged unions so a comment or like can never point at two parents at once.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque, globally unique identifier shared by every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(Uuid);

impl Id {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a caller-supplied identifier. A malformed id can never match a
    /// stored record, so it is reported as `NotFound` for `what`.
    pub fn parse_for(raw: &str, what: &str) -> Result<Self> {
        raw.trim()
            .parse()
            .map_err(|_| Error::not_found(format!("{what} {raw} not found")))
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for Id {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for Id {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl ToSql for Id {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Id {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        text.parse().map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl From<Id> for rusqlite::types::Value {
    fn from(id: Id) -> Self {
        rusqlite::types::Value::Text(id.to_string())
    }
}

/// Trimmed copy of a mandatory text field.
pub(crate) fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// A media asset already persisted by the external media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub provider_id: String,
}

impl MediaRef {
    pub fn new(url: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            provider_id: provider_id.into(),
        }
    }

    pub(crate) fn validate(&self, field: &str) -> Result<()> {
        if self.url.trim().is_empty() || self.provider_id.trim().is_empty() {
            return Err(Error::invalid(format!("{field} reference is required")));
        }
        Ok(())
    }
}

/// Instruction for the media layer: the asset with `provider_id` is no
/// longer referenced and should be deleted from the media host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Supersede {
    pub provider_id: String,
}

impl Supersede {
    pub(crate) fn replaced(old: &MediaRef, new: &MediaRef) -> Option<Self> {
        (old.provider_id != new.provider_id).then(|| Self {
            provider_id: old.provider_id.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: MediaRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<MediaRef>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. `password_hash` is produced by the excluded
/// credential layer; the core stores it without interpreting it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub avatar: MediaRef,
    #[serde(default)]
    pub cover_image: Option<MediaRef>,
    pub password_hash: String,
}

/// Trimmed owner metadata attached to listed records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: Id,
    pub username: String,
    pub display_name: String,
    pub avatar: MediaRef,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: Id,
    pub media: MediaRef,
    pub thumbnail: MediaRef,
    pub title: String,
    pub description: String,
    /// Seconds.
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVideo {
    pub media: MediaRef,
    pub thumbnail: MediaRef,
    pub title: String,
    pub description: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoUpdate {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<MediaRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tweet {
    pub id: Id,
    pub content: String,
    pub owner: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a comment hangs off: a video, a tweet, or another comment (a reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CommentParent {
    Video(Id),
    Tweet(Id),
    Comment(Id),
}

impl CommentParent {
    /// Splits the variant into the `(video, tweet, comment)` foreign keys.
    pub fn columns(&self) -> (Option<Id>, Option<Id>, Option<Id>) {
        match *self {
            CommentParent::Video(id) => (Some(id), None, None),
            CommentParent::Tweet(id) => (None, Some(id), None),
            CommentParent::Comment(id) => (None, None, Some(id)),
        }
    }

    pub(crate) fn from_columns(
        video: Option<Id>,
        tweet: Option<Id>,
        comment: Option<Id>,
    ) -> Option<Self> {
        match (video, tweet, comment) {
            (Some(id), None, None) => Some(CommentParent::Video(id)),
            (None, Some(id), None) => Some(CommentParent::Tweet(id)),
            (None, None, Some(id)) => Some(CommentParent::Comment(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: Id,
    pub content: String,
    pub owner: Id,
    pub parent: CommentParent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn video(&self) -> Option<Id> {
        self.parent.columns().0
    }

    pub fn tweet(&self) -> Option<Id> {
        self.parent.columns().1
    }

    pub fn comment(&self) -> Option<Id> {
        self.parent.columns().2
    }
}

/// What a like points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LikeTarget {
    Video(Id),
    Comment(Id),
    Tweet(Id),
}

impl LikeTarget {
    pub fn id(&self) -> Id {
        match self {
            LikeTarget::Video(id) | LikeTarget::Comment(id) | LikeTarget::Tweet(id) => *id,
        }
    }

    /// Name of the foreign-key column on `likes` populated for this target.
    pub(crate) fn column(&self) -> &'static str {
        match self {
            LikeTarget::Video(_) => "video_id",
            LikeTarget::Comment(_) => "comment_id",
            LikeTarget::Tweet(_) => "tweet_id",
        }
    }

    pub(crate) fn from_columns(
        video: Option<Id>,
        comment: Option<Id>,
        tweet: Option<Id>,
    ) -> Option<Self> {
        match (video, comment, tweet) {
            (Some(id), None, None) => Some(LikeTarget::Video(id)),
            (None, Some(id), None) => Some(LikeTarget::Comment(id)),
            (None, None, Some(id)) => Some(LikeTarget::Tweet(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Like {
    pub id: Id,
    pub liked_by: Id,
    pub target: LikeTarget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Id,
    pub subscriber: Id,
    pub channel: Id,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub owner: Id,
    pub is_published: bool,
    /// Insertion order, duplicates suppressed.
    pub videos: Vec<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_id_is_not_found() {
        let err = Id::parse_for("not-a-uuid", "video").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
        assert!(err.message().contains("video not-a-uuid"));
    }

    #[test]
    fn id_display_round_trips_through_parse() {
        let id = Id::new();
        assert_eq!(Id::parse_for(&id.to_string(), "user").unwrap(), id);
    }

    #[test]
    fn comment_parent_populates_exactly_one_column() {
        let id = Id::new();
        assert_eq!(CommentParent::Tweet(id).columns(), (None, Some(id), None));
        assert_eq!(
            CommentParent::from_columns(None, None, Some(id)),
            Some(CommentParent::Comment(id))
        );
        assert_eq!(CommentParent::from_columns(Some(id), Some(id), None), None);
        assert_eq!(CommentParent::from_columns(None, None, None), None);
    }

    #[test]
    fn like_target_serializes_as_tagged_reference() {
        let id = Id::new();
        let json = serde_json::to_value(LikeTarget::Comment(id)).unwrap();
        assert_eq!(json["kind"], "comment");
        assert_eq!(json["id"], id.to_string());
    }

    #[test]
    fn supersede_only_when_provider_changes() {
        let old = MediaRef::new("https://cdn/a.jpg", "a");
        assert!(Supersede::replaced(&old, &old.clone()).is_none());
        let new = MediaRef::new("https://cdn/b.jpg", "b");
        assert_eq!(
            Supersede::replaced(&old, &new),
            Some(Supersede {
                provider_id: "a".to_string()
            })
        );
    }
}
