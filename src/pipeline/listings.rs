//! Listing shapes: one projection per record kind the HTTP layer returns in
//! pages, with the owner summary and derived counts already attached.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use super::{Field, Listing, Sort, SortDirection, SortKey};
use crate::model::{CommentParent, Id, MediaRef, OwnerSummary};
use crate::store::{SqlBuilder, comment_parent, media, timestamp};

const OWNER_COLUMNS: &str = "o.id AS owner_id, o.username AS owner_username, \
    o.display_name AS owner_display_name, o.avatar_url AS owner_avatar_url, \
    o.avatar_provider_id AS owner_avatar_provider_id";

fn owner_summary(row: &Row<'_>) -> rusqlite::Result<OwnerSummary> {
    Ok(OwnerSummary {
        id: row.get("owner_id")?,
        username: row.get("owner_username")?,
        display_name: row.get("owner_display_name")?,
        avatar: media(row, "owner_avatar_url", "owner_avatar_provider_id")?,
    })
}

/// Video as shown in feeds, search results and channel pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCard {
    pub id: Id,
    pub thumbnail: MediaRef,
    pub title: String,
    pub description: String,
    pub duration: f64,
    pub views: i64,
    pub is_published: bool,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing for VideoCard {
    const LABEL: &'static str = "videos";
    const FROM: &'static str = "videos v JOIN users o ON o.id = v.owner_id";
    const ID: &'static str = "v.id";
    const CREATED_AT: &'static str = "v.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = Some(("v.title", "v.description"));

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Id => Some("v.id = ?"),
            Field::Owner => Some("v.owner_id = ?"),
            Field::Published => Some("v.is_published = ?"),
            Field::LikedBy => Some(
                "v.id IN (SELECT video_id FROM likes WHERE liked_by = ? AND video_id IS NOT NULL)",
            ),
            Field::Playlist => {
                Some("v.id IN (SELECT video_id FROM playlist_videos WHERE playlist_id = ?)")
            }
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::CreatedAt => Some("v.created_at"),
            SortKey::UpdatedAt => Some("v.updated_at"),
            SortKey::Title => Some("v.title COLLATE NOCASE"),
            SortKey::Views => Some("v.views"),
            SortKey::Duration => Some("v.duration"),
            _ => None,
        }
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        qb.push(
            "v.id AS id, v.thumbnail_url AS thumbnail_url, \
             v.thumbnail_provider_id AS thumbnail_provider_id, v.title AS title, \
             v.description AS description, v.duration AS duration, v.views AS views, \
             v.is_published AS is_published, v.created_at AS created_at, \
             v.updated_at AS updated_at, ",
        )
        .push(OWNER_COLUMNS)
        .push(
            ", (SELECT COUNT(*) FROM likes l WHERE l.video_id = v.id) AS likes_count, \
             (SELECT COUNT(*) FROM comments cm WHERE cm.video_id = v.id) AS comments_count, ",
        )
        .push_template(
            "EXISTS (SELECT 1 FROM likes l WHERE l.video_id = v.id AND l.liked_by = ?) AS is_liked",
            viewer.clone(),
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(VideoCard {
            id: row.get("id")?,
            thumbnail: media(row, "thumbnail_url", "thumbnail_provider_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
            views: row.get("views")?,
            is_published: row.get("is_published")?,
            owner: owner_summary(row)?,
            likes_count: row.get("likes_count")?,
            comments_count: row.get("comments_count")?,
            is_liked: row.get("is_liked")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// Single-video view: the card plus the playable media and the owner's
/// channel standing relative to the viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: VideoCard,
    pub media: MediaRef,
    pub subscribers_count: i64,
    pub is_subscribed: bool,
}

impl Listing for VideoDetail {
    const LABEL: &'static str = "videos";
    const FROM: &'static str = <VideoCard as Listing>::FROM;
    const ID: &'static str = <VideoCard as Listing>::ID;
    const CREATED_AT: &'static str = <VideoCard as Listing>::CREATED_AT;

    fn predicate(field: Field) -> Option<&'static str> {
        VideoCard::predicate(field)
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        VideoCard::sort_column(key)
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        VideoCard::project(qb, viewer);
        qb.push(
            ", v.media_url AS media_url, v.media_provider_id AS media_provider_id, \
             (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = v.owner_id) \
             AS subscribers_count, ",
        )
        .push_template(
            "EXISTS (SELECT 1 FROM subscriptions s \
             WHERE s.channel_id = v.owner_id AND s.subscriber_id = ?) AS is_subscribed",
            viewer.clone(),
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(VideoDetail {
            video: VideoCard::from_row(row)?,
            media: media(row, "media_url", "media_provider_id")?,
            subscribers_count: row.get("subscribers_count")?,
            is_subscribed: row.get("is_subscribed")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetCard {
    pub id: Id,
    pub content: String,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    pub comments_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing for TweetCard {
    const LABEL: &'static str = "tweets";
    const FROM: &'static str = "tweets t JOIN users o ON o.id = t.owner_id";
    const ID: &'static str = "t.id";
    const CREATED_AT: &'static str = "t.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = Some(("t.content", "''"));

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Id => Some("t.id = ?"),
            Field::Owner => Some("t.owner_id = ?"),
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::CreatedAt => Some("t.created_at"),
            SortKey::UpdatedAt => Some("t.updated_at"),
            _ => None,
        }
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        qb.push(
            "t.id AS id, t.content AS content, t.created_at AS created_at, \
             t.updated_at AS updated_at, ",
        )
        .push(OWNER_COLUMNS)
        .push(
            ", (SELECT COUNT(*) FROM likes l WHERE l.tweet_id = t.id) AS likes_count, \
             (SELECT COUNT(*) FROM comments cm WHERE cm.tweet_id = t.id) AS comments_count, ",
        )
        .push_template(
            "EXISTS (SELECT 1 FROM likes l WHERE l.tweet_id = t.id AND l.liked_by = ?) AS is_liked",
            viewer.clone(),
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(TweetCard {
            id: row.get("id")?,
            content: row.get("content")?,
            owner: owner_summary(row)?,
            likes_count: row.get("likes_count")?,
            comments_count: row.get("comments_count")?,
            is_liked: row.get("is_liked")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// Comment or reply in a thread listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentCard {
    pub id: Id,
    pub content: String,
    pub parent: CommentParent,
    pub owner: OwnerSummary,
    pub likes_count: i64,
    pub replies_count: i64,
    pub is_liked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing for CommentCard {
    const LABEL: &'static str = "comments";
    const FROM: &'static str = "comments c JOIN users o ON o.id = c.owner_id";
    const ID: &'static str = "c.id";
    const CREATED_AT: &'static str = "c.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = Some(("c.content", "''"));

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Id => Some("c.id = ?"),
            Field::Owner => Some("c.owner_id = ?"),
            Field::Video => Some("c.video_id = ?"),
            Field::Tweet => Some("c.tweet_id = ?"),
            Field::ParentComment => Some("c.parent_id = ?"),
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::CreatedAt => Some("c.created_at"),
            SortKey::UpdatedAt => Some("c.updated_at"),
            _ => None,
        }
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        qb.push(
            "c.id AS id, c.content AS content, c.video_id AS video_id, \
             c.tweet_id AS tweet_id, c.parent_id AS parent_id, \
             c.created_at AS created_at, c.updated_at AS updated_at, ",
        )
        .push(OWNER_COLUMNS)
        .push(
            ", (SELECT COUNT(*) FROM likes l WHERE l.comment_id = c.id) AS likes_count, \
             (SELECT COUNT(*) FROM comments r WHERE r.parent_id = c.id) AS replies_count, ",
        )
        .push_template(
            "EXISTS (SELECT 1 FROM likes l WHERE l.comment_id = c.id AND l.liked_by = ?) \
             AS is_liked",
            viewer.clone(),
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(CommentCard {
            id: row.get("id")?,
            content: row.get("content")?,
            parent: comment_parent(row, "video_id", "tweet_id", "parent_id")?,
            owner: owner_summary(row)?,
            likes_count: row.get("likes_count")?,
            replies_count: row.get("replies_count")?,
            is_liked: row.get("is_liked")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// A user seen as a channel: subscriber lists, subscription lists.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelCard {
    pub id: Id,
    pub username: String,
    pub display_name: String,
    pub avatar: MediaRef,
    pub subscribers_count: i64,
    pub videos_count: i64,
    pub is_subscribed: bool,
}

const CHANNEL_COLUMNS: &str = "u.id AS id, u.username AS username, \
    u.display_name AS display_name, u.avatar_url AS avatar_url, \
    u.avatar_provider_id AS avatar_provider_id, \
    (SELECT COUNT(*) FROM subscriptions s WHERE s.channel_id = u.id) AS subscribers_count, \
    (SELECT COUNT(*) FROM videos cv WHERE cv.owner_id = u.id AND cv.is_published = 1) \
    AS videos_count, ";

const CHANNEL_IS_SUBSCRIBED: &str = "EXISTS (SELECT 1 FROM subscriptions s \
    WHERE s.channel_id = u.id AND s.subscriber_id = ?) AS is_subscribed";

impl Listing for ChannelCard {
    const LABEL: &'static str = "channels";
    const FROM: &'static str = "users u";
    const ID: &'static str = "u.id";
    const CREATED_AT: &'static str = "u.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = Some(("u.username", "u.display_name"));

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Id => Some("u.id = ?"),
            Field::Username => Some("u.username = ?"),
            Field::SubscribersOf => {
                Some("u.id IN (SELECT subscriber_id FROM subscriptions WHERE channel_id = ?)")
            }
            Field::SubscriptionsOf => {
                Some("u.id IN (SELECT channel_id FROM subscriptions WHERE subscriber_id = ?)")
            }
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::CreatedAt => Some("u.created_at"),
            SortKey::UpdatedAt => Some("u.updated_at"),
            SortKey::Name => Some("u.username"),
            _ => None,
        }
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        qb.push(CHANNEL_COLUMNS)
            .push_template(CHANNEL_IS_SUBSCRIBED, viewer.clone());
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(ChannelCard {
            id: row.get("id")?,
            username: row.get("username")?,
            display_name: row.get("display_name")?,
            avatar: media(row, "avatar_url", "avatar_provider_id")?,
            subscribers_count: row.get("subscribers_count")?,
            videos_count: row.get("videos_count")?,
            is_subscribed: row.get("is_subscribed")?,
        })
    }
}

/// Public channel page for one user.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    #[serde(flatten)]
    pub channel: ChannelCard,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<MediaRef>,
    pub subscribed_to_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Listing for ChannelProfile {
    const LABEL: &'static str = "channels";
    const FROM: &'static str = <ChannelCard as Listing>::FROM;
    const ID: &'static str = <ChannelCard as Listing>::ID;
    const CREATED_AT: &'static str = <ChannelCard as Listing>::CREATED_AT;

    fn predicate(field: Field) -> Option<&'static str> {
        ChannelCard::predicate(field)
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        ChannelCard::sort_column(key)
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        ChannelCard::project(qb, viewer);
        qb.push(
            ", u.email AS email, u.cover_url AS cover_url, \
             u.cover_provider_id AS cover_provider_id, u.created_at AS created_at, \
             (SELECT COUNT(*) FROM subscriptions s WHERE s.subscriber_id = u.id) \
             AS subscribed_to_count",
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let cover_url: Option<String> = row.get("cover_url")?;
        let cover_provider_id: Option<String> = row.get("cover_provider_id")?;
        Ok(ChannelProfile {
            channel: ChannelCard::from_row(row)?,
            email: row.get("email")?,
            cover_image: cover_url
                .zip(cover_provider_id)
                .map(|(url, provider_id)| MediaRef { url, provider_id }),
            subscribed_to_count: row.get("subscribed_to_count")?,
            created_at: timestamp(row, "created_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistCard {
    pub id: Id,
    pub name: String,
    pub description: String,
    pub is_published: bool,
    pub owner: OwnerSummary,
    pub videos_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Listing for PlaylistCard {
    const LABEL: &'static str = "playlists";
    const FROM: &'static str = "playlists p JOIN users o ON o.id = p.owner_id";
    const ID: &'static str = "p.id";
    const CREATED_AT: &'static str = "p.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = Some(("p.name", "p.description"));

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Id => Some("p.id = ?"),
            Field::Owner => Some("p.owner_id = ?"),
            Field::Published => Some("p.is_published = ?"),
            Field::Video => {
                Some("p.id IN (SELECT playlist_id FROM playlist_videos WHERE video_id = ?)")
            }
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::CreatedAt => Some("p.created_at"),
            SortKey::UpdatedAt => Some("p.updated_at"),
            SortKey::Name => Some("p.name COLLATE NOCASE"),
            _ => None,
        }
    }

    fn project(qb: &mut SqlBuilder, _viewer: &Value) {
        qb.push(
            "p.id AS id, p.name AS name, p.description AS description, \
             p.is_published AS is_published, p.created_at AS created_at, \
             p.updated_at AS updated_at, ",
        )
        .push(OWNER_COLUMNS)
        .push(
            ", (SELECT COUNT(*) FROM playlist_videos pv WHERE pv.playlist_id = p.id) \
             AS videos_count",
        );
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PlaylistCard {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            is_published: row.get("is_published")?,
            owner: owner_summary(row)?,
            videos_count: row.get("videos_count")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// A video inside a playlist, in playlist order by default.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub position: i64,
    pub added_at: DateTime<Utc>,
    #[serde(flatten)]
    pub video: VideoCard,
}

impl Listing for PlaylistEntry {
    const LABEL: &'static str = "playlist videos";
    const FROM: &'static str = "playlist_videos pv JOIN videos v ON v.id = pv.video_id \
        JOIN users o ON o.id = v.owner_id";
    const ID: &'static str = "v.id";
    const CREATED_AT: &'static str = "v.created_at";
    const SEARCH: Option<(&'static str, &'static str)> = <VideoCard as Listing>::SEARCH;
    const DEFAULT_SORT: Sort = Sort::new(SortKey::Position, SortDirection::Asc);

    fn predicate(field: Field) -> Option<&'static str> {
        match field {
            Field::Playlist => Some("pv.playlist_id = ?"),
            Field::Published => Some("v.is_published = ?"),
            Field::Owner => Some("v.owner_id = ?"),
            _ => None,
        }
    }

    fn sort_column(key: SortKey) -> Option<&'static str> {
        match key {
            SortKey::Position => Some("pv.position"),
            other => VideoCard::sort_column(other),
        }
    }

    fn project(qb: &mut SqlBuilder, viewer: &Value) {
        VideoCard::project(qb, viewer);
        qb.push(", pv.position AS position, pv.added_at AS added_at");
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PlaylistEntry {
            position: row.get("position")?,
            added_at: timestamp(row, "added_at")?,
            video: VideoCard::from_row(row)?,
        })
    }
}
