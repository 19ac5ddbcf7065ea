//! Typed inserts and row mapping for each collection.

use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Collection, Record, Store, bool_value, now, timestamp, timestamp_text};
use crate::error::{Error, Result};
use crate::model::{
    Comment, CommentParent, Id, Like, LikeTarget, MediaRef, NewUser, NewVideo, Playlist,
    Subscription, Tweet, User, Video,
};

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    const COLUMNS: &'static str = "id, username, email, display_name, avatar_url, \
        avatar_provider_id, cover_url, cover_provider_id, password_hash, refresh_token, \
        created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let cover_url: Option<String> = row.get("cover_url")?;
        let cover_provider_id: Option<String> = row.get("cover_provider_id")?;
        Ok(User {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            display_name: row.get("display_name")?,
            avatar: media(row, "avatar_url", "avatar_provider_id")?,
            cover_image: cover_url
                .zip(cover_provider_id)
                .map(|(url, provider_id)| MediaRef { url, provider_id }),
            password_hash: row.get("password_hash")?,
            refresh_token: row.get("refresh_token")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Video {
    const COLLECTION: Collection = Collection::Videos;
    const COLUMNS: &'static str = "id, media_url, media_provider_id, thumbnail_url, \
        thumbnail_provider_id, title, description, duration, views, is_published, owner_id, \
        created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Video {
            id: row.get("id")?,
            media: media(row, "media_url", "media_provider_id")?,
            thumbnail: media(row, "thumbnail_url", "thumbnail_provider_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            duration: row.get("duration")?,
            views: row.get("views")?,
            is_published: row.get("is_published")?,
            owner: row.get("owner_id")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Tweet {
    const COLLECTION: Collection = Collection::Tweets;
    const COLUMNS: &'static str = "id, content, owner_id, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Tweet {
            id: row.get("id")?,
            content: row.get("content")?,
            owner: row.get("owner_id")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Comment {
    const COLLECTION: Collection = Collection::Comments;
    const COLUMNS: &'static str =
        "id, content, owner_id, video_id, tweet_id, parent_id, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Comment {
            id: row.get("id")?,
            content: row.get("content")?,
            owner: row.get("owner_id")?,
            parent: comment_parent(row, "video_id", "tweet_id", "parent_id")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Like {
    const COLLECTION: Collection = Collection::Likes;
    const COLUMNS: &'static str =
        "id, liked_by, video_id, comment_id, tweet_id, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let target = LikeTarget::from_columns(
            row.get("video_id")?,
            row.get("comment_id")?,
            row.get("tweet_id")?,
        )
        .ok_or_else(|| corrupt_reference(row, "video_id"))?;
        Ok(Like {
            id: row.get("id")?,
            liked_by: row.get("liked_by")?,
            target,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Record for Subscription {
    const COLLECTION: Collection = Collection::Subscriptions;
    const COLUMNS: &'static str = "id, subscriber_id, channel_id, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Subscription {
            id: row.get("id")?,
            subscriber: row.get("subscriber_id")?,
            channel: row.get("channel_id")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// Maps the playlist row only; `videos` is filled by [`Store::find_playlist`].
impl Record for Playlist {
    const COLLECTION: Collection = Collection::Playlists;
    const COLUMNS: &'static str =
        "id, name, description, owner_id, is_published, created_at, updated_at";

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Playlist {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            owner: row.get("owner_id")?,
            is_published: row.get("is_published")?,
            videos: Vec::new(),
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl Store {
    /// Inserts a user whose username and email are already normalized.
    pub fn insert_user(&self, new: &NewUser) -> Result<User> {
        let ts = now();
        let user = User {
            id: Id::new(),
            username: new.username.clone(),
            email: new.email.clone(),
            display_name: new.display_name.clone(),
            avatar: new.avatar.clone(),
            cover_image: new.cover_image.clone(),
            password_hash: new.password_hash.clone(),
            refresh_token: None,
            created_at: ts,
            updated_at: ts,
        };

        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO users (
                    id, username, email, display_name, avatar_url, avatar_provider_id,
                    cover_url, cover_provider_id, password_hash, refresh_token,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, ?10, ?10)
                "#,
                params![
                    user.id,
                    user.username,
                    user.email,
                    user.display_name,
                    user.avatar.url,
                    user.avatar.provider_id,
                    user.cover_image.as_ref().map(|cover| cover.url.as_str()),
                    user.cover_image.as_ref().map(|cover| cover.provider_id.as_str()),
                    user.password_hash,
                    timestamp_text(&ts),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(user = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    pub fn insert_video(&self, owner: Id, new: &NewVideo) -> Result<Video> {
        let ts = now();
        let video = Video {
            id: Id::new(),
            media: new.media.clone(),
            thumbnail: new.thumbnail.clone(),
            title: new.title.clone(),
            description: new.description.clone(),
            duration: new.duration,
            views: 0,
            is_published: false,
            owner,
            created_at: ts,
            updated_at: ts,
        };

        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO videos (
                    id, media_url, media_provider_id, thumbnail_url, thumbnail_provider_id,
                    title, description, duration, views, is_published, owner_id,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, ?9, ?10, ?10)
                "#,
                params![
                    video.id,
                    video.media.url,
                    video.media.provider_id,
                    video.thumbnail.url,
                    video.thumbnail.provider_id,
                    video.title,
                    video.description,
                    video.duration,
                    video.owner,
                    timestamp_text(&ts),
                ],
            )?;
            Ok(())
        })?;

        tracing::info!(video = %video.id, owner = %owner, "video published");
        Ok(video)
    }

    pub fn insert_tweet(&self, owner: Id, content: &str) -> Result<Tweet> {
        let ts = now();
        let tweet = Tweet {
            id: Id::new(),
            content: content.to_string(),
            owner,
            created_at: ts,
            updated_at: ts,
        };

        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO tweets (id, content, owner_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![tweet.id, tweet.content, tweet.owner, timestamp_text(&ts)],
            )?;
            Ok(())
        })?;
        Ok(tweet)
    }

    /// Stores a comment with exactly the foreign key `parent` selects.
    pub fn insert_comment(&self, owner: Id, parent: CommentParent, content: &str) -> Result<Comment> {
        let ts = now();
        let comment = Comment {
            id: Id::new(),
            content: content.to_string(),
            owner,
            parent,
            created_at: ts,
            updated_at: ts,
        };
        let (video, tweet, reply_to) = parent.columns();

        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO comments (
                    id, content, owner_id, video_id, tweet_id, parent_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                "#,
                params![
                    comment.id,
                    comment.content,
                    comment.owner,
                    video,
                    tweet,
                    reply_to,
                    timestamp_text(&ts),
                ],
            )?;
            Ok(())
        })?;
        Ok(comment)
    }

    pub fn insert_playlist(&self, owner: Id, name: &str, description: &str) -> Result<Playlist> {
        let ts = now();
        let playlist = Playlist {
            id: Id::new(),
            name: name.to_string(),
            description: description.to_string(),
            owner,
            is_published: false,
            videos: Vec::new(),
            created_at: ts,
            updated_at: ts,
        };

        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO playlists (
                    id, name, description, owner_id, is_published, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                "#,
                params![
                    playlist.id,
                    playlist.name,
                    playlist.description,
                    playlist.owner,
                    timestamp_text(&ts),
                ],
            )?;
            Ok(())
        })?;
        Ok(playlist)
    }

    /// Loads a playlist together with its ordered video ids.
    pub fn find_playlist(&self, id: Id) -> Result<Option<Playlist>> {
        let Some(mut playlist) = self.find_by_id::<Playlist>(id)? else {
            return Ok(None);
        };
        playlist.videos = self.with_connection(|conn| playlist_video_ids(conn, id))?;
        Ok(Some(playlist))
    }

    /// Appends `video` unless it is already present. Returns whether the
    /// playlist changed.
    pub fn playlist_add(&self, playlist: Id, video: Id) -> Result<bool> {
        self.with_connection(|conn| {
            let inserted = conn.execute(
                r#"
                INSERT OR IGNORE INTO playlist_videos (playlist_id, video_id, position, added_at)
                SELECT ?1, ?2, COALESCE(MAX(position), 0) + 1, ?3
                FROM playlist_videos
                WHERE playlist_id = ?1
                "#,
                params![playlist, video, timestamp_text(&now())],
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn playlist_remove(&self, playlist: Id, video: Id) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn.execute(
                "DELETE FROM playlist_videos WHERE playlist_id = ?1 AND video_id = ?2",
                params![playlist, video],
            )?;
            Ok(removed > 0)
        })
    }

    /// Atomically increments a video's view counter.
    pub fn increment_views(&self, video: Id) -> Result<bool> {
        self.with_connection(|conn| {
            let updated = conn.execute("UPDATE videos SET views = views + 1 WHERE id = ?1", [video])?;
            Ok(updated > 0)
        })
    }

    /// Flips `is_published` in one statement and returns the new value, or
    /// `None` if no row matched.
    pub fn flip_published(&self, collection: Collection, id: Id) -> Result<Option<bool>> {
        if !matches!(collection, Collection::Videos | Collection::Playlists) {
            return Err(Error::invalid(format!(
                "{} has no publication flag",
                collection.label()
            )));
        }
        self.with_connection(|conn| {
            let flag = conn
                .query_row(
                    &format!(
                        "UPDATE {} SET is_published = NOT is_published, updated_at = ?1
                         WHERE id = ?2 RETURNING is_published",
                        collection.table()
                    ),
                    params![timestamp_text(&now()), id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(flag)
        })
    }

    pub fn set_published(&self, collection: Collection, id: Id, flag: bool) -> Result<bool> {
        self.update_by_id(
            collection,
            id,
            &super::Changes::new().set("is_published", bool_value(flag)),
        )
    }
}

fn playlist_video_ids(conn: &Connection, playlist: Id) -> Result<Vec<Id>> {
    let mut stmt = conn.prepare(
        "SELECT video_id FROM playlist_videos WHERE playlist_id = ?1 ORDER BY position ASC",
    )?;
    let ids = stmt
        .query_map([playlist], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<Id>>>()?;
    Ok(ids)
}

pub(crate) fn media(row: &Row<'_>, url: &str, provider_id: &str) -> rusqlite::Result<MediaRef> {
    Ok(MediaRef {
        url: row.get(url)?,
        provider_id: row.get(provider_id)?,
    })
}

pub(crate) fn comment_parent(
    row: &Row<'_>,
    video: &str,
    tweet: &str,
    parent: &str,
) -> rusqlite::Result<CommentParent> {
    CommentParent::from_columns(row.get(video)?, row.get(tweet)?, row.get(parent)?)
        .ok_or_else(|| corrupt_reference(row, video))
}

/// A stored polymorphic row whose reference columns are not exactly one.
fn corrupt_reference(row: &Row<'_>, column: &str) -> rusqlite::Error {
    let index = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        "polymorphic reference must have exactly one target".into(),
    )
}
