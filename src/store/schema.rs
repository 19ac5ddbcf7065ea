use rusqlite::Connection;

use crate::error::Result;

/// Bumped whenever the layout below changes.
pub(crate) const SCHEMA_VERSION: u32 = 1;

/// Creates every table and index if missing. Wrapped in a transaction so a
/// failure leaves the database untouched.
///
/// The `(subject, target)` unique indexes on `likes` and `subscriptions` are
/// what makes toggling race-free: the conditional insert in the toggle path
/// relies on them. Dependent rows are removed by `ON DELETE CASCADE`; users
/// are never deleted by the core, so owner references carry no cascade.
pub(crate) fn ensure_tables(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            avatar_url TEXT NOT NULL,
            avatar_provider_id TEXT NOT NULL,
            cover_url TEXT,
            cover_provider_id TEXT,
            password_hash TEXT NOT NULL,
            refresh_token TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS videos (
            id TEXT PRIMARY KEY NOT NULL,
            media_url TEXT NOT NULL,
            media_provider_id TEXT NOT NULL,
            thumbnail_url TEXT NOT NULL,
            thumbnail_provider_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            duration REAL NOT NULL CHECK (duration > 0),
            views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
            is_published INTEGER NOT NULL DEFAULT 0,
            owner_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id, is_published);

        CREATE TABLE IF NOT EXISTS tweets (
            id TEXT PRIMARY KEY NOT NULL,
            content TEXT NOT NULL,
            owner_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tweets_owner ON tweets(owner_id);

        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY NOT NULL,
            content TEXT NOT NULL,
            owner_id TEXT NOT NULL REFERENCES users(id),
            video_id TEXT REFERENCES videos(id) ON DELETE CASCADE,
            tweet_id TEXT REFERENCES tweets(id) ON DELETE CASCADE,
            parent_id TEXT REFERENCES comments(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);
        CREATE INDEX IF NOT EXISTS idx_comments_tweet ON comments(tweet_id);
        CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id);

        CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY NOT NULL,
            liked_by TEXT NOT NULL REFERENCES users(id),
            video_id TEXT REFERENCES videos(id) ON DELETE CASCADE,
            comment_id TEXT REFERENCES comments(id) ON DELETE CASCADE,
            tweet_id TEXT REFERENCES tweets(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_video_edge
            ON likes(liked_by, video_id) WHERE video_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_comment_edge
            ON likes(liked_by, comment_id) WHERE comment_id IS NOT NULL;
        CREATE UNIQUE INDEX IF NOT EXISTS idx_likes_tweet_edge
            ON likes(liked_by, tweet_id) WHERE tweet_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_likes_video ON likes(video_id);
        CREATE INDEX IF NOT EXISTS idx_likes_comment ON likes(comment_id);
        CREATE INDEX IF NOT EXISTS idx_likes_tweet ON likes(tweet_id);

        CREATE TABLE IF NOT EXISTS subscriptions (
            id TEXT PRIMARY KEY NOT NULL,
            subscriber_id TEXT NOT NULL REFERENCES users(id),
            channel_id TEXT NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (subscriber_id, channel_id)
        );

        CREATE INDEX IF NOT EXISTS idx_subscriptions_channel ON subscriptions(channel_id);

        CREATE TABLE IF NOT EXISTS playlists (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            owner_id TEXT NOT NULL REFERENCES users(id),
            is_published INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_playlists_owner ON playlists(owner_id);

        CREATE TABLE IF NOT EXISTS playlist_videos (
            playlist_id TEXT NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
            video_id TEXT NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            added_at TEXT NOT NULL,
            PRIMARY KEY (playlist_id, video_id)
        );

        CREATE INDEX IF NOT EXISTS idx_playlist_videos_video ON playlist_videos(video_id);
        "#,
    )?;

    tx.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    tx.commit()?;
    Ok(())
}
