//! Conditional writes for the toggleable social edges.
//!
//! Each write is one statement whose effect depends on the row state at the
//! moment it runs, so a writer that lost a race finds out from the result
//! instead of corrupting the edge set.

use rusqlite::{OptionalExtension, params};

use super::{Record, Store, now, timestamp_text};
use crate::error::Result;
use crate::model::{Id, Like, LikeTarget, Subscription};

impl Store {
    pub fn find_like(&self, liked_by: Id, target: LikeTarget) -> Result<Option<Like>> {
        let sql = format!(
            "SELECT {} FROM likes WHERE liked_by = ?1 AND {} = ?2",
            Like::COLUMNS,
            target.column()
        );
        self.with_connection(|conn| {
            Ok(conn
                .query_row(&sql, params![liked_by, target.id()], Like::from_row)
                .optional()?)
        })
    }

    /// Inserts the like unless `(liked_by, target)` already exists. `None`
    /// means another writer got there first.
    pub fn insert_like_if_absent(&self, liked_by: Id, target: LikeTarget) -> Result<Option<Like>> {
        let ts = now();
        let (video, comment, tweet) = match target {
            LikeTarget::Video(id) => (Some(id), None, None),
            LikeTarget::Comment(id) => (None, Some(id), None),
            LikeTarget::Tweet(id) => (None, None, Some(id)),
        };
        let sql = format!(
            r#"
            INSERT INTO likes (id, liked_by, video_id, comment_id, tweet_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            Like::COLUMNS
        );
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &sql,
                    params![Id::new(), liked_by, video, comment, tweet, timestamp_text(&ts)],
                    Like::from_row,
                )
                .optional()?)
        })
    }

    /// Deletes exactly the observed like. `false` means it was already gone.
    pub fn delete_like_if_present(&self, id: Id) -> Result<bool> {
        self.delete_edge("likes", id)
    }

    pub fn find_subscription(&self, subscriber: Id, channel: Id) -> Result<Option<Subscription>> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE subscriber_id = ?1 AND channel_id = ?2",
            Subscription::COLUMNS
        );
        self.with_connection(|conn| {
            Ok(conn
                .query_row(&sql, params![subscriber, channel], Subscription::from_row)
                .optional()?)
        })
    }

    pub fn insert_subscription_if_absent(
        &self,
        subscriber: Id,
        channel: Id,
    ) -> Result<Option<Subscription>> {
        let sql = format!(
            r#"
            INSERT INTO subscriptions (id, subscriber_id, channel_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            ON CONFLICT DO NOTHING
            RETURNING {}
            "#,
            Subscription::COLUMNS
        );
        self.with_connection(|conn| {
            Ok(conn
                .query_row(
                    &sql,
                    params![Id::new(), subscriber, channel, timestamp_text(&now())],
                    Subscription::from_row,
                )
                .optional()?)
        })
    }

    pub fn delete_subscription_if_present(&self, id: Id) -> Result<bool> {
        self.delete_edge("subscriptions", id)
    }

    fn delete_edge(&self, table: &'static str, id: Id) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;
            Ok(removed > 0)
        })
    }
}
