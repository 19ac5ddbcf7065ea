//! Channel owner dashboard.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::identity::ensure_owner;
use crate::model::Id;
use crate::pipeline::{Field, ListParams, Page, VideoCard, list_page};
use crate::store::{Collection, Store};
use crate::users::find_by_username;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelStats {
    pub total_views: i64,
    pub total_videos: i64,
    pub total_subscribers: i64,
    pub total_likes: i64,
}

/// Aggregate numbers for one channel, drafts included.
pub fn channel_stats(store: &Store, user: Id) -> Result<ChannelStats> {
    if !store.exists(Collection::Users, user)? {
        return Err(Error::not_found(format!("user {user} not found")));
    }
    store.with_connection(|conn| {
        let stats = conn.query_row(
            r#"
            SELECT
                (SELECT COALESCE(SUM(views), 0) FROM videos WHERE owner_id = ?1),
                (SELECT COUNT(*) FROM videos WHERE owner_id = ?1),
                (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?1),
                (SELECT COUNT(*) FROM likes l JOIN videos v ON v.id = l.video_id
                 WHERE v.owner_id = ?1)
            "#,
            [user],
            |row| {
                Ok(ChannelStats {
                    total_views: row.get(0)?,
                    total_videos: row.get(1)?,
                    total_subscribers: row.get(2)?,
                    total_likes: row.get(3)?,
                })
            },
        )?;
        Ok(stats)
    })
}

/// The owner's own video list, drafts included unless `published` narrows
/// it. Only the channel owner may read it.
pub fn channel_videos(
    store: &Store,
    caller: Id,
    username: &str,
    published: Option<bool>,
    params: &ListParams,
) -> Result<Page<VideoCard>> {
    let owner = find_by_username(store, username)?;
    ensure_owner(caller, owner.id, "channel dashboard")?;
    let spec = params
        .spec()
        .viewer(Some(caller))
        .filter(Field::Owner, owner.id)
        .filter_opt(Field::Published, published);
    list_page(store, &spec)
}
