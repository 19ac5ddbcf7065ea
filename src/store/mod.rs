//! Entity store adapter.
//!
//! [`Store`] owns the SQLite connection the whole core runs against. It is
//! opened once at process start and handed explicitly to every operation;
//! clones share the same connection and the database closes when the last
//! clone is dropped.
//!
//! The generic half of the adapter (find, count, update, delete over a
//! [`Collection`]) lives here; typed inserts and row mapping live in
//! `records`, and the conditional edge writes used by toggling live in
//! `edges`.

mod edges;
mod records;
mod schema;
mod sql;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use parking_lot::Mutex;
use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};

use crate::error::{Error, Result};
use crate::model::Id;
use crate::pipeline::search;

pub(crate) use records::{comment_parent, media};
pub use sql::{Changes, Filter, SqlBuilder};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Named collection of typed records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Videos,
    Tweets,
    Comments,
    Likes,
    Subscriptions,
    Playlists,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Videos => "videos",
            Collection::Tweets => "tweets",
            Collection::Comments => "comments",
            Collection::Likes => "likes",
            Collection::Subscriptions => "subscriptions",
            Collection::Playlists => "playlists",
        }
    }

    /// Singular noun used in error messages.
    pub fn label(self) -> &'static str {
        match self {
            Collection::Users => "user",
            Collection::Videos => "video",
            Collection::Tweets => "tweet",
            Collection::Comments => "comment",
            Collection::Likes => "like",
            Collection::Subscriptions => "subscription",
            Collection::Playlists => "playlist",
        }
    }
}

/// A row type stored in one [`Collection`].
pub trait Record: Sized {
    const COLLECTION: Collection;
    /// Comma separated column list understood by [`Record::from_row`].
    const COLUMNS: &'static str;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

/// Shared handle over the SQLite database.
#[derive(Debug, Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Opens (and if necessary creates) the database file and ensures the
    /// expected schema exists. WAL mode keeps readers from blocking writers.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| {
                Error::StoreFailure(format!(
                    "creating store directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        tracing::info!(path = %path.display(), "opening store");
        Self::init(conn)
    }

    /// Private database that disappears with the last handle. Used by tests
    /// and throwaway tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        search::register(&conn)?;
        schema::ensure_tables(&mut conn)?;
        tracing::debug!(version = schema::SCHEMA_VERSION, "store schema ready");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection. Each call is one
    /// store round-trip; nothing is held across calls.
    pub(crate) fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    pub fn find_by_id<R: Record>(&self, id: Id) -> Result<Option<R>> {
        self.find_one(&Filter::new().eq("id", id))
    }

    /// Like [`Store::find_by_id`] but absence is an error.
    pub fn get<R: Record>(&self, id: Id) -> Result<R> {
        self.find_by_id(id)?.ok_or_else(|| {
            Error::not_found(format!("{} {id} not found", R::COLLECTION.label()))
        })
    }

    pub fn find_one<R: Record>(&self, filter: &Filter) -> Result<Option<R>> {
        let mut qb = select::<R>();
        filter.apply(&mut qb);
        qb.push(" LIMIT 1");
        self.with_connection(|conn| Ok(qb.query_map(conn, R::from_row)?.into_iter().next()))
    }

    /// Every matching record, newest first.
    pub fn find_many<R: Record>(&self, filter: &Filter) -> Result<Vec<R>> {
        let mut qb = select::<R>();
        filter.apply(&mut qb);
        qb.push(" ORDER BY created_at DESC, id DESC");
        self.with_connection(|conn| Ok(qb.query_map(conn, R::from_row)?))
    }

    pub fn exists(&self, collection: Collection, id: Id) -> Result<bool> {
        Ok(self.count(collection, &Filter::new().eq("id", id))? > 0)
    }

    pub fn count(&self, collection: Collection, filter: &Filter) -> Result<i64> {
        let mut qb = SqlBuilder::new(format!("SELECT COUNT(*) FROM {}", collection.table()));
        filter.apply(&mut qb);
        self.with_connection(|conn| Ok(qb.query_scalar(conn)?))
    }

    /// Applies `changes` and stamps `updated_at`. Returns whether a row
    /// matched.
    pub fn update_by_id(&self, collection: Collection, id: Id, changes: &Changes) -> Result<bool> {
        if changes.is_empty() {
            return self.exists(collection, id);
        }
        let mut qb = SqlBuilder::new(format!("UPDATE {} SET ", collection.table()));
        changes.apply(&mut qb);
        qb.push(", updated_at = ").push_bind(timestamp_text(&now()));
        Filter::new().eq("id", id).apply(&mut qb);
        self.with_connection(|conn| Ok(qb.execute(conn)? > 0))
    }

    /// Deletes one record; dependent rows go with it through the schema's
    /// cascades. Returns whether a row was removed.
    pub fn delete_by_id(&self, collection: Collection, id: Id) -> Result<bool> {
        let mut qb = SqlBuilder::new(format!("DELETE FROM {}", collection.table()));
        Filter::new().eq("id", id).apply(&mut qb);
        let removed = self.with_connection(|conn| Ok(qb.execute(conn)? > 0))?;
        if removed {
            tracing::debug!(collection = collection.table(), %id, "record deleted");
        }
        Ok(removed)
    }
}

fn select<R: Record>() -> SqlBuilder {
    SqlBuilder::new(format!(
        "SELECT {} FROM {}",
        R::COLUMNS,
        R::COLLECTION.table()
    ))
}

/// Current time at the precision the store persists.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339 text, so lexical order equals time order.
pub(crate) fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(column)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| {
            let index = row.as_ref().column_index(column).unwrap_or_default();
            rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(err))
        })
}

pub(crate) fn bool_value(flag: bool) -> Value {
    Value::Integer(i64::from(flag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MediaRef, NewUser, Tweet, User};

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.to_string(),
            email: format!("{name}@example.com"),
            display_name: name.to_uppercase(),
            avatar: MediaRef::new(format!("https://cdn/{name}.png"), format!("av-{name}")),
            cover_image: None,
            password_hash: "hash".to_string(),
        }
    }

    #[test]
    fn open_creates_schema_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vidnest.db");

        let store = Store::open(&path).expect("should open");
        let user = store.insert_user(&new_user("alice")).unwrap();
        drop(store);

        let store = Store::open(&path).expect("should reopen");
        let loaded: User = store.get(user.id).unwrap();
        assert_eq!(loaded.username, "alice");
        assert_eq!(loaded.created_at, user.created_at);
    }

    #[test]
    fn find_count_update_delete_by_filter() {
        let store = Store::open_in_memory().unwrap();
        let alice = store.insert_user(&new_user("alice")).unwrap();
        let bob = store.insert_user(&new_user("bob")).unwrap();
        store.insert_tweet(alice.id, "first").unwrap();
        let second = store.insert_tweet(alice.id, "second").unwrap();
        store.insert_tweet(bob.id, "elsewhere").unwrap();

        let by_alice = Filter::new().eq("owner_id", alice.id);
        assert_eq!(store.count(Collection::Tweets, &by_alice).unwrap(), 2);
        let tweets: Vec<Tweet> = store.find_many(&by_alice).unwrap();
        assert_eq!(tweets.len(), 2);
        assert!(tweets.iter().all(|tweet| tweet.owner == alice.id));

        let changes = Changes::new().set("content", "edited".to_string());
        assert!(store.update_by_id(Collection::Tweets, second.id, &changes).unwrap());
        let edited: Tweet = store.get(second.id).unwrap();
        assert_eq!(edited.content, "edited");
        assert!(edited.updated_at >= second.updated_at);

        assert!(store.delete_by_id(Collection::Tweets, second.id).unwrap());
        assert!(!store.delete_by_id(Collection::Tweets, second.id).unwrap());
        assert!(!store.exists(Collection::Tweets, second.id).unwrap());
        assert_eq!(store.count(Collection::Tweets, &by_alice).unwrap(), 1);
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = Store::open_in_memory().unwrap();
        let err = store.get::<User>(Id::new()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
        assert!(err.message().starts_with("user "));
    }
}
