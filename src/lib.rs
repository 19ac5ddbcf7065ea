#![forbid(unsafe_code)]

//! Core of the vidnest content backend.
//!
//! Videos, tweets, comments and replies are linked through toggleable likes
//! and channel subscriptions. The crate owns the relationship engine: the
//! [`store`] adapter over SQLite, the [`toggle`] engine for social edges,
//! the [`resolver`] for polymorphic references and the [`pipeline`] that
//! turns list requests into scored, paginated, aggregated pages. The
//! per-entity modules (`users`, `videos`, ...) compose those into the
//! operations the HTTP binary exposes.

pub mod comments;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod identity;
pub mod likes;
pub mod model;
pub mod pipeline;
pub mod playlists;
pub mod resolver;
pub mod security;
pub mod store;
pub mod subscriptions;
pub mod toggle;
pub mod tweets;
pub mod users;
pub mod videos;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{Error, ErrorKind, Result};
