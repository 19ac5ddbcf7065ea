//! Idempotent toggling of the social edges (likes and subscriptions).
//!
//! A toggle observes the edge for `(subject, target)` and then issues one
//! conditional write: insert-if-absent when nothing was seen, delete of the
//! observed row when something was. Either write can discover that another
//! writer changed the edge in between, in which case the toggle fails with
//! `Conflict` and leaves the retry decision to the caller.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{Id, Like, LikeTarget, Subscription};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
    Created,
    Removed,
}

/// Outcome of a toggle. For `Removed`, `record` is the edge that was deleted.
#[derive(Debug, Clone, Serialize)]
pub struct ToggleResult<E> {
    pub state: ToggleState,
    pub record: E,
}

/// A toggleable relation between a subject user and a target.
pub trait Edge: Sized {
    type Target: Copy + fmt::Debug;

    const KIND: &'static str;

    fn id(&self) -> Id;

    fn find(store: &Store, subject: Id, target: Self::Target) -> Result<Option<Self>>;

    /// `None` when the unique `(subject, target)` key was already taken.
    fn insert_if_absent(store: &Store, subject: Id, target: Self::Target) -> Result<Option<Self>>;

    /// `false` when the row was already gone.
    fn delete_if_present(store: &Store, id: Id) -> Result<bool>;
}

impl Edge for Like {
    type Target = LikeTarget;

    const KIND: &'static str = "like";

    fn id(&self) -> Id {
        self.id
    }

    fn find(store: &Store, subject: Id, target: LikeTarget) -> Result<Option<Self>> {
        store.find_like(subject, target)
    }

    fn insert_if_absent(store: &Store, subject: Id, target: LikeTarget) -> Result<Option<Self>> {
        store.insert_like_if_absent(subject, target)
    }

    fn delete_if_present(store: &Store, id: Id) -> Result<bool> {
        store.delete_like_if_present(id)
    }
}

impl Edge for Subscription {
    type Target = Id;

    const KIND: &'static str = "subscription";

    fn id(&self) -> Id {
        self.id
    }

    fn find(store: &Store, subject: Id, channel: Id) -> Result<Option<Self>> {
        store.find_subscription(subject, channel)
    }

    fn insert_if_absent(store: &Store, subject: Id, channel: Id) -> Result<Option<Self>> {
        store.insert_subscription_if_absent(subject, channel)
    }

    fn delete_if_present(store: &Store, id: Id) -> Result<bool> {
        store.delete_subscription_if_present(id)
    }
}

/// Edge state seen by the first phase of a toggle.
#[derive(Debug, Clone)]
pub enum Observed<E> {
    Absent,
    Present(E),
}

pub fn observe<E: Edge>(store: &Store, subject: Id, target: E::Target) -> Result<Observed<E>> {
    Ok(match E::find(store, subject, target)? {
        Some(edge) => Observed::Present(edge),
        None => Observed::Absent,
    })
}

/// Second phase: the conditional write implied by `observed`.
pub fn apply<E: Edge>(
    store: &Store,
    subject: Id,
    target: E::Target,
    observed: Observed<E>,
) -> Result<ToggleResult<E>> {
    match observed {
        Observed::Absent => match E::insert_if_absent(store, subject, target)? {
            Some(record) => {
                tracing::debug!(kind = E::KIND, %subject, ?target, state = "created", "edge toggled");
                Ok(ToggleResult {
                    state: ToggleState::Created,
                    record,
                })
            }
            None => Err(lost_race::<E>(subject, target, "created")),
        },
        Observed::Present(record) => {
            if E::delete_if_present(store, record.id())? {
                tracing::debug!(kind = E::KIND, %subject, ?target, state = "removed", "edge toggled");
                Ok(ToggleResult {
                    state: ToggleState::Removed,
                    record,
                })
            } else {
                Err(lost_race::<E>(subject, target, "removed"))
            }
        }
    }
}

pub fn toggle<E: Edge>(store: &Store, subject: Id, target: E::Target) -> Result<ToggleResult<E>> {
    let observed = observe::<E>(store, subject, target)?;
    apply(store, subject, target, observed)
}

fn lost_race<E: Edge>(subject: Id, target: E::Target, by_other: &str) -> Error {
    tracing::info!(kind = E::KIND, %subject, ?target, "toggle lost a race");
    Error::conflict(format!(
        "{} was {by_other} concurrently; retry the toggle",
        E::KIND
    ))
}
