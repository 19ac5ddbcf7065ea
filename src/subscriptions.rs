use crate::error::{Error, Result};
use crate::identity::require_caller;
use crate::model::{Id, Subscription};
use crate::pipeline::{ChannelCard, Field, ListParams, Page, list_page};
use crate::store::{Collection, Store};
use crate::toggle::{ToggleResult, toggle};

/// Subscribes the caller to `channel`, or unsubscribes if already
/// subscribed. Refusing self-subscription is left to the caller layer.
pub fn toggle_subscription(
    store: &Store,
    caller: Id,
    channel: Id,
) -> Result<ToggleResult<Subscription>> {
    require_caller(store, caller)?;
    require_channel(store, channel)?;
    toggle::<Subscription>(store, caller, channel)
}

/// Users subscribed to `channel`.
pub fn list_channel_subscribers(
    store: &Store,
    channel: Id,
    params: &ListParams,
) -> Result<Page<ChannelCard>> {
    require_channel(store, channel)?;
    list_page(store, &params.spec().filter(Field::SubscribersOf, channel))
}

/// Channels `subscriber` is subscribed to.
pub fn list_subscribed_channels(
    store: &Store,
    subscriber: Id,
    params: &ListParams,
) -> Result<Page<ChannelCard>> {
    require_channel(store, subscriber)?;
    list_page(store, &params.spec().filter(Field::SubscriptionsOf, subscriber))
}

fn require_channel(store: &Store, id: Id) -> Result<()> {
    if !store.exists(Collection::Users, id)? {
        return Err(Error::not_found(format!("channel {id} not found")));
    }
    Ok(())
}
