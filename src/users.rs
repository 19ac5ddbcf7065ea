//! Accounts and channel pages.

use crate::error::{Error, Result};
use crate::identity::require_caller;
use crate::model::{Id, MediaRef, NewUser, Supersede, User, required};
use crate::pipeline::{ChannelProfile, Field, ListSpec, PageRequest, list_page};
use crate::store::{Changes, Collection, Filter, Store};

/// Validates and stores a new account. Username and email are stored
/// lowercased; either one already taken is `Conflict`.
pub fn register_user(store: &Store, new: NewUser) -> Result<User> {
    let username = required(&new.username, "username")?.to_lowercase();
    let email = normalize_email(&new.email)?;
    let display_name = required(&new.display_name, "display name")?;
    let password_hash = required(&new.password_hash, "password hash")?;
    new.avatar.validate("avatar")?;
    if let Some(cover) = &new.cover_image {
        cover.validate("cover image")?;
    }

    let taken = store.count(Collection::Users, &Filter::new().eq("username", username.clone()))?
        + store.count(Collection::Users, &Filter::new().eq("email", email.clone()))?;
    if taken > 0 {
        return Err(Error::conflict("user with this username or email already exists"));
    }

    store.insert_user(&NewUser {
        username,
        email,
        display_name,
        avatar: new.avatar,
        cover_image: new.cover_image,
        password_hash,
    })
}

pub fn get_user(store: &Store, id: Id) -> Result<User> {
    store.get(id)
}

pub fn find_by_username(store: &Store, username: &str) -> Result<User> {
    let username = required(username, "username")?.to_lowercase();
    store
        .find_one(&Filter::new().eq("username", username.clone()))?
        .ok_or_else(|| Error::not_found(format!("user {username} not found")))
}

pub fn update_account(store: &Store, caller: Id, display_name: &str, email: &str) -> Result<User> {
    require_caller(store, caller)?;
    let display_name = required(display_name, "display name")?;
    let email = normalize_email(email)?;

    let holder: Option<User> = store.find_one(&Filter::new().eq("email", email.clone()))?;
    if holder.is_some_and(|holder| holder.id != caller) {
        return Err(Error::conflict("email is already in use"));
    }

    store.update_by_id(
        Collection::Users,
        caller,
        &Changes::new()
            .set("display_name", display_name)
            .set("email", email),
    )?;
    store.get(caller)
}

/// Points the account at a new avatar. The previous asset is returned for
/// deletion when it differs.
pub fn update_avatar(store: &Store, caller: Id, avatar: MediaRef) -> Result<(User, Option<Supersede>)> {
    let user = require_caller(store, caller)?;
    avatar.validate("avatar")?;
    let supersede = Supersede::replaced(&user.avatar, &avatar);

    store.update_by_id(
        Collection::Users,
        caller,
        &Changes::new()
            .set("avatar_url", avatar.url)
            .set("avatar_provider_id", avatar.provider_id),
    )?;
    Ok((store.get(caller)?, supersede))
}

pub fn update_cover_image(
    store: &Store,
    caller: Id,
    cover: MediaRef,
) -> Result<(User, Option<Supersede>)> {
    let user = require_caller(store, caller)?;
    cover.validate("cover image")?;
    let supersede = user
        .cover_image
        .as_ref()
        .and_then(|old| Supersede::replaced(old, &cover));

    store.update_by_id(
        Collection::Users,
        caller,
        &Changes::new()
            .set("cover_url", cover.url)
            .set("cover_provider_id", cover.provider_id),
    )?;
    Ok((store.get(caller)?, supersede))
}

/// Public channel page. Unknown usernames are `NotFound`.
pub fn channel_profile(store: &Store, username: &str, viewer: Option<Id>) -> Result<ChannelProfile> {
    let username = required(username, "username")?.to_lowercase();
    let spec = ListSpec::new(PageRequest::default())
        .filter(Field::Username, username.clone())
        .viewer(viewer);
    list_page::<ChannelProfile>(store, &spec)?
        .items
        .into_iter()
        .next()
        .ok_or_else(|| Error::not_found(format!("channel {username} not found")))
}

fn normalize_email(email: &str) -> Result<String> {
    let email = required(email, "email")?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::invalid(format!("email {email} is malformed"))),
    }
}
