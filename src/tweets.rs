use crate::error::{Error, Result};
use crate::identity::{ensure_owner, require_caller};
use crate::model::{Id, Tweet, required};
use crate::pipeline::{Field, ListParams, Page, TweetCard, list_page};
use crate::store::{Changes, Collection, Store};

pub fn create_tweet(store: &Store, caller: Id, content: &str) -> Result<Tweet> {
    require_caller(store, caller)?;
    let content = required(content, "content")?;
    store.insert_tweet(caller, &content)
}

pub fn update_tweet(store: &Store, caller: Id, id: Id, content: &str) -> Result<Tweet> {
    let tweet: Tweet = store.get(id)?;
    ensure_owner(caller, tweet.owner, "tweet")?;
    let content = required(content, "content")?;
    if !store.update_by_id(Collection::Tweets, id, &Changes::new().set("content", content))? {
        return Err(Error::not_found(format!("tweet {id} not found")));
    }
    store.get(id)
}

/// Removes the tweet together with its comments and likes.
pub fn delete_tweet(store: &Store, caller: Id, id: Id) -> Result<()> {
    let tweet: Tweet = store.get(id)?;
    ensure_owner(caller, tweet.owner, "tweet")?;
    if !store.delete_by_id(Collection::Tweets, id)? {
        return Err(Error::not_found(format!("tweet {id} not found")));
    }
    Ok(())
}

pub fn list_user_tweets(store: &Store, user: Id, params: &ListParams) -> Result<Page<TweetCard>> {
    if !store.exists(Collection::Users, user)? {
        return Err(Error::not_found(format!("user {user} not found")));
    }
    list_page(store, &params.spec().filter(Field::Owner, user))
}
