//! Comments on videos and tweets, and replies to other comments.

use crate::error::{Error, Result};
use crate::identity::{ensure_owner, require_caller};
use crate::model::{Comment, CommentParent, Id, required};
use crate::pipeline::{CommentCard, Field, ListParams, Page, list_page};
use crate::resolver::{ContentRef, resolve_comment_parent};
use crate::store::{Changes, Collection, Store};

/// Stores a comment under the single parent named by `parent`.
pub fn create_comment(
    store: &Store,
    caller: Id,
    parent: &ContentRef,
    content: &str,
) -> Result<Comment> {
    require_caller(store, caller)?;
    let content = required(content, "content")?;
    let parent = resolve_comment_parent(store, parent, Some(caller))?;
    let comment = store.insert_comment(caller, parent, &content)?;
    tracing::debug!(comment = %comment.id, parent = ?parent, "comment created");
    Ok(comment)
}

pub fn update_comment(store: &Store, caller: Id, id: Id, content: &str) -> Result<Comment> {
    let comment: Comment = store.get(id)?;
    ensure_owner(caller, comment.owner, "comment")?;
    let content = required(content, "content")?;
    if !store.update_by_id(Collection::Comments, id, &Changes::new().set("content", content))? {
        return Err(Error::not_found(format!("comment {id} not found")));
    }
    store.get(id)
}

/// Deletes the comment; its replies and likes are removed with it.
pub fn delete_comment(store: &Store, caller: Id, id: Id) -> Result<()> {
    let comment: Comment = store.get(id)?;
    ensure_owner(caller, comment.owner, "comment")?;
    if !store.delete_by_id(Collection::Comments, id)? {
        return Err(Error::not_found(format!("comment {id} not found")));
    }
    Ok(())
}

/// Thread listing under a video, a tweet, or a comment (its replies). The
/// parent must exist and be visible to the viewer.
pub fn list_comments(
    store: &Store,
    parent: &ContentRef,
    params: &ListParams,
) -> Result<Page<CommentCard>> {
    let (field, id) = match resolve_comment_parent(store, parent, params.viewer)? {
        CommentParent::Video(id) => (Field::Video, id),
        CommentParent::Tweet(id) => (Field::Tweet, id),
        CommentParent::Comment(id) => (Field::ParentComment, id),
    };
    list_page(store, &params.spec().filter(field, id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{new_video, seed_user, seed_video};

    #[test]
    fn parent_must_be_exactly_one() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let video = seed_video(&store, alice.id, "Clip", "desc");
        let tweet = store.insert_tweet(alice.id, "hi").unwrap();

        let none = ContentRef::default();
        assert_eq!(
            create_comment(&store, alice.id, &none, "x").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );
        let two = ContentRef {
            video_id: Some(video.id.to_string()),
            tweet_id: Some(tweet.id.to_string()),
            comment_id: None,
        };
        assert_eq!(
            create_comment(&store, alice.id, &two, "x").unwrap_err().kind(),
            ErrorKind::InvalidInput
        );

        let stored = create_comment(&store, alice.id, &ContentRef::video(video.id), "nice").unwrap();
        assert_eq!(stored.video(), Some(video.id));
        assert_eq!(stored.tweet(), None);
        assert_eq!(stored.comment(), None);
    }

    #[test]
    fn reply_requires_existing_comment() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let tweet = store.insert_tweet(alice.id, "hi").unwrap();

        assert_eq!(
            create_comment(&store, alice.id, &ContentRef::comment("c1"), "reply")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );

        let c1 = create_comment(&store, alice.id, &ContentRef::tweet(tweet.id), "root").unwrap();
        let reply = create_comment(&store, alice.id, &ContentRef::comment(c1.id), "reply").unwrap();
        assert_eq!(reply.parent, CommentParent::Comment(c1.id));
        assert_eq!(reply.video(), None);
        assert_eq!(reply.tweet(), None);

        let replies = list_comments(&store, &ContentRef::comment(c1.id), &ListParams::default()).unwrap();
        assert_eq!(replies.total_items, 1);
        assert_eq!(replies.items[0].id, reply.id);
    }

    #[test]
    fn owner_only_edits_and_cascading_delete() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let video = seed_video(&store, alice.id, "Clip", "desc");
        let root = create_comment(&store, alice.id, &ContentRef::video(video.id), "root").unwrap();
        let reply = create_comment(&store, bob.id, &ContentRef::comment(root.id), "reply").unwrap();

        assert_eq!(
            update_comment(&store, bob.id, root.id, "mine now").unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            update_comment(&store, alice.id, root.id, "edited").unwrap().content,
            "edited"
        );
        assert_eq!(
            delete_comment(&store, bob.id, root.id).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );

        delete_comment(&store, alice.id, root.id).unwrap();
        assert!(!store.exists(Collection::Comments, reply.id).unwrap());
    }

    #[test]
    fn listing_unknown_parent_is_not_found_and_empty_is_ok() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let video = seed_video(&store, alice.id, "Clip", "desc");

        let empty = list_comments(&store, &ContentRef::video(video.id), &ListParams::default()).unwrap();
        assert_eq!(empty.items_on_page, 0);
        assert_eq!(empty.total_items, 0);

        assert_eq!(
            list_comments(&store, &ContentRef::video(Id::new()), &ListParams::default())
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn drafts_accept_comments_from_their_owner_only() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let draft = store.insert_video(alice.id, &new_video("Draft", "wip")).unwrap();
        let parent = ContentRef::video(draft.id);

        assert_eq!(
            create_comment(&store, bob.id, &parent, "first!").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        let as_bob = ListParams::default().with_viewer(Some(bob.id));
        assert_eq!(
            list_comments(&store, &parent, &as_bob).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            list_comments(&store, &parent, &ListParams::default())
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );

        create_comment(&store, alice.id, &parent, "note to self").unwrap();
        let as_alice = ListParams::default().with_viewer(Some(alice.id));
        assert_eq!(list_comments(&store, &parent, &as_alice).unwrap().total_items, 1);
    }
}
