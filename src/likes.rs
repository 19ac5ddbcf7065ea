use crate::error::Result;
use crate::identity::require_caller;
use crate::model::{Id, Like};
use crate::pipeline::{Field, ListParams, Page, VideoCard, list_page};
use crate::resolver::{ContentRef, resolve_like_target};
use crate::store::Store;
use crate::toggle::{ToggleResult, toggle};

/// Likes the referenced video, comment or tweet, or removes the like if
/// the caller already has one.
pub fn toggle_like(store: &Store, caller: Id, target: &ContentRef) -> Result<ToggleResult<Like>> {
    require_caller(store, caller)?;
    let target = resolve_like_target(store, target, Some(caller))?;
    toggle::<Like>(store, caller, target)
}

/// Published videos the caller has liked.
pub fn list_liked_videos(store: &Store, caller: Id, params: &ListParams) -> Result<Page<VideoCard>> {
    require_caller(store, caller)?;
    let spec = params
        .spec()
        .viewer(Some(caller))
        .filter(Field::LikedBy, caller)
        .filter(Field::Published, true);
    list_page(store, &spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{new_video, seed_user, seed_video};
    use crate::toggle::ToggleState;

    #[test]
    fn toggle_like_round_trip() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let video = seed_video(&store, alice.id, "Clip", "desc");
        let target = ContentRef::video(video.id);

        assert_eq!(
            toggle_like(&store, alice.id, &target).unwrap().state,
            ToggleState::Created
        );
        let liked = list_liked_videos(&store, alice.id, &ListParams::default()).unwrap();
        assert_eq!(liked.total_items, 1);
        assert!(liked.items[0].is_liked);

        assert_eq!(
            toggle_like(&store, alice.id, &target).unwrap().state,
            ToggleState::Removed
        );
        let liked = list_liked_videos(&store, alice.id, &ListParams::default()).unwrap();
        assert_eq!(liked.total_items, 0);
    }

    #[test]
    fn toggle_like_validates_caller_and_target() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        assert_eq!(
            toggle_like(&store, Id::new(), &ContentRef::tweet(Id::new()))
                .unwrap_err()
                .kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            toggle_like(&store, alice.id, &ContentRef::tweet(Id::new()))
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            toggle_like(&store, alice.id, &ContentRef::default())
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidInput
        );
    }

    #[test]
    fn drafts_cannot_be_liked_by_other_users() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        let bob = seed_user(&store, "bob");
        let draft = store.insert_video(alice.id, &new_video("Draft", "wip")).unwrap();
        let target = ContentRef::video(draft.id);

        assert_eq!(
            toggle_like(&store, bob.id, &target).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            toggle_like(&store, alice.id, &target).unwrap().state,
            ToggleState::Created
        );
    }
}
