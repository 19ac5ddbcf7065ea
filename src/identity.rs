//! Caller identity as handed over by the (external) authentication layer.

use crate::error::{Error, Result};
use crate::model::{Id, User};
use crate::store::Store;

/// Parses the authenticated caller id. Missing or malformed identities are
/// `Unauthorized`.
pub fn identify(raw: Option<&str>) -> Result<Id> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| Error::unauthorized("caller identity is required"))?;
    raw.parse()
        .map_err(|_| Error::unauthorized("caller identity is malformed"))
}

/// Like [`identify`] but absence means an anonymous viewer. A malformed
/// identity is still rejected.
pub fn identify_optional(raw: Option<&str>) -> Result<Option<Id>> {
    match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => identify(Some(raw)).map(Some),
        None => Ok(None),
    }
}

/// Loads the caller's user record. An identity that names no user is
/// `Unauthorized`, not `NotFound`.
pub fn require_caller(store: &Store, caller: Id) -> Result<User> {
    store
        .find_by_id(caller)?
        .ok_or_else(|| Error::unauthorized(format!("caller {caller} is not a known user")))
}

/// Mutations of owned records are reserved to their owner.
pub fn ensure_owner(caller: Id, owner: Id, what: &str) -> Result<()> {
    if caller != owner {
        return Err(Error::unauthorized(format!(
            "only the owner may modify this {what}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::seed_user;

    #[test]
    fn missing_or_malformed_identity_is_unauthorized() {
        assert_eq!(identify(None).unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(identify(Some("  ")).unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(
            identify(Some("user-1")).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
        let id = Id::new();
        assert_eq!(identify(Some(&id.to_string())).unwrap(), id);
    }

    #[test]
    fn optional_identity_allows_anonymous() {
        assert_eq!(identify_optional(None).unwrap(), None);
        assert_eq!(identify_optional(Some("")).unwrap(), None);
        assert!(identify_optional(Some("nope")).is_err());
    }

    #[test]
    fn unknown_caller_is_unauthorized() {
        let store = Store::open_in_memory().unwrap();
        let alice = seed_user(&store, "alice");
        assert_eq!(require_caller(&store, alice.id).unwrap().username, "alice");
        assert_eq!(
            require_caller(&store, Id::new()).unwrap_err().kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn only_owner_passes_ownership_check() {
        let owner = Id::new();
        assert!(ensure_owner(owner, owner, "video").is_ok());
        let err = ensure_owner(Id::new(), owner, "video").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert!(err.message().contains("video"));
    }
}
