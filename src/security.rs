//! Process-level guards for the vidnest binaries.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Fails fast when a binary is started as root. The backend only needs
/// write access to its database directory.
pub fn ensure_not_root(process: &str) -> Result<()> {
    refuse_uid(Uid::effective(), process)
}

fn refuse_uid(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!("{process} must not be run as root; start it under an unprivileged account");
    }
    tracing::debug!(process, uid = uid.as_raw(), "running unprivileged");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_uid_is_refused() {
        let err = refuse_uid(Uid::from_raw(0), "vidnest-backend").unwrap_err();
        assert!(err.to_string().contains("vidnest-backend"));
    }

    #[test]
    fn service_uid_is_accepted() {
        assert!(refuse_uid(Uid::from_raw(1000), "vidnest-backend").is_ok());
    }
}
