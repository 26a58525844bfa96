#![forbid(unsafe_code)]

//! Process-level safety checks performed at startup.

use anyhow::{Result, bail};
use nix::unistd::Uid;

/// Refuses to start when running as root. The server binds a plain TCP port
/// and never needs elevated privileges.
pub fn ensure_unprivileged(process: &str) -> Result<()> {
    ensure_unprivileged_uid(Uid::current(), process)
}

fn ensure_unprivileged_uid(uid: Uid, process: &str) -> Result<()> {
    if uid.is_root() {
        bail!("{process} refuses to run as root; start it under a regular service account");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regular_uid_is_accepted() {
        assert!(ensure_unprivileged_uid(Uid::from_raw(1000), "server").is_ok());
    }

    #[test]
    fn root_uid_is_rejected() {
        let err = ensure_unprivileged_uid(Uid::from_raw(0), "server").unwrap_err();
        assert!(err.to_string().contains("refuses to run as root"));
    }
}
