//! Irreversible descent to an unprivileged identity.
//!
//! CRITICAL: the step order is fixed and security-relevant. Dumpable is
//! cleared first, the group id changes before the user id, and capabilities
//! are dropped explicitly at the end. Reordering any step reopens a window
//! the sequence exists to close.

use crate::config::types::PrivilegeFailure;
use crate::kernel::capabilities::install_capabilities;
use crate::kernel::dumpable::clear_dumpable;
use nix::unistd::{setresgid, setresuid, Gid, Uid};

/// Permanently adopt `(uid, gid)` with empty capability sets.
///
/// Monotonic: after success no code path regains the prior identity or
/// capabilities. Any failing step aborts immediately with no rollback; a
/// rollback is not safe once a step may have partially applied, so the
/// caller must treat the process as failed-stop and terminate it.
pub fn drop_privileges(uid: libc::uid_t, gid: libc::gid_t) -> Result<(), PrivilegeFailure> {
    if uid == 0 || gid == 0 {
        return Err(PrivilegeFailure::PrivilegedTarget { uid, gid });
    }

    // Cleared explicitly, not left to setuid(): on capability-aware
    // filesystems privilege is not tied to uid 0, so the automatic
    // non-dumpable transition of a uid change cannot be relied upon.
    clear_dumpable()?;

    // Group id first: once the user id is lowered, the process may no
    // longer hold permission to change its group id.
    let target_gid = Gid::from_raw(gid);
    setresgid(target_gid, target_gid, target_gid)
        .map_err(|source| PrivilegeFailure::GroupChange { gid, source })?;

    let target_uid = Uid::from_raw(uid);
    setresuid(target_uid, target_uid, target_uid)
        .map_err(|source| PrivilegeFailure::UserChange { uid, source })?;

    // Explicit drop: the no-capabilities-after-setuid convention does not
    // hold when this state is reached through a non-setuid privilege path.
    install_capabilities(&[])?;

    log::info!("descended to uid={} gid={} with empty capability sets", uid, gid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descent_rejects_root_uid_before_any_syscall() {
        let result = drop_privileges(0, 1000);
        assert!(matches!(
            result,
            Err(PrivilegeFailure::PrivilegedTarget { uid: 0, gid: 1000 })
        ));
    }

    #[test]
    fn descent_rejects_root_gid_before_any_syscall() {
        let result = drop_privileges(1000, 0);
        assert!(matches!(
            result,
            Err(PrivilegeFailure::PrivilegedTarget { uid: 1000, gid: 0 })
        ));
    }
}
