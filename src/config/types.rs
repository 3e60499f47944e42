//! Failure taxonomy for the privilege-separation core.
//!
//! One error type per trust-boundary contract. Every component reports a
//! failure exactly once to its immediate caller; nothing here is retried.
//! Components that own process lifetime (the chroot helper, the namespace
//! child and reaper) terminate on failure instead of returning, so their
//! error surface is an exit status rather than a variant below.

use std::io;
use thiserror::Error;

/// Resource-acquisition failures while standing up the chroot helper.
///
/// Setup never tears down a helper that may already be running: an orphaned
/// helper self-terminates once its channel peer disappears.
#[derive(Error, Debug)]
pub enum SetupFailure {
    /// Neither safe-directory candidate exists as a directory. The jail
    /// target is verified, never fabricated.
    #[error("no safe chroot directory exists on this kernel")]
    NoSafeDirectory,

    #[error("failed to create control channel: {0}")]
    Channel(nix::errno::Errno),

    #[error("failed to spawn chroot helper: {0}")]
    Spawn(nix::errno::Errno),

    #[error("failed to release helper-side channel endpoint: {0}")]
    EndpointClose(nix::errno::Errno),

    #[error("environment name {0:?} cannot be exported")]
    Environment(String),
}

/// Channel misbehavior observed by the command issuer.
///
/// The helper side never reports these: a helper that sees a bad exchange
/// exits failed without acknowledging.
#[derive(Error, Debug)]
pub enum ProtocolViolation {
    #[error("chroot channel is not exported in the environment ({0})")]
    ChannelUnavailable(String),

    #[error("failed to send chroot command: {0}")]
    SendFailed(nix::errno::Errno),

    /// The channel reached end-of-stream before any acknowledgment byte.
    /// The filesystem view must be assumed unjailed.
    #[error("channel closed before the chroot acknowledgment arrived")]
    AckMissing,

    #[error("failed to read chroot acknowledgment: {0}")]
    RecvFailed(nix::errno::Errno),

    #[error("unexpected acknowledgment byte 0x{0:02x}")]
    UnexpectedAck(u8),
}

/// A step of the identity/capability descent failed.
///
/// There is no rollback: once any step may have partially applied, the
/// caller must treat the process as failed-stop and terminate it rather
/// than continue with ambiguous privilege.
#[derive(Error, Debug)]
pub enum PrivilegeFailure {
    /// The caller contract supplies already-resolved, non-privileged ids;
    /// a privileged target is rejected before any syscall runs.
    #[error("refusing privileged credential target (uid={uid}, gid={gid})")]
    PrivilegedTarget { uid: libc::uid_t, gid: libc::gid_t },

    #[error("failed to clear dumpable flag: {0}")]
    Dumpable(#[from] ControlFailure),

    #[error("setresgid to {gid} failed: {source}")]
    GroupChange {
        gid: libc::gid_t,
        source: nix::errno::Errno,
    },

    #[error("setresuid to {uid} failed: {source}")]
    UserChange {
        uid: libc::uid_t,
        source: nix::errno::Errno,
    },

    #[error("capability drop after identity change failed: {0}")]
    CapabilityDrop(#[from] CapabilityFailure),
}

/// PID-namespace creation failed before any child existed.
///
/// A namespace that was created but did not take effect is detected inside
/// the child (which cannot return) and surfaces as the reaper's exit
/// status instead.
#[derive(Error, Debug)]
pub enum NamespaceFailure {
    #[error("failed to clone into a new pid namespace: {0}")]
    Clone(nix::errno::Errno),
}

/// Capability-state construction or installation failed.
///
/// All-or-nothing: after this error the process's capability state is
/// unknown and must be assumed most-restrictive.
#[derive(Error, Debug)]
pub enum CapabilityFailure {
    #[error("capset(2) rejected the prepared capability state: {0}")]
    Install(io::Error),
}

/// Reading the dumpable flag failed.
#[derive(Error, Debug)]
#[error("PR_GET_DUMPABLE failed: {0}")]
pub struct QueryFailure(pub io::Error);

/// Clearing the dumpable flag failed.
#[derive(Error, Debug)]
#[error("PR_SET_DUMPABLE failed: {0}")]
pub struct ControlFailure(pub io::Error);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_safe_directory_names_the_condition() {
        let err = SetupFailure::NoSafeDirectory;
        assert!(err.to_string().contains("safe chroot directory"));
    }

    #[test]
    fn privileged_target_reports_both_ids() {
        let err = PrivilegeFailure::PrivilegedTarget { uid: 0, gid: 0 };
        let text = err.to_string();
        assert!(text.contains("uid=0"));
        assert!(text.contains("gid=0"));
    }

    #[test]
    fn unexpected_ack_is_shown_in_hex() {
        let err = ProtocolViolation::UnexpectedAck(0x41);
        assert!(err.to_string().contains("0x41"));
    }

    #[test]
    fn capability_failure_nests_into_privilege_failure() {
        let inner = CapabilityFailure::Install(io::Error::from_raw_os_error(libc::EPERM));
        let err = PrivilegeFailure::from(inner);
        assert!(matches!(err, PrivilegeFailure::CapabilityDrop(_)));
    }
}
