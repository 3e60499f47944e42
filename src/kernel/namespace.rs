//! PID-namespace bootstrap with a reaper bridge.
//!
//! `unshare(2)` does not accept CLONE_NEWPID, so isolation goes through
//! `clone(2)`: the caller's process stays behind as a reaper while the
//! child continues inside the new namespace as pid 1. The reaper layer is
//! load-bearing: when pid 1 of a namespace terminates the namespace dies
//! with it and cannot report status to whatever waits on the pre-namespace
//! process id, so the reaper is the bridge that forwards the exit code.

use crate::config::types::NamespaceFailure;
use nix::errno::Errno;
use nix::sched::{clone, CloneFlags};
use nix::sys::wait::{waitpid, WaitStatus};
use std::convert::Infallible;

const CHILD_STACK_SIZE: usize = 256 * 1024;

/// Exit status the reaper forwards when the child did not exit normally.
pub const REAPER_GENERIC_FAILURE: i32 = 1;

/// Exit status of a child that found itself outside a working namespace.
const ISOLATION_INEFFECTIVE: isize = 1;

/// True when the self-observed pid proves the namespace took effect.
///
/// Old kernels accept unknown clone flags instead of failing with EINVAL,
/// so a successful clone is not proof of isolation; only the child seeing
/// itself as pid 1 is.
fn namespace_took_effect(observed_pid: i32) -> bool {
    observed_pid == 1
}

/// Exit status the reaper should forward for a terminal wait status, or
/// `None` when the status is not terminal and the wait must continue.
fn reaper_exit_code(status: &WaitStatus) -> Option<i32> {
    match status {
        WaitStatus::Exited(_, code) => Some(*code),
        WaitStatus::Signaled(_, _, _) => Some(REAPER_GENERIC_FAILURE),
        _ => None,
    }
}

/// Move execution into an isolated pid namespace.
///
/// On success this never returns: the child runs `child_main` as pid 1 of
/// the new namespace and exits with its returned status, while the calling
/// process becomes a dedicated reaper that blocks until the child
/// terminates and then exits itself, forwarding the child's exit code for
/// normal exits and [`REAPER_GENERIC_FAILURE`] otherwise.
///
/// `child_main` only runs after the pid-1 self-check passes; a child that
/// observes any other pid reports failure through its exit status and does
/// not proceed. Only namespace-creation failure itself is returned, with
/// no child left running.
pub fn isolate_pid_namespace<F>(mut child_main: F) -> Result<Infallible, NamespaceFailure>
where
    F: FnMut() -> isize + 'static,
{
    let mut child_stack = vec![0u8; CHILD_STACK_SIZE];
    let child_cb: Box<dyn FnMut() -> isize> = Box::new(move || {
        let observed = nix::unistd::getpid().as_raw();
        if !namespace_took_effect(observed) {
            log::error!(
                "pid namespace creation was accepted but had no effect (observed pid {})",
                observed
            );
            return ISOLATION_INEFFECTIVE;
        }
        child_main()
    });

    let child = match unsafe {
        clone(
            child_cb,
            &mut child_stack,
            CloneFlags::CLONE_NEWPID,
            Some(libc::SIGCHLD),
        )
    } {
        Ok(pid) => pid,
        Err(e) => return Err(NamespaceFailure::Clone(e)),
    };

    log::debug!("pid namespace child {} started; staying behind to reap", child);

    // One blocking wait on the single direct child, then terminate.
    loop {
        match waitpid(child, None) {
            Ok(status) => {
                if let Some(code) = reaper_exit_code(&status) {
                    std::process::exit(code);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => {
                log::error!("waitpid on namespace child failed: {}", e);
                std::process::exit(REAPER_GENERIC_FAILURE);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    #[test]
    fn pid_one_proves_isolation() {
        assert!(namespace_took_effect(1));
    }

    #[test]
    fn legacy_kernel_pid_is_rejected() {
        // A pre-namespace kernel hands the child its ordinary pid.
        assert!(!namespace_took_effect(12345));
        assert!(!namespace_took_effect(2));
    }

    #[test]
    fn reaper_forwards_normal_exit_codes() {
        let status = WaitStatus::Exited(Pid::from_raw(100), 7);
        assert_eq!(reaper_exit_code(&status), Some(7));

        let status = WaitStatus::Exited(Pid::from_raw(100), 0);
        assert_eq!(reaper_exit_code(&status), Some(0));
    }

    #[test]
    fn reaper_maps_abnormal_termination_to_generic_failure() {
        let status = WaitStatus::Signaled(Pid::from_raw(100), Signal::SIGKILL, false);
        assert_eq!(reaper_exit_code(&status), Some(REAPER_GENERIC_FAILURE));
    }

    #[test]
    fn reaper_keeps_waiting_on_non_terminal_statuses() {
        let status = WaitStatus::Stopped(Pid::from_raw(100), Signal::SIGSTOP);
        assert_eq!(reaper_exit_code(&status), None);
    }
}
