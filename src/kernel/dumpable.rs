//! The per-process dumpable flag.
//!
//! A non-dumpable process cannot be ptrace-attached by unprivileged peers
//! and produces no core dump, so sensitive memory cannot leak across the
//! privilege-drop boundary. The flag must be cleared before or during
//! descent, never after.

use crate::config::types::{ControlFailure, QueryFailure};

/// Whether the process is currently dumpable.
pub fn get_dumpable() -> Result<bool, QueryFailure> {
    // SAFETY: PR_GET_DUMPABLE reads a per-process flag and takes no
    // pointer arguments.
    let rc = unsafe { libc::prctl(libc::PR_GET_DUMPABLE, 0, 0, 0, 0) };
    if rc < 0 {
        return Err(QueryFailure(std::io::Error::last_os_error()));
    }
    // The kernel may report 2 (dumpable by root only); anything nonzero
    // still permits some attachment and is reported as dumpable.
    Ok(rc != 0)
}

/// Make the process non-dumpable. Irreversible from this crate's surface.
pub fn clear_dumpable() -> Result<(), ControlFailure> {
    // SAFETY: PR_SET_DUMPABLE with value 0 writes a per-process flag and
    // takes no pointer arguments.
    let rc = unsafe { libc::prctl(libc::PR_SET_DUMPABLE, 0, 0, 0, 0) };
    if rc != 0 {
        return Err(ControlFailure(std::io::Error::last_os_error()));
    }
    log::debug!("process is now non-dumpable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dumpable_flag_is_readable() {
        assert!(get_dumpable().is_ok());
    }

    #[test]
    fn cleared_flag_reads_back_non_dumpable() {
        clear_dumpable().expect("PR_SET_DUMPABLE should not fail");
        assert!(!get_dumpable().expect("PR_GET_DUMPABLE should not fail"));
    }
}
