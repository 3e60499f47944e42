//! Fixed constants for one sandbox session.
//!
//! Safe-directory candidates, wire bytes, and environment names live in a
//! single immutable [`SandboxLayout`] built once at startup and passed
//! explicitly to every component that needs it. Nothing in this crate
//! reaches for ambient globals.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Session-wide layout: where the jail lives, how the helper is addressed,
/// and which bytes flow over the control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxLayout {
    /// Chroot jail candidates, probed in priority order at setup time.
    /// The first existing directory wins; none is ever created.
    pub safe_dir_candidates: Vec<PathBuf>,
    /// Environment name carrying the helper's process id (decimal string).
    pub helper_pid_env: String,
    /// Environment name carrying the retained channel descriptor number
    /// (decimal string).
    pub channel_fd_env: String,
    /// The one command byte the helper will act on.
    pub chroot_command: u8,
    /// The one acknowledgment byte the helper sends after the jail is in
    /// place.
    pub chroot_ack: u8,
}

impl SandboxLayout {
    /// First candidate that exists and is a directory.
    pub fn resolve_safe_directory(&self) -> Option<&Path> {
        self.safe_dir_candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|path| is_existing_directory(path))
    }
}

impl Default for SandboxLayout {
    fn default() -> Self {
        Self {
            // A kernel-provided directory that is never writable. The
            // second candidate covers kernels predating /proc/self/fdinfo.
            safe_dir_candidates: vec![
                PathBuf::from("/proc/self/fdinfo"),
                PathBuf::from("/proc/self/fd"),
            ],
            helper_pid_env: "SANDBOX_HELPER_PID".to_string(),
            channel_fd_env: "SANDBOX_CHROOT_FD".to_string(),
            chroot_command: b'C',
            chroot_ack: b'O',
        }
    }
}

fn is_existing_directory(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn default_layout_has_two_candidates_in_priority_order() {
        let layout = SandboxLayout::default();
        assert_eq!(layout.safe_dir_candidates.len(), 2);
        assert_ne!(layout.chroot_command, layout.chroot_ack);
    }

    #[test]
    fn default_layout_resolves_on_a_modern_kernel() {
        let layout = SandboxLayout::default();
        let resolved = layout
            .resolve_safe_directory()
            .expect("/proc/self/fd should exist");
        assert!(resolved.starts_with("/proc/self"));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let layout = SandboxLayout {
            safe_dir_candidates: vec![
                PathBuf::from("/nonexistent/privbox-test"),
                env::temp_dir(),
            ],
            ..SandboxLayout::default()
        };
        assert_eq!(layout.resolve_safe_directory(), Some(env::temp_dir().as_path()));
    }

    #[test]
    fn resolution_respects_priority_when_both_exist() {
        let layout = SandboxLayout {
            safe_dir_candidates: vec![env::temp_dir(), PathBuf::from("/")],
            ..SandboxLayout::default()
        };
        assert_eq!(layout.resolve_safe_directory(), Some(env::temp_dir().as_path()));
    }

    #[test]
    fn missing_candidates_resolve_to_nothing() {
        let layout = SandboxLayout {
            safe_dir_candidates: vec![
                PathBuf::from("/nonexistent/privbox-a"),
                PathBuf::from("/nonexistent/privbox-b"),
            ],
            ..SandboxLayout::default()
        };
        assert!(layout.resolve_safe_directory().is_none());
    }

    #[test]
    fn a_plain_file_is_not_a_safe_directory() {
        let file = env::temp_dir().join("privbox-layout-file-probe");
        fs::write(&file, b"x").expect("write probe file");

        let layout = SandboxLayout {
            safe_dir_candidates: vec![file.clone()],
            ..SandboxLayout::default()
        };
        assert!(layout.resolve_safe_directory().is_none());

        let _ = fs::remove_file(&file);
    }
}
