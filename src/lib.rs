//! privbox: the privilege-separation core of a process sandbox.
//!
//! A small set of primitives that take a process holding elevated
//! identity/capabilities and irreversibly reduce it to a confined,
//! unprivileged, filesystem-jailed state, while a trusted sibling process
//! performs the one privileged operation (`chroot`) the confined process
//! itself must never be trusted to perform.
//!
//! # Architecture
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::capabilities`]: atomic capability-state installation
//! - [`kernel::credentials`]: irreversible descent to an unprivileged identity
//! - [`kernel::dumpable`]: the per-process dumpable flag (ptrace/core-dump gate)
//! - [`kernel::namespace`]: PID-namespace bootstrap with a reaper bridge
//!
//! ## Helper Service ([`helper`])
//! - [`helper::establish_chroot_helper`]: spawn the filesystem-sharing sibling
//! - [`helper::request_chroot`]: one-shot command/acknowledgment exchange
//!
//! ## Configuration ([`config`])
//! - [`config::layout`]: fixed session constants, built once and passed explicitly
//! - [`config::types`]: failure taxonomy, one error type per trust-boundary contract
//!
//! # Design Principles
//!
//! 1. **Ordering is the security model** - every privilege-drop step has a
//!    fixed position; a reordering is a sandbox escape, not a style choice
//! 2. **Kernel as truth** - isolation is verified from observable state
//!    (self-observed pid, dumpable flag), never assumed from a syscall's
//!    return alone
//! 3. **Fail-stop over fallback** - no retries, no rollback; a partial
//!    transition leaves the process unusable and the caller terminates it
//! 4. **Protocol shape over locks** - cooperating processes exchange at most
//!    one command and one acknowledgment over a private channel

pub mod config;
pub mod helper;
pub mod kernel;

pub use config::layout::SandboxLayout;
pub use config::types::{
    CapabilityFailure, ControlFailure, NamespaceFailure, PrivilegeFailure, ProtocolViolation,
    QueryFailure, SetupFailure,
};
pub use helper::{establish_chroot_helper, helper_pid, request_chroot};
pub use kernel::capabilities::{install_capabilities, CapabilityId};
pub use kernel::credentials::drop_privileges;
pub use kernel::dumpable::{clear_dumpable, get_dumpable};
pub use kernel::namespace::isolate_pid_namespace;
