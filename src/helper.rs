//! Chroot helper service.
//!
//! While the caller still holds privilege, a sibling process is spawned
//! sharing the caller's filesystem namespace. The sharing is deliberate:
//! the `chroot` the helper later performs must confine the same filesystem
//! view the sandboxed process keeps using. The helper collapses its open-
//! file limit to zero before it reads anything, accepts exactly one command
//! byte over a private socketpair, jails the shared view, acknowledges with
//! one byte, and exits. It never loops and never serves a second command.
//!
//! The channel is exported to later stages through two environment values:
//! the helper's process id and the retained endpoint's descriptor number,
//! both as decimal strings. The now-unprivileged process finds the channel
//! there when it is ready to be jailed.

use crate::config::layout::SandboxLayout;
use crate::config::types::{ProtocolViolation, SetupFailure};
use nix::sched::{clone, CloneFlags};
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::socket::{socketpair, AddressFamily, SockFlag, SockType};
use nix::unistd::{chdir, chroot, close, read, write};
use std::env;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

const HELPER_STACK_SIZE: usize = 256 * 1024;

const EXIT_OK: isize = 0;
const EXIT_FAILED: isize = 1;

/// Outcome of the helper's single blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandOutcome {
    /// Peer endpoint closed without sending anything. Not an error: the
    /// process to be jailed simply exited first.
    PeerClosed,
    /// The one defined command byte arrived.
    ChrootRequested,
    /// A read error or an undefined byte.
    Violation,
}

/// Spawn the chroot helper and export its location.
///
/// On success one live helper is left blocking on the channel, and the
/// helper pid plus the retained descriptor number are exported into the
/// environment under the names carried by `layout`. Setup failures return
/// without tearing down a helper that may already be running; an orphaned
/// helper self-terminates once its channel peer disappears, so no cleanup
/// handshake exists.
pub fn establish_chroot_helper(layout: &SandboxLayout) -> Result<(), SetupFailure> {
    let safe_dir: PathBuf = layout
        .resolve_safe_directory()
        .ok_or(SetupFailure::NoSafeDirectory)?
        .to_path_buf();

    for name in [&layout.helper_pid_env, &layout.channel_fd_env] {
        if !exportable_env_name(name) {
            return Err(SetupFailure::Environment(name.clone()));
        }
    }

    let (helper_end, spawner_end) = socketpair(
        AddressFamily::Unix,
        SockType::Stream,
        None,
        SockFlag::empty(),
    )
    .map_err(SetupFailure::Channel)?;

    let command = layout.chroot_command;
    let ack = layout.chroot_ack;
    let mut helper_stack = vec![0u8; HELPER_STACK_SIZE];
    let helper_cb: Box<dyn FnMut() -> isize> =
        Box::new(move || helper_main(helper_end, spawner_end, &safe_dir, command, ack));

    // CLONE_FS only: the helper shares the filesystem view but keeps its
    // own copy of everything else.
    let helper = match unsafe {
        clone(
            helper_cb,
            &mut helper_stack,
            CloneFlags::CLONE_FS,
            Some(libc::SIGCHLD),
        )
    } {
        Ok(pid) => pid,
        Err(e) => return Err(SetupFailure::Spawn(e)),
    };

    env::set_var(&layout.helper_pid_env, helper.as_raw().to_string());
    env::set_var(&layout.channel_fd_env, spawner_end.to_string());

    close(helper_end).map_err(SetupFailure::EndpointClose)?;

    log::info!(
        "chroot helper {} ready; command endpoint exported as fd {}",
        helper,
        spawner_end
    );
    Ok(())
}

/// Send the chroot command and block for the acknowledgment.
///
/// A successful return is synchronous proof that the shared filesystem
/// view is jailed: the helper makes the acknowledgment byte observable
/// only after `chroot` and `chdir` have taken effect.
pub fn request_chroot(layout: &SandboxLayout) -> Result<(), ProtocolViolation> {
    let channel = exported_channel_fd(layout)?;

    write(channel, &[layout.chroot_command]).map_err(ProtocolViolation::SendFailed)?;

    let mut buf = [0u8; 1];
    match read(channel, &mut buf) {
        Ok(0) => Err(ProtocolViolation::AckMissing),
        Ok(_) if buf[0] == layout.chroot_ack => {
            log::info!("filesystem view jailed by helper");
            Ok(())
        }
        Ok(_) => Err(ProtocolViolation::UnexpectedAck(buf[0])),
        Err(e) => Err(ProtocolViolation::RecvFailed(e)),
    }
}

/// The exported helper process id, if a helper was established.
pub fn helper_pid(layout: &SandboxLayout) -> Option<u32> {
    env::var(&layout.helper_pid_env).ok()?.parse().ok()
}

/// Helper body. Runs in the cloned sibling; every return value becomes the
/// helper's exit status.
fn helper_main(
    channel: RawFd,
    spawner_end: RawFd,
    safe_dir: &Path,
    command: u8,
    ack: u8,
) -> isize {
    // The filesystem view is shared with an untrusted process. The
    // descriptor limit collapses to zero strictly before any channel read;
    // from here on this process cannot open anything.
    if let Err(e) = setrlimit(Resource::RLIMIT_NOFILE, 0, 0) {
        log::error!("helper could not clamp RLIMIT_NOFILE: {}", e);
        return EXIT_FAILED;
    }

    // Drop the inherited copy of the spawner's endpoint; the later EOF
    // signal depends on the spawner side being the only holder.
    if let Err(e) = close(spawner_end) {
        log::error!("helper could not close spawner endpoint: {}", e);
        return EXIT_FAILED;
    }

    match await_command(channel, command) {
        CommandOutcome::PeerClosed => EXIT_OK,
        CommandOutcome::Violation => EXIT_FAILED,
        CommandOutcome::ChrootRequested => confine_and_acknowledge(channel, safe_dir, ack),
    }
}

/// One blocking read with no timeout; cancellation is channel closure.
fn await_command(channel: RawFd, command: u8) -> CommandOutcome {
    let mut buf = [0u8; 1];
    match read(channel, &mut buf) {
        Ok(0) => CommandOutcome::PeerClosed,
        Ok(_) if buf[0] == command => CommandOutcome::ChrootRequested,
        Ok(_) => {
            log::error!("helper received undefined command byte 0x{:02x}", buf[0]);
            CommandOutcome::Violation
        }
        Err(e) => {
            log::error!("helper read failed: {}", e);
            CommandOutcome::Violation
        }
    }
}

fn confine_and_acknowledge(channel: RawFd, safe_dir: &Path, ack: u8) -> isize {
    if let Err(e) = chroot(safe_dir) {
        log::error!("helper chroot to {} failed: {}", safe_dir.display(), e);
        return EXIT_FAILED;
    }
    if let Err(e) = chdir("/") {
        log::error!("helper chdir into jail failed: {}", e);
        return EXIT_FAILED;
    }

    // The jail is in place before the byte below can become observable.
    // A short or failed write is helper failure; whether the byte is ever
    // consumed by the peer is not.
    match write(channel, &[ack]) {
        Ok(1) => EXIT_OK,
        Ok(_) => EXIT_FAILED,
        Err(e) => {
            log::error!("helper could not write acknowledgment: {}", e);
            EXIT_FAILED
        }
    }
}

fn exported_channel_fd(layout: &SandboxLayout) -> Result<RawFd, ProtocolViolation> {
    let raw = env::var(&layout.channel_fd_env)
        .map_err(|_| ProtocolViolation::ChannelUnavailable(layout.channel_fd_env.clone()))?;
    raw.parse::<RawFd>().map_err(|_| {
        ProtocolViolation::ChannelUnavailable(format!("{}={}", layout.channel_fd_env, raw))
    })
}

fn exportable_env_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('=') && !name.contains('\0')
}
