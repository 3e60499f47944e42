//! Capability-state management via the raw capset(2) interface.
//!
//! A capability state is installed atomically or not at all. The design
//! never supports asymmetric sets: whatever is retained appears identically
//! in the effective, inheritable, and permitted sets.

use crate::config::types::CapabilityFailure;

const LINUX_CAPABILITY_VERSION_3: u32 = 0x2008_0522;

/// Capability number newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CapabilityId(u32);

impl CapabilityId {
    /// Highest capability number the kernel interface can express here.
    pub const MAX_CAP: u32 = 40;

    pub fn new(cap: u32) -> Option<Self> {
        if cap <= Self::MAX_CAP {
            Some(Self(cap))
        } else {
            None
        }
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

#[repr(C)]
struct CapUserHeader {
    version: u32,
    pid: i32,
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct CapUserData {
    effective: u32,
    permitted: u32,
    inheritable: u32,
}

/// Build the two version-3 data words (caps 0-31 and caps 32-63) from the
/// requested identifiers, starting from a fully cleared state. Each id is
/// set identically in the effective, inheritable, and permitted sets.
fn capability_words(caps: &[CapabilityId]) -> [CapUserData; 2] {
    let mut data = [CapUserData::default(); 2];
    for cap in caps {
        let word = (cap.value() >> 5) as usize;
        let bit = 1u32 << (cap.value() & 31);
        data[word].effective |= bit;
        data[word].inheritable |= bit;
        data[word].permitted |= bit;
    }
    data
}

/// Install exactly `caps` as the calling thread's capability state.
///
/// Starts from a fully cleared state; an empty slice is the first-class
/// "retain none" request, not an error. Exactly one attempt is made. On
/// failure the caller must assume its capability state is unknown and
/// most-restrictive; callers that need resilience handle it themselves,
/// typically by aborting.
pub fn install_capabilities(caps: &[CapabilityId]) -> Result<(), CapabilityFailure> {
    let header = CapUserHeader {
        version: LINUX_CAPABILITY_VERSION_3,
        pid: 0,
    };

    let data = capability_words(caps);

    // SAFETY: capset(2) with a valid version-3 header (pid 0 = calling
    // thread) and exactly two properly initialized data entries.
    let rc = unsafe {
        libc::syscall(
            libc::SYS_capset,
            &header as *const CapUserHeader,
            data.as_ptr(),
        )
    };
    if rc != 0 {
        return Err(CapabilityFailure::Install(std::io::Error::last_os_error()));
    }

    if caps.is_empty() {
        log::info!("cleared effective/inheritable/permitted capability sets");
    } else {
        log::info!(
            "installed {} capabilities into effective/inheritable/permitted sets",
            caps.len()
        );
    }
    Ok(())
}
