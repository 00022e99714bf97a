//! Save and restore of the guest's declared persistent state region.
//!
//! The region's pointer and size are queried from the guest every time; nothing is cached.
//! A snapshot is an opaque byte copy with no header, so restoring one taken under a
//! different ROM or VM build is the caller's problem.

use crate::abi::guest_exports;
use crate::error::{BridgeError, Result};
use crate::runtime::Vm;

/// Immutable copy of the state region at the time of a save.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot(Box<[u8]>);

impl Snapshot {
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Snapshot {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

/// Copy `getStateSize()` bytes starting at `getStatePtr()`.
pub fn save(vm: &mut Vm) -> Result<Snapshot> {
    let (ptr, size) = state_region(vm)?;
    let bytes = vm.read(ptr, size as usize)?;
    log::debug!("saved {size} bytes of guest state from {ptr:#x}");
    Ok(Snapshot(bytes.into()))
}

/// Write `snapshot` back at the current `getStatePtr()`.
///
/// The blob length is not checked against the current state size. A blob that would run
/// past the end of guest memory is still rejected.
pub fn restore(vm: &mut Vm, snapshot: &Snapshot) -> Result<()> {
    let (ptr, size) = state_region(vm)?;
    if snapshot.len() != size as usize {
        log::warn!(
            "restoring a {}-byte snapshot into a {size}-byte state region",
            snapshot.len()
        );
    }
    vm.write(ptr, snapshot.bytes())?;
    log::debug!("restored {} bytes of guest state at {ptr:#x}", snapshot.len());
    Ok(())
}

fn state_region(vm: &mut Vm) -> Result<(u32, u32)> {
    vm.state_region()?
        .ok_or(BridgeError::Unsupported(guest_exports::GET_STATE_PTR))
}
