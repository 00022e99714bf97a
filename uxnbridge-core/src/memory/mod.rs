//! Bounds-checked lens over the guest's linear memory.
//!
//! The window owns nothing. Every address comes from the guest; each access is checked
//! against the memory's current size so a bad address surfaces as
//! [`BridgeError::OutOfRange`] instead of a host-side panic.

use crate::error::BridgeError;
use core::ops::Range;
use wasmtime::{AsContext, Memory, StoreContext, StoreContextMut};

#[derive(Clone, Copy, Debug)]
pub struct MemoryWindow {
    memory: Memory,
}

impl MemoryWindow {
    pub fn new(memory: Memory) -> Self {
        Self { memory }
    }

    pub fn size(&self, store: impl AsContext) -> usize {
        self.memory.data_size(store)
    }

    pub fn bytes<'a, T: 'static>(&self, store: impl Into<StoreContext<'a, T>>) -> &'a [u8] {
        self.memory.data(store)
    }

    pub fn bytes_mut<'a, T: 'static>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
    ) -> &'a mut [u8] {
        self.memory.data_mut(store)
    }

    /// Guest memory and store data borrowed together, for host callbacks that move bytes
    /// between the two.
    pub fn split<'a, T: 'static>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
    ) -> (&'a mut [u8], &'a mut T) {
        self.memory.data_and_store_mut(store)
    }

    pub fn read<'a, T: 'static>(
        &self,
        store: impl Into<StoreContext<'a, T>>,
        addr: u32,
        len: usize,
    ) -> Result<&'a [u8], BridgeError> {
        let data = self.memory.data(store);
        Ok(&data[checked_range(data.len(), addr, len)?])
    }

    pub fn write<'a, T: 'static>(
        &self,
        store: impl Into<StoreContextMut<'a, T>>,
        addr: u32,
        bytes: &[u8],
    ) -> Result<(), BridgeError> {
        let data = self.memory.data_mut(store);
        let range = checked_range(data.len(), addr, bytes.len())?;
        data[range].copy_from_slice(bytes);
        Ok(())
    }
}

/// `addr..addr + len` if it lies inside a memory of `size` bytes.
pub fn checked_range(size: usize, addr: u32, len: usize) -> Result<Range<usize>, BridgeError> {
    let start = addr as usize;
    match start.checked_add(len) {
        Some(end) if end <= size => Ok(start..end),
        _ => Err(BridgeError::OutOfRange {
            addr: addr as u64,
            len,
            size,
        }),
    }
}

/// Bytes of the NUL-terminated string starting at `addr`, terminator excluded.
pub fn c_string(data: &[u8], addr: u32) -> Result<&[u8], BridgeError> {
    let tail = data.get(addr as usize..).ok_or(BridgeError::OutOfRange {
        addr: addr as u64,
        len: 1,
        size: data.len(),
    })?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(BridgeError::UnterminatedString { addr })?;
    Ok(&tail[..end])
}
