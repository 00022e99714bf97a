use crate::abi::{GuestEntrypoints, WheelEntry, guest_exports};
use crate::error::BridgeError;
use crate::memory::MemoryWindow;
use crate::state::BridgeState;

use wasmtime::Store;

/// An instantiated VM: its store, memory and entrypoints.
///
/// Every entry point goes through [`Vm::enter`], which takes `&mut self`. Host callbacks
/// only reach [`BridgeState`] through their `Caller`, never the `Vm`, so a second call
/// cannot start while one is in flight; the borrow checker is the single-flight guard.
/// What the gate adds at runtime is the fault latch: after a trap the VM refuses all
/// further calls.
pub struct Vm {
    store: Store<BridgeState>,
    memory: MemoryWindow,
    entry: GuestEntrypoints,
    faulted: bool,
}

impl Vm {
    pub(crate) fn new(
        store: Store<BridgeState>,
        memory: MemoryWindow,
        entry: GuestEntrypoints,
    ) -> Self {
        Self {
            store,
            memory,
            entry,
            faulted: false,
        }
    }

    fn enter<R>(
        &mut self,
        name: &'static str,
        call: impl FnOnce(&GuestEntrypoints, &mut Store<BridgeState>) -> wasmtime::Result<R>,
    ) -> Result<R, BridgeError> {
        if self.faulted {
            return Err(BridgeError::Faulted);
        }

        match call(&self.entry, &mut self.store) {
            Ok(value) => Ok(value),
            Err(err) => {
                self.faulted = true;
                let err = guest_error(name, err);
                log::error!("guest faulted: {err}");
                Err(err)
            }
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    // --- Entry points ---

    pub fn init(&mut self) -> Result<(), BridgeError> {
        self.enter(guest_exports::INIT, |e, s| e.init.call(s, ()))
    }

    /// Returns whether the guest exports `runMain`.
    pub fn run_main(&mut self) -> Result<bool, BridgeError> {
        self.enter(guest_exports::RUN_MAIN, |e, s| match &e.run_main {
            Some(f) => f.call(s, ()).map(|()| true),
            None => Ok(false),
        })
    }

    pub fn update(&mut self) -> Result<(), BridgeError> {
        self.enter(guest_exports::ON_UPDATE, |e, s| e.on_update.call(s, ()))
    }

    pub fn pointer(&mut self, x: i32, y: i32, buttons: u8) -> Result<(), BridgeError> {
        self.enter(guest_exports::ON_POINTER_EVENT, |e, s| match &e.on_pointer_event {
            Some(f) => f.call(s, (x, y, buttons as i32)),
            None => Ok(()),
        })
    }

    pub fn wheel(&mut self, delta_y: f64) -> Result<(), BridgeError> {
        self.enter(guest_exports::ON_WHEEL_EVENT, |e, s| match &e.on_wheel_event {
            Some(WheelEntry::Float(f)) => f.call(s, delta_y),
            Some(WheelEntry::Int(f)) => f.call(s, delta_y as i32),
            None => Ok(()),
        })
    }

    pub fn keyboard(&mut self, mask: u8, char_code: u8) -> Result<(), BridgeError> {
        self.enter(guest_exports::ON_KEYBOARD_EVENT, |e, s| {
            match &e.on_keyboard_event {
                Some(f) => f.call(s, (mask as i32, char_code as i32)),
                None => Ok(()),
            }
        })
    }

    // --- Accessors (queried fresh on every use) ---

    pub fn rom_ptr(&mut self) -> Result<u32, BridgeError> {
        self.enter(guest_exports::GET_ROM_PTR, |e, s| e.get_rom_ptr.call(s, ()))
    }

    /// `(ptr, size)` of the persistent state region, or `None` if the guest declares none.
    pub fn state_region(&mut self) -> Result<Option<(u32, u32)>, BridgeError> {
        let ptr = self.enter(guest_exports::GET_STATE_PTR, |e, s| {
            e.get_state_ptr.as_ref().map(|f| f.call(s, ())).transpose()
        })?;
        let size = self.enter(guest_exports::GET_STATE_SIZE, |e, s| {
            e.get_state_size.as_ref().map(|f| f.call(s, ())).transpose()
        })?;
        Ok(ptr.zip(size))
    }

    pub fn audio_samples_ptr(&mut self) -> Result<Option<u32>, BridgeError> {
        self.enter(guest_exports::GET_AUDIO_SAMPLES, |e, s| {
            e.get_audio_samples
                .as_ref()
                .map(|f| f.call(s, ()))
                .transpose()
        })
    }

    // --- Memory ---

    pub fn memory(&self) -> &[u8] {
        self.memory.bytes(&self.store)
    }

    pub fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.bytes_mut(&mut self.store)
    }

    pub fn read(&self, addr: u32, len: usize) -> Result<&[u8], BridgeError> {
        self.memory.read(&self.store, addr, len)
    }

    pub fn write(&mut self, addr: u32, bytes: &[u8]) -> Result<(), BridgeError> {
        self.memory.write(&mut self.store, addr, bytes)
    }

    // --- Host state ---

    pub fn state(&self) -> &BridgeState {
        self.store.data()
    }

    pub fn state_mut(&mut self) -> &mut BridgeState {
        self.store.data_mut()
    }
}

/// Recover a host-side [`BridgeError`] carried by a trap, or wrap the trap itself.
fn guest_error(entry: &'static str, err: wasmtime::Error) -> BridgeError {
    match err.downcast::<BridgeError>() {
        Ok(inner) => inner,
        Err(trap) => BridgeError::Trap { entry, trap },
    }
}
