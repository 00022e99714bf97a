//! Host import definitions for the Wasmtime runtime.
//!
//! This module defines all the host functions imported by the guest under the "env" module.
//! A callback that hits an integration error traps the guest with the [`BridgeError`] as the
//! trap payload; [`super::Vm`] recovers it when the entry point returns.

use crate::{
    abi::{IMPORT_MODULE, MEMORY_EXPORT, host_imports},
    clock::date_time_record,
    error::BridgeError,
    memory::{MemoryWindow, c_string},
    state::BridgeState,
};

use wasmtime::{Caller, Extern, Linker};

/// Define all host imports expected by guests under module `"env"`.
///
/// Must be called before instantiating the module.
pub fn define_imports(linker: &mut Linker<BridgeState>) -> Result<(), anyhow::Error> {
    // --- Console ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::PRINT_CHAR,
        |mut caller: Caller<'_, BridgeState>, code: i32| {
            caller.data_mut().console.push(code as u8);
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::PRINT_STR,
        |mut caller: Caller<'_, BridgeState>, ptr: u32| -> wasmtime::Result<()> {
            let memory = guest_memory(&mut caller).map_err(trap)?;
            let (data, state) = memory.split(&mut caller);
            let text = c_string(data, ptr).map_err(trap)?;
            state.console.push_bytes(text);
            Ok(())
        },
    )?;

    // --- Display ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::RENDER,
        |mut caller: Caller<'_, BridgeState>, bg: u32, fg: u32| -> wasmtime::Result<()> {
            let memory = guest_memory(&mut caller).map_err(trap)?;
            let (data, state) = memory.split(&mut caller);
            state.compositor.render(data, bg, fg).map_err(trap)
        },
    )?;

    // --- Clock ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GET_DATE_TIME,
        |mut caller: Caller<'_, BridgeState>, out: u32| -> wasmtime::Result<()> {
            let record = date_time_record(&caller.data().clock.now());
            let memory = guest_memory(&mut caller).map_err(trap)?;
            memory.write(&mut caller, out, &record).map_err(trap)
        },
    )?;

    Ok(())
}

fn guest_memory(caller: &mut Caller<'_, BridgeState>) -> Result<MemoryWindow, BridgeError> {
    caller
        .get_export(MEMORY_EXPORT)
        .and_then(Extern::into_memory)
        .map(MemoryWindow::new)
        .ok_or(BridgeError::MissingMemory)
}

fn trap(err: BridgeError) -> wasmtime::Error {
    wasmtime::Error::new(err)
}
