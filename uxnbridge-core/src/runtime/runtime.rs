use crate::abi::{self, MEMORY_EXPORT};
use crate::error::BridgeError;
use crate::loader::{self, LoadError};
use crate::memory::MemoryWindow;
use crate::state::BridgeState;

use super::Vm;
use wasmtime::{Engine, Linker, Module, Store};

/// Host-side runtime container: one engine plus a linker carrying the host imports.
pub struct WasmtimeRuntime {
    pub engine: Engine,
    pub linker: Linker<BridgeState>,
}

impl WasmtimeRuntime {
    /// Create the engine and define all host imports.
    ///
    /// VM builds are usually produced by C toolchains targeting the MVP plus a few common
    /// proposals; those are enabled so such modules validate.
    pub fn new() -> Result<Self, anyhow::Error> {
        let mut cfg = wasmtime::Config::new();

        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);
        cfg.wasm_multi_memory(true);
        cfg.wasm_tail_call(true);

        let engine = Engine::new(&cfg)?;
        let mut linker = Linker::new(&engine);
        super::imports::define_imports(&mut linker)?;

        Ok(Self { engine, linker })
    }

    /// Compile a VM module given as wasm or wat bytes.
    pub fn compile(&self, module_bytes: &[u8]) -> Result<Module, LoadError> {
        loader::compile_module(&self.engine, module_bytes)
    }

    /// Instantiate a module with fresh host state and resolve its memory and entrypoints.
    pub fn instantiate(&self, module: &Module, state: BridgeState) -> Result<Vm, BridgeError> {
        let mut store = Store::new(&self.engine, state);
        let instance = self
            .linker
            .instantiate(&mut store, module)
            .map_err(BridgeError::Runtime)?;

        let memory = instance
            .get_memory(&mut store, MEMORY_EXPORT)
            .ok_or(BridgeError::MissingMemory)?;
        let entrypoints = abi::GuestEntrypoints::resolve(&instance, &mut store)?;

        Ok(Vm::new(store, MemoryWindow::new(memory), entrypoints))
    }
}
