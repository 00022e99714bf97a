//! Wasmtime-backed runtime glue for uxnbridge-core.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine` with the proposal features VM builds commonly rely on.
//! - Define host imports under module `"env"` matching the guest ABI.
//! - Instantiate a compiled `wasmtime::Module` and resolve its memory and entrypoints.
//! - Gate every entry-point call through [`Vm`], which serializes calls and refuses to
//!   continue once the guest has trapped.

pub mod imports;
pub mod runtime;
pub mod vm;

pub use runtime::WasmtimeRuntime;
pub use vm::Vm;
