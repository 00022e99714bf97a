//! uxnbridge-core: hosts an opaque wasm VM and wires it to its environment.
//!
//! The VM is a compiled module with one linear memory. The host never interprets it; it
//! calls a few exported entry points and answers four imported callbacks:
//! - display: the VM hands over two RGBA layers, the host composites and presents them,
//! - input: pointer, keyboard and gamepad are normalized into the VM's modifier-mask protocol,
//! - state: the VM's declared state region can be snapshotted and restored,
//! - audio: the device pulls fixed-size chunks straight out of VM memory,
//! - diagnostics: a line-buffered console fed one byte at a time.
//!
//! Everything for one VM lives in a [`Session`]. Environment stimuli are sent to it as
//! [`Event`]s and handled one at a time, so the VM is never re-entered.
//!
//! The ABI surface is described in `crate::abi`.

mod abi;
pub mod av;
pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod input;
mod loader;
mod memory;
mod runtime;
pub mod session;
pub mod snapshot;
mod state;

#[cfg(test)]
mod testing;

pub use abi::Modifier;
pub use av::{AudioChunk, AudioDevice, Frame, FrameSink, NullSink};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{BridgeConfig, ConfigError};
pub use console::{ConsoleSink, LogConsole};
pub use error::{BridgeError, Result};
pub use input::{Bounds, GamepadSource, KeyEvent, KeyState, PointerEvent, PointerKind};
pub use loader::LoadError;
pub use runtime::Vm;
pub use session::{Disposition, Event, HostCapabilities, LifecycleState, Session, run};
pub use snapshot::Snapshot;
