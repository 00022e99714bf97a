//! uxnbridge-core ABI module
//!
//! This module defines the contract between:
//! - **Host**: `uxnbridge-core`
//! - **Guest**: the VM module, an opaque wasm instance with one linear memory
//!
//! ## Model
//! The host never interprets VM state. It only:
//! - calls a handful of exported entry points,
//! - reads and writes byte ranges at addresses the guest itself reports,
//! - answers four callbacks imported by the guest.
//!
//! ## Imports (guest -> host), module `"env"`
//! - `printChar(code: i32)`: push one byte onto the line-buffered console.
//! - `printStr(ptr: i32)`: push a NUL-terminated string from guest memory.
//! - `render(bg: i32, fg: i32)`: present two RGBA8 layers of `width*height*4` bytes each.
//! - `getDateTime(out: i32)`: host writes a 16-byte date/time record at `out`.
//!
//! ## Exports (host -> guest)
//! Required:
//! - `memory`, `init()`, `onUpdate()`, `getRomPtr() -> i32`
//!
//! Optional:
//! - `runMain()`
//! - `onPointerEvent(x: i32, y: i32, buttons: i32)`
//! - `onWheelEvent(delta_y: f64 | i32)`
//! - `onKeyboardEvent(mask: i32, char_code: i32)`
//! - `getStatePtr() -> i32`, `getStateSize() -> i32`
//! - `getAudioSamples() -> i32`
//!
//! All addresses are query results; the host never hard-codes a guest address.

use crate::error::BridgeError;
use wasmtime::{Instance, Store, TypedFunc};

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Name of the exported linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// Guest export names (entrypoints and accessors).
pub mod guest_exports {
    pub const INIT: &str = "init";
    pub const RUN_MAIN: &str = "runMain";
    pub const ON_UPDATE: &str = "onUpdate";
    pub const ON_POINTER_EVENT: &str = "onPointerEvent";
    pub const ON_WHEEL_EVENT: &str = "onWheelEvent";
    pub const ON_KEYBOARD_EVENT: &str = "onKeyboardEvent";
    pub const GET_ROM_PTR: &str = "getRomPtr";
    pub const GET_STATE_PTR: &str = "getStatePtr";
    pub const GET_STATE_SIZE: &str = "getStateSize";
    pub const GET_AUDIO_SAMPLES: &str = "getAudioSamples";
}

/// Host import names provided to the guest under [`IMPORT_MODULE`].
pub mod host_imports {
    pub const PRINT_CHAR: &str = "printChar";
    pub const PRINT_STR: &str = "printStr";
    pub const RENDER: &str = "render";
    pub const GET_DATE_TIME: &str = "getDateTime";
}

/// Bits of the 8-bit modifier mask passed to `onKeyboardEvent`.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Modifier {
    Ctrl = 1 << 0,
    Alt = 1 << 1,
    Shift = 1 << 2,
    Escape = 1 << 3,
    Up = 1 << 4,
    Down = 1 << 5,
    Left = 1 << 6,
    Right = 1 << 7,
}

impl Modifier {
    pub const fn bit(self) -> u8 {
        self as u8
    }
}

/// Size of the record written by `getDateTime`.
pub const DATE_TIME_RECORD_LEN: usize = 16;

/// `onWheelEvent` is accepted with either a float or an integer parameter.
#[derive(Clone)]
pub enum WheelEntry {
    Float(TypedFunc<f64, ()>),
    Int(TypedFunc<i32, ()>),
}

/// The guest's entrypoints, resolved once after instantiation.
#[derive(Clone)]
pub struct GuestEntrypoints {
    pub init: TypedFunc<(), ()>,
    pub run_main: Option<TypedFunc<(), ()>>,
    pub on_update: TypedFunc<(), ()>,
    pub on_pointer_event: Option<TypedFunc<(i32, i32, i32), ()>>,
    pub on_wheel_event: Option<WheelEntry>,
    pub on_keyboard_event: Option<TypedFunc<(i32, i32), ()>>,
    pub get_rom_ptr: TypedFunc<(), u32>,
    pub get_state_ptr: Option<TypedFunc<(), u32>>,
    pub get_state_size: Option<TypedFunc<(), u32>>,
    pub get_audio_samples: Option<TypedFunc<(), u32>>,
}

impl GuestEntrypoints {
    /// Resolve entrypoint exports from an instance.
    ///
    /// A required export that is absent or has the wrong signature is an integration error.
    /// Optional exports are logged when missing and resolved to `None`.
    pub fn resolve<T: 'static>(
        instance: &Instance,
        store: &mut Store<T>,
    ) -> Result<Self, BridgeError> {
        use guest_exports::*;

        macro_rules! required {
            ($name:expr) => {
                instance
                    .get_typed_func(&mut *store, $name)
                    .map_err(|_| BridgeError::MissingExport($name))?
            };
        }
        macro_rules! optional {
            ($name:expr) => {{
                let func = instance.get_typed_func(&mut *store, $name).ok();
                if func.is_none() {
                    log::warn!("guest does not export `{}`; feature disabled", $name);
                }
                func
            }};
        }

        let on_wheel_event = match instance.get_typed_func::<f64, ()>(&mut *store, ON_WHEEL_EVENT) {
            Ok(func) => Some(WheelEntry::Float(func)),
            Err(_) => {
                let func = optional!(ON_WHEEL_EVENT);
                func.map(WheelEntry::Int)
            }
        };

        Ok(Self {
            init: required!(INIT),
            run_main: optional!(RUN_MAIN),
            on_update: required!(ON_UPDATE),
            on_pointer_event: optional!(ON_POINTER_EVENT),
            on_wheel_event,
            on_keyboard_event: optional!(ON_KEYBOARD_EVENT),
            get_rom_ptr: required!(GET_ROM_PTR),
            get_state_ptr: optional!(GET_STATE_PTR),
            get_state_size: optional!(GET_STATE_SIZE),
            get_audio_samples: optional!(GET_AUDIO_SAMPLES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasmtime::{Engine, Linker, Module};

    fn resolve(wat: &str) -> Result<GuestEntrypoints, BridgeError> {
        let engine = Engine::default();
        let module = Module::new(&engine, wat).unwrap();
        let mut store = Store::new(&engine, ());
        let instance = Linker::new(&engine)
            .instantiate(&mut store, &module)
            .unwrap();
        GuestEntrypoints::resolve(&instance, &mut store)
    }

    #[test]
    fn modifier_bits_are_distinct_and_cover_the_byte() {
        let all = [
            Modifier::Ctrl,
            Modifier::Alt,
            Modifier::Shift,
            Modifier::Escape,
            Modifier::Up,
            Modifier::Down,
            Modifier::Left,
            Modifier::Right,
        ];
        let combined = all.iter().fold(0u8, |acc, m| {
            assert_eq!(acc & m.bit(), 0);
            acc | m.bit()
        });
        assert_eq!(combined, 0xff);
    }

    #[test]
    fn minimal_guest_resolves_with_optional_exports_absent() {
        let entry = resolve(
            r#"(module
                (func (export "init"))
                (func (export "onUpdate"))
                (func (export "getRomPtr") (result i32) (i32.const 256)))"#,
        )
        .unwrap();
        assert!(entry.run_main.is_none());
        assert!(entry.on_wheel_event.is_none());
        assert!(entry.get_state_ptr.is_none());
    }

    #[test]
    fn missing_update_is_reported_by_name() {
        let err = resolve(
            r#"(module
                (func (export "init"))
                (func (export "getRomPtr") (result i32) (i32.const 256)))"#,
        )
        .err()
        .unwrap();
        assert!(matches!(err, BridgeError::MissingExport("onUpdate")));
    }

    #[test]
    fn wheel_accepts_float_or_int_parameter() {
        let base = r#"
            (func (export "init"))
            (func (export "onUpdate"))
            (func (export "getRomPtr") (result i32) (i32.const 256))"#;

        let float = resolve(&format!(
            "(module {base} (func (export \"onWheelEvent\") (param f64)))"
        ))
        .unwrap();
        assert!(matches!(float.on_wheel_event, Some(WheelEntry::Float(_))));

        let int = resolve(&format!(
            "(module {base} (func (export \"onWheelEvent\") (param i32)))"
        ))
        .unwrap();
        assert!(matches!(int.on_wheel_event, Some(WheelEntry::Int(_))));
    }
}
