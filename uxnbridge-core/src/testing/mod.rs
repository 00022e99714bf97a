//! Shared fixtures for unit tests: a WAT guest that records what the host did to it, plus
//! recording host capabilities.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::av::{AudioDevice, Frame, FrameSink, NullSink};
use crate::clock::FixedClock;
use crate::config::{AudioConfig, BridgeConfig, DisplayConfig};
use crate::console::{ConsoleSink, LogConsole};
use crate::input::GamepadSource;
use crate::runtime::{Vm, WasmtimeRuntime};
use crate::session::{HostCapabilities, Session};
use crate::state::BridgeState;

// Guest memory map (all slots are little-endian u32 unless noted).
pub const INIT_COUNT: usize = 0x12000;
pub const MAIN_COUNT: usize = 0x12004;
pub const UPDATE_COUNT: usize = 0x12008;
pub const POINTER_X: usize = 0x1200C;
pub const POINTER_Y: usize = 0x12010;
pub const POINTER_BUTTONS: usize = 0x12014;
pub const WHEEL: usize = 0x12018;
pub const KEY_COUNT: usize = 0x1201C;
pub const KEY_MASK: usize = 0x12020;
pub const KEY_CHAR: usize = 0x12024;
pub const POINTER_COUNT: usize = 0x12028;
pub const INIT_SEQ: usize = 0x12040;
pub const MAIN_SEQ: usize = 0x12044;
/// First ROM byte as seen from inside `runMain`.
pub const MAIN_ROM_BYTE: usize = 0x12048;
pub const UPDATE_SEQ: usize = 0x1204C;
pub const BG: u32 = 0x13000;
pub const FG: u32 = 0x14000;
pub const AUDIO: usize = 0x15000;
/// Where `runMain` asks for the date/time record (16 bytes).
pub const DATE_TIME: usize = 0x17000;
pub const ROM_PTR: usize = 0x100;
/// Slot holding the address `getStatePtr` returns (initially [`ROM_PTR`]).
pub const STATE_PTR_SLOT: usize = 0x12050;
/// Slot holding the address `getAudioSamples` returns (initially [`AUDIO`]).
pub const AUDIO_PTR_SLOT: usize = 0x12054;

/// Knobs for the generated guest.
#[derive(Clone, Debug)]
pub struct GuestFixture {
    pub bg: u32,
    pub fg: u32,
    pub state_region: bool,
    pub wheel_f64: bool,
}

impl Default for GuestFixture {
    fn default() -> Self {
        Self {
            bg: BG,
            fg: FG,
            state_region: true,
            wheel_f64: false,
        }
    }
}

impl GuestFixture {
    pub fn wat(&self) -> String {
        let state = if self.state_region {
            r#"
  (func (export "getStatePtr") (result i32) (i32.load (i32.const 0x12050)))
  (func (export "getStateSize") (result i32) (i32.const 0x100))"#
        } else {
            ""
        };
        let wheel = if self.wheel_f64 {
            r#"(func (export "onWheelEvent") (param $d f64)
    (i32.store (i32.const 0x12018) (i32.trunc_f64_s (local.get $d))))"#
        } else {
            r#"(func (export "onWheelEvent") (param $d i32)
    (i32.store (i32.const 0x12018) (local.get $d)))"#
        };
        format!(
            r#"(module
  (import "env" "printChar" (func $printChar (param i32)))
  (import "env" "printStr" (func $printStr (param i32)))
  (import "env" "render" (func $render (param i32 i32)))
  (import "env" "getDateTime" (func $getDateTime (param i32)))
  (memory (export "memory") 2)
  (data (i32.const 0x16000) "init\n\00")
  ;; getStatePtr = 0x100, getAudioSamples = 0x15000; tests may move either.
  (data (i32.const 0x12050) "\00\01\00\00\00\50\01\00")

  (func $bump (param $addr i32)
    (i32.store (local.get $addr) (i32.add (i32.load (local.get $addr)) (i32.const 1))))

  (func $mark (param $slot i32)
    (local $n i32)
    (local.set $n (i32.add (i32.load (i32.const 0x1202C)) (i32.const 1)))
    (i32.store (i32.const 0x1202C) (local.get $n))
    (i32.store (local.get $slot) (local.get $n)))

  (func (export "init")
    (call $bump (i32.const 0x12000))
    (call $mark (i32.const 0x12040))
    (call $printStr (i32.const 0x16000)))

  (func (export "runMain")
    (call $bump (i32.const 0x12004))
    (call $mark (i32.const 0x12044))
    (i32.store (i32.const 0x12048) (i32.load8_u (i32.const 0x100)))
    (call $getDateTime (i32.const 0x17000))
    (call $printChar (i32.const 109))
    (call $printChar (i32.const 97)))

  (func (export "onUpdate")
    (call $bump (i32.const 0x12008))
    (call $mark (i32.const 0x1204C))
    (call $render (i32.const {bg}) (i32.const {fg})))

  (func (export "onPointerEvent") (param $x i32) (param $y i32) (param $b i32)
    (call $bump (i32.const 0x12028))
    (i32.store (i32.const 0x1200C) (local.get $x))
    (i32.store (i32.const 0x12010) (local.get $y))
    (i32.store (i32.const 0x12014) (local.get $b)))

  {wheel}

  (func (export "onKeyboardEvent") (param $m i32) (param $c i32)
    (call $bump (i32.const 0x1201C))
    (i32.store (i32.const 0x12020) (local.get $m))
    (i32.store (i32.const 0x12024) (local.get $c)))

  (func (export "getRomPtr") (result i32) (i32.const 0x100))
  (func (export "getAudioSamples") (result i32) (i32.load (i32.const 0x12054))){state}
)"#,
            bg = self.bg,
            fg = self.fg,
        )
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 4x2 display and 4-frame audio chunks keep buffers small enough to spell out.
pub fn config() -> BridgeConfig {
    BridgeConfig {
        display: DisplayConfig {
            width: 4,
            height: 2,
        },
        audio: AudioConfig {
            chunk_frames: 4,
            ..AudioConfig::default()
        },
        ..BridgeConfig::default()
    }
}

pub fn clock() -> FixedClock {
    let at = NaiveDate::from_ymd_opt(2021, 6, 10)
        .and_then(|d| d.and_hms_opt(13, 45, 7))
        .unwrap();
    FixedClock(at)
}

/// Instantiate the fixture without a session around it.
pub fn vm(fixture: &GuestFixture) -> Vm {
    init_logger();
    let runtime = WasmtimeRuntime::new().unwrap();
    let module = runtime.compile(fixture.wat().as_bytes()).unwrap();
    let state = BridgeState::new(
        config().display,
        Box::new(NullSink),
        Box::new(LogConsole),
        Box::new(clock()),
    );
    runtime.instantiate(&module, state).unwrap()
}

/// Recording host capabilities; clones share their recordings.
#[derive(Clone, Default)]
pub struct Recorder {
    pub lines: Arc<Mutex<Vec<String>>>,
    pub frames: Arc<Mutex<Vec<Vec<u8>>>>,
    pub pad: ScriptedPad,
}

impl Recorder {
    pub fn host(&self) -> HostCapabilities {
        HostCapabilities {
            display: Box::new(RecordingDisplay(self.frames.clone())),
            console: Box::new(RecordingConsole(self.lines.clone())),
            clock: Box::new(clock()),
            gamepads: Box::new(self.pad.clone()),
            audio_device: None,
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }
}

pub struct RecordingDisplay(Arc<Mutex<Vec<Vec<u8>>>>);

impl FrameSink for RecordingDisplay {
    fn present(&mut self, frame: Frame<'_>) {
        self.0.lock().unwrap().push(frame.rgba.to_vec());
    }
}

pub struct RecordingConsole(Arc<Mutex<Vec<String>>>);

impl ConsoleSink for RecordingConsole {
    fn line(&mut self, line: &str) {
        self.0.lock().unwrap().push(line.to_owned());
    }
}

/// Gamepad at index 0 whose held buttons the test changes between ticks.
#[derive(Clone, Default)]
pub struct ScriptedPad(Arc<Mutex<HashSet<usize>>>);

impl ScriptedPad {
    pub fn hold(&self, buttons: &[usize]) {
        *self.0.lock().unwrap() = buttons.iter().copied().collect();
    }
}

impl GamepadSource for ScriptedPad {
    fn is_pressed(&self, index: u32, button: usize) -> bool {
        index == 0 && self.0.lock().unwrap().contains(&button)
    }
}

/// Audio device that refuses to resume a fixed number of times.
pub struct StubbornDevice {
    pub refusals: u32,
    pub attempts: Arc<Mutex<u32>>,
}

impl AudioDevice for StubbornDevice {
    fn resume(&mut self) -> anyhow::Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.refusals > 0 {
            self.refusals -= 1;
            anyhow::bail!("no user gesture yet");
        }
        Ok(())
    }
}

pub fn session(fixture: &GuestFixture, rom: Vec<u8>, host: HostCapabilities) -> Session {
    init_logger();
    Session::new(config(), fixture.wat().as_bytes(), rom, host).unwrap()
}

pub fn write_u32(memory: &mut [u8], addr: usize, value: u32) {
    memory[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn read_u32(memory: &[u8], addr: usize) -> u32 {
    u32::from_le_bytes(memory[addr..addr + 4].try_into().unwrap())
}
