//! The lifecycle controller.
//!
//! A [`Session`] owns everything one running VM needs: the instantiated guest, its ROM image,
//! input arbitration, the audio streamer and the current snapshot. Nothing lives in globals,
//! so a second session is just a second value.
//!
//! Lifecycle: `Unbooted -> Booting -> Running`. Reset, save and restore all leave the session
//! in `Running`. A failed boot drops back to `Unbooted`.

pub mod dispatch;

pub use dispatch::{Disposition, Event, run};

use crate::av::{AudioChunk, AudioDevice, AudioResume, AudioStreamer, Frame, FrameSink, NullSink};
use crate::clock::{Clock, SystemClock};
use crate::config::BridgeConfig;
use crate::console::{ConsoleSink, LogConsole};
use crate::error::{BridgeError, Result};
use crate::input::{
    Bounds, GamepadSource, InputNormalizer, KeyEvent, KeyState, NoGamepads, PointerEvent,
    PointerKind,
};
use crate::runtime::{Vm, WasmtimeRuntime};
use crate::snapshot::{self, Snapshot};
use crate::state::BridgeState;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Unbooted,
    Booting,
    Running,
}

/// Everything the embedding environment provides.
///
/// All of it is `Send`, so a [`Session`] can move to the thread that runs [`run`].
pub struct HostCapabilities {
    pub display: Box<dyn FrameSink>,
    pub console: Box<dyn ConsoleSink>,
    pub clock: Box<dyn Clock>,
    pub gamepads: Box<dyn GamepadSource>,
    /// `None` when there is no audio output at all.
    pub audio_device: Option<Box<dyn AudioDevice>>,
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self {
            display: Box::new(NullSink),
            console: Box::new(LogConsole),
            clock: Box::new(SystemClock),
            gamepads: Box::new(NoGamepads),
            audio_device: None,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Hotkey {
    Save,
    Restore,
    Reset,
}

pub struct Session {
    config: BridgeConfig,
    vm: Vm,
    rom: Vec<u8>,
    lifecycle: LifecycleState,
    input: InputNormalizer,
    gamepads: Box<dyn GamepadSource>,
    audio: AudioStreamer,
    audio_resume: AudioResume,
    snapshot: Option<Snapshot>,
}

impl Session {
    /// Compile and instantiate the VM module. The session starts `Unbooted`; call
    /// [`Session::boot`] to load the ROM.
    pub fn new(
        config: BridgeConfig,
        vm_module: &[u8],
        rom: Vec<u8>,
        host: HostCapabilities,
    ) -> Result<Self> {
        config.validate()?;
        if rom.is_empty() {
            return Err(BridgeError::EmptyRom);
        }

        let runtime = WasmtimeRuntime::new().map_err(BridgeError::Runtime)?;
        let module = runtime.compile(vm_module)?;
        let state = BridgeState::new(config.display, host.display, host.console, host.clock);
        let vm = runtime.instantiate(&module, state)?;

        log::info!(
            "VM instantiated: {}x{} display, {} byte ROM",
            config.display.width,
            config.display.height,
            rom.len()
        );

        Ok(Self {
            input: InputNormalizer::new(config.display.width, config.display.height),
            audio: AudioStreamer::new(config.audio.chunk_frames),
            audio_resume: AudioResume::new(host.audio_device),
            gamepads: host.gamepads,
            snapshot: None,
            lifecycle: LifecycleState::Unbooted,
            config,
            vm,
            rom,
        })
    }

    // --- Lifecycle ---

    /// Initialize the guest, load the ROM and run its main entry once.
    ///
    /// Also used for reset: the guest is re-initialized in place and the ROM reloaded. The
    /// current snapshot and the gamepad binding survive; held input does not.
    pub fn boot(&mut self) -> Result<()> {
        log::info!("booting");
        self.lifecycle = LifecycleState::Booting;
        match self.load_and_start() {
            Ok(()) => {
                self.lifecycle = LifecycleState::Running;
                log::info!("running");
                Ok(())
            }
            Err(err) => {
                self.lifecycle = LifecycleState::Unbooted;
                log::error!("boot failed: {err}");
                Err(err)
            }
        }
    }

    fn load_and_start(&mut self) -> Result<()> {
        self.input.reset();
        self.vm.init()?;

        let capacity = self.config.memory.rom_capacity();
        let len = self.rom.len().min(capacity);
        if len < self.rom.len() {
            log::warn!(
                "ROM is {} bytes, only the first {capacity} fit; truncating",
                self.rom.len()
            );
        }
        let ptr = self.vm.rom_ptr()?;
        self.vm.write(ptr, &self.rom[..len])?;
        log::debug!("loaded {len} ROM bytes at {ptr:#x}");

        if !self.vm.run_main()? {
            log::debug!("guest has no runMain");
        }
        self.vm.state_mut().console.flush_pending();
        Ok(())
    }

    pub fn reset(&mut self) -> Result<()> {
        log::info!("reset requested");
        self.boot()
    }

    /// One animation-clock tick: poll the gamepad, then let the guest update.
    ///
    /// Ticks carry no timestamp; the guest must not assume a fixed interval.
    pub fn update(&mut self) -> Result<()> {
        self.ensure_running()?;
        if let Some(input) = self.input.poll_gamepad(self.gamepads.as_ref()) {
            self.vm.keyboard(input.mask, input.char_code)?;
        }
        self.vm.update()
    }

    /// Capture the guest's state region as the current snapshot.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_running()?;
        let snap = snapshot::save(&mut self.vm)?;
        log::info!("state saved ({} bytes)", snap.len());
        self.snapshot = Some(snap);
        Ok(())
    }

    /// Write the current snapshot back. Without one this does nothing.
    pub fn restore(&mut self) -> Result<()> {
        self.ensure_running()?;
        let Some(snap) = self.snapshot.as_ref() else {
            log::debug!("restore requested with no snapshot");
            return Ok(());
        };
        snapshot::restore(&mut self.vm, snap)?;
        log::info!("state restored ({} bytes)", snap.len());
        Ok(())
    }

    // --- Input ---

    pub fn pointer(&mut self, event: &PointerEvent, bounds: &Bounds) -> Result<()> {
        if event.kind == PointerKind::Down {
            self.audio_resume.on_gesture();
        }
        self.ensure_running()?;
        let input = self.input.pointer(event, bounds);
        self.vm.pointer(input.x, input.y, input.buttons)
    }

    pub fn wheel(&mut self, delta_y: f64) -> Result<()> {
        self.ensure_running()?;
        self.vm.wheel(delta_y)
    }

    /// Forward a key event, unless it is bound to a lifecycle hotkey.
    ///
    /// Hotkeys fire on key-down; their key-up is swallowed too so the guest never sees half
    /// of the pair.
    pub fn keyboard(&mut self, event: &KeyEvent) -> Result<()> {
        if event.state == KeyState::Down {
            self.audio_resume.on_gesture();
        }
        if let Some(hotkey) = self.hotkey(event.key_code) {
            return match event.state {
                KeyState::Down => self.run_hotkey(hotkey),
                KeyState::Up => Ok(()),
            };
        }

        self.ensure_running()?;
        let input = self.input.keyboard(event);
        self.vm.keyboard(input.mask, input.char_code)
    }

    pub fn gamepad_connected(&mut self, index: u32, standard_mapping: bool) -> bool {
        self.input.gamepad_connected(index, standard_mapping)
    }

    pub fn gamepad_disconnected(&mut self, index: u32) {
        self.input.gamepad_disconnected(index);
    }

    fn hotkey(&self, key_code: u32) -> Option<Hotkey> {
        let keys = &self.config.hotkeys;
        [
            (keys.save, Hotkey::Save),
            (keys.restore, Hotkey::Restore),
            (keys.reset, Hotkey::Reset),
        ]
        .into_iter()
        .find_map(|(code, hotkey)| (code == Some(key_code)).then_some(hotkey))
    }

    fn run_hotkey(&mut self, hotkey: Hotkey) -> Result<()> {
        log::debug!("hotkey {hotkey:?}");
        match hotkey {
            Hotkey::Save => self.save(),
            Hotkey::Restore => self.restore(),
            Hotkey::Reset => self.reset(),
        }
    }

    // --- Audio ---

    /// Fill `chunk` with the next stretch of audio. Before boot this is silence.
    pub fn pull_audio(&mut self, chunk: &mut AudioChunk) -> Result<()> {
        if self.lifecycle != LifecycleState::Running {
            chunk.resize(self.audio.chunk_frames());
            chunk.silence();
            return Ok(());
        }
        self.audio.pull_into(&mut self.vm, chunk)
    }

    pub fn audio_pending_resume(&self) -> bool {
        self.audio_resume.is_pending()
    }

    // --- Diagnostics ---

    pub fn lifecycle(&self) -> LifecycleState {
        self.lifecycle
    }

    pub fn is_faulted(&self) -> bool {
        self.vm.is_faulted()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The modifier mask the guest currently sees.
    pub fn mask(&self) -> u8 {
        self.input.mask()
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    /// The last composited frame; encode it with [`Frame::write_png`] for a screenshot.
    pub fn frame(&self) -> Frame<'_> {
        self.vm.state().compositor.frame()
    }

    pub fn presented_frames(&self) -> u64 {
        self.vm.state().compositor.presented()
    }

    pub fn guest_memory(&self) -> &[u8] {
        self.vm.memory()
    }

    pub fn guest_memory_mut(&mut self) -> &mut [u8] {
        self.vm.memory_mut()
    }

    fn ensure_running(&self) -> Result<()> {
        match self.lifecycle {
            LifecycleState::Running => Ok(()),
            _ => Err(BridgeError::NotRunning),
        }
    }
}
