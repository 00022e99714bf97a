//! Input normalization for uxnbridge-core.
//!
//! Three producers feed the VM's keyboard protocol, an 8-bit [`Modifier`] mask plus an
//! optional character code:
//! - keyboard events, mapped from legacy DOM key codes,
//! - a bound gamepad, polled once per frame (gamepads have no change events),
//! - pointer and wheel events, which bypass the mask and go to their own entry points.
//!
//! Keyboard and gamepad hold separate masks; the VM sees their union. Keyboard events
//! always forward, gamepad polls only forward when the union changed.

use crate::abi::Modifier;

/// Legacy DOM key codes that map onto modifier bits.
pub mod key_codes {
    pub const SHIFT: u32 = 16;
    pub const CONTROL: u32 = 17;
    pub const ALT: u32 = 18;
    pub const ESCAPE: u32 = 27;
    pub const LEFT: u32 = 37;
    pub const UP: u32 = 38;
    pub const RIGHT: u32 = 39;
    pub const DOWN: u32 = 40;
}

/// Buttons below this raw key code count as control characters when nothing else applies.
const CONTROL_KEY_LIMIT: u32 = 20;

/// Standard-mapping gamepad buttons and the modifier each one drives.
const GAMEPAD_BUTTONS: [(usize, Modifier); 9] = [
    (0, Modifier::Ctrl),
    (1, Modifier::Alt),
    (2, Modifier::Shift),
    (8, Modifier::Escape),
    (9, Modifier::Escape),
    (12, Modifier::Up),
    (13, Modifier::Down),
    (14, Modifier::Left),
    (15, Modifier::Right),
];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KeyState {
    Down,
    Up,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub state: KeyState,
    /// Legacy numeric key code (`KeyboardEvent.keyCode`).
    pub key_code: u32,
    /// Produced text (`KeyboardEvent.key`), e.g. `"a"`, `"A"`, `"Enter"`.
    pub key: String,
}

impl KeyEvent {
    pub fn down(key_code: u32, key: impl Into<String>) -> Self {
        Self {
            state: KeyState::Down,
            key_code,
            key: key.into(),
        }
    }

    pub fn up(key_code: u32, key: impl Into<String>) -> Self {
        Self {
            state: KeyState::Up,
            key_code,
            key: key.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PointerKind {
    Move,
    Down,
    Up,
}

/// Pointer event in client (window) coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub client_x: f64,
    pub client_y: f64,
    /// Held-buttons bitfield (`PointerEvent.buttons`).
    pub buttons: u8,
}

/// Bounding box of the display element in client coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// Arguments for `onPointerEvent`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PointerInput {
    pub x: i32,
    pub y: i32,
    pub buttons: u8,
}

/// Arguments for `onKeyboardEvent`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct KeyboardInput {
    pub mask: u8,
    pub char_code: u8,
}

/// Digital button state of connected gamepads.
pub trait GamepadSource: Send {
    fn is_pressed(&self, index: u32, button: usize) -> bool;
}

/// No gamepads at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGamepads;

impl GamepadSource for NoGamepads {
    fn is_pressed(&self, _index: u32, _button: usize) -> bool {
        false
    }
}

/// Modifier bit for a legacy key code, or 0 if the key is unmapped.
pub fn key_modifier(key_code: u32) -> u8 {
    let modifier = match key_code {
        key_codes::CONTROL => Modifier::Ctrl,
        key_codes::ALT => Modifier::Alt,
        key_codes::SHIFT => Modifier::Shift,
        key_codes::ESCAPE => Modifier::Escape,
        key_codes::UP => Modifier::Up,
        key_codes::DOWN => Modifier::Down,
        key_codes::LEFT => Modifier::Left,
        key_codes::RIGHT => Modifier::Right,
        _ => return 0,
    };
    modifier.bit()
}

/// Character code for a key-down: the key's single character if it produces one, else the
/// raw code for unmapped control keys (backspace, tab, enter), else 0.
pub fn key_char_code(event: &KeyEvent) -> u8 {
    if event.state == KeyState::Up {
        return 0;
    }
    let mut chars = event.key.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        // A key outside the BMP is two UTF-16 units and has no single code.
        return if c.len_utf16() == 1 { c as u32 as u8 } else { 0 };
    }
    if key_modifier(event.key_code) == 0 && event.key_code < CONTROL_KEY_LIMIT {
        return event.key_code as u8;
    }
    0
}

/// Full mask recomputed from a gamepad's current buttons.
pub fn gamepad_mask(source: &dyn GamepadSource, index: u32) -> u8 {
    GAMEPAD_BUTTONS
        .iter()
        .filter(|(button, _)| source.is_pressed(index, *button))
        .fold(0, |mask, (_, modifier)| mask | modifier.bit())
}

/// Scale a client-space position into display pixels. Not clamped.
pub fn pointer_position(
    event: &PointerEvent,
    bounds: &Bounds,
    display_width: u32,
    display_height: u32,
) -> (i32, i32) {
    let x = display_width as f64 * (event.client_x - bounds.left) / bounds.width;
    let y = display_height as f64 * (event.client_y - bounds.top) / bounds.height;
    (x as i32, y as i32)
}

/// Owns the modifier state for a session and arbitrates between keyboard and gamepad.
#[derive(Debug, Default, Clone)]
pub struct InputNormalizer {
    display_width: u32,
    display_height: u32,
    keyboard_mask: u8,
    gamepad_mask: u8,
    last_forwarded: u8,
    gamepad: Option<u32>,
}

impl InputNormalizer {
    pub fn new(display_width: u32, display_height: u32) -> Self {
        Self {
            display_width,
            display_height,
            ..Self::default()
        }
    }

    /// The mask the VM should currently see.
    pub fn mask(&self) -> u8 {
        self.keyboard_mask | self.gamepad_mask
    }

    pub fn bound_gamepad(&self) -> Option<u32> {
        self.gamepad
    }

    /// Forget held keys and buttons. The gamepad binding survives.
    pub fn reset(&mut self) {
        self.keyboard_mask = 0;
        self.gamepad_mask = 0;
        self.last_forwarded = 0;
    }

    pub fn keyboard(&mut self, event: &KeyEvent) -> KeyboardInput {
        let bit = key_modifier(event.key_code);
        match event.state {
            KeyState::Down => self.keyboard_mask |= bit,
            KeyState::Up => self.keyboard_mask &= !bit,
        }
        let mask = self.mask();
        self.last_forwarded = mask;
        KeyboardInput {
            mask,
            char_code: key_char_code(event),
        }
    }

    pub fn pointer(&self, event: &PointerEvent, bounds: &Bounds) -> PointerInput {
        let (x, y) = pointer_position(event, bounds, self.display_width, self.display_height);
        PointerInput {
            x,
            y,
            buttons: event.buttons,
        }
    }

    /// Bind a newly connected gamepad. Non-standard mappings are ignored.
    pub fn gamepad_connected(&mut self, index: u32, standard_mapping: bool) -> bool {
        if !standard_mapping {
            log::debug!("ignoring gamepad {index}: non-standard mapping");
            return false;
        }
        if let Some(previous) = self.gamepad.replace(index) {
            log::debug!("gamepad {index} replaces gamepad {previous}");
        }
        log::info!("gamepad {index} bound");
        true
    }

    pub fn gamepad_disconnected(&mut self, index: u32) {
        if self.gamepad == Some(index) {
            log::info!("gamepad {index} unbound");
            self.gamepad = None;
        }
    }

    /// Poll the bound gamepad. Returns the mask to forward if it changed since the last
    /// forward, with a char code of 0.
    pub fn poll_gamepad(&mut self, source: &dyn GamepadSource) -> Option<KeyboardInput> {
        self.gamepad_mask = match self.gamepad {
            Some(index) => gamepad_mask(source, index),
            None => 0,
        };
        let mask = self.mask();
        if mask == self.last_forwarded {
            return None;
        }
        self.last_forwarded = mask;
        Some(KeyboardInput { mask, char_code: 0 })
    }
}
