//! Session configuration.
//!
//! Every field has a default matching the stock VM build (384x256 display, 64 KiB address
//! space with a 256-byte zero page, 1024-frame audio chunks), so an empty JSON object is a
//! valid config.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Upper bound for one RGBA8 layer (a 4096x4096 display). The compositor holds three.
pub const MAX_LAYER_BYTES: usize = 4096 * 4096 * 4;

/// Upper bound for frames per audio pull.
pub const MAX_CHUNK_FRAMES: u32 = 1 << 16;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub display: DisplayConfig,
    pub memory: MemoryConfig,
    pub audio: AudioConfig,
    pub hotkeys: Hotkeys,
}

/// Logical size of both raster layers. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 384,
            height: 256,
        }
    }
}

impl DisplayConfig {
    /// Bytes in one RGBA8 layer, or `None` if that does not fit in `usize`.
    pub fn checked_layer_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(4)
    }

    /// Bytes in one RGBA8 layer. Saturates; [`BridgeConfig::validate`] rejects sizes that
    /// would.
    pub fn layer_len(&self) -> usize {
        self.checked_layer_len().unwrap_or(usize::MAX)
    }
}

/// Shape of the VM's addressable space, used to cap the ROM image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub address_space: u32,
    pub reserved_header: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            address_space: 0x1_0000,
            reserved_header: 0x100,
        }
    }
}

impl MemoryConfig {
    /// Largest ROM image that is loaded; anything past this is dropped.
    pub fn rom_capacity(&self) -> usize {
        self.address_space.saturating_sub(self.reserved_header) as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Frames per channel requested on each device pull.
    pub chunk_frames: u32,
    /// Output rate the device should be opened with. The bridge never resamples.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            chunk_frames: 1024,
            sample_rate: 44100,
        }
    }
}

/// Legacy key codes that trigger lifecycle actions instead of reaching the VM.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotkeys {
    pub save: Option<u32>,
    pub restore: Option<u32>,
    pub reset: Option<u32>,
}

impl BridgeConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.width == 0 || self.display.height == 0 {
            return Err(ConfigError::Invalid("display size must be non-zero"));
        }
        match self.display.checked_layer_len() {
            Some(len) if len <= MAX_LAYER_BYTES => {}
            _ => return Err(ConfigError::Invalid("display area exceeds 4096x4096 pixels")),
        }
        if self.audio.chunk_frames == 0 {
            return Err(ConfigError::Invalid("audio chunk must hold at least one frame"));
        }
        if self.audio.chunk_frames > MAX_CHUNK_FRAMES {
            return Err(ConfigError::Invalid("audio chunk is larger than 65536 frames"));
        }
        if self.memory.reserved_header >= self.memory.address_space {
            return Err(ConfigError::Invalid(
                "reserved header must be smaller than the address space",
            ));
        }
        Ok(())
    }
}
