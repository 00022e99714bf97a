//! Host-side state reachable from guest callbacks.
//!
//! This lives in the wasmtime `Store` data, so host imports reach it through their `Caller`
//! while the guest runs, and the session reaches it through the store between calls.

use crate::av::{Compositor, FrameSink};
use crate::clock::Clock;
use crate::config::DisplayConfig;
use crate::console::{Console, ConsoleSink};

pub struct BridgeState {
    pub compositor: Compositor,
    pub console: Console,
    pub clock: Box<dyn Clock>,
}

impl BridgeState {
    pub fn new(
        display: DisplayConfig,
        frames: Box<dyn FrameSink>,
        console: Box<dyn ConsoleSink>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            compositor: Compositor::new(display, frames),
            console: Console::new(console),
            clock,
        }
    }
}
