//! Audio/Video plumbing for uxnbridge-core.
//!
//! - Video: the guest calls `render(bg, fg)` with two RGBA8 layers in its own memory. The host
//!   copies both into host-owned layers, composites foreground over background, and hands the
//!   result to a [`FrameSink`].
//!
//! - Audio: the device pulls. On each pull the host asks the guest where its sample buffer is,
//!   reads one chunk of planar f32 samples (left run, then right run), and returns it.
//!
//! Notes / limitations:
//! - We always copy out of guest memory (no zero-copy).
//! - Display size is fixed per session; no resizing.
//! - No resampling and no buffering beyond the single in-flight chunk.

pub mod audio;
pub mod compositor;


pub use audio::{AudioChunk, AudioDevice, AudioResume, AudioStreamer};
pub use compositor::{Compositor, Frame, FrameSink, NullSink};
