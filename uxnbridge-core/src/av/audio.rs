use crate::error::BridgeError;
use crate::runtime::Vm;

/// Bytes per sample: the guest writes 32-bit little-endian floats.
const SAMPLE_BYTES: usize = 4;

/// One device pull worth of audio, split per channel.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AudioChunk {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
}

impl AudioChunk {
    pub fn silent(frames: usize) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    /// Make both channels exactly `frames` long. Allocates only when growing past capacity.
    pub fn resize(&mut self, frames: usize) {
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
    }

    pub fn silence(&mut self) {
        self.left.fill(0.0);
        self.right.fill(0.0);
    }
}

/// Audio output that may start suspended until the user interacts with the page/window.
pub trait AudioDevice: Send {
    fn resume(&mut self) -> anyhow::Result<()>;
}

/// Pull-model streamer: each device callback reads one fixed-size chunk from the guest.
///
/// The device owns the chunk buffers and hands one back with every pull, so steady-state
/// streaming does not allocate. Nothing is buffered across pulls; if the device and the
/// guest drift apart the result is audible, not corrected.
#[derive(Copy, Clone, Debug)]
pub struct AudioStreamer {
    frames: usize,
}

impl AudioStreamer {
    pub fn new(chunk_frames: u32) -> Self {
        Self {
            frames: chunk_frames as usize,
        }
    }

    pub fn chunk_frames(&self) -> usize {
        self.frames
    }

    /// Fill `chunk` from the guest's sample buffer.
    ///
    /// The buffer address is re-queried on every pull. Guests without `getAudioSamples`
    /// produce silence.
    pub fn pull_into(&self, vm: &mut Vm, chunk: &mut AudioChunk) -> Result<(), BridgeError> {
        chunk.resize(self.frames);
        let Some(ptr) = vm.audio_samples_ptr()? else {
            chunk.silence();
            return Ok(());
        };

        let bytes = vm.read(ptr, self.frames * 2 * SAMPLE_BYTES)?;
        split_planar(bytes, &mut chunk.left, &mut chunk.right);
        Ok(())
    }
}

/// Decode `left.len() + right.len()` LE f32 samples: the first run fills `left`, the next
/// fills `right`.
pub fn split_planar(bytes: &[u8], left: &mut [f32], right: &mut [f32]) {
    let (left_bytes, right_bytes) = bytes.split_at(left.len() * SAMPLE_BYTES);
    decode_f32_le(left_bytes, left);
    decode_f32_le(right_bytes, right);
}

fn decode_f32_le(bytes: &[u8], out: &mut [f32]) {
    for (dst, src) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_BYTES)) {
        *dst = f32::from_le_bytes([src[0], src[1], src[2], src[3]]);
    }
}

/// Retries resuming a suspended device on each qualifying user gesture until it succeeds.
pub struct AudioResume {
    device: Option<Box<dyn AudioDevice>>,
    pending: bool,
}

impl AudioResume {
    pub fn new(device: Option<Box<dyn AudioDevice>>) -> Self {
        let pending = device.is_some();
        Self { device, pending }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn on_gesture(&mut self) {
        if !self.pending {
            return;
        }
        let Some(device) = self.device.as_mut() else {
            return;
        };
        match device.resume() {
            Ok(()) => {
                log::info!("audio device resumed");
                self.pending = false;
            }
            Err(e) => log::debug!("audio device not resumable yet: {e:#}"),
        }
    }
}
