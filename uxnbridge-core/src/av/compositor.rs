use crate::config::DisplayConfig;
use crate::error::BridgeError;
use crate::memory::checked_range;
use std::io::Write;

/// A borrowed RGBA8 frame, row-major, no padding.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub width: u32,
    pub height: u32,
    pub rgba: &'a [u8],
}

impl Frame<'_> {
    /// Encode the frame as an 8-bit RGBA PNG.
    pub fn write_png<W: Write>(&self, out: W) -> Result<(), png::EncodingError> {
        let mut encoder = png::Encoder::new(out, self.width, self.height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(self.rgba)?;
        writer.finish()
    }
}

/// Backend that can show a pixel buffer.
pub trait FrameSink: Send {
    fn present(&mut self, frame: Frame<'_>);
}

/// Discards every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: Frame<'_>) {}
}

/// Owns the background and foreground layers plus the composited output.
///
/// Buffers are allocated once for the session's display size and reused every frame.
pub struct Compositor {
    width: u32,
    height: u32,
    background: Vec<u8>,
    foreground: Vec<u8>,
    output: Vec<u8>,
    presented: u64,
    sink: Box<dyn FrameSink>,
}

impl Compositor {
    pub fn new(display: DisplayConfig, sink: Box<dyn FrameSink>) -> Self {
        let len = display.layer_len();
        Self {
            width: display.width,
            height: display.height,
            background: vec![0; len],
            foreground: vec![0; len],
            output: vec![0; len],
            presented: 0,
            sink,
        }
    }

    pub fn layer_len(&self) -> usize {
        self.output.len()
    }

    /// Copy both layers out of guest memory, blend, and present.
    ///
    /// Both ranges are validated before anything is copied, so a bad address leaves the
    /// previous frame untouched.
    pub fn render(&mut self, memory: &[u8], bg_ptr: u32, fg_ptr: u32) -> Result<(), BridgeError> {
        let len = self.layer_len();
        let bg = checked_range(memory.len(), bg_ptr, len)?;
        let fg = checked_range(memory.len(), fg_ptr, len)?;

        self.background.copy_from_slice(&memory[bg]);
        self.foreground.copy_from_slice(&memory[fg]);
        composite_over(&self.background, &self.foreground, &mut self.output);

        self.presented += 1;
        let frame = Frame {
            width: self.width,
            height: self.height,
            rgba: &self.output,
        };
        self.sink.present(frame);
        Ok(())
    }

    /// The most recent composited frame (all zero before the first render).
    pub fn frame(&self) -> Frame<'_> {
        Frame {
            width: self.width,
            height: self.height,
            rgba: &self.output,
        }
    }

    /// Number of frames presented since the session started.
    pub fn presented(&self) -> u64 {
        self.presented
    }
}

/// Source-over alpha compositing of `fg` onto `bg`, per RGBA8 pixel:
/// `out = fg * a + bg * (1 - a)` for colour, `out_a = a + bg_a * (1 - a)` for alpha.
pub fn composite_over(bg: &[u8], fg: &[u8], out: &mut [u8]) {
    for ((o, b), f) in out
        .chunks_exact_mut(4)
        .zip(bg.chunks_exact(4))
        .zip(fg.chunks_exact(4))
    {
        let a = f[3] as u32;
        for c in 0..3 {
            o[c] = blend_channel(f[c] as u32, b[c] as u32, a);
        }
        o[3] = blend_channel(255, b[3] as u32, a);
    }
}

#[inline]
fn blend_channel(fg: u32, bg: u32, alpha: u32) -> u8 {
    ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8
}
