//! Line-buffered diagnostic channel fed one byte at a time by the guest.

/// Receives each completed console line.
pub trait ConsoleSink: Send {
    fn line(&mut self, line: &str);
}

/// Logs every line at `info` on target `uxnbridge::guest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConsole;

impl ConsoleSink for LogConsole {
    fn line(&mut self, line: &str) {
        log::info!(target: "uxnbridge::guest", "{line}");
    }
}

pub struct Console {
    buffer: String,
    sink: Box<dyn ConsoleSink>,
}

impl Console {
    pub fn new(sink: Box<dyn ConsoleSink>) -> Self {
        Self {
            buffer: String::new(),
            sink,
        }
    }

    /// Append one byte; `\n` completes the line instead of being buffered.
    pub fn push(&mut self, byte: u8) {
        if byte == b'\n' {
            self.sink.line(&self.buffer);
            self.buffer.clear();
        } else {
            // Bytes map 1:1 onto U+0000..=U+00FF.
            self.buffer.push(char::from(byte));
        }
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Terminate a partially written line, if any.
    pub fn flush_pending(&mut self) {
        if !self.buffer.is_empty() {
            self.push(b'\n');
        }
    }

    pub fn pending(&self) -> &str {
        &self.buffer
    }
}
