use std::collections::VecDeque;

use crate::error::{ProviderError, Result};

/// Byte buffer that hands out complete `\n`-terminated lines.
/// Chunks from the network can split lines (and UTF-8 sequences) anywhere.
pub struct LineBuffer {
    buffer: VecDeque<u8>,
}

impl LineBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
        }
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete line, trimmed. None until a newline has arrived.
    pub fn next_line(&mut self) -> Option<Result<String>> {
        let newline_pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();

        match String::from_utf8(line_bytes) {
            Ok(line) => Some(Ok(line.trim().to_string())),
            Err(e) => Some(Err(ProviderError::Decode(format!("invalid UTF-8 in stream: {}", e)))),
        }
    }

    /// Whatever is left after the stream closed without a trailing newline
    pub fn take_remainder(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        let line = String::from_utf8_lossy(&rest).trim().to_string();
        (!line.is_empty()).then_some(line)
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
