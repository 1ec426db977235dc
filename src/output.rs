//! Growable byte buffer flushed in one write per render cycle (spec.md
//! §4.2) -- the sole mechanism used to avoid intra-frame flicker.

use std::io::{self, Write};

#[derive(Default)]
pub struct OutputBuffer {
    buf: Vec<u8>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Issues exactly one write of the accumulated bytes to `out`, then
    /// frees the buffer.
    pub fn flush_to<W: Write>(mut self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.buf)?;
        out.flush()?;
        self.buf.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_write_contains_all_appended_bytes() {
        let mut ob = OutputBuffer::new();
        ob.append(b"\x1b[?25l");
        ob.append(b"\x1b[H");
        ob.append(b"hello");
        let mut sink = Vec::new();
        ob.flush_to(&mut sink).unwrap();
        assert_eq!(sink, b"\x1b[?25l\x1b[Hhello");
    }
}
