#![forbid(unsafe_code)]

//! Line-oriented writer used to forward formatted `tracing` output to the
//! browser console.

use std::io;

/// Buffers bytes and hands complete lines to `emit`.
///
/// Any trailing partial line is emitted on drop, so one formatted event
/// always reaches the console even without a final newline.
pub struct LineForwarder<F: FnMut(&str)> {
    buf: Vec<u8>,
    emit: F,
}

impl<F: FnMut(&str)> LineForwarder<F> {
    pub fn new(emit: F) -> Self {
        Self {
            buf: Vec::new(),
            emit,
        }
    }

    fn emit_complete_lines(&mut self) {
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..line.len() - 1]);
            (self.emit)(text.trim_end_matches('\r'));
        }
    }
}

impl<F: FnMut(&str)> io::Write for LineForwarder<F> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        self.emit_complete_lines();
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit_complete_lines();
        Ok(())
    }
}

impl<F: FnMut(&str)> Drop for LineForwarder<F> {
    fn drop(&mut self) {
        self.emit_complete_lines();
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            (self.emit)(&String::from_utf8_lossy(&rest));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn forwards_one_call_per_line() {
        let mut lines = Vec::new();
        {
            let mut writer = LineForwarder::new(|line: &str| lines.push(line.to_owned()));
            writer.write_all(b" INFO framewatch: iframe ").unwrap();
            writer.write_all(b"loaded\r\n DEBUG second\n").unwrap();
        }
        assert_eq!(lines, vec![" INFO framewatch: iframe loaded", " DEBUG second"]);
    }

    #[test]
    fn trailing_fragment_is_emitted_on_drop() {
        let mut lines = Vec::new();
        {
            let mut writer = LineForwarder::new(|line: &str| lines.push(line.to_owned()));
            writer.write_all(b"no newline").unwrap();
            writer.flush().unwrap();
        }
        assert_eq!(lines, vec!["no newline"]);
    }
}
