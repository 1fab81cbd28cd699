/// Maximum number of content bytes in one command line.
pub const MAX_LINE: usize = 9;

/// Accumulates transport bytes into terminated command lines.
///
/// The buffer holds nine content bytes plus the terminator slot. A
/// line feed completes the line; a preceding carriage return is folded
/// into the terminator so CRLF and bare LF arrive identically. Filling
/// the last slot with anything other than a line feed silently drops
/// the input accumulated so far.
pub struct LineFramer {
    buf: [u8; MAX_LINE + 1],
    pos: usize,
}

impl LineFramer {
    pub fn new() -> LineFramer {
        LineFramer {
            buf: [0; MAX_LINE + 1],
            pos: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pos = 0;
    }

    /// Feed one byte. Returns the content of a completed line, without
    /// the terminator.
    pub fn push(&mut self, byte: u8) -> Option<&[u8]> {
        self.buf[self.pos] = byte;
        if byte == b'\n' {
            let mut end = self.pos;
            if end > 0 && self.buf[end - 1] == b'\r' {
                end -= 1;
            }
            self.pos = 0;
            Some(&self.buf[..end])
        } else if self.pos == MAX_LINE {
            // Overflow: drop the line, report nothing.
            self.pos = 0;
            None
        } else {
            self.pos += 1;
            None
        }
    }
}

impl Default for LineFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn feed<'a>(framer: &'a mut LineFramer, bytes: &[u8]) -> Option<Vec<u8>> {
        let mut line = None;
        for &b in bytes {
            if let Some(l) = framer.push(b) {
                assert!(line.is_none(), "more than one line completed");
                line = Some(l.to_vec());
            }
        }
        line
    }

    #[test]
    fn lf_terminates() {
        let mut framer = LineFramer::new();
        assert_eq!(feed(&mut framer, b"b1\n").as_deref(), Some(&b"b1"[..]));
    }

    #[test]
    fn crlf_normalized() {
        let mut framer = LineFramer::new();
        assert_eq!(
            feed(&mut framer, b"da12100\r\n").as_deref(),
            Some(&b"da12100"[..])
        );
        // Bare LF parses the same.
        assert_eq!(
            feed(&mut framer, b"da12100\n").as_deref(),
            Some(&b"da12100"[..])
        );
    }

    #[test]
    fn empty_lines() {
        let mut framer = LineFramer::new();
        assert_eq!(feed(&mut framer, b"\n").as_deref(), Some(&b""[..]));
        assert_eq!(feed(&mut framer, b"\r\n").as_deref(), Some(&b""[..]));
    }

    #[test]
    fn nine_content_bytes_accepted() {
        let mut framer = LineFramer::new();
        assert_eq!(
            feed(&mut framer, b"cm0110051\n").as_deref(),
            Some(&b"cm0110051"[..])
        );
    }

    #[test]
    fn overflow_resets_silently() {
        let mut framer = LineFramer::new();
        assert_eq!(feed(&mut framer, b"0123456789"), None);
        // The framer has recovered; the next terminator yields only
        // what arrived after the reset.
        assert_eq!(feed(&mut framer, b"\n").as_deref(), Some(&b""[..]));
        assert_eq!(feed(&mut framer, b"b1\n").as_deref(), Some(&b"b1"[..]));
    }
}
