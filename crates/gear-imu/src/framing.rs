//! Line reassembly for the IMU serial stream.
//!
//! The sensor emits `\r\n` terminated ASCII records with no length prefix,
//! so framing is recovered from the terminators alone. Anything between two
//! `\n` that does not end in `\r` is a corrupted fragment and is dropped.

use bytes::{Buf, BytesMut};

pub const DEFAULT_MAX_BUFFER_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub lines: u64,
    pub fragments_dropped: u64,
    pub non_utf8_dropped: u64,
    pub overflows: u64,
}

#[derive(Debug)]
pub struct FrameSync {
    buf: BytesMut,
    max_buffer_bytes: usize,
    stats: FrameStats,
}

impl FrameSync {
    pub fn new(max_buffer_bytes: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            max_buffer_bytes: max_buffer_bytes.max(1),
            stats: FrameStats::default(),
        }
    }

    /// Appends `raw` and returns every complete line, terminator stripped.
    /// The unterminated tail stays buffered for the next call.
    pub fn submit(&mut self, raw: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        self.buf.extend_from_slice(raw);

        while let Some(nl) = self.buf.iter().position(|b| *b == b'\n') {
            let seg = self.buf.split_to(nl);
            self.buf.advance(1); // '\n'

            let Some(body) = seg.strip_suffix(b"\r") else {
                self.stats.fragments_dropped += 1;
                continue;
            };
            match std::str::from_utf8(body) {
                Ok(line) => {
                    self.stats.lines += 1;
                    out.push(line.to_string());
                }
                Err(_) => self.stats.non_utf8_dropped += 1,
            }
        }

        if self.buf.len() > self.max_buffer_bytes {
            self.stats.overflows += 1;
            self.buf.clear();
        }
        out
    }

    /// Bytes held back as an in-progress line.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

impl Default for FrameSync {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BUFFER_BYTES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_line_split_across_reads() {
        let mut fs = FrameSync::default();

        let first = fs.submit(b"abc\r\nTeensyIMU partial");
        assert_eq!(first, vec!["abc".to_string()]);
        assert_eq!(fs.pending(), "TeensyIMU partial".len());

        let second = fs.submit(b" line rest\r\n");
        assert_eq!(second, vec!["TeensyIMU partial line rest".to_string()]);
        assert_eq!(fs.pending(), 0);
        assert_eq!(fs.stats().lines, 2);
    }

    #[test]
    fn empty_submit_is_noop() {
        let mut fs = FrameSync::default();
        assert!(fs.submit(b"").is_empty());

        assert_eq!(fs.submit(b"one\r\n"), vec!["one".to_string()]);
        assert!(fs.submit(b"").is_empty());
        assert!(fs.submit(b"").is_empty());

        fs.submit(b"tail");
        assert!(fs.submit(b"").is_empty());
        assert_eq!(fs.pending(), 4);
    }

    #[test]
    fn drops_unterminated_middle_segment() {
        let mut fs = FrameSync::default();
        let lines = fs.submit(b"good\r\ncorrupt\nalso good\r\n");
        assert_eq!(lines, vec!["good".to_string(), "also good".to_string()]);
        assert_eq!(fs.stats().fragments_dropped, 1);
    }

    #[test]
    fn terminator_split_between_reads() {
        let mut fs = FrameSync::default();
        assert!(fs.submit(b"xyz\r").is_empty());
        assert_eq!(fs.submit(b"\n"), vec!["xyz".to_string()]);
    }

    #[test]
    fn drops_non_utf8_line() {
        let mut fs = FrameSync::default();
        let lines = fs.submit(b"\xff\xfe\r\nok\r\n");
        assert_eq!(lines, vec!["ok".to_string()]);
        assert_eq!(fs.stats().non_utf8_dropped, 1);
    }

    #[test]
    fn overflow_discards_buffer() {
        let mut fs = FrameSync::new(16);
        assert!(fs.submit(&[b'a'; 20]).is_empty());
        assert_eq!(fs.pending(), 0);
        assert_eq!(fs.stats().overflows, 1);

        // recovers on the next clean line
        assert_eq!(fs.submit(b"ok\r\n"), vec!["ok".to_string()]);
    }
}
