//! Incremental capture of one output pipe.

use std::io::{self, BufRead, BufReader, Read};

use super::{OutputListener, OutputStream};

/// Reads `reader` to EOF, forwarding each line to `listener` and returning
/// the raw bytes.
pub(super) fn capture(
    reader: impl Read,
    stream: OutputStream,
    listener: &dyn OutputListener,
) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(buffer);
        }
        let text = String::from_utf8_lossy(&line);
        listener.on_line(stream, text.trim_end_matches(['\n', '\r']));
        buffer.extend_from_slice(&line);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Lines(Mutex<Vec<(OutputStream, String)>>);

    impl OutputListener for Lines {
        fn on_line(&self, stream: OutputStream, line: &str) {
            self.0
                .lock()
                .expect("lines mutex poisoned")
                .push((stream, line.to_owned()));
        }
    }

    #[test]
    fn forwards_lines_and_keeps_bytes() {
        let listener = Lines::default();
        let bytes = capture(
            Cursor::new("first\r\nsecond\nthird"),
            OutputStream::Stderr,
            &listener,
        )
        .expect("capture");

        assert_eq!(bytes, b"first\r\nsecond\nthird");
        let lines = listener.0.into_inner().expect("lines mutex poisoned");
        assert_eq!(
            lines,
            vec![
                (OutputStream::Stderr, String::from("first")),
                (OutputStream::Stderr, String::from("second")),
                (OutputStream::Stderr, String::from("third")),
            ]
        );
    }

    #[test]
    fn empty_stream_yields_nothing() {
        let listener = Lines::default();
        let bytes = capture(Cursor::new(""), OutputStream::Stdout, &listener).expect("capture");
        assert!(bytes.is_empty());
        assert!(listener.0.into_inner().expect("poisoned").is_empty());
    }

    #[test]
    fn invalid_utf8_is_kept_verbatim() {
        let listener = Lines::default();
        let bytes = capture(
            Cursor::new(vec![0xff, b'a', b'\n']),
            OutputStream::Stdout,
            &listener,
        )
        .expect("capture");
        assert_eq!(bytes, vec![0xff, b'a', b'\n']);
        let lines = listener.0.into_inner().expect("poisoned");
        assert_eq!(lines.len(), 1);
    }
}
