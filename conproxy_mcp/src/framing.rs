//! Length-framed JSON-RPC reader/writer: `Content-Length: N\r\n\r\n<body>`.

use std::io::{self, BufRead, Write};

/// Read one length-framed message body from `reader`. Returns `Ok(None)` on
/// a clean EOF before any header line is read. A malformed header line is
/// skipped; the reader resyncs on the next line that parses as
/// `Content-Length:`.
pub fn read_message<R: BufRead>(reader: &mut R) -> io::Result<Option<String>> {
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            return Ok(None);
        }

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() {
            // Blank line: header block ended.
            match content_length {
                Some(len) => break read_exact_body(reader, len).map(Some),
                None => continue,
            }
        }

        if let Some(value) = trimmed.strip_prefix("Content-Length:") {
            if let Ok(len) = value.trim().parse::<usize>() {
                content_length = Some(len);
            }
            // Malformed value: ignore the line and keep scanning.
        }
        // Any other header line is ignored per the framing grammar.
    }
}

fn read_exact_body<R: BufRead>(reader: &mut R, len: usize) -> io::Result<String> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Write one length-framed message to `writer`.
pub fn write_message<W: Write>(writer: &mut W, body: &str) -> io::Result<()> {
    write!(writer, "Content-Length: {}\r\n\r\n{}", body.len(), body)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_a_single_message() {
        let mut buf = Vec::new();
        write_message(&mut buf, r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        let mut cursor = Cursor::new(buf);
        let body = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(body, r#"{"jsonrpc":"2.0","id":1}"#);
    }

    #[test]
    fn reads_two_successive_messages() {
        let mut buf = Vec::new();
        write_message(&mut buf, "one").unwrap();
        write_message(&mut buf, "two").unwrap();
        let mut cursor = Cursor::new(buf);
        assert_eq!(read_message(&mut cursor).unwrap().unwrap(), "one");
        assert_eq!(read_message(&mut cursor).unwrap().unwrap(), "two");
        assert!(read_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn skips_unrecognised_header_lines() {
        let raw = b"X-Custom: ignored\r\nContent-Length: 4\r\n\r\nbody";
        let mut cursor = Cursor::new(raw.to_vec());
        let body = read_message(&mut cursor).unwrap().unwrap();
        assert_eq!(body, "body");
    }

    #[test]
    fn clean_eof_before_any_header_yields_none() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_message(&mut cursor).unwrap().is_none());
    }
}
