//! HTTP request parser.
//!
//! Reads the request line and header block off a buffered stream:
//!
//! ```text
//! METHOD SP PATH [SP HTTP/major.minor] CRLF
//! (Header-Name ": " value CRLF)*
//! CRLF
//! ```
//!
//! The request line is decoded as Latin-1, header lines as UTF-8.
//! Nothing after the blank line is read.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, Read};
use std::num::IntErrorKind;

/// Per-request parsing limits.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Longest accepted request line or header line, in bytes.
    pub max_header_size: usize,
    /// Most header lines accepted in one request.
    pub max_headers: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_header_size: 65536,
            max_headers: 100,
        }
    }
}

/// Protocol version from the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_20: Version = Version { major: 2, minor: 0 };
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

/// A parsed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub version: Version,
    /// Header names are kept exactly as received.
    pub headers: HashMap<String, String>,
}

/// Request parsing errors
#[derive(Debug)]
pub enum ParseError {
    /// Version token is not `HTTP/<int>.<int>`
    BadVersion(String),
    /// Version 2.0 or later
    UnsupportedVersion(String),
    /// Request line has the wrong number of tokens
    BadSyntax(String),
    /// Header line without a `": "` separator or not valid UTF-8
    BadHeader(String),
    HeaderLineTooLong,
    TooManyHeaders,
    /// Underlying stream failure
    Io(io::Error),
}

impl ParseError {
    /// Status code reported to the client.
    pub fn status(&self) -> u16 {
        match self {
            ParseError::UnsupportedVersion(_) => 505,
            ParseError::Io(_) => 500,
            _ => 400,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BadVersion(v) => write!(f, "Bad request version ('{}')", v),
            ParseError::UnsupportedVersion(v) => write!(f, "Invalid HTTP Version ({})", v),
            ParseError::BadSyntax(line) => write!(f, "Bad request syntax ('{}')", line),
            ParseError::BadHeader(line) => write!(f, "Bad header line ('{}')", line),
            ParseError::HeaderLineTooLong => write!(f, "Header line too long"),
            ParseError::TooManyHeaders => write!(f, "Too many headers"),
            ParseError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ParseError {}

impl From<io::Error> for ParseError {
    fn from(e: io::Error) -> Self {
        ParseError::Io(e)
    }
}

/// Read one line (terminator included) of at most `limit` bytes.
///
/// A result of exactly `limit` bytes may be a truncated line.
pub fn read_line<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.take(limit as u64).read_until(b'\n', &mut line)?;
    Ok(line)
}

/// Decode the raw request line as Latin-1 and strip the line terminator.
pub fn decode_request_line(raw: &[u8]) -> String {
    let line: String = raw.iter().map(|&b| b as char).collect();
    line.trim_end_matches(['\r', '\n']).to_string()
}

/// Parse a decoded request line.
///
/// Returns `Ok(None)` for a blank line, which callers treat as "nothing to
/// do". The returned request has no headers yet.
pub fn parse_request_line(line: &str) -> Result<Option<Request>, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();

    let (method, path, version) = match words.as_slice() {
        [] => return Ok(None),
        [method, path] => (*method, *path, Version::HTTP_10),
        [method, path, raw_version] => (*method, *path, parse_version(raw_version)?),
        _ => return Err(ParseError::BadSyntax(line.to_string())),
    };

    Ok(Some(Request {
        method: method.to_string(),
        path: path.to_string(),
        version,
        headers: HashMap::new(),
    }))
}

fn parse_version(raw: &str) -> Result<Version, ParseError> {
    let number = raw
        .strip_prefix("HTTP/")
        .ok_or_else(|| ParseError::BadVersion(raw.to_string()))?;

    let (major, minor) = number
        .split_once('.')
        .filter(|(_, minor)| !minor.contains('.'))
        .ok_or_else(|| ParseError::BadVersion(raw.to_string()))?;

    let version = match (version_component(major), version_component(minor)) {
        (Some(major), Some(minor)) => Version { major, minor },
        _ => return Err(ParseError::BadVersion(raw.to_string())),
    };

    if version >= Version::HTTP_20 {
        return Err(ParseError::UnsupportedVersion(number.to_string()));
    }
    Ok(version)
}

/// Parse one side of `major.minor`. An all-digit number too large for `u32`
/// saturates, so an oversized major still compares as 2.0 or later.
fn version_component(s: &str) -> Option<u32> {
    match s.parse::<u32>() {
        Ok(n) => Some(n),
        Err(e)
            if *e.kind() == IntErrorKind::PosOverflow && s.bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(u32::MAX)
        }
        Err(_) => None,
    }
}

/// Read header lines up to and including the terminating blank line.
///
/// A bare CRLF, a bare LF, or end of stream ends the header block.
pub fn parse_headers<R: BufRead>(
    reader: &mut R,
    limits: &Limits,
) -> Result<HashMap<String, String>, ParseError> {
    let mut headers = HashMap::new();
    let mut count = 0;

    loop {
        let line = read_line(reader, limits.max_header_size + 1)?;
        if line.len() > limits.max_header_size {
            return Err(ParseError::HeaderLineTooLong);
        }
        if matches!(line.as_slice(), b"\r\n" | b"\n" | b"") {
            break;
        }

        count += 1;
        if count > limits.max_headers {
            return Err(ParseError::TooManyHeaders);
        }

        let text = std::str::from_utf8(&line).map_err(|_| {
            ParseError::BadHeader(String::from_utf8_lossy(&line).trim_end().to_string())
        })?;
        let text = text.trim_end_matches(['\r', '\n']);

        let (key, value) = text
            .split_once(": ")
            .ok_or_else(|| ParseError::BadHeader(text.to_string()))?;
        headers.insert(key.to_string(), value.trim().to_string());
    }

    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(line: &str) -> Result<Option<Request>, ParseError> {
        parse_request_line(line)
    }

    #[test]
    fn test_three_token_request_line() {
        for (line, version) in [
            ("GET /index.html HTTP/1.0", Version::HTTP_10),
            ("POST /submit HTTP/1.1", Version { major: 1, minor: 1 }),
            ("GET / HTTP/0.9", Version { major: 0, minor: 9 }),
        ] {
            let req = parse(line).unwrap().unwrap();
            let mut words = line.split(' ');
            assert_eq!(Some(req.method.as_str()), words.next());
            assert_eq!(Some(req.path.as_str()), words.next());
            assert_eq!(req.version, version);
            assert!(req.headers.is_empty());
        }
    }

    #[test]
    fn test_two_token_request_defaults_to_http_10() {
        let req = parse("GET /legacy").unwrap().unwrap();
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/legacy");
        assert_eq!(req.version, Version::HTTP_10);
    }

    #[test]
    fn test_blank_line_is_not_a_request() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("   \t ").unwrap().is_none());
    }

    #[test]
    fn test_wrong_token_count() {
        for line in ["GET", "GET / HTTP/1.0 extra", "a b c d e"] {
            match parse(line) {
                Err(e @ ParseError::BadSyntax(_)) => {
                    assert_eq!(e.status(), 400);
                    assert!(e.to_string().starts_with("Bad request syntax"));
                }
                other => panic!("unexpected for {line:?}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_bad_versions() {
        for line in [
            "GET / FTP/1.0",
            "GET / http/1.0",
            "GET / HTTP/1",
            "GET / HTTP/1.0.1",
            "GET / HTTP/a.b",
            "GET / HTTP/",
            "GET / HTTP/-1.0",
        ] {
            match parse(line) {
                Err(e @ ParseError::BadVersion(_)) => assert_eq!(e.status(), 400),
                other => panic!("unexpected for {line:?}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_http2_and_later_unsupported() {
        for (line, number) in [("GET / HTTP/2.0", "2.0"), ("GET / HTTP/3.1", "3.1")] {
            match parse(line) {
                Err(e @ ParseError::UnsupportedVersion(_)) => {
                    assert_eq!(e.status(), 505);
                    assert_eq!(e.to_string(), format!("Invalid HTTP Version ({number})"));
                }
                other => panic!("unexpected for {line:?}: {:?}", other),
            }
        }
    }

    #[test]
    fn test_oversized_version_numbers() {
        for (line, number) in [
            ("GET / HTTP/99999999999.0", "99999999999.0"),
            ("GET / HTTP/2.99999999999", "2.99999999999"),
        ] {
            match parse(line) {
                Err(e @ ParseError::UnsupportedVersion(_)) => {
                    assert_eq!(e.status(), 505);
                    assert_eq!(e.to_string(), format!("Invalid HTTP Version ({number})"));
                }
                other => panic!("unexpected for {line:?}: {:?}", other),
            }
        }

        let req = parse("GET / HTTP/1.99999999999").unwrap().unwrap();
        assert_eq!(req.version.major, 1);

        assert!(matches!(
            parse("GET / HTTP/+99999999999.0"),
            Err(ParseError::BadVersion(_))
        ));
    }

    #[test]
    fn test_decode_request_line_is_latin1() {
        assert_eq!(decode_request_line(b"GET /caf\xe9 HTTP/1.0\r\n"), "GET /café HTTP/1.0");
        assert_eq!(decode_request_line(b"GET /\n"), "GET /");
    }

    #[test]
    fn test_read_line_respects_limit() {
        let mut reader = Cursor::new(b"0123456789\r\nrest".to_vec());
        assert_eq!(read_line(&mut reader, 5).unwrap(), b"01234");

        let mut reader = Cursor::new(b"short\r\nrest".to_vec());
        assert_eq!(read_line(&mut reader, 100).unwrap(), b"short\r\n");
        assert_eq!(read_line(&mut reader, 100).unwrap(), b"rest");
        assert!(read_line(&mut reader, 100).unwrap().is_empty());
    }

    #[test]
    fn test_parse_headers() {
        let mut reader = Cursor::new(
            b"Host: example.com\r\nX-Padded:   spaced   \r\nAccept: a: b\r\n\r\nbody".to_vec(),
        );
        let headers = parse_headers(&mut reader, &Limits::default()).unwrap();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers["Host"], "example.com");
        assert_eq!(headers["X-Padded"], "spaced");
        assert_eq!(headers["Accept"], "a: b");
        assert!(!headers.contains_key("host"));

        // The body is left unread.
        let mut rest = String::new();
        reader.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "body");
    }

    #[test]
    fn test_header_block_terminators() {
        for input in [&b"A: 1\n\nB: 2\n"[..], b"A: 1\r\n", b"A: 1"] {
            let mut reader = Cursor::new(input.to_vec());
            let headers = parse_headers(&mut reader, &Limits::default()).unwrap();
            assert_eq!(headers.len(), 1);
            assert_eq!(headers["A"], "1");
        }
    }

    #[test]
    fn test_header_without_separator_rejected() {
        let mut reader = Cursor::new(b"Host:example.com\r\n\r\n".to_vec());
        match parse_headers(&mut reader, &Limits::default()) {
            Err(e @ ParseError::BadHeader(_)) => {
                assert_eq!(e.status(), 400);
                assert_eq!(e.to_string(), "Bad header line ('Host:example.com')");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_header_limits() {
        let limits = Limits {
            max_header_size: 16,
            max_headers: 2,
        };

        let mut reader = Cursor::new(b"X-Long: 0123456789abcdef\r\n\r\n".to_vec());
        assert!(matches!(
            parse_headers(&mut reader, &limits),
            Err(ParseError::HeaderLineTooLong)
        ));

        let mut reader = Cursor::new(b"A: 1\r\nB: 2\r\nC: 3\r\n\r\n".to_vec());
        assert!(matches!(
            parse_headers(&mut reader, &limits),
            Err(ParseError::TooManyHeaders)
        ));
    }

    #[test]
    fn test_non_utf8_header_rejected() {
        let mut reader = Cursor::new(b"X-Bad: \xff\xfe\r\n\r\n".to_vec());
        assert!(matches!(
            parse_headers(&mut reader, &Limits::default()),
            Err(ParseError::BadHeader(_))
        ));
    }
}
