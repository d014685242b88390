//! Response serialization and error pages.
//!
//! A response is written in three stages: status line (with the mandatory
//! `Server` and `Date` headers), further headers, then the body. Each write
//! goes straight to the underlying stream. Calls made out of order are
//! rejected with `InvalidInput` before any byte is written.

use crate::http::{date, status};
use bytes::{BufMut, BytesMut};
use std::io::{self, Write};
use std::net::SocketAddr;
use tracing::{info, warn};

/// Protocol version written on every status line.
pub const PROTOCOL_VERSION: &str = "HTTP/1.0";

/// Value of the `Server` header.
pub const SERVER_VERSION: &str = concat!("tiny-httpd/", env!("CARGO_PKG_VERSION"));

const ERROR_CONTENT_TYPE: &str = "text/html;charset=utf-8";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    StatusLine,
    Headers,
    Body,
}

/// Writes one response onto a connection.
pub struct ResponseWriter<'a> {
    out: &'a mut dyn Write,
    peer: SocketAddr,
    /// Decoded request line, for the access log.
    request_line: String,
    /// Request method, once the request line has been accepted.
    method: Option<String>,
    stage: Stage,
    status: Option<u16>,
}

impl<'a> ResponseWriter<'a> {
    pub fn new(out: &'a mut dyn Write, peer: SocketAddr) -> Self {
        Self {
            out,
            peer,
            request_line: String::new(),
            method: None,
            stage: Stage::StatusLine,
            status: None,
        }
    }

    pub(crate) fn set_request_line(&mut self, line: &str) {
        self.request_line = line.to_string();
    }

    pub(crate) fn set_method(&mut self, method: &str) {
        self.method = Some(method.to_string());
    }

    /// Status code of the response in progress, if the status line is out.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Write the status line followed by `Server` and `Date`.
    ///
    /// Without `message` the table's reason phrase is used (empty for
    /// unknown codes).
    pub fn send_response_header(&mut self, code: u16, message: Option<&str>) -> io::Result<()> {
        self.expect_stage(Stage::StatusLine, "status line already sent")?;

        let message = message.unwrap_or_else(|| status::reason_phrase(code));
        let mut line = BytesMut::with_capacity(PROTOCOL_VERSION.len() + message.len() + 8);
        encode_latin1(&format!("{} {} {}", PROTOCOL_VERSION, code, message), &mut line)?;
        line.put_slice(b"\r\n");

        info!(
            peer = %self.peer,
            request = %self.request_line,
            code,
            "Request"
        );

        self.out.write_all(&line)?;
        self.stage = Stage::Headers;
        self.status = Some(code);

        self.send_header("Server", SERVER_VERSION)?;
        self.send_header("Date", &date::date_time_string())
    }

    /// Append one `key: value` header line.
    pub fn send_header(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.expect_stage(Stage::Headers, "header sent outside the header block")?;
        if key.is_empty() || key.contains(':') {
            return Err(invalid_input(format!("invalid header name '{}'", key)));
        }

        let mut line = BytesMut::with_capacity(key.len() + value.len() + 4);
        encode_latin1(key, &mut line)?;
        line.put_slice(b": ");
        encode_latin1(value, &mut line)?;
        line.put_slice(b"\r\n");
        self.out.write_all(&line)
    }

    /// Terminate the header block.
    pub fn end_headers(&mut self) -> io::Result<()> {
        self.expect_stage(Stage::Headers, "header block not open")?;
        self.out.write_all(b"\r\n")?;
        self.stage = Stage::Body;
        Ok(())
    }

    /// Write body bytes. Only valid after [`end_headers`](Self::end_headers).
    pub fn write_body(&mut self, body: &[u8]) -> io::Result<()> {
        self.expect_stage(Stage::Body, "body written before end of headers")?;
        self.out.write_all(body)
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    /// Send a complete error response.
    ///
    /// Codes that forbid a body (1xx, 200, 204, 205, 304) get headers only.
    /// Responses to HEAD keep their headers but drop the body.
    pub fn send_error(&mut self, code: u16, message: Option<&str>) -> io::Result<()> {
        let (short, explain) = status::lookup(code).map_or(("???", "???"), |e| (e.short, e.long));
        let message = message.unwrap_or(short);

        warn!(peer = %self.peer, code, reason = message, "Sending error response");

        // The message may carry client bytes that cannot go on the status line.
        let status_message = if is_header_safe(message) { message } else { short };
        self.send_response_header(code, Some(status_message))?;

        let body = if status::forbids_body(code) {
            None
        } else {
            Some(render_error_body(code, message, explain))
        };

        if let Some(ref body) = body {
            self.send_header("Content-Type", ERROR_CONTENT_TYPE)?;
            self.send_header("Content-Length", &body.len().to_string())?;
        }
        self.end_headers()?;

        match body {
            Some(body) if self.method.as_deref() != Some("HEAD") => {
                self.write_body(body.as_bytes())
            }
            _ => Ok(()),
        }
    }

    fn expect_stage(&self, stage: Stage, violation: &str) -> io::Result<()> {
        if self.stage == stage {
            Ok(())
        } else {
            Err(invalid_input(violation.to_string()))
        }
    }
}

fn invalid_input(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, msg)
}

fn is_header_safe(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF && c != '\r' && c != '\n')
}

/// Encode header text as Latin-1, rejecting anything that would not
/// survive the trip or would break the line structure.
fn encode_latin1(text: &str, buf: &mut BytesMut) -> io::Result<()> {
    if !is_header_safe(text) {
        return Err(invalid_input(format!(
            "header text is not Latin-1 encodable: {:?}",
            text
        )));
    }
    buf.extend(text.chars().map(|c| c as u8));
    Ok(())
}

/// Escape text for inclusion in HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Render the HTML error page.
pub fn render_error_body(code: u16, message: &str, explain: &str) -> String {
    format!(
        r#"<!DOCTYPE HTML PUBLIC "-//W3C//DTD HTML 4.01//EN"
        "http://www.w3.org/TR/html4/strict.dtd">
<html>
    <head>
        <meta http-equiv="Content-Type" content="text/html;charset=utf-8">
        <title>Error</title>
    </head>
    <body>
        <h1>Error response</h1>
        <p>Error code: {code}</p>
        <p>Message: {message}.</p>
        <p>Error code explanation: {code} - {explain}.</p>
    </body>
</html>
"#,
        code = code,
        message = escape_html(message),
        explain = explain,
    )
}
