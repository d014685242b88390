//! Per-connection request lifecycle.
//!
//! One connection carries exactly one request:
//!
//! ```text
//! setup → read request line → parse headers → dispatch → flush → finish
//! ```
//!
//! Parse failures are answered here with the matching status and never
//! reach the caller. A socket timeout at any step drops the request
//! without a response. `finish` runs on every path.

use crate::http::parser::{self, Limits, ParseError, Request};
use crate::http::response::ResponseWriter;
use crate::http::router::Router;
use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use tracing::{debug, warn};

/// State for one request on one connection.
pub struct Connection<'a, R> {
    reader: R,
    out: ResponseWriter<'a>,
    router: &'a Router,
    limits: Limits,
    peer: SocketAddr,
}

impl<'a, R: BufRead> Connection<'a, R> {
    /// Pair a buffered reader with an unbuffered writer for one request.
    pub fn setup(
        reader: R,
        writer: &'a mut dyn Write,
        peer: SocketAddr,
        router: &'a Router,
        limits: Limits,
    ) -> Self {
        Self {
            reader,
            out: ResponseWriter::new(writer, peer),
            router,
            limits,
            peer,
        }
    }

    /// Process the request. Timeouts become a silent abort.
    pub fn handle(&mut self) -> io::Result<()> {
        match self.handle_one_request() {
            Err(e) if is_timeout(&e) => {
                warn!(peer = %self.peer, error = %e, "Request timed out");
                Ok(())
            }
            other => other,
        }
    }

    fn handle_one_request(&mut self) -> io::Result<()> {
        let max = self.limits.max_header_size;
        let raw_request_line = parser::read_line(&mut self.reader, max + 1)?;
        if raw_request_line.len() > max {
            return self.out.send_error(414, None);
        }

        let request = match self.parse_request(&raw_request_line) {
            Ok(Some(request)) => request,
            Ok(None) => {
                debug!(peer = %self.peer, "Empty request line");
                return Ok(());
            }
            Err(ParseError::Io(e)) => return Err(e),
            Err(e) => return self.out.send_error(e.status(), Some(&e.to_string())),
        };

        let handler = match self.router.resolve(&request.method) {
            Some(handler) => handler,
            None => {
                let message = format!("Unsupported method ('{}')", request.method);
                return self.out.send_error(501, Some(&message));
            }
        };

        debug!(
            peer = %self.peer,
            method = %request.method,
            path = %request.path,
            version = %request.version,
            headers = request.headers.len(),
            "Dispatching request"
        );
        handler(&request, &mut self.out)?;
        self.out.flush()?;
        debug!(peer = %self.peer, status = ?self.out.status(), "Response sent");
        Ok(())
    }

    fn parse_request(&mut self, raw: &[u8]) -> Result<Option<Request>, ParseError> {
        let line = parser::decode_request_line(raw);
        self.out.set_request_line(&line);

        let mut request = match parser::parse_request_line(&line)? {
            Some(request) => request,
            None => return Ok(None),
        };
        self.out.set_method(&request.method);

        request.headers = parser::parse_headers(&mut self.reader, &self.limits)?;
        Ok(Some(request))
    }

    /// Flush and release both streams.
    ///
    /// A peer that already went away is not an error here.
    pub fn finish(mut self) -> io::Result<()> {
        match self.out.flush() {
            Err(e) if is_disconnect(&e) => {
                debug!(peer = %self.peer, error = %e, "Peer gone before flush");
                Ok(())
            }
            other => other,
        }
    }
}

/// Run one request over a reader/writer pair, always finishing.
pub fn serve<R: BufRead>(
    reader: R,
    writer: &mut dyn Write,
    peer: SocketAddr,
    router: &Router,
    limits: Limits,
) -> io::Result<()> {
    let mut conn = Connection::setup(reader, writer, peer, router, limits);
    let handled = conn.handle();
    let finished = conn.finish();
    handled.and(finished)
}

/// Read/write timeouts surface as `WouldBlock` on Unix and `TimedOut` elsewhere.
pub fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::BrokenPipe | io::ErrorKind::NotConnected | io::ErrorKind::ConnectionReset
    )
}
