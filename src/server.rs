//! Listening socket, readiness loop and acceptor.
//!
//! The listener is registered with mio and the loop blocks in `poll` for at
//! most the poll interval. Once the listener is readable, pending
//! connections are accepted one at a time and each is served to completion
//! with ordinary blocking I/O before the next `accept`. A failure or panic
//! while serving one connection is logged and that connection is closed;
//! the loop keeps running.

use crate::config::Config;
use crate::http::connection;
use crate::http::{Limits, Router};
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use std::any::Any;
use std::io::{self, BufReader};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const LISTENER_TOKEN: Token = Token(0);

/// Result of one attempt to accept and serve a pending connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accept {
    /// A connection was accepted and served.
    Served,
    /// The attempt failed but the queue may still hold connections.
    Retry,
    /// The accept queue is empty.
    Drained,
    /// Accepting failed for a reason that may not clear on its own.
    Stalled,
}

/// Accept until the queue is empty or accepting stalls.
///
/// Returns the number served and whether the listener needs re-arming.
fn drain(mut accept: impl FnMut() -> Accept) -> (usize, bool) {
    let mut served = 0;
    loop {
        match accept() {
            Accept::Served => served += 1,
            Accept::Retry => {}
            Accept::Drained => return (served, false),
            Accept::Stalled => return (served, true),
        }
    }
}

/// Server instance
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    poll: Poll,
    events: Events,
    router: Router,
    limits: Limits,
    /// Read/write timeout applied to accepted connections.
    timeout: Option<Duration>,
}

impl Server {
    /// Bind and activate the listening socket.
    pub fn bind(config: &Config, router: Router) -> io::Result<Self> {
        let addr = config
            .bind_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

        let listener = create_listener(addr, config.backlog)?;
        let local_addr = listener.local_addr()?;

        let poll = Poll::new()?;
        poll.registry().register(
            &mut SourceFd(&listener.as_raw_fd()),
            LISTENER_TOKEN,
            Interest::READABLE,
        )?;

        info!(
            address = %local_addr,
            backlog = config.backlog,
            methods = ?router.methods(),
            "Server listening"
        );

        Ok(Server {
            listener,
            local_addr,
            poll,
            events: Events::with_capacity(8),
            router,
            limits: Limits {
                max_header_size: config.max_header_size,
                max_headers: config.max_headers,
            },
            timeout: config.timeout,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until the process is killed.
    pub fn serve_forever(&mut self, poll_interval: Duration) -> io::Result<()> {
        loop {
            self.poll_once(Some(poll_interval))?;
        }
    }

    /// Wait up to `timeout` for the listener and serve whatever is pending.
    ///
    /// Returns the number of connections served.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> io::Result<usize> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(0),
            Err(e) => return Err(e),
        }

        let ready = self
            .events
            .iter()
            .any(|event| event.token() == LISTENER_TOKEN);
        if !ready {
            return Ok(0);
        }

        // Readiness is edge-triggered: drain the accept queue so no pending
        // connection is left without a wakeup.
        let (served, rearm) = drain(|| self.handle_request_noblock());
        if rearm {
            // Re-registering makes the kernel report the still-pending queue
            // on the next poll.
            self.poll.registry().reregister(
                &mut SourceFd(&self.listener.as_raw_fd()),
                LISTENER_TOKEN,
                Interest::READABLE,
            )?;
        }
        Ok(served)
    }

    /// Accept and serve one connection.
    fn handle_request_noblock(&self) -> Accept {
        let (stream, peer) = match self.listener.accept() {
            Ok(pair) => pair,
            Err(e) => return accept_failed(&e),
        };

        debug!(peer = %peer, "Accepted connection");
        self.process_request(stream, peer);
        Accept::Served
    }

    fn process_request(&self, stream: TcpStream, peer: SocketAddr) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.handle_request(&stream, peer)));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => handle_error(peer, &e),
            Err(payload) => handle_panic(peer, &*payload),
        }
        shutdown_request(stream, peer);
    }

    fn handle_request(&self, stream: &TcpStream, peer: SocketAddr) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;

        let reader = BufReader::new(stream);
        let mut writer = stream;
        connection::serve(reader, &mut writer, peer, &self.router, self.limits)
    }
}

fn accept_failed(e: &io::Error) -> Accept {
    match e.kind() {
        io::ErrorKind::WouldBlock => Accept::Drained,
        io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => {
            debug!(error = %e, "Accept failed, retrying");
            Accept::Retry
        }
        _ => {
            warn!(error = %e, "Accept failed");
            Accept::Stalled
        }
    }
}

fn handle_error(peer: SocketAddr, e: &io::Error) {
    error!(peer = %peer, error = %e, "Error while processing request");
}

fn handle_panic(peer: SocketAddr, payload: &(dyn Any + Send)) {
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    error!(peer = %peer, panic = message, "Handler panicked while processing request");
}

/// Half-close then close. `ENOTCONN` on shutdown is expected on some platforms.
fn shutdown_request(stream: TcpStream, peer: SocketAddr) {
    if let Err(e) = stream.shutdown(Shutdown::Write) {
        debug!(peer = %peer, error = %e, "Shutdown failed");
    }
    drop(stream);
    debug!(peer = %peer, "Connection closed");
}

/// Create a non-blocking TCP listener with `SO_REUSEADDR` and the given backlog.
fn create_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;

    Ok(socket.into())
}
