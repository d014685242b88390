//! HTTP/1.0 protocol implementation.
//!
//! - `parser`: request line and header parsing
//! - `response`: status line, header and body serialization, error pages
//! - `status`: status code table
//! - `date`: `Date` header formatting
//! - `router`: method → handler registry
//! - `connection`: the per-connection request lifecycle

pub mod connection;
pub mod date;
pub mod parser;
pub mod response;
pub mod router;
pub mod status;

pub use parser::{Limits, Request};
pub use response::ResponseWriter;
pub use router::Router;
