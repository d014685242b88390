//! Status code table.
//!
//! Maps each known status code to its reason phrase and a longer
//! explanation used in error pages. The table is sorted by code and
//! never mutated.

/// A known status code with its short and long descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEntry {
    pub code: u16,
    /// Reason phrase for the status line.
    pub short: &'static str,
    /// Explanation rendered into error bodies.
    pub long: &'static str,
}

const fn entry(code: u16, short: &'static str, long: &'static str) -> StatusEntry {
    StatusEntry { code, short, long }
}

static STATUS_TABLE: &[StatusEntry] = &[
    entry(100, "Continue", "Request received, please continue"),
    entry(101, "Switching Protocols", "Switching to new protocol; obey Upgrade header"),
    entry(200, "OK", "Request fulfilled, document follows"),
    entry(201, "Created", "Document created, URL follows"),
    entry(202, "Accepted", "Request accepted, processing continues off-line"),
    entry(203, "Non-Authoritative Information", "Request fulfilled from cache"),
    entry(204, "No Content", "Request fulfilled, nothing follows"),
    entry(205, "Reset Content", "Clear input form for further input"),
    entry(206, "Partial Content", "Partial content follows"),
    entry(300, "Multiple Choices", "Object has several resources -- see URI list"),
    entry(301, "Moved Permanently", "Object moved permanently -- see URI list"),
    entry(302, "Found", "Object moved temporarily -- see URI list"),
    entry(303, "See Other", "Object moved -- see Method and URL list"),
    entry(304, "Not Modified", "Document has not changed since given time"),
    entry(305, "Use Proxy", "You must use proxy specified in Location to access this resource"),
    entry(307, "Temporary Redirect", "Object moved temporarily -- see URI list"),
    entry(400, "Bad Request", "Bad request syntax or unsupported method"),
    entry(401, "Unauthorized", "No permission -- see authorization schemes"),
    entry(402, "Payment Required", "No payment -- see charging schemes"),
    entry(403, "Forbidden", "Request forbidden -- authorization will not help"),
    entry(404, "Not Found", "Nothing matches the given URI"),
    entry(405, "Method Not Allowed", "Specified method is invalid for this resource"),
    entry(406, "Not Acceptable", "URI not available in preferred format"),
    entry(407, "Proxy Authentication Required", "You must authenticate with this proxy before proceeding"),
    entry(408, "Request Timeout", "Request timed out; try again later"),
    entry(409, "Conflict", "Request conflict"),
    entry(410, "Gone", "URI no longer exists and has been permanently removed"),
    entry(411, "Length Required", "Client must specify Content-Length"),
    entry(412, "Precondition Failed", "Precondition in headers is false"),
    entry(413, "Request Entity Too Large", "Entity is too large"),
    entry(414, "Request-URI Too Long", "URI is too long"),
    entry(415, "Unsupported Media Type", "Entity body in unsupported format"),
    entry(416, "Requested Range Not Satisfiable", "Cannot satisfy request range"),
    entry(417, "Expectation Failed", "Expect condition could not be satisfied"),
    entry(500, "Internal Server Error", "Server got itself in trouble"),
    entry(501, "Not Implemented", "Server does not support this operation"),
    entry(502, "Bad Gateway", "Invalid responses from another server/proxy"),
    entry(503, "Service Unavailable", "The server cannot process the request due to a high load"),
    entry(504, "Gateway Timeout", "The gateway server did not receive a timely response"),
    entry(505, "HTTP Version Not Supported", "Cannot fulfill request"),
];

/// Look up a status code.
pub fn lookup(code: u16) -> Option<&'static StatusEntry> {
    STATUS_TABLE
        .binary_search_by_key(&code, |e| e.code)
        .ok()
        .map(|idx| &STATUS_TABLE[idx])
}

/// Reason phrase for `code`, or an empty string if unknown.
pub fn reason_phrase(code: u16) -> &'static str {
    lookup(code).map_or("", |e| e.short)
}

/// Whether a response with this status must not carry a body.
pub fn forbids_body(code: u16) -> bool {
    code <= 200 || matches!(code, 204 | 205 | 304)
}
