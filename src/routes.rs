//! Example application routes.
//!
//! - `GET /` serves a static index page
//! - `GET /favicon*` serves a placeholder page
//! - any other `GET` path is a 404
//!
//! Every page is rendered in full before `Content-Length` is sent.

use crate::http::{Request, ResponseWriter, Router};
use std::io;

const INDEX_PAGE: &str = "<html>
<body>
<p>Hello, Web Server!</p>
</body>
</html>
";

const FAVICON_PAGE: &str = "<html>
<body>
<p>Unknown</p>
</body>
</html>
";

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Build the router with the example handlers.
pub fn router() -> Router {
    let mut router = Router::new();
    router.register("GET", do_get);
    router
}

fn do_get(request: &Request, out: &mut ResponseWriter<'_>) -> io::Result<()> {
    if request.path == "/" {
        send_page(out, INDEX_PAGE)
    } else if request.path.starts_with("/favicon") {
        send_page(out, FAVICON_PAGE)
    } else {
        out.send_error(404, None)
    }
}

fn send_page(out: &mut ResponseWriter<'_>, page: &str) -> io::Result<()> {
    let body = page.as_bytes();
    out.send_response_header(200, None)?;
    out.send_header("Content-Type", HTML_CONTENT_TYPE)?;
    out.send_header("Content-Length", &body.len().to_string())?;
    out.end_headers()?;
    out.write_body(body)
}
