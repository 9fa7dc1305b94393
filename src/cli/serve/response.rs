//! Writing replies to tiny_http requests.

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use super::route::Reply;

pub fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

/// Send `reply`; HEAD requests get the headers only.
pub fn send(request: Request, reply: Reply) -> Result<()> {
    let allow = (reply.status == 405).then_some(("Allow", "GET, HEAD"));
    let headers: Vec<Header> = [
        Some(("Content-Type", reply.content_type)),
        Some(("Cache-Control", "no-store")),
        allow,
    ]
    .into_iter()
    .flatten()
    .filter_map(|(key, value)| make_header(key, value))
    .collect();

    let status = StatusCode(reply.status);
    if is_head_request(&request) {
        let mut response = Response::empty(status);
        for header in headers {
            response.add_header(header);
        }
        request.respond(response)?;
        return Ok(());
    }

    let mut response = Response::from_data(reply.body).with_status_code(status);
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &str, value: &str) -> Option<Header> {
    Header::from_bytes(key.as_bytes(), value.as_bytes()).ok()
}
