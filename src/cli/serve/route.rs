//! Request routing for the preview server.
//!
//! Routing is pure (`method + url -> Route`) and replies are plain values,
//! so both are testable without a socket.

use std::sync::Arc;

use anyhow::Result;
use tiny_http::Method;

use crate::sync::{LongPoll, PollQuery};

use content_type::{HTML, JSON, PLAIN};

/// `Content-Type` values of the replies.
pub mod content_type {
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const JSON: &str = "application/json";
}

/// Where a request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `GET /`: the mind-map page
    Shell,
    /// `GET /data?ts=..&timeout=..`: long-poll for a newer tree
    Data(PollQuery),
    NotFound,
    MethodNotAllowed,
    /// Shutdown in progress
    Unavailable,
}

impl Route {
    pub fn resolve(method: &Method, url: &str, shutting_down: bool) -> Self {
        if shutting_down {
            return Self::Unavailable;
        }

        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        let route = match path {
            "/" | "/index.html" => Self::Shell,
            "/data" => Self::Data(PollQuery::parse(query)),
            _ => return Self::NotFound,
        };

        if matches!(method, Method::Get | Method::Head) {
            route
        } else {
            Self::MethodNotAllowed
        }
    }
}

/// A response ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn plain(status: u16, body: &'static str) -> Self {
        Self::new(status, PLAIN, body)
    }
}

/// State shared by request handlers.
pub struct Preview {
    /// Page built once at startup; later trees arrive through `/data`
    shell: Arc<str>,
    poll: LongPoll,
}

impl Preview {
    pub fn new(shell: String, poll: LongPoll) -> Self {
        Self {
            shell: shell.into(),
            poll,
        }
    }

    /// Build the reply for `route`. HEAD requests never wait on the poll.
    pub fn reply(&self, route: Route, head: bool) -> Result<Reply> {
        Ok(match route {
            Route::Shell => Reply::new(200, HTML, self.shell.as_bytes()),
            Route::Data(_) if head => Reply::new(200, JSON, Vec::new()),
            Route::Data(query) => Reply::new(200, JSON, self.poll.handle(&query).to_json()?),
            Route::NotFound => Reply::plain(404, "404 Not Found"),
            Route::MethodNotAllowed => Reply::plain(405, "405 Method Not Allowed"),
            Route::Unavailable => Reply::plain(503, "503 Service Unavailable"),
        })
    }
}
