//! HTTP request, parser and body reader.
use std::fmt;

pub use body::{parse_content_length, read_body, BodyError, BodyReader};
pub use header::*;
pub use parser::{find_header_end, parse_request, ParseError, RequestParser};

use crate::slice::Slice;

pub mod body;
pub mod header;
pub mod parser;

/// A parsed HTTP request.
///
/// Every field borrows either the receive buffer or the arena the request was
/// parsed with, so a request cannot outlive an arena reset.
#[derive(Debug, Clone, PartialEq)]
pub struct Request<'a> {
    pub method: Method,
    /// Normalized path, without leading `/`.
    pub path: Slice<'a>,
    /// Protocol version token, passed through as received.
    pub version: Slice<'a>,
    pub headers: HeaderList<'a>,
    /// Full body, set by the body reader for POST requests.
    pub body: Option<Slice<'a>>,
    buffered: Slice<'a>,
}

impl<'a> Request<'a> {
    pub fn new(method: Method, path: Slice<'a>, version: Slice<'a>) -> Self {
        Self {
            method,
            path,
            version,
            headers: HeaderList::new(),
            body: None,
            buffered: Slice::default(),
        }
    }

    /// Value of the first header named exactly `key`.
    pub fn header(&self, key: &str) -> Option<Slice<'a>> {
        find_header(&self.headers, key)
    }

    /// Bytes that followed the header block in the receive buffer.
    pub fn buffered_body(&self) -> Slice<'a> {
        self.buffered
    }

    pub fn with_buffered_body(mut self, buffered: Slice<'a>) -> Self {
        self.buffered = buffered;
        self
    }

    pub fn with_header(mut self, key: &'a str, value: &'a str) -> Self {
        self.headers.push(Header::new(key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    POST,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GET => "GET",
            Self::POST => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
