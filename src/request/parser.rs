use log::{debug, trace};
use thiserror::Error;

use crate::arena::{Arena, ArenaError};
use crate::config::Limits;
use crate::request::{Header, Method, Request, MAX_HEADERS};
use crate::slice::{Slice, SliceError};

const CRLF: &[u8] = b"\r\n";
const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";
const HEADER_DELIMITER: &[u8] = b": ";

/// Served in place of an empty path or a path naming a directory.
pub const INDEX_PAGE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError<'a> {
    #[error("request line is not terminated by CRLF")]
    MissingLineTerminator,
    #[error("header block is not terminated by an empty line")]
    IncompleteHeader,
    #[error("malformed request line \"{line}\"")]
    MalformedRequestLine { line: Slice<'a> },
    #[error("unsupported method \"{method}\"")]
    UnsupportedMethod { method: Slice<'a> },
    #[error("malformed header line \"{line}\"")]
    MalformedHeaderLine { line: Slice<'a> },
    /// The headers collected before the limit was hit are kept in `partial`.
    #[error("request has more than {limit} headers")]
    TooManyHeaders {
        limit: usize,
        partial: Box<Request<'a>>,
    },
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error(transparent)]
    Slice(#[from] SliceError),
}

pub type Result<'a, T> = std::result::Result<T, ParseError<'a>>;

/// Offset just past the `\r\n\r\n` ending the header block, if `buf` holds a
/// complete one.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    Slice::new(buf)
        .find(HEADER_SEPARATOR)
        .map(|at| at + HEADER_SEPARATOR.len())
}

/// Single pass HTTP/1.x request head parser.
///
/// The parser never reads from a socket: it works on a buffer that already
/// holds the complete header block and borrows every field from it, only
/// allocating in the arena when the path has to be rewritten.
#[derive(Debug, Clone)]
pub struct RequestParser {
    max_headers: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new(MAX_HEADERS)
    }
}

impl From<&Limits> for RequestParser {
    fn from(limits: &Limits) -> Self {
        Self::new(limits.max_headers)
    }
}

impl RequestParser {
    pub fn new(max_headers: usize) -> Self {
        Self { max_headers }
    }

    /// Parse the request head at the start of `buf`.
    ///
    /// ```
    /// use crvr::arena::Arena;
    /// use crvr::request::{Method, RequestParser};
    ///
    /// let arena = Arena::new(1024).unwrap();
    /// let buf = b"POST /quiz/ HTTP/1.1\r\nContent-Length: 11\r\n\r\nbutton=good";
    /// let request = RequestParser::default().parse(buf, &arena).unwrap();
    ///
    /// assert_eq!(request.method, Method::POST);
    /// assert_eq!(request.path, "quiz/index.html");
    /// assert_eq!(request.header("Content-Length").unwrap(), "11");
    /// assert_eq!(request.buffered_body(), "button=good");
    /// assert!(request.body.is_none());
    /// ```
    pub fn parse<'a>(&self, buf: &'a [u8], arena: &'a Arena) -> Result<'a, Request<'a>> {
        let data = Slice::new(buf);
        let line_end = data.find(CRLF).ok_or(ParseError::MissingLineTerminator)?;
        let header_end = find_header_end(buf).ok_or(ParseError::IncompleteHeader)?;

        let request_line = data.subrange(..line_end)?;
        let (method, path, version) = request_line_tokens(request_line)?;
        let path = normalize_path(path, arena)?;
        let mut request = Request::new(method, path, version)
            .with_buffered_body(data.subrange(header_end..)?);

        // Lines between the request line and the empty line, each still
        // carrying its CRLF terminator.
        let header_block = data.subrange(line_end + CRLF.len()..header_end - CRLF.len())?;
        for line in header_block.lines() {
            let (key, value) = line
                .split_once(HEADER_DELIMITER)
                .ok_or(ParseError::MalformedHeaderLine { line })?;
            if request.headers.len() >= self.max_headers {
                return Err(ParseError::TooManyHeaders {
                    limit: self.max_headers,
                    partial: Box::new(request),
                });
            }
            request.headers.push(Header::new(key, value));
        }

        debug!(
            "parsed {} {} {} ({} headers)",
            request.method,
            request.path,
            request.version,
            request.headers.len()
        );
        trace!("REQUEST {:?}", &request);
        Ok(request)
    }
}

/// Parse with the default header limit.
pub fn parse_request<'a>(buf: &'a [u8], arena: &'a Arena) -> Result<'a, Request<'a>> {
    RequestParser::default().parse(buf, arena)
}

fn request_line_tokens(line: Slice<'_>) -> Result<'_, (Method, Slice<'_>, Slice<'_>)> {
    let malformed = || ParseError::MalformedRequestLine { line };
    let (method, rest) = line.split_once(b" ").ok_or_else(malformed)?;
    let (path, version) = rest.split_once(b" ").ok_or_else(malformed)?;
    let method = if method.equals_text("GET") {
        Method::GET
    } else if method.equals_text("POST") {
        Method::POST
    } else {
        return Err(ParseError::UnsupportedMethod { method });
    };
    Ok((method, path, version))
}

/// Strip leading slashes and map directory paths onto their index page.
/// Rewritten paths are copied into the arena, never built in the receive
/// buffer.
fn normalize_path<'a>(raw: Slice<'a>, arena: &'a Arena) -> Result<'a, Slice<'a>> {
    let slashes = raw.iter().take_while(|&&b| b == b'/').count();
    let path = raw.subrange(slashes..)?;
    if path.is_empty() {
        return Ok(Slice::from(INDEX_PAGE).copy_into_arena(arena)?);
    }
    if path.ends_with(b"/") {
        return Ok(path.copy_into_arena_with(INDEX_PAGE.as_bytes(), arena)?);
    }
    Ok(path)
}
