//! HTTP Server components.
//!
//! Servers drive one request at a time through the arena:
//! receive the header block into an arena buffer, parse it, complete a POST
//! body, hand the request to the [`Handler`](crate::handler::Handler), write
//! the response, and release every per-request allocation.
use std::io::{self, Read, Write};
use std::time::Instant;

use log::{debug, error, info, trace, warn};
use thiserror::Error;

use crate::arena::{Arena, ArenaError};
use crate::config::{ConfigError, Limits};
use crate::handler::Handler;
use crate::request::{find_header_end, BodyError, BodyReader, Method, ParseError, RequestParser};
use crate::slice::SliceError;

pub mod stream;
pub mod tcp;

pub use stream::StreamServer;
pub use tcp::TcpServer;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("IOError({0})")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error("bad request: {0}")]
    Parse(#[from] BadRequest),
    #[error(transparent)]
    Body(#[from] BodyError),
    #[error("connection closed before the header block was complete")]
    IncompleteHeader,
    #[error("header block does not fit in {limit} bytes")]
    HeaderTooLarge { limit: usize },
    #[error("connection closed")]
    Closed,
}

/// A [`ParseError`] detached from the receive buffer, so it can outlive the
/// arena reset that ends every exchange.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BadRequest {
    #[error("request line is not terminated by CRLF")]
    MissingLineTerminator,
    #[error("header block is not terminated by an empty line")]
    IncompleteHeader,
    #[error("malformed request line \"{}\"", String::from_utf8_lossy(.line))]
    MalformedRequestLine { line: Vec<u8> },
    #[error("unsupported method \"{}\"", String::from_utf8_lossy(.method))]
    UnsupportedMethod { method: Vec<u8> },
    #[error("malformed header line \"{}\"", String::from_utf8_lossy(.line))]
    MalformedHeaderLine { line: Vec<u8> },
    /// `path` and `headers` are what was parsed before the limit was hit.
    #[error("request has more than {limit} headers")]
    TooManyHeaders {
        limit: usize,
        path: Vec<u8>,
        headers: Vec<(Vec<u8>, Vec<u8>)>,
    },
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error(transparent)]
    Slice(#[from] SliceError),
}

impl From<ParseError<'_>> for BadRequest {
    fn from(err: ParseError<'_>) -> Self {
        match err {
            ParseError::MissingLineTerminator => BadRequest::MissingLineTerminator,
            ParseError::IncompleteHeader => BadRequest::IncompleteHeader,
            ParseError::MalformedRequestLine { line } => BadRequest::MalformedRequestLine {
                line: line.to_vec(),
            },
            ParseError::UnsupportedMethod { method } => BadRequest::UnsupportedMethod {
                method: method.to_vec(),
            },
            ParseError::MalformedHeaderLine { line } => BadRequest::MalformedHeaderLine {
                line: line.to_vec(),
            },
            ParseError::TooManyHeaders { limit, partial } => BadRequest::TooManyHeaders {
                limit,
                path: partial.path.to_vec(),
                headers: partial
                    .headers
                    .iter()
                    .map(|header| (header.key.to_vec(), header.value.to_vec()))
                    .collect(),
            },
            ParseError::Arena(e) => BadRequest::Arena(e),
            ParseError::Slice(e) => BadRequest::Slice(e),
        }
    }
}

impl From<ParseError<'_>> for ServerError {
    fn from(err: ParseError<'_>) -> Self {
        ServerError::Parse(BadRequest::from(err))
    }
}

pub trait Server {
    /// Serve one request, must be implemented.
    fn serve_one(&mut self) -> Result<(), ServerError>;
    /// Serve requests until the peer closes (default implementation).
    fn serve_forever(&mut self) {
        loop {
            match self.serve_one() {
                Ok(()) => (),
                Err(ServerError::Closed) => {
                    debug!("peer closed, stopping");
                    return;
                }
                Err(e) => error!("{}", e),
            }
        }
    }
}

/// Read from `stream` into an arena buffer until it holds a complete header
/// block. `pending` holds bytes left over from the previous request on the
/// same stream; they go first and the stream is only read if they do not
/// already contain a full header block. Body bytes that arrive in the same
/// reads stay in the buffer.
fn receive_header<'a, S: Read + ?Sized>(
    arena: &'a Arena,
    stream: &mut S,
    capacity: usize,
    pending: &mut Vec<u8>,
) -> Result<&'a [u8], ServerError> {
    let buffer = arena.alloc(capacity)?;
    let mut filled = pending.len().min(capacity);
    buffer[..filled].copy_from_slice(&pending[..filled]);
    pending.clear();
    while find_header_end(&buffer[..filled]).is_none() {
        if filled == buffer.len() {
            return Err(ServerError::HeaderTooLarge { limit: capacity });
        }
        let n = stream.read(&mut buffer[filled..])?;
        if n == 0 {
            return Err(if filled == 0 {
                ServerError::Closed
            } else {
                ServerError::IncompleteHeader
            });
        }
        filled += n;
        trace!("received {} bytes ({} total)", n, filled);
    }
    let buffer: &'a [u8] = buffer;
    Ok(&buffer[..filled])
}

/// One full request/response exchange. Everything allocated here lives in
/// `arena` and is released by the caller.
///
/// Bytes received past the end of this request belong to the next one and are
/// moved to `pending` once the response is written. A rejected request drops
/// them, since the stream position can no longer be trusted.
fn exchange<S, H, C>(
    arena: &Arena,
    stream: &mut S,
    handler: &H,
    context: &mut C,
    limits: &Limits,
    pending: &mut Vec<u8>,
) -> Result<(), ServerError>
where
    S: Read + Write + ?Sized,
    H: Handler<C> + ?Sized,
{
    let start = Instant::now();
    let received = receive_header(arena, stream, limits.receive_buffer, pending)?;
    let mut request = RequestParser::from(limits)
        .parse(received, arena)
        .map_err(|e| {
            warn!("rejecting request: {}", e);
            ServerError::from(e)
        })?;
    let buffered = request.buffered_body();
    let mut consumed = 0;
    if request.method == Method::POST {
        let content_length = request.content_length()?;
        BodyReader::from(limits).read(&mut request, content_length, buffered, stream, arena)?;
        consumed = content_length.min(buffered.len());
    }
    let leftover = &buffered.as_bytes()[consumed..];

    debug!("running request handler");
    let response = handler.handle(&request, context);
    trace!("RESPONSE: {:?}", &response);
    info!(
        "{}ms - {} {} ({} bytes) -> {} {} ({} bytes)",
        start.elapsed().as_millis(),
        request.method,
        request.path,
        request.body.map_or(0, |body| body.len()),
        response.status_code,
        &response.status,
        response.content_length(),
    );
    response.write_to(stream)?;
    stream.flush()?;
    if !leftover.is_empty() {
        trace!("keeping {} bytes of the next request", leftover.len());
        pending.extend_from_slice(leftover);
    }
    Ok(())
}
