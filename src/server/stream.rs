//! Generic IO Stream HTTP server.
use std::io::prelude::*;

use crate::{
    arena::Arena,
    config::Limits,
    handler::Handler,
    server::{exchange, Server, ServerError},
};

/// Serve HTTP requests over a generic stream. The stream is not closed,
/// multiple requests can be served, and the handler context carries over from
/// one request to the next. Pipelined requests that arrive in the same read are
/// kept and served by the following `serve_one` calls.
///
/// # Example
/// ```
/// use crvr::io::ReadWriteAdapter;
/// use crvr::prelude::*;
/// use crvr::server::StreamServer;
///
/// fn handle_hello(req: &Request<'_>, _: &mut ()) -> Response {
///     Response::new(200).with_payload(format!("Hello from {}!", req.path).into_bytes())
/// }
///
/// let read_buf = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
/// let mut write_buf = vec![];
/// let stream = ReadWriteAdapter::new(&read_buf[..], &mut write_buf);
/// let mut server = StreamServer::new(stream, handle_hello).unwrap();
/// server.serve_one().unwrap();
/// drop(server);
///
/// assert_eq!(
///     std::str::from_utf8(&write_buf[..]).unwrap(),
///     "HTTP/1.1 200 OK\r\n\
///      Content-Length: 22\r\n\
///      \r\n\
///      Hello from index.html!"
/// );
/// ```
pub struct StreamServer<H, S, C = ()> {
    handler: H,
    stream: S,
    context: C,
    arena: Arena,
    limits: Limits,
    pending: Vec<u8>,
}

impl<H: Handler<C>, S, C: Default> StreamServer<H, S, C> {
    pub fn new(stream: S, handler: H) -> Result<Self, ServerError> {
        Self::with_limits(stream, handler, Limits::default())
    }
    pub fn with_limits(stream: S, handler: H, limits: Limits) -> Result<Self, ServerError> {
        Self::with_context(stream, handler, C::default(), limits)
    }
}

impl<H: Handler<C>, S, C> StreamServer<H, S, C> {
    pub fn with_context(
        stream: S,
        handler: H,
        context: C,
        limits: Limits,
    ) -> Result<Self, ServerError> {
        limits.validate()?;
        Ok(Self {
            handler,
            stream,
            context,
            arena: Arena::new(limits.arena_capacity)?,
            limits,
            pending: Vec::new(),
        })
    }
    pub fn context(&self) -> &C {
        &self.context
    }
    pub fn arena(&self) -> &Arena {
        &self.arena
    }
    pub fn into_inner(self) -> (S, C) {
        (self.stream, self.context)
    }
}

impl<H, S, C> Server for StreamServer<H, S, C>
where
    H: Handler<C>,
    S: Read + Write,
{
    fn serve_one(&mut self) -> Result<(), ServerError> {
        let Self {
            handler,
            stream,
            context,
            arena,
            limits,
            pending,
        } = self;
        arena.scope(|arena| exchange(arena, stream, handler, context, limits, pending))
    }
}
