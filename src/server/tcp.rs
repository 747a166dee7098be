//! TCP HTTP server.
use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use log::*;

use crate::{
    arena::Arena,
    config::Limits,
    handler::Handler,
    server::{exchange, Server, ServerError},
};

/// A single-threaded TCP server. Each accepted connection carries one
/// request and is closed once the response is written.
pub struct TcpServer<H, C = ()> {
    listener: TcpListener,
    handler: H,
    context: C,
    arena: Arena,
    limits: Limits,
    timeout: Option<Duration>,
}

impl<H: Handler<C>, C: Default> TcpServer<H, C> {
    /// Create a new TCP server
    ///
    /// # Arguments
    /// * `bind_addr`: Address to listen on, such as "0.0.0.0:8080"
    /// * `limits`: arena and buffer sizes
    /// * `timeout`: network socket timeout
    /// * `handler`: request handler
    pub fn new(
        bind_addr: &str,
        limits: Limits,
        timeout: Option<Duration>,
        handler: H,
    ) -> Result<Self, ServerError> {
        limits.validate()?;
        Ok(Self {
            listener: TcpListener::bind(bind_addr)?,
            handler,
            context: C::default(),
            arena: Arena::new(limits.arena_capacity)?,
            limits,
            timeout,
        })
    }
}

impl<H, C> TcpServer<H, C> {
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
    pub fn context(&self) -> &C {
        &self.context
    }
}

impl<H, C> Server for TcpServer<H, C>
where
    H: Handler<C>,
{
    /// Accept one connection and serve its request.
    fn serve_one(&mut self) -> Result<(), ServerError> {
        let (mut stream, addr) = self.listener.accept()?;
        debug!("accepted connection from {:?}", addr);
        stream.set_read_timeout(self.timeout)?;
        stream.set_write_timeout(self.timeout)?;
        let Self {
            handler,
            context,
            arena,
            limits,
            ..
        } = self;
        // One request per connection: anything the client sent after it is
        // discarded with the connection.
        let mut pipelined = Vec::new();
        let result = arena.scope(|arena| {
            exchange(arena, &mut stream, handler, context, limits, &mut pipelined)
        });
        if !pipelined.is_empty() {
            debug!("{} sent {} bytes past its request", addr, pipelined.len());
        }
        match result {
            // A client hanging up without sending anything ends only its own
            // connection, not the server.
            Err(ServerError::Closed) => {
                debug!("{} closed without a request", addr);
                Ok(())
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Request;
    use crate::response::Response;
    use std::io::prelude::*;
    use std::net::TcpStream;
    use std::thread;

    fn count(request: &Request<'_>, served: &mut usize) -> Response {
        *served += 1;
        Response::new(200).with_payload(format!("{} #{}", request.path, served).into_bytes())
    }

    fn roundtrip(addr: SocketAddr, request: &'static [u8]) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let mut client = TcpStream::connect(addr).unwrap();
            client.write_all(request).unwrap();
            let mut response = vec![];
            client.read_to_end(&mut response).unwrap();
            response
        })
    }

    #[test]
    fn test_tcp_serve_one() {
        let mut server: TcpServer<_, usize> =
            TcpServer::new("127.0.0.1:0", Limits::default(), None, count).unwrap();
        let addr = server.local_addr().unwrap();

        let client = roundtrip(addr, b"GET /a.html HTTP/1.1\r\nHost: x\r\n\r\n");
        server.serve_one().unwrap();
        assert_eq!(
            client.join().unwrap(),
            b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\na.html #1".to_vec()
        );

        let client = roundtrip(addr, b"POST /b.html HTTP/1.1\r\nContent-Length: 3\r\n\r\nx=1");
        server.serve_one().unwrap();
        assert_eq!(
            client.join().unwrap(),
            b"HTTP/1.1 200 OK\r\nContent-Length: 9\r\n\r\nb.html #2".to_vec()
        );
        assert_eq!(*server.context(), 2);
    }

    #[test]
    fn test_tcp_bad_request_closes_connection() {
        let mut server: TcpServer<_, usize> =
            TcpServer::new("127.0.0.1:0", Limits::default(), None, count).unwrap();
        let addr = server.local_addr().unwrap();

        let client = roundtrip(addr, b"PUT / HTTP/1.1\r\n\r\n");
        assert!(matches!(server.serve_one(), Err(ServerError::Parse(_))));
        assert!(client.join().unwrap().is_empty());
        assert_eq!(*server.context(), 0);
    }
}
