//! Zero-copy HTTP/1.1 request handling on top of a per-request arena.
//! * Bump [arena](crate::arena::Arena) with checkpoint/reset
//! * Borrowed byte [slices](crate::slice::Slice) that never copy request data
//! * Request [parsing](crate::request::RequestParser) and backpressured
//!   [body reading](crate::request::BodyReader)
//! * [Stream](crate::server::StreamServer) and [TCP](crate::server::TcpServer)
//!   servers that release the arena after every request
//!
//! # Example
//! ```
//! use crvr::io::ReadWriteAdapter;
//! use crvr::prelude::*;
//! use crvr::server::StreamServer;
//!
//! fn answers(req: &Request<'_>, answered: &mut usize) -> Response {
//!     match req.body {
//!         Some(body) if req.path == "quiz.html" => {
//!             *answered += 1;
//!             Response::new(200).with_payload(format!("you said {}", body).into_bytes())
//!         }
//!         _ => Response::not_found(),
//!     }
//! }
//!
//! fn main() {
//!     let request = b"POST /quiz.html HTTP/1.1\r\nContent-Length: 8\r\n\r\nanswer=b";
//!     let mut write_buf = vec![];
//!     let stream = ReadWriteAdapter::new(&request[..], &mut write_buf);
//!     let mut server = StreamServer::new(stream, answers).unwrap();
//!     server.serve_one().unwrap();
//!     assert_eq!(*server.context(), 1);
//!     drop(server);
//!     assert!(write_buf.ends_with(b"\r\n\r\nyou said answer=b"));
//! }
//! ```
pub mod arena;
pub mod config;
pub mod handler;
pub mod io;
pub mod prelude;
pub mod request;
pub mod response;
pub mod server;
pub mod slice;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
