pub use crate::arena::{Arena, ArenaError, Checkpoint};
pub use crate::config::Limits;
pub use crate::handler::Handler;
pub use crate::request::{BodyError, Header, Method, ParseError, Request};
pub use crate::response::Response;
pub use crate::server::{BadRequest, Server, ServerError};
pub use crate::slice::Slice;
