//! Base for all request handlers.
use crate::request::Request;
use crate::response::Response;

/// A Handler implements the application behind the server: it takes a parsed
/// request and builds the response.
///
/// `C` is state the server keeps for the handler across requests, such as a
/// quiz session. It is passed in explicitly instead of living in globals.
pub trait Handler<C> {
    fn handle(&self, request: &Request<'_>, context: &mut C) -> Response;
}

impl<F, C> Handler<C> for F
where
    F: Fn(&Request<'_>, &mut C) -> Response,
{
    fn handle(&self, request: &Request<'_>, context: &mut C) -> Response {
        (self)(request, context)
    }
}
