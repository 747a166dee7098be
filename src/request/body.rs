//! Completing POST bodies from a blocking byte source.
//!
//! The reader blocks until the declared length has arrived, the source
//! fails, or the peer closes. There is no timeout and no way to cancel a read
//! in progress; a source that needs either has to provide it itself through
//! its `Read` implementation.
use std::io::{self, Read};

use log::{debug, trace, warn};
use thiserror::Error;

use crate::arena::Arena;
use crate::config::Limits;
use crate::request::Request;
use crate::slice::Slice;

pub const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request has no Content-Length header")]
    MissingContentLength,
    #[error("Content-Length is not a number")]
    NotANumber,
    #[error("Content-Length does not fit in memory")]
    Overflow,
    #[error("request body needs {needed} bytes, only {available} available")]
    RequestTooLarge { needed: usize, available: usize },
    #[error("failed to read request body: {0}")]
    ReadFailed(#[source] io::Error),
    #[error("connection closed with {missing} body bytes outstanding")]
    UnexpectedEof { missing: usize },
}

/// Strict decimal parser for a Content-Length value: digits only, no sign,
/// no whitespace.
pub fn parse_content_length(value: Slice<'_>) -> Result<usize, BodyError> {
    if value.is_empty() {
        return Err(BodyError::NotANumber);
    }
    value.iter().try_fold(0usize, |total, &b| {
        if !b.is_ascii_digit() {
            return Err(BodyError::NotANumber);
        }
        total
            .checked_mul(10)
            .and_then(|total| total.checked_add(usize::from(b - b'0')))
            .ok_or(BodyError::Overflow)
    })
}

impl<'a> Request<'a> {
    /// Declared body length, from the first `Content-Length` header.
    pub fn content_length(&self) -> Result<usize, BodyError> {
        let value = self
            .header(CONTENT_LENGTH)
            .ok_or(BodyError::MissingContentLength)?;
        parse_content_length(value)
    }
}

/// Reads the part of a request body that did not arrive with the header.
#[derive(Debug, Clone)]
pub struct BodyReader {
    max_body: usize,
}

impl Default for BodyReader {
    fn default() -> Self {
        Self::from(&Limits::default())
    }
}

impl From<&Limits> for BodyReader {
    fn from(limits: &Limits) -> Self {
        Self::new(limits.max_body)
    }
}

impl BodyReader {
    pub fn new(max_body: usize) -> Self {
        Self { max_body }
    }

    /// Complete the body of `request`.
    ///
    /// `buffered` holds the body bytes that were already received. When it
    /// covers `content_length` the body is a view into it. Otherwise the
    /// whole body is assembled in one arena region: the buffered prefix is
    /// copied in and the rest is read from `source` after it. The size check
    /// happens before `source` is touched, so an oversized body is refused
    /// without consuming any of it.
    ///
    /// ```
    /// use crvr::arena::Arena;
    /// use crvr::request::{parse_request, BodyReader};
    ///
    /// let arena = Arena::new(1024).unwrap();
    /// let head = b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nbutton";
    /// let mut rest = &b"=good"[..];
    ///
    /// let mut request = parse_request(head, &arena).unwrap();
    /// let length = request.content_length().unwrap();
    /// let buffered = request.buffered_body();
    /// let body = BodyReader::default()
    ///     .read(&mut request, length, buffered, &mut rest, &arena)
    ///     .unwrap();
    /// assert_eq!(body, "button=good");
    /// assert_eq!(request.body, Some(body));
    /// ```
    pub fn read<'a, R: Read + ?Sized>(
        &self,
        request: &mut Request<'a>,
        content_length: usize,
        buffered: Slice<'a>,
        source: &mut R,
        arena: &'a Arena,
    ) -> Result<Slice<'a>, BodyError> {
        if content_length > self.max_body {
            warn!(
                "refusing {} byte body, limit is {}",
                content_length, self.max_body
            );
            return Err(BodyError::RequestTooLarge {
                needed: content_length,
                available: self.max_body,
            });
        }

        if buffered.len() >= content_length {
            let body = Slice::new(&buffered.as_bytes()[..content_length]);
            trace!("body of {} bytes already buffered", content_length);
            request.body = Some(body);
            return Ok(body);
        }

        let remaining = content_length - buffered.len();
        let available = arena.remaining_capacity();
        if remaining > available {
            warn!(
                "refusing body: {} bytes outstanding, {} bytes of arena left",
                remaining, available
            );
            return Err(BodyError::RequestTooLarge {
                needed: remaining,
                available,
            });
        }
        let region = arena
            .alloc(content_length)
            .map_err(|_| BodyError::RequestTooLarge {
                needed: content_length,
                available,
            })?;
        region[..buffered.len()].copy_from_slice(&buffered);

        debug!(
            "reading {} more body bytes ({} buffered)",
            remaining,
            buffered.len()
        );
        let mut filled = buffered.len();
        while filled < content_length {
            match source.read(&mut region[filled..]) {
                Ok(0) => {
                    return Err(BodyError::UnexpectedEof {
                        missing: content_length - filled,
                    })
                }
                Ok(n) => {
                    filled += n;
                    trace!("read {} ({}/{})", n, filled, content_length);
                }
                Err(e) => return Err(BodyError::ReadFailed(e)),
            }
        }

        let body = Slice::new(region);
        request.body = Some(body);
        Ok(body)
    }
}

/// Complete a request body with the default size limit.
pub fn read_body<'a, R: Read + ?Sized>(
    request: &mut Request<'a>,
    content_length: usize,
    buffered: Slice<'a>,
    source: &mut R,
    arena: &'a Arena,
) -> Result<Slice<'a>, BodyError> {
    BodyReader::default().read(request, content_length, buffered, source, arena)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::request::Method;
    use std::collections::VecDeque;

    /// Replays scripted reads and counts how often it was asked.
    struct Script {
        chunks: VecDeque<io::Result<Vec<u8>>>,
        reads: usize,
    }

    impl Script {
        fn new(chunks: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                chunks: chunks.into(),
                reads: 0,
            }
        }
    }

    impl Read for Script {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            match self.chunks.pop_front() {
                Some(Ok(chunk)) => {
                    assert!(chunk.len() <= buf.len(), "read past the declared length");
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                Some(Err(e)) => Err(e),
                None => Ok(0),
            }
        }
    }

    fn post<'a>() -> Request<'a> {
        Request::new(Method::POST, "asl.html".into(), "HTTP/1.1".into())
    }

    #[test]
    fn test_parse_content_length() {
        assert_eq!(parse_content_length("0".into()).unwrap(), 0);
        assert_eq!(parse_content_length("1024".into()).unwrap(), 1024);
        assert_eq!(parse_content_length("007".into()).unwrap(), 7);
        assert!(matches!(
            parse_content_length("".into()),
            Err(BodyError::NotANumber)
        ));
        assert!(matches!(
            parse_content_length("12a".into()),
            Err(BodyError::NotANumber)
        ));
        assert!(matches!(
            parse_content_length("-1".into()),
            Err(BodyError::NotANumber)
        ));
        assert!(matches!(
            parse_content_length(" 1".into()),
            Err(BodyError::NotANumber)
        ));
        let too_big = format!("{}0", usize::MAX);
        assert!(matches!(
            parse_content_length(too_big.as_str().into()),
            Err(BodyError::Overflow)
        ));
        let max = usize::MAX.to_string();
        assert_eq!(parse_content_length(max.as_str().into()).unwrap(), usize::MAX);
    }

    #[test]
    fn test_request_content_length() {
        let request = post().with_header("Content-Length", "42");
        assert_eq!(request.content_length().unwrap(), 42);
        assert!(matches!(
            post().with_header("content-length", "42").content_length(),
            Err(BodyError::MissingContentLength)
        ));
    }

    #[test]
    fn test_body_completed_by_partial_reads() {
        let arena = Arena::new(64).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![Ok(b"efg".to_vec()), Ok(b"hij".to_vec())]);
        let body = read_body(&mut request, 10, "abcd".into(), &mut source, &arena).unwrap();
        assert_eq!(body, "abcdefghij");
        assert_eq!(body.len(), 10);
        assert_eq!(request.body, Some(body));
        assert_eq!(source.reads, 2);
    }

    #[test]
    fn test_body_already_buffered() {
        let arena = Arena::new(64).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![]);
        let body = read_body(&mut request, 4, "abcdEXTRA".into(), &mut source, &arena).unwrap();
        assert_eq!(body, "abcd");
        assert_eq!(source.reads, 0);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_empty_body() {
        let arena = Arena::new(0).unwrap();
        let mut request = post();
        let body = read_body(&mut request, 0, Slice::default(), &mut io::empty(), &arena).unwrap();
        assert!(body.is_empty());
    }

    #[test]
    fn test_body_larger_than_arena_is_not_read() {
        let arena = Arena::new(16).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![Ok(vec![b'x'; 32])]);
        match read_body(&mut request, 40, "abcd".into(), &mut source, &arena) {
            Err(BodyError::RequestTooLarge { needed, available }) => {
                assert_eq!(needed, 36);
                assert_eq!(available, 16);
            }
            other => panic!("expected RequestTooLarge, got {:?}", other),
        }
        assert_eq!(source.reads, 0);
        assert_eq!(arena.used(), 0);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_body_over_limit_is_not_read() {
        let arena = Arena::new(1024).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![Ok(vec![b'x'; 100])]);
        let reader = BodyReader::new(99);
        assert!(matches!(
            reader.read(&mut request, 100, Slice::default(), &mut source, &arena),
            Err(BodyError::RequestTooLarge { needed: 100, available: 99 })
        ));
        assert_eq!(source.reads, 0);
    }

    #[test]
    fn test_body_premature_close() {
        let arena = Arena::new(64).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![Ok(b"ef".to_vec())]);
        assert!(matches!(
            read_body(&mut request, 10, "abcd".into(), &mut source, &arena),
            Err(BodyError::UnexpectedEof { missing: 4 })
        ));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_body_read_error() {
        let arena = Arena::new(64).unwrap();
        let mut request = post();
        let mut source = Script::new(vec![
            Ok(b"ef".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"ghij".to_vec()),
        ]);
        match read_body(&mut request, 10, "abcd".into(), &mut source, &arena) {
            Err(BodyError::ReadFailed(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected ReadFailed, got {:?}", other),
        }
        assert_eq!(source.reads, 2);
    }
}
