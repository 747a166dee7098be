use std::fmt;

use smallvec::SmallVec;

use crate::slice::Slice;

/// Number of headers a request keeps without spilling to the heap, and the
/// default cap on headers per request.
pub const MAX_HEADERS: usize = 20;

/// One `Key: Value` header line, both sides borrowed from the request buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header<'a> {
    pub key: Slice<'a>,
    pub value: Slice<'a>,
}

impl<'a> Header<'a> {
    pub fn new(key: Slice<'a>, value: Slice<'a>) -> Self {
        Self { key, value }
    }
}

impl fmt::Display for Header<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// Headers in the order they were received.
pub type HeaderList<'a> = SmallVec<[Header<'a>; MAX_HEADERS]>;

/// Case-sensitive linear scan, first match wins.
pub fn find_header<'a>(headers: &[Header<'a>], key: &str) -> Option<Slice<'a>> {
    headers
        .iter()
        .find(|header| header.key.equals_text(key))
        .map(|header| header.value)
}
