//! Zero-copy byte string views.
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Bound, Deref, RangeBounds};
use std::str::Utf8Error;

use thiserror::Error;

use crate::arena::{Arena, ArenaError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SliceError {
    #[error("range {start}..{end} out of bounds for slice of length {len}")]
    OutOfRange { start: usize, end: usize, len: usize },
}

/// A borrowed view of bytes owned by a caller buffer or an [`Arena`].
///
/// Slices order byte-wise up to the shorter length; when one is a prefix of
/// the other, the shorter one is less.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Slice<'a> {
    bytes: &'a [u8],
}

impl<'a> Slice<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn as_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }

    pub fn compare(&self, other: &Slice<'_>) -> Ordering {
        let len = self.bytes.len().min(other.bytes.len());
        for i in 0..len {
            match self.bytes[i].cmp(&other.bytes[i]) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.bytes.len().cmp(&other.bytes.len())
    }

    /// Byte-exact comparison against a constant such as `"GET"`.
    pub fn equals_text(&self, literal: &str) -> bool {
        self.bytes == literal.as_bytes()
    }

    /// Index of the first occurrence of `needle`. An empty needle matches at 0.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        let haystack = self.bytes;
        if needle.len() > haystack.len() {
            return None;
        }
        (0..=haystack.len() - needle.len()).find(|&i| &haystack[i..i + needle.len()] == needle)
    }

    /// Sub-view over `range`. An unbounded end runs to the end of the slice.
    ///
    /// ```
    /// use crvr::slice::Slice;
    ///
    /// let line = Slice::from("GET /index.html HTTP/1.1");
    /// assert_eq!(line.subrange(4..15).unwrap(), "/index.html");
    /// assert_eq!(line.subrange(16..).unwrap(), "HTTP/1.1");
    /// assert!(line.subrange(20..30).is_err());
    /// ```
    pub fn subrange<R: RangeBounds<usize>>(&self, range: R) -> Result<Slice<'a>, SliceError> {
        let len = self.bytes.len();
        let start = match range.start_bound() {
            Bound::Included(&n) => n,
            Bound::Excluded(&n) => n.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&n) => n.saturating_add(1),
            Bound::Excluded(&n) => n,
            Bound::Unbounded => len,
        };
        if start > end || end > len {
            return Err(SliceError::OutOfRange { start, end, len });
        }
        Ok(Slice::new(&self.bytes[start..end]))
    }

    /// Copy the bytes into `arena`. The copy no longer depends on the buffer
    /// this slice came from.
    pub fn copy_into_arena<'b>(&self, arena: &'b Arena) -> Result<Slice<'b>, ArenaError> {
        self.copy_into_arena_with(b"", arena)
    }

    /// Like [`copy_into_arena`](Self::copy_into_arena), with `suffix` appended
    /// to the copy.
    pub fn copy_into_arena_with<'b>(
        &self,
        suffix: &[u8],
        arena: &'b Arena,
    ) -> Result<Slice<'b>, ArenaError> {
        let len = self.bytes.len();
        let total = len.checked_add(suffix.len()).ok_or(ArenaError::OutOfMemory {
            requested: usize::MAX,
            remaining: arena.remaining_capacity(),
        })?;
        let copy = arena.alloc(total)?;
        copy[..len].copy_from_slice(self.bytes);
        copy[len..].copy_from_slice(suffix);
        Ok(Slice::new(copy))
    }

    /// Split around the first occurrence of `delimiter`.
    pub fn split_once(&self, delimiter: &[u8]) -> Option<(Slice<'a>, Slice<'a>)> {
        let at = self.find(delimiter)?;
        Some((
            Slice::new(&self.bytes[..at]),
            Slice::new(&self.bytes[at + delimiter.len()..]),
        ))
    }

    /// Iterate over CRLF separated lines. A trailing CRLF does not produce an
    /// empty final line.
    pub fn lines(&self) -> Lines<'a> {
        Lines { rest: *self }
    }
}

impl<'a> Deref for Slice<'a> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl<'a> From<&'a [u8]> for Slice<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a str> for Slice<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl PartialOrd for Slice<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slice<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.compare(other)
    }
}

impl PartialEq<str> for Slice<'_> {
    fn eq(&self, other: &str) -> bool {
        self.equals_text(other)
    }
}

impl PartialEq<&str> for Slice<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.equals_text(other)
    }
}

impl fmt::Display for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(self.bytes))
    }
}

impl fmt::Debug for Slice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.bytes.escape_ascii())
    }
}

pub struct Lines<'a> {
    rest: Slice<'a>,
}

impl<'a> Iterator for Lines<'a> {
    type Item = Slice<'a>;

    fn next(&mut self) -> Option<Slice<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        match self.rest.split_once(b"\r\n") {
            Some((line, rest)) => {
                self.rest = rest;
                Some(line)
            }
            None => {
                let line = self.rest;
                self.rest = Slice::default();
                Some(line)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_compare() {
        let abc = Slice::from("abc");
        assert_eq!(abc.compare(&Slice::from("abc")), Ordering::Equal);
        assert_eq!(abc.compare(&Slice::from("abd")), Ordering::Less);
        assert_eq!(abc.compare(&Slice::from("abb")), Ordering::Greater);
        assert_eq!(abc.compare(&Slice::from("ab")), Ordering::Greater);
        assert_eq!(abc.compare(&Slice::from("abcd")), Ordering::Less);
        assert_eq!(Slice::from("").compare(&Slice::from("")), Ordering::Equal);
        assert!(Slice::from("b") > Slice::from("abc"));
    }

    #[test]
    fn test_equals_text() {
        assert!(Slice::from("GET").equals_text("GET"));
        assert!(!Slice::from("GE").equals_text("GET"));
        assert!(!Slice::from("GETS").equals_text("GET"));
        assert!(!Slice::from("get").equals_text("GET"));
    }

    #[test]
    fn test_find() {
        let s = Slice::from("Host: x\r\n\r\n");
        assert_eq!(s.find(b"Host"), Some(0));
        assert_eq!(s.find(b": "), Some(4));
        assert_eq!(s.find(b"\r\n"), Some(7));
        assert_eq!(s.find(b"\r\n\r\n"), Some(7));
        assert_eq!(s.find(b"\n\r\n"), Some(8));
        assert_eq!(s.find(b"Content-Length"), None);
        assert_eq!(s.find(b""), Some(0));
        assert_eq!(Slice::from("aab").find(b"ab"), Some(1));
        assert_eq!(Slice::from("ab").find(b"abc"), None);
    }

    #[test]
    fn test_subrange_bounds() {
        let s = Slice::from("abcdef");
        assert_eq!(s.subrange(2..4).unwrap(), "cd");
        assert_eq!(s.subrange(6..).unwrap(), "");
        assert_eq!(s.subrange(..=1).unwrap(), "ab");
        assert_eq!(
            s.subrange(4..2),
            Err(SliceError::OutOfRange {
                start: 4,
                end: 2,
                len: 6
            })
        );
        assert!(s.subrange(7..).is_err());
        assert!(s.subrange(..7).is_err());
    }

    #[test]
    fn test_copy_into_arena_is_independent() {
        let arena = Arena::new(64).unwrap();
        let mut buffer = b"index.html".to_vec();
        let copy = Slice::new(&buffer).copy_into_arena(&arena).unwrap();
        let copy = copy.as_bytes().to_vec();
        buffer[0] = b'X';
        assert_eq!(copy, b"index.html".to_vec());
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_copy_into_arena_with_suffix() {
        let arena = Arena::new(64).unwrap();
        let buffer = b"dir/".to_vec();
        let joined = Slice::new(&buffer)
            .copy_into_arena_with(b"index.html", &arena)
            .unwrap();
        assert_eq!(joined, "dir/index.html");
        assert_eq!(buffer, b"dir/".to_vec());
        assert_eq!(arena.used(), 16);
    }

    #[test]
    fn test_copy_into_full_arena() {
        let arena = Arena::new(8).unwrap();
        assert!(Slice::from("0123456789").copy_into_arena(&arena).is_err());
    }

    #[test]
    fn test_split_once() {
        let (key, value) = Slice::from("Referer: http://a: b").split_once(b": ").unwrap();
        assert_eq!(key, "Referer");
        assert_eq!(value, "http://a: b");
        assert!(Slice::from("Host x").split_once(b": ").is_none());
    }

    #[test]
    fn test_lines() {
        let lines: Vec<Slice> = Slice::from("a: 1\r\nb: 2\r\n").lines().collect();
        assert_eq!(lines, vec![Slice::from("a: 1"), Slice::from("b: 2")]);
        let lines: Vec<Slice> = Slice::from("a\r\n\r\nb").lines().collect();
        assert_eq!(lines, vec![Slice::from("a"), Slice::from(""), Slice::from("b")]);
        assert_eq!(Slice::from("").lines().count(), 0);
    }

    #[test]
    fn test_debug_escapes() {
        assert_eq!(format!("{:?}", Slice::from("a\r\n")), "\"a\\r\\n\"");
    }

    proptest! {
        #[test]
        fn prop_full_subrange_is_identity(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
            let s = Slice::new(&bytes);
            prop_assert_eq!(s.subrange(0..s.len()).unwrap(), s);
            prop_assert_eq!(s.subrange(..).unwrap(), s);
        }

        #[test]
        fn prop_find_first_occurrence(
            prefix in prop::collection::vec(any::<u8>(), 0..32),
            needle in prop::collection::vec(any::<u8>(), 1..4),
            suffix in prop::collection::vec(any::<u8>(), 0..32),
        ) {
            let mut haystack = prefix.clone();
            haystack.extend_from_slice(&needle);
            haystack.extend_from_slice(&suffix);
            let found = Slice::new(&haystack).find(&needle).unwrap();
            prop_assert!(found <= prefix.len());
            prop_assert_eq!(&haystack[found..found + needle.len()], &needle[..]);
            prop_assert!(Slice::new(&haystack[..found + needle.len() - 1]).find(&needle).is_none());
        }

        #[test]
        fn prop_compare_matches_byte_order(
            a in prop::collection::vec(any::<u8>(), 0..8),
            b in prop::collection::vec(any::<u8>(), 0..8),
        ) {
            prop_assert_eq!(Slice::new(&a).compare(&Slice::new(&b)), a.cmp(&b));
        }
    }
}
