//! Bump-pointer memory arena with checkpoint/reset.
//!
//! An [`Arena`] owns one fixed block of bytes. Allocations are carved off the
//! front by advancing a single offset, and are reclaimed all at once by
//! resetting the offset to an earlier [`Checkpoint`].
//!
//! Allocation only needs a shared borrow, so any number of regions can be
//! alive at the same time. [`Arena::reset`] needs a unique borrow, which means
//! every region handed out since the arena was last borrowed mutably must be
//! dead before the offset can move backwards.
use std::cell::Cell;
use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use log::trace;
use thiserror::Error;

/// Allocation granularity. Every allocation advances the offset by a
/// multiple of this.
pub const ALIGNMENT: usize = mem::size_of::<usize>();

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("arena out of memory: requested {requested} bytes, {remaining} remaining")]
    OutOfMemory { requested: usize, remaining: usize },
    #[error("invalid checkpoint {checkpoint}, arena offset is {offset}")]
    InvalidCheckpoint { checkpoint: usize, offset: usize },
}

/// Opaque arena position returned by [`Arena::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checkpoint(usize);

impl Checkpoint {
    /// Offset into the arena this checkpoint refers to.
    pub fn offset(self) -> usize {
        self.0
    }
}

/// A fixed-capacity bump allocator.
///
/// # Example
/// ```
/// use crvr::arena::Arena;
///
/// let mut arena = Arena::new(64).unwrap();
/// let start = arena.checkpoint();
/// {
///     let a = arena.alloc(3).unwrap();
///     a.copy_from_slice(b"abc");
///     let b = arena.alloc_copy(b"def").unwrap();
///     assert_eq!(a, b"abc");
///     assert_eq!(b, b"def");
/// }
/// assert_eq!(arena.remaining_capacity(), 64 - 16);
/// arena.reset(start).unwrap();
/// assert_eq!(arena.remaining_capacity(), 64);
/// ```
pub struct Arena {
    base: NonNull<u8>,
    capacity: usize,
    offset: Cell<usize>,
}

// The arena exclusively owns its block; outstanding regions borrow the arena
// itself, so moving it to another thread cannot leave them dangling.
unsafe impl Send for Arena {}

/// Round `n` up to the allocation granularity.
pub fn aligned_size(n: usize) -> Option<usize> {
    n.checked_add(ALIGNMENT - 1).map(|n| n & !(ALIGNMENT - 1))
}

impl Arena {
    /// Reserve `capacity` bytes. This is the only point where the arena
    /// talks to the system allocator.
    pub fn new(capacity: usize) -> Result<Self, ArenaError> {
        let mut storage: Vec<u8> = Vec::new();
        storage
            .try_reserve_exact(capacity)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: capacity,
                remaining: 0,
            })?;
        storage.resize(capacity, 0);
        let storage = Box::into_raw(storage.into_boxed_slice()) as *mut u8;
        let base = NonNull::new(storage).ok_or(ArenaError::OutOfMemory {
            requested: capacity,
            remaining: 0,
        })?;
        trace!("arena reserved {} bytes", capacity);
        Ok(Self {
            base,
            capacity,
            offset: Cell::new(0),
        })
    }

    /// Allocate `n` zeroed bytes. The offset advances by `n` rounded up to
    /// [`ALIGNMENT`]. On failure nothing changes.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc(&self, n: usize) -> Result<&mut [u8], ArenaError> {
        let start = self.offset.get();
        let remaining = self.capacity - start;
        let aligned = match aligned_size(n) {
            Some(aligned) if aligned <= remaining => aligned,
            _ => {
                return Err(ArenaError::OutOfMemory {
                    requested: n,
                    remaining,
                })
            }
        };
        self.offset.set(start + aligned);
        // SAFETY: `start + n <= capacity`, and `[start, start + aligned)` was
        // past the offset until now, so no other live region overlaps it.
        // Regions borrow `self`, and the offset only moves backwards through
        // `&mut self`.
        let region = unsafe { slice::from_raw_parts_mut(self.base.as_ptr().add(start), n) };
        region.fill(0);
        Ok(region)
    }

    /// Allocate a region and fill it with a copy of `bytes`.
    #[allow(clippy::mut_from_ref)]
    pub fn alloc_copy(&self, bytes: &[u8]) -> Result<&mut [u8], ArenaError> {
        let region = self.alloc(bytes.len())?;
        region.copy_from_slice(bytes);
        Ok(region)
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.offset.get())
    }

    /// Move the offset back to `checkpoint`. Everything allocated after it is
    /// released. A checkpoint ahead of the current offset is rejected.
    pub fn reset(&mut self, checkpoint: Checkpoint) -> Result<(), ArenaError> {
        let offset = self.offset.get();
        if checkpoint.0 > offset {
            return Err(ArenaError::InvalidCheckpoint {
                checkpoint: checkpoint.0,
                offset,
            });
        }
        trace!("arena reset {} -> {}", offset, checkpoint.0);
        self.offset.set(checkpoint.0);
        Ok(())
    }

    /// Run `f` against the arena and release everything it allocated
    /// afterwards, whatever `f` returns.
    ///
    /// ```
    /// use crvr::arena::Arena;
    ///
    /// let mut arena = Arena::new(32).unwrap();
    /// let result: Result<usize, &str> = arena.scope(|arena| {
    ///     arena.alloc(10).map_err(|_| "oom")?;
    ///     Err("handler failed")
    /// });
    /// assert!(result.is_err());
    /// assert_eq!(arena.used(), 0);
    /// ```
    pub fn scope<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&Arena) -> R,
    {
        let checkpoint = self.checkpoint();
        let result = f(&*self);
        self.offset.set(checkpoint.0);
        result
    }

    pub fn remaining_capacity(&self) -> usize {
        self.capacity - self.offset.get()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes currently allocated.
    pub fn used(&self) -> usize {
        self.offset.get()
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: `base` and `capacity` come from the boxed slice leaked in
        // `new`, and nothing borrows the arena while it is being dropped.
        unsafe {
            drop(Box::from_raw(ptr::slice_from_raw_parts_mut(
                self.base.as_ptr(),
                self.capacity,
            )));
        }
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity)
            .field("offset", &self.offset.get())
            .finish()
    }
}
