use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display};

use crate::error::Error;

/**
 * All keyed elements of a datastructure implement this trait. They are
 * identified by a stable index that never changes for the lifetime of the
 * element, even as other elements are created and deleted around it.
 */
pub trait Handle: Copy + Eq + Ord + std::hash::Hash {
    /**
     * The index of the element.
     */
    fn index(&self) -> u64;
}

/**
 * Vertex key. Also used for the nodes of a [`Graph`](crate::Graph).
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VH {
    idx: u64,
}

/**
 * Face key.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FH {
    idx: u64,
}

/**
 * Cell key.
 */
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CH {
    idx: u64,
}

impl Handle for VH {
    fn index(&self) -> u64 {
        self.idx
    }
}

impl From<u64> for VH {
    fn from(idx: u64) -> Self {
        VH { idx }
    }
}

impl From<&u64> for VH {
    fn from(idx: &u64) -> Self {
        VH { idx: *idx }
    }
}

impl Handle for FH {
    fn index(&self) -> u64 {
        self.idx
    }
}

impl From<u64> for FH {
    fn from(idx: u64) -> Self {
        FH { idx }
    }
}

impl From<&u64> for FH {
    fn from(idx: &u64) -> Self {
        FH { idx: *idx }
    }
}

impl Handle for CH {
    fn index(&self) -> u64 {
        self.idx
    }
}

impl From<u64> for CH {
    fn from(idx: u64) -> Self {
        CH { idx }
    }
}

impl From<&u64> for CH {
    fn from(idx: &u64) -> Self {
        CH { idx: *idx }
    }
}

impl Display for VH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VH({})", self.index())
    }
}

impl Display for FH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FH({})", self.index())
    }
}

impl Display for CH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CH({})", self.index())
    }
}

impl Debug for VH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VH({})", self.index())
    }
}

impl Debug for FH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FH({})", self.index())
    }
}

impl Debug for CH {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CH({})", self.index())
    }
}

/// Issues keys for one kind of element.
///
/// Auto-allocated keys are monotonic: the allocator hands out `max_used + 1`
/// (0 when nothing was ever allocated) and never reuses a retired key. An
/// explicitly supplied key advances the counter past itself, so later auto
/// keys cannot collide with it. Vertex, face and cell keys come from separate
/// allocators and live in separate namespaces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KeyAllocator {
    next: u64,
}

impl KeyAllocator {
    pub fn new() -> Self {
        KeyAllocator { next: 0 }
    }

    pub fn from_next(next: u64) -> Self {
        KeyAllocator { next }
    }

    /// Allocate the next auto key.
    pub fn fresh<H: Handle + From<u64>>(&mut self) -> H {
        let k = self.next;
        self.next += 1;
        k.into()
    }

    /// Record an explicitly supplied key.
    ///
    /// The caller must check the key against its live set first; this only
    /// moves the counter so auto keys stay collision-free.
    pub fn claim<H: Handle>(&mut self, key: H) {
        self.next = self.next.max(key.index() + 1);
    }

    /// Allocate a key, honoring an explicit request.
    ///
    /// `is_live` reports whether a key is currently in use; an explicit key
    /// that is live fails with [`Error::KeyCollision`]. Explicit reuse of a
    /// retired key is allowed.
    pub fn allocate<H, F>(&mut self, explicit: Option<H>, is_live: F) -> Result<H, Error>
    where
        H: Handle + From<u64>,
        F: Fn(H) -> bool,
    {
        match explicit {
            Some(key) => {
                if is_live(key) {
                    return Err(Error::KeyCollision(key.index()));
                }
                self.claim(key);
                Ok(key)
            }
            None => Ok(self.fresh()),
        }
    }

    pub fn next_key(&self) -> u64 {
        self.next
    }
}
