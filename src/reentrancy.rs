//! Debug-only reentrancy guard.
//!
//! `ChainedHashTable` calls into user code (the key hasher and the key
//! comparator) while walking chains. A callback that re-enters the same
//! table, e.g. through a raw pointer, would observe a half-updated chain or
//! cursor. In debug builds entering twice without dropping the guard
//! panics; in release builds the guard compiles to a no-op.
//!
//! The tracker is a `Cell`, so a guarded structure is `Send` but not `Sync`:
//! it can move between threads behind a caller-owned lock and never be
//! shared without one.

use core::cell::Cell;
use core::marker::PhantomData;

/// Per-instance reentrancy tracker. Embed this in structs to guard public
/// entry-points with `let _g = self.reentrancy.enter();`.
#[derive(Debug)]
pub struct DebugReentrancy {
    #[cfg(debug_assertions)]
    depth: Cell<u32>,
    _not_sync: PhantomData<Cell<()>>,
}

impl DebugReentrancy {
    pub const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            depth: Cell::new(0),
            _not_sync: PhantomData,
        }
    }

    /// Enter a guarded section. In debug builds, panics if already entered.
    #[inline]
    pub fn enter(&self) -> ReentrancyGuard<'_> {
        #[cfg(debug_assertions)]
        {
            let d = self.depth.get();
            assert!(d == 0, "reentrancy detected: nested entry into hash table");
            self.depth.set(d + 1);
            ReentrancyGuard { owner: self }
        }

        #[cfg(not(debug_assertions))]
        {
            ReentrancyGuard { _z: PhantomData }
        }
    }
}

impl Default for DebugReentrancy {
    fn default() -> Self {
        Self::new()
    }
}

/// RAII guard returned by `DebugReentrancy::enter`.
pub struct ReentrancyGuard<'a> {
    #[cfg(debug_assertions)]
    owner: &'a DebugReentrancy,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            let d = self.owner.depth.get();
            debug_assert!(d > 0);
            self.owner.depth.set(d - 1);
        }
    }
}
