//! Optional chain-depth instrumentation for diagnosing load-factor problems.

use core::cell::Cell;

/// Snapshot of lookup depths since construction, the last `clear` or the
/// last `resize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Lookups satisfied by the chain head.
    pub depth_0: u64,
    /// Lookups satisfied by the second node of a chain.
    pub depth_1: u64,
    /// Lookups satisfied any deeper.
    pub depth_2_plus: u64,
    /// Longest chain walk observed, hits and misses alike.
    pub max_depth: u32,
}

#[derive(Debug, Default)]
pub(crate) struct SearchCounters {
    enabled: bool,
    depth_0: Cell<u64>,
    depth_1: Cell<u64>,
    deeper: Cell<u64>,
    max_depth: Cell<u32>,
}

impl SearchCounters {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// `depth` is the zero-based position of the matching node.
    #[inline]
    pub(crate) fn record_hit(&self, depth: u32) {
        if !self.enabled {
            return;
        }
        let slot = match depth {
            0 => &self.depth_0,
            1 => &self.depth_1,
            _ => &self.deeper,
        };
        slot.set(slot.get() + 1);
        self.observe(depth);
    }

    /// `walked` is the number of nodes inspected before giving up.
    #[inline]
    pub(crate) fn record_miss(&self, walked: u32) {
        if self.enabled {
            self.observe(walked);
        }
    }

    #[inline]
    fn observe(&self, depth: u32) {
        if depth > self.max_depth.get() {
            self.max_depth.set(depth);
        }
    }

    pub(crate) fn snapshot(&self) -> SearchStats {
        SearchStats {
            depth_0: self.depth_0.get(),
            depth_1: self.depth_1.get(),
            depth_2_plus: self.deeper.get(),
            max_depth: self.max_depth.get(),
        }
    }

    pub(crate) fn reset(&self) {
        self.depth_0.set(0);
        self.depth_1.set(0);
        self.deeper.set(0);
        self.max_depth.set(0);
    }
}
