// Per-target size constraints and the cross-target floor

use std::fmt;

/// Snapshot of one target's volume. `minimum_size <= current_size` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceConstraint {
    current_size: u64,
    minimum_size: u64,
}

impl ResourceConstraint {
    /// Returns `None` when the minimum exceeds the current size.
    pub fn new(current_size: u64, minimum_size: u64) -> Option<Self> {
        (minimum_size <= current_size).then_some(Self {
            current_size,
            minimum_size,
        })
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn minimum_size(&self) -> u64 {
        self.minimum_size
    }
}

/// Largest minimum size among the targets that answered, and who set it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateConstraint {
    pub floor: u64,
    pub set_by: String,
}

/// Bytes to remove from every target's current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShrinkRequest {
    pub delta: i64,
}

impl ShrinkRequest {
    pub fn new(delta: i64) -> Self {
        Self { delta }
    }
}

impl fmt::Display for ShrinkRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.delta > 0 {
            f.write_str(&crate::units::format_bytes(self.delta as u64))
        } else {
            write!(f, "{} B", self.delta)
        }
    }
}
