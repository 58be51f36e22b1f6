//! Event identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Generates a new UUID v4.
#[must_use]
pub fn generate_uuid() -> Uuid {
    Uuid::new_v4()
}

/// Source of unique event ids.
///
/// Implementations are shared across host threads and must not hand out the
/// same id twice.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh id.
    fn next_id(&self) -> String;
}

/// Random UUID v4 ids; collision-resistant without coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> String {
        generate_uuid().to_string()
    }
}

/// Predictable ids (`<prefix>-1`, `<prefix>-2`, ...) for tests and fixtures.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdGenerator {
    /// Creates a generator whose first id is `<prefix>-1`.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new("event")
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{n}", self.prefix)
    }
}
