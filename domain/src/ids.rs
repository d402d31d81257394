//! Identifier generation strategies.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::IdGenerator;

/// Counter-based generator yielding `"1"`, `"2"`, ... Deterministic, which
/// makes it the generator of choice for tests and demos.
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for SequentialIdGenerator {
    fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}
