//! Execution id minting

use flowcat_spec::ExecutionId;
use std::sync::atomic::{AtomicI64, Ordering};

/// Mints positive, strictly increasing execution ids
///
/// Ids follow the millisecond wall clock and are bumped by one when two runs
/// land on the same millisecond or the clock steps back.
#[derive(Debug, Default)]
pub struct ExecutionIdGenerator {
    last: AtomicI64,
}

impl ExecutionIdGenerator {
    /// Create generator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next execution id
    pub fn next_id(&self) -> ExecutionId {
        let now = chrono::Utc::now().timestamp_millis().max(1);
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return ExecutionId::new(next),
                Err(actual) => prev = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_positive_and_increasing() {
        let generator = ExecutionIdGenerator::new();
        let ids: Vec<i64> = (0..1000).map(|_| generator.next_id().get()).collect();

        assert!(ids[0] > 0);
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn ids_follow_the_clock() {
        let before = chrono::Utc::now().timestamp_millis();
        let id = ExecutionIdGenerator::new().next_id();
        assert!(id.get() >= before);
        assert!(id.is_run());
    }
}
