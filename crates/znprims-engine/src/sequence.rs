use std::sync::atomic::{AtomicU8, Ordering};

/// Transaction sequence numbers, 1 through 255.
///
/// Zero is never handed out; after 255 the counter wraps to 1. Safe to share
/// between tasks: concurrent callers always receive distinct values until the
/// counter wraps.
#[derive(Debug)]
pub struct SequenceCounter {
    next: AtomicU8,
}

impl SequenceCounter {
    pub const FIRST: u8 = 1;

    pub fn new() -> Self {
        Self::starting_at(Self::FIRST)
    }

    /// Counter whose first value is `value` (0 is bumped to 1).
    pub fn starting_at(value: u8) -> Self {
        Self {
            next: AtomicU8::new(value.max(Self::FIRST)),
        }
    }

    /// Take the next number.
    pub fn next(&self) -> u8 {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(advance(current))
            })
            .unwrap_or_else(|current| current)
    }

    /// The number the next call will return.
    pub fn peek(&self) -> u8 {
        self.next.load(Ordering::Acquire)
    }
}

fn advance(current: u8) -> u8 {
    match current {
        u8::MAX => SequenceCounter::FIRST,
        n => n + 1,
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn starts_at_one() {
        let counter = SequenceCounter::new();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        assert_eq!(counter.peek(), 3);
    }

    #[test]
    fn wraps_past_zero() {
        let counter = SequenceCounter::starting_at(254);
        assert_eq!(counter.next(), 254);
        assert_eq!(counter.next(), 255);
        assert_eq!(counter.next(), 1);
    }

    #[test]
    fn zero_start_is_bumped() {
        assert_eq!(SequenceCounter::starting_at(0).next(), 1);
    }

    #[test]
    fn full_cycle_never_yields_zero() {
        let counter = SequenceCounter::new();
        let seen: HashSet<u8> = (0..255).map(|_| counter.next()).collect();
        assert_eq!(seen.len(), 255);
        assert!(!seen.contains(&0));
    }

    #[test]
    fn concurrent_callers_get_distinct_values() {
        let counter = Arc::new(SequenceCounter::new());
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counter = Arc::clone(&counter);
                thread::spawn(move || (0..50).map(|_| counter.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for worker in workers {
            for value in worker.join().expect("worker should finish") {
                assert!(seen.insert(value), "value {value} handed out twice");
            }
        }
        assert_eq!(seen.len(), 200);
    }
}
