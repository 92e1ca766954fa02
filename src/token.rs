// Token Allocator (spec.md §4.1): strictly monotonically increasing 64-bit
// request identifiers for a connection. Values start at 2 (the counter
// increments then returns), thread-safe under concurrent callers.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug)]
pub struct TokenAllocator {
    next: AtomicU64,
}

impl TokenAllocator {
    pub fn new() -> Self {
        TokenAllocator { next: AtomicU64::new(1) }
    }

    /// Returns a value strictly greater than every previously returned
    /// value. Wraparound is not a concern in practice (2^63 tokens).
    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_two() {
        let allocator = TokenAllocator::new();
        assert_eq!(allocator.next(), 2);
        assert_eq!(allocator.next(), 3);
    }

    #[test]
    fn monotonic_under_concurrency() {
        let allocator = Arc::new(TokenAllocator::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let allocator = Arc::clone(&allocator);
            handles.push(std::thread::spawn(move || {
                (0..1000).map(|_| allocator.next()).collect::<Vec<_>>()
            }));
        }

        let mut all_tokens: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all_tokens.sort_unstable();

        let unique_count = {
            let mut dedup = all_tokens.clone();
            dedup.dedup();
            dedup.len()
        };
        assert_eq!(unique_count, all_tokens.len(), "tokens must be unique");

        for window in all_tokens.windows(2) {
            assert!(window[0] < window[1]);
        }
    }
}
