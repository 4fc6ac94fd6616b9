//! Trade number generation
//!
//! Trade numbers are globally unique and sort in creation order: a fixed
//! prefix plus a zero-padded microsecond timestamp. The generator never
//! reuses or goes below an issued suffix, so two bookings in the same
//! microsecond (or a clock that stands still) still produce strictly
//! increasing numbers.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

/// Prefix carried by every generated trade number
pub const TRADE_NUMBER_PREFIX: &str = "TRD";

/// Monotonic trade number generator
pub struct TradeNumberGenerator {
    last: AtomicU64,
}

impl TradeNumberGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Generate the next trade number
    pub fn next(&self) -> String {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return format!("{}-{:020}", TRADE_NUMBER_PREFIX, candidate),
                Err(observed) => prev = observed,
            }
        }
    }
}

impl Default for TradeNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_are_unique_and_sorted() {
        let generator = TradeNumberGenerator::new();
        let numbers: Vec<String> = (0..1000).map(|_| generator.next()).collect();

        let mut sorted = numbers.clone();
        sorted.sort();
        sorted.dedup();

        assert_eq!(sorted.len(), numbers.len());
        assert_eq!(sorted, numbers);
    }

    #[test]
    fn test_number_format() {
        let generator = TradeNumberGenerator::new();
        let number = generator.next();
        assert!(number.starts_with("TRD-"));
        assert_eq!(number.len(), TRADE_NUMBER_PREFIX.len() + 1 + 20);
    }
}
