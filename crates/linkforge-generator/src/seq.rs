use linkforge_core::base62;
use linkforge_core::{Generator, GeneratorError};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, trace};

/// Lowest counter value; keeps generated codes at two symbols or more.
pub const COUNTER_FLOOR: i64 = 100;

/// A short code generator backed by a single atomic counter.
///
/// Each call increments the counter and returns the new value encoded in
/// base62, so concurrent callers never observe the same value. Codes are
/// unique per instance only; share one instance per store.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicI64,
}

impl SeqGenerator {
    /// Creates a generator seeded at [`COUNTER_FLOOR`].
    pub fn new() -> Self {
        Self::with_offset(COUNTER_FLOOR)
    }

    /// Creates a generator whose first code encodes `offset + 1`.
    ///
    /// Offsets below [`COUNTER_FLOOR`] are raised to it.
    pub fn with_offset(offset: i64) -> Self {
        Self {
            counter: AtomicI64::new(offset.max(COUNTER_FLOOR)),
        }
    }

    /// Increments the counter and returns the new value.
    pub fn next_value(&self) -> Result<i64, GeneratorError> {
        self.counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |v| v.checked_add(1))
            .map(|previous| previous + 1)
            .map_err(GeneratorError::Exhausted)
    }

    /// Returns the next base62-encoded code.
    pub fn next_code(&self) -> Result<String, GeneratorError> {
        let value = self.next_value()?;
        let code = base62::encode(value)?;
        trace!(value, code = %code, "generated code");
        Ok(code)
    }

    /// Last value handed out (or the seed, before the first call).
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SeqGenerator {
    fn generate(&self) -> Result<String, GeneratorError> {
        self.next_code()
    }

    fn checkpoint(&self) -> Option<i64> {
        Some(self.current())
    }

    fn resume_from(&self, position: i64) {
        let previous = self.counter.fetch_max(position, Ordering::SeqCst);
        if previous < position {
            debug!(from = previous, to = position, "generator resumed");
        }
    }
}
