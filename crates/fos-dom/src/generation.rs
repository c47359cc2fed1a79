//! DOM Generation IDs
//!
//! The document owns one generation counter that advances on every
//! structural or attribute mutation. Caches remember the generation they
//! were computed at; if it still matches, the cached value is valid.
//!
//! # Consumers
//! - Live collections
//! - The id index
//! - Selector query results

use std::cell::Cell;

/// Generation counter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Initial generation (never mutated)
    pub const INITIAL: Self = Generation(0);

    /// Create a generation from a raw value
    #[inline]
    pub const fn new(value: u64) -> Self {
        Generation(value)
    }

    /// Get the raw value
    #[inline]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next generation
    #[inline]
    pub const fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }
}

impl Default for Generation {
    fn default() -> Self {
        Self::INITIAL
    }
}

/// Generation source for a document
///
/// Single-owner: interior mutability through `Cell`, no atomics.
#[derive(Debug, Default)]
pub struct GenerationSource {
    current: Cell<Generation>,
}

impl GenerationSource {
    /// Create a new generation source
    pub const fn new() -> Self {
        Self {
            current: Cell::new(Generation::INITIAL),
        }
    }

    /// Get the current generation
    #[inline]
    pub fn current(&self) -> Generation {
        self.current.get()
    }

    /// Advance for a mutation and return the new generation
    #[inline]
    pub fn bump(&self) -> Generation {
        let next = self.current.get().next();
        self.current.set(next);
        next
    }
}

/// Cached value with generation tracking
#[derive(Debug, Clone)]
pub struct Cached<T> {
    /// The cached value
    value: T,
    /// Generation when this was computed
    generation: Generation,
}

impl<T> Cached<T> {
    /// Create a new cached value
    pub fn new(value: T, generation: Generation) -> Self {
        Self { value, generation }
    }

    /// Get the value if still valid
    pub fn get_if_valid(&self, current: Generation) -> Option<&T> {
        (self.generation == current).then_some(&self.value)
    }

    /// Get the value (even if stale)
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Get the generation
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Check if valid
    pub fn is_valid(&self, current: Generation) -> bool {
        self.generation == current
    }

    /// Update the cached value
    pub fn update(&mut self, value: T, generation: Generation) {
        self.value = value;
        self.generation = generation;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_ordering() {
        let g1 = Generation::new(0);
        let g2 = g1.next();
        assert!(g2 > g1);
        assert_eq!(g2.value(), 1);
    }

    #[test]
    fn test_generation_source() {
        let source = GenerationSource::new();
        assert_eq!(source.current(), Generation::INITIAL);

        let g1 = source.bump();
        let g2 = source.bump();
        assert_eq!(g1, Generation::new(1));
        assert_eq!(g2, Generation::new(2));
        assert_eq!(source.current(), g2);
    }

    #[test]
    fn test_cached_value() {
        let mut cache: Cached<i32> = Cached::new(42, Generation::new(1));

        assert_eq!(cache.get(), &42);
        assert!(cache.get_if_valid(Generation::new(1)).is_some());
        assert!(cache.get_if_valid(Generation::new(2)).is_none());

        cache.update(99, Generation::new(2));
        assert_eq!(cache.get(), &99);
        assert!(cache.is_valid(Generation::new(2)));
    }
}
