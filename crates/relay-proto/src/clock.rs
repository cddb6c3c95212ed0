//! Lamport logical clock for ordering distributed events.

use serde::{Deserialize, Serialize};

/// A Lamport logical clock for establishing causal ordering of events.
///
/// Each participant maintains its own clock. The value increases
/// monotonically: it is ticked before any event is emitted and observed
/// whenever a clock value arrives from another participant.
///
/// # Example
///
/// ```rust
/// use relay_proto::LamportClock;
///
/// let mut clock = LamportClock::new();
/// assert_eq!(clock.tick(), 1);
/// assert_eq!(clock.tick(), 2);
///
/// // A message arrives stamped with clock 10.
/// assert_eq!(clock.observe(10), 11); // max(2, 10) + 1
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Serialize, Deserialize)]
pub struct LamportClock {
    value: u64,
}

impl LamportClock {
    /// Creates a new clock initialized to 0.
    #[must_use]
    pub const fn new() -> Self {
        Self { value: 0 }
    }

    /// Creates a clock with a specific initial value.
    #[must_use]
    pub const fn with_value(value: u64) -> Self {
        Self { value }
    }

    /// Returns the current clock value.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.value
    }

    /// Increments the clock for a local event and returns the new value.
    pub fn tick(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    /// Observes a clock value received from another participant.
    ///
    /// Sets this clock to `max(self, received) + 1` so that every later
    /// local event is ordered after the received one.
    pub fn observe(&mut self, received: u64) -> u64 {
        self.value = self.value.max(received) + 1;
        self.value
    }

    /// Compares two clocks for the happens-before relationship.
    ///
    /// Lamport clocks only provide a partial order: `false` does not mean
    /// `other` happened before `self`.
    #[must_use]
    pub const fn happened_before(&self, other: &LamportClock) -> bool {
        self.value < other.value
    }
}
