//! Timestamped value changes and their id generator.

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use strobe_common::Logic;
use strobe_netlist::NetId;

/// A value change on one net at one point in simulation time.
///
/// Equality compares `(net, value, time)` and ignores `id`, so the same change
/// scheduled twice compares equal. Ordering is by `(time, id)`: earlier first,
/// and among simultaneous events, creation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Event {
    /// Target net.
    pub net: NetId,
    /// New value.
    pub value: Logic,
    /// Simulation time in timescale steps.
    pub time: u64,
    /// Creation sequence number, unique within a run.
    pub id: u64,
}

impl Event {
    /// The `(time, id)` sort key.
    pub fn key(&self) -> (u64, u64) {
        (self.time, self.id)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.net == other.net && self.value == other.value && self.time == other.time
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.net.hash(state);
        self.value.hash(state);
        self.time.hash(state);
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Hands out monotonically increasing event ids for one simulation run.
#[derive(Debug, Default)]
pub struct EventIdGenerator {
    next: u64,
}

impl EventIdGenerator {
    /// Creates a generator starting at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Builds an event with a fresh id.
    pub fn event(&mut self, net: NetId, value: Logic, time: u64) -> Event {
        Event {
            net,
            value,
            time,
            id: self.next_id(),
        }
    }

    /// Creates a generator whose first id is `next`, for continuing a
    /// restored run without reusing its ids.
    pub fn starting_at(next: u64) -> Self {
        Self { next }
    }

    /// Restarts numbering at 0.
    pub fn reset(&mut self) {
        self.next = 0;
    }
}
