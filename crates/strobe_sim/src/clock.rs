//! Periodic clock stimulus.
//!
//! Clocks are generated lazily: the engine asks each clock for its next edge
//! time and only materializes the event when that time becomes the next
//! timestamp to process, so a long-running clock never floods the pending set.

use strobe_common::Logic;
use strobe_netlist::NetId;

use crate::error::StimulusError;

/// Description of a clock driving one net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockSpec {
    /// Driven net.
    pub net: NetId,
    /// Full period; the net toggles every `period / 2` steps.
    pub period: u64,
    /// Value of the first edge.
    pub start_value: Logic,
    /// Time of the first edge.
    pub start_time: u64,
    /// Edges are produced for times before `start_time + duration`.
    pub duration: u64,
}

impl ClockSpec {
    /// Checks the start value and period. `net_name` is used in error messages.
    pub fn validate(&self, net_name: &str) -> Result<(), StimulusError> {
        if !self.start_value.is_binary() {
            return Err(StimulusError::NonBinaryClockStart {
                net: net_name.to_string(),
                value: self.start_value,
            });
        }
        if self.period < 2 || self.period % 2 != 0 {
            return Err(StimulusError::InvalidClockPeriod {
                net: net_name.to_string(),
                period: self.period,
            });
        }
        Ok(())
    }

    /// First time at which no more edges are produced.
    pub fn end_time(&self) -> u64 {
        self.start_time.saturating_add(self.duration)
    }
}

/// A running clock: its description plus the next edge to emit.
#[derive(Debug, Clone)]
pub struct Clock {
    spec: ClockSpec,
    next: Option<(u64, Logic)>,
}

impl Clock {
    /// Creates a clock positioned at its first edge.
    pub fn new(spec: ClockSpec) -> Self {
        let mut clock = Self { spec, next: None };
        clock.rewind();
        clock
    }

    /// The clock's description.
    pub fn spec(&self) -> &ClockSpec {
        &self.spec
    }

    /// Time of the next edge, if the clock has not finished.
    pub fn peek_time(&self) -> Option<u64> {
        self.next.map(|(time, _)| time)
    }

    /// Returns the next edge and advances past it.
    pub fn advance(&mut self) -> Option<(u64, Logic)> {
        let current = self.next?;
        let half = self.spec.period / 2;
        self.next = current
            .0
            .checked_add(half)
            .filter(|t| *t < self.spec.end_time())
            .map(|t| (t, current.1.toggle()));
        Some(current)
    }

    /// Drops every edge at or before `time`.
    pub fn skip_through(&mut self, time: u64) {
        while self.peek_time().is_some_and(|t| t <= time) {
            self.advance();
        }
    }

    /// Restarts the clock at its first edge.
    pub fn rewind(&mut self) {
        self.next = (self.spec.duration > 0).then_some((self.spec.start_time, self.spec.start_value));
    }
}
