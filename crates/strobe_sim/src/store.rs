//! Per-net event histories.
//!
//! The [`EventLog`] is the simulation's record of everything that happened:
//! for every net, the processed events in `(time, id)` order. Value queries at
//! arbitrary times are binary searches over that order.

use std::collections::BTreeMap;

use strobe_common::Logic;
use strobe_netlist::NetId;

use crate::event::Event;

/// Ordered event histories keyed by net.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    histories: BTreeMap<NetId, Vec<Event>>,
    count: usize,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an event into its net's history, keeping `(time, id)` order.
    ///
    /// Duplicates are retained.
    pub fn add_event(&mut self, event: Event) {
        let history = self.histories.entry(event.net).or_default();
        match history.last() {
            Some(last) if last.key() > event.key() => {
                let index = history.partition_point(|e| e.key() <= event.key());
                history.insert(index, event);
            }
            _ => history.push(event),
        }
        self.count += 1;
    }

    /// Returns the value of `net` at `time`: the value of the last event with
    /// a timestamp at or before `time`, or `X` when there is none.
    pub fn get_value(&self, net: NetId, time: u64) -> Logic {
        let history = self.history(net);
        let index = history.partition_point(|e| e.time <= time);
        if index == 0 {
            Logic::X
        } else {
            history[index - 1].value
        }
    }

    /// Borrows the history of one net; empty for nets without events.
    pub fn history(&self, net: NetId) -> &[Event] {
        self.histories.get(&net).map_or(&[], Vec::as_slice)
    }

    /// Returns a copy of one net's history.
    pub fn get_history(&self, net: NetId) -> Vec<Event> {
        self.history(net).to_vec()
    }

    /// Returns a copy of every history.
    pub fn get_all_history(&self) -> BTreeMap<NetId, Vec<Event>> {
        self.histories.clone()
    }

    /// Time of the most recent event on `net`.
    pub fn last_time(&self, net: NetId) -> Option<u64> {
        self.history(net).last().map(|e| e.time)
    }

    /// Value of the most recent event on `net`.
    pub fn last_value(&self, net: NetId) -> Option<Logic> {
        self.history(net).last().map(|e| e.value)
    }

    /// Events on `net` with `start <= time <= end`.
    pub fn events_between(&self, net: NetId, start: u64, end: u64) -> Vec<Event> {
        let history = self.history(net);
        let lo = history.partition_point(|e| e.time < start);
        let hi = history.partition_point(|e| e.time <= end);
        history[lo..hi.max(lo)].to_vec()
    }

    /// Total number of recorded events.
    pub fn event_count(&self) -> usize {
        self.count
    }

    /// Nets with at least one event, in id order.
    pub fn nets(&self) -> impl Iterator<Item = NetId> + '_ {
        self.histories.keys().copied()
    }

    /// Latest timestamp across all nets.
    pub fn end_time(&self) -> Option<u64> {
        self.histories
            .values()
            .filter_map(|h| h.last().map(|e| e.time))
            .max()
    }

    /// Removes every event.
    pub fn clear(&mut self) {
        self.histories.clear();
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ev(net: u32, value: Logic, time: u64, id: u64) -> Event {
        Event {
            net: NetId::from_raw(net),
            value,
            time,
            id,
        }
    }

    #[test]
    fn value_before_any_event_is_x() {
        let mut log = EventLog::new();
        assert_eq!(log.get_value(NetId::from_raw(0), 100), Logic::X);
        log.add_event(ev(0, Logic::One, 10, 0));
        assert_eq!(log.get_value(NetId::from_raw(0), 9), Logic::X);
    }

    #[test]
    fn value_holds_between_events() {
        let mut log = EventLog::new();
        log.add_event(ev(0, Logic::Zero, 5, 0));
        log.add_event(ev(0, Logic::One, 20, 1));
        let n = NetId::from_raw(0);
        for t in 5..20 {
            assert_eq!(log.get_value(n, t), Logic::Zero);
        }
        assert_eq!(log.get_value(n, 20), Logic::One);
        assert_eq!(log.get_value(n, u64::MAX), Logic::One);
    }

    #[test]
    fn same_time_last_id_wins() {
        let mut log = EventLog::new();
        log.add_event(ev(0, Logic::Zero, 5, 3));
        log.add_event(ev(0, Logic::One, 5, 4));
        assert_eq!(log.get_value(NetId::from_raw(0), 5), Logic::One);
    }

    #[test]
    fn out_of_order_insert_is_sorted() {
        let mut log = EventLog::new();
        log.add_event(ev(0, Logic::One, 30, 2));
        log.add_event(ev(0, Logic::Zero, 10, 0));
        log.add_event(ev(0, Logic::X, 20, 1));
        log.add_event(ev(0, Logic::Z, 20, 5));
        let keys: Vec<_> = log.history(NetId::from_raw(0)).iter().map(Event::key).collect();
        assert_eq!(keys, vec![(10, 0), (20, 1), (20, 5), (30, 2)]);
    }

    #[test]
    fn duplicates_retained() {
        let mut log = EventLog::new();
        log.add_event(ev(0, Logic::One, 5, 0));
        log.add_event(ev(0, Logic::One, 5, 1));
        assert_eq!(log.get_history(NetId::from_raw(0)).len(), 2);
        assert_eq!(log.event_count(), 2);
    }

    #[test]
    fn queries_and_clear() {
        let mut log = EventLog::new();
        log.add_event(ev(1, Logic::Zero, 0, 0));
        log.add_event(ev(1, Logic::One, 10, 1));
        log.add_event(ev(1, Logic::Zero, 20, 2));
        log.add_event(ev(3, Logic::One, 15, 3));
        let n = NetId::from_raw(1);
        assert_eq!(log.last_time(n), Some(20));
        assert_eq!(log.last_value(n), Some(Logic::Zero));
        assert_eq!(log.events_between(n, 5, 20).len(), 2);
        assert!(log.events_between(n, 11, 19).is_empty());
        assert_eq!(log.nets().collect::<Vec<_>>(), vec![n, NetId::from_raw(3)]);
        assert_eq!(log.end_time(), Some(20));
        assert_eq!(log.get_all_history().len(), 2);
        log.clear();
        assert_eq!(log.event_count(), 0);
        assert_eq!(log.last_time(n), None);
    }
}
