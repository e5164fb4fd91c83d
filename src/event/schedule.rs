//! Immutable, time-sorted event groups handed to the transport.
//!
//! A [`Schedule`] is built completely from an arrangement's compiled events
//! before it is installed, so a live schedule is never edited element by
//! element. Range queries use binary search over the sorted start positions.

use std::sync::Arc;

use super::beat::Beat;
use super::types::ScheduledEvent;

/// A sorted, shareable group of events with their absolute start positions.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    entries: Arc<[(Beat, ScheduledEvent)]>,
}

impl Schedule {
    /// Build a schedule from compiled events.
    ///
    /// Uses a stable sort so simultaneous events keep their compiled order.
    pub fn new(events: &[ScheduledEvent]) -> Self {
        let mut entries: Vec<(Beat, ScheduledEvent)> =
            events.iter().map(|e| (e.start(), e.clone())).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            entries: entries.into(),
        }
    }

    /// All events starting in `[from, to)`, in time order.
    pub fn range(&self, from: Beat, to: Beat) -> &[(Beat, ScheduledEvent)] {
        let lo = self.entries.partition_point(|(t, _)| *t < from);
        let hi = self.entries.partition_point(|(t, _)| *t < to);
        if lo >= hi {
            return &[];
        }
        &self.entries[lo..hi]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.entries.iter().map(|(_, e)| e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::types::Trigger;

    fn hit(slot: usize, step: u32, instrument: usize) -> ScheduledEvent {
        ScheduledEvent::drum(slot, step, instrument, 0.8)
    }

    #[test]
    fn empty_schedule() {
        let s = Schedule::new(&[]);
        assert!(s.is_empty());
        assert_eq!(s.len(), 0);
        assert!(s.range(Beat::ZERO, Beat::from_bars(4)).is_empty());
    }

    #[test]
    fn sorted_by_start() {
        let s = Schedule::new(&[hit(1, 0, 0), hit(0, 8, 1), hit(0, 0, 2)]);
        let order: Vec<_> = s.iter().map(|e| (e.slot, e.step)).collect();
        assert_eq!(order, vec![(0, 0), (0, 8), (1, 0)]);
    }

    #[test]
    fn simultaneous_events_keep_compiled_order() {
        let s = Schedule::new(&[hit(0, 4, 2), hit(0, 4, 0), hit(0, 4, 1)]);
        let rows: Vec<_> = s
            .iter()
            .map(|e| match e.trigger {
                Trigger::Drum { instrument } => instrument,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(rows, vec![2, 0, 1]);
    }

    #[test]
    fn range_is_start_inclusive_end_exclusive() {
        let s = Schedule::new(&[hit(0, 0, 0), hit(0, 4, 0), hit(0, 8, 0)]);
        let window = s.range(Beat::from_steps(4), Beat::from_steps(8));
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].1.step, 4);
    }

    #[test]
    fn range_outside_events_is_empty() {
        let s = Schedule::new(&[hit(0, 0, 0)]);
        assert!(s.range(Beat::from_steps(1), Beat::from_steps(16)).is_empty());
        assert!(s.range(Beat::from_steps(8), Beat::from_steps(4)).is_empty());
    }

    #[test]
    fn clones_share_storage() {
        let s = Schedule::new(&[hit(0, 0, 0)]);
        let t = s.clone();
        assert!(Arc::ptr_eq(&s.entries, &t.entries));
    }
}
