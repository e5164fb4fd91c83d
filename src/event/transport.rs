//! Transport — the shared musical clock that schedules bound events.
//!
//! [`Transport`] is the contract the engine consumes; it never owns a clock
//! itself. [`LoopTransport`] is the reference implementation: it advances by
//! audio frames with a fractional tick accumulator (no drift over long
//! sessions), loops at a configurable bar count, and fires bound schedules into
//! a [`PlaybackSink`].

use super::beat::{Beat, TRANSPORT_PPQN};
use super::schedule::Schedule;
use crate::playback::{self, PlaybackSink};

/// Handle of a schedule registered with a transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScheduleId(u64);

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    Stopped,
    Playing,
}

/// The clock contract consumed by arrangements and the scheduler binding.
pub trait Transport {
    /// Current position within the loop.
    fn position(&self) -> Beat;

    fn bpm(&self) -> f64;

    /// Register a schedule that fires on every pass of the loop.
    fn schedule_repeating(&mut self, schedule: Schedule) -> ScheduleId;

    /// Remove a schedule. Returns `false` if `id` was not registered.
    fn cancel(&mut self, id: ScheduleId) -> bool;

    /// Dispose `old` and install `schedule` as one step.
    ///
    /// No firing can observe the state in between: the caller holds `&mut self`
    /// for the whole exchange.
    fn replace(&mut self, old: Option<ScheduleId>, schedule: Schedule) -> ScheduleId {
        if let Some(id) = old {
            self.cancel(id);
        }
        self.schedule_repeating(schedule)
    }

    fn start(&mut self);

    fn stop(&mut self);

    fn set_loop_length(&mut self, bars: u32);
}

/// Frame-driven looping transport.
#[derive(Debug)]
pub struct LoopTransport {
    bpm: f64,
    sample_rate: u32,
    state: PlayState,
    position_ticks: u64,
    /// Fractional tick accumulator for drift-free advancement.
    tick_remainder: f64,
    loop_bars: u32,
    schedules: Vec<(ScheduleId, Schedule)>,
    next_id: u64,
}

impl LoopTransport {
    /// Create a stopped transport at position zero looping over `loop_bars`.
    pub fn new(bpm: f64, sample_rate: u32, loop_bars: u32) -> Self {
        Self {
            bpm,
            sample_rate,
            state: PlayState::Stopped,
            position_ticks: 0,
            tick_remainder: 0.0,
            loop_bars: loop_bars.max(1),
            schedules: Vec::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        self.bpm = bpm;
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn loop_length(&self) -> u32 {
        self.loop_bars
    }

    /// Number of schedules currently bound.
    pub fn bound(&self) -> usize {
        self.schedules.len()
    }

    /// Reset position to zero without changing play state.
    pub fn reset(&mut self) {
        self.position_ticks = 0;
        self.tick_remainder = 0.0;
    }

    fn loop_ticks(&self) -> u64 {
        Beat::from_bars(self.loop_bars).ticks()
    }

    /// Advance by `num_frames` audio frames, firing every bound event that
    /// starts inside the covered window.
    ///
    /// The window is `[from, to)`. When it crosses the loop end it is split at
    /// the seam and continues from zero. Events are delivered in strictly
    /// increasing time order across all schedules; events at the same tick keep
    /// schedule registration order. Returns `None` while stopped.
    pub fn advance_by_frames(
        &mut self,
        num_frames: u32,
        sink: &mut dyn PlaybackSink,
    ) -> Option<(Beat, Beat)> {
        if self.state == PlayState::Stopped {
            return None;
        }

        let from = Beat::from_ticks(self.position_ticks);

        // ticks = (frames / sample_rate) * (bpm / 60) * PPQN
        let ticks_f64 = (num_frames as f64 / self.sample_rate as f64)
            * (self.bpm / 60.0)
            * TRANSPORT_PPQN as f64;
        let total = self.tick_remainder + ticks_f64;
        let whole_ticks = total.floor() as u64;
        self.tick_remainder = total - whole_ticks as f64;

        let loop_ticks = self.loop_ticks();
        // (offset from block start, schedule order, event)
        let mut due = Vec::new();
        let mut cursor = self.position_ticks;
        let mut remaining = whole_ticks;
        let mut elapsed = 0u64;
        while remaining > 0 {
            let span = remaining.min(loop_ticks - cursor);
            let lo = Beat::from_ticks(cursor);
            let hi = Beat::from_ticks(cursor + span);
            for (order, (_, schedule)) in self.schedules.iter().enumerate() {
                for (start, event) in schedule.range(lo, hi) {
                    due.push((elapsed + (start.ticks() - cursor), order, event.clone()));
                }
            }
            elapsed += span;
            remaining -= span;
            cursor = (cursor + span) % loop_ticks;
        }
        self.position_ticks = cursor;

        due.sort_by_key(|(offset, order, _)| (*offset, *order));
        let bpm = self.bpm;
        let sample_rate = self.sample_rate;
        for (offset, _, event) in &due {
            let frames = Beat::from_ticks(*offset).to_sample_offset(bpm, sample_rate);
            let frame_offset = (frames as u32).min(num_frames.saturating_sub(1));
            playback::fire(event, frame_offset, sink);
        }

        Some((from, Beat::from_ticks(self.position_ticks)))
    }
}

impl Transport for LoopTransport {
    fn position(&self) -> Beat {
        Beat::from_ticks(self.position_ticks)
    }

    fn bpm(&self) -> f64 {
        self.bpm
    }

    fn schedule_repeating(&mut self, schedule: Schedule) -> ScheduleId {
        let id = ScheduleId(self.next_id);
        self.next_id += 1;
        self.schedules.push((id, schedule));
        id
    }

    fn cancel(&mut self, id: ScheduleId) -> bool {
        let before = self.schedules.len();
        self.schedules.retain(|(sid, _)| *sid != id);
        self.schedules.len() != before
    }

    fn replace(&mut self, old: Option<ScheduleId>, schedule: Schedule) -> ScheduleId {
        let id = ScheduleId(self.next_id);
        self.next_id += 1;
        // Swap in place so the new schedule keeps the old one's firing order.
        let existing = old.and_then(|old| self.schedules.iter().position(|(sid, _)| *sid == old));
        match existing {
            Some(index) => self.schedules[index] = (id, schedule),
            None => self.schedules.push((id, schedule)),
        }
        id
    }

    fn start(&mut self) {
        self.state = PlayState::Playing;
    }

    /// Stop playback and rewind to the loop start.
    fn stop(&mut self) {
        self.state = PlayState::Stopped;
        self.reset();
    }

    fn set_loop_length(&mut self, bars: u32) {
        self.loop_bars = bars.max(1);
        self.position_ticks %= self.loop_ticks();
    }
}
