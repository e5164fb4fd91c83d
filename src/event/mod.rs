//! Event engine — musical time, compiled events, and the scheduler binding.
//!
//! Arrangements compile their bars into [`ScheduledEvent`]s. A
//! [`ScheduleBinding`] keeps exactly one live [`Schedule`] per arrangement on a
//! shared [`Transport`], replacing it whenever the arrangement recompiles.
//!
//! The binding does **not** own the transport. The caller passes it in for
//! each operation, which keeps all scheduling logic testable without a clock.

pub mod beat;
pub mod schedule;
pub mod transport;
pub mod types;

pub use beat::{
    Beat, MusicalTime, STEPS_PER_BAR, STEPS_PER_QUARTER, TICKS_PER_STEP, TRANSPORT_PPQN,
};
pub use schedule::Schedule;
pub use transport::{LoopTransport, PlayState, ScheduleId, Transport};
pub use types::{ScheduledEvent, Trigger};

/// The live schedule handle of one arrangement.
#[derive(Debug, Default)]
pub struct ScheduleBinding {
    id: Option<ScheduleId>,
}

impl ScheduleBinding {
    pub fn new() -> Self {
        Self { id: None }
    }

    /// Whether a schedule is currently installed.
    pub fn is_bound(&self) -> bool {
        self.id.is_some()
    }

    pub fn id(&self) -> Option<ScheduleId> {
        self.id
    }

    /// Install `events` as this arrangement's live schedule.
    ///
    /// The new schedule is built completely before the old one is touched,
    /// then the transport disposes the old and installs the new in one call.
    /// An empty event list releases the binding instead.
    pub fn bind(&mut self, transport: &mut dyn Transport, events: &[ScheduledEvent]) {
        if events.is_empty() {
            self.release(transport);
            return;
        }
        let schedule = Schedule::new(events);
        let id = transport.replace(self.id.take(), schedule);
        log::debug!("bound schedule {id:?} with {} events", events.len());
        self.id = Some(id);
    }

    /// Tear down the live schedule. Safe to call repeatedly.
    pub fn release(&mut self, transport: &mut dyn Transport) {
        if let Some(id) = self.id.take() {
            transport.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::RecordingSink;

    const FRAMES_PER_BAR: u32 = 96_000; // 120 BPM, 48 kHz

    fn kick_on(step: u32) -> ScheduledEvent {
        ScheduledEvent::drum(0, step, 0, 1.0)
    }

    #[test]
    fn bind_installs_schedule() {
        let mut transport = LoopTransport::new(120.0, 48000, 1);
        let mut binding = ScheduleBinding::new();
        binding.bind(&mut transport, &[kick_on(0)]);
        assert!(binding.is_bound());
        assert_eq!(transport.bound(), 1);
    }

    #[test]
    fn rebinding_never_doubles() {
        let mut transport = LoopTransport::new(120.0, 48000, 1);
        let mut binding = ScheduleBinding::new();
        binding.bind(&mut transport, &[kick_on(0)]);
        binding.bind(&mut transport, &[kick_on(0), kick_on(8)]);
        binding.bind(&mut transport, &[kick_on(4)]);
        assert_eq!(transport.bound(), 1);

        transport.start();
        let mut sink = RecordingSink::new();
        transport.advance_by_frames(FRAMES_PER_BAR, &mut sink);
        assert_eq!(sink.drums.len(), 1);
        assert_eq!(sink.drums[0].time, MusicalTime::new(0, 1, 0));
    }

    #[test]
    fn rebinding_mid_loop_drops_nothing() {
        let mut transport = LoopTransport::new(120.0, 48000, 1);
        let mut binding = ScheduleBinding::new();
        let events: Vec<_> = (0..16).map(kick_on).collect();
        binding.bind(&mut transport, &events);
        transport.start();

        let mut sink = RecordingSink::new();
        transport.advance_by_frames(FRAMES_PER_BAR / 2, &mut sink);
        binding.bind(&mut transport, &events);
        transport.advance_by_frames(FRAMES_PER_BAR / 2, &mut sink);

        let steps: Vec<_> = sink.drums.iter().map(|h| h.time.to_steps()).collect();
        assert_eq!(steps, (0..16).collect::<Vec<_>>());
    }

    #[test]
    fn empty_events_release_binding() {
        let mut transport = LoopTransport::new(120.0, 48000, 1);
        let mut binding = ScheduleBinding::new();
        binding.bind(&mut transport, &[kick_on(0)]);
        binding.bind(&mut transport, &[]);
        assert!(!binding.is_bound());
        assert_eq!(transport.bound(), 0);
    }

    #[test]
    fn release_is_idempotent() {
        let mut transport = LoopTransport::new(120.0, 48000, 1);
        let mut binding = ScheduleBinding::new();
        binding.bind(&mut transport, &[kick_on(0)]);
        binding.release(&mut transport);
        binding.release(&mut transport);
        assert!(!binding.is_bound());
        assert_eq!(transport.bound(), 0);
    }
}
