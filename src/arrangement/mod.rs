//! Arrangements — the fixed-length loop of slots for one track.
//!
//! An [`Arrangement`] owns its compiled event list. Every mutation stages the
//! new slot contents, compiles them from scratch, and commits only if every
//! slot compiles; on failure the previous events stay in force.

pub mod pool;

pub use pool::BarPool;

use std::sync::Arc;

use crate::bar::{validate_threshold, Bar, BarKind, CompileContext, ValidationError};
use crate::event::ScheduledEvent;

/// Default loop length in bars.
pub const DEFAULT_SLOTS: usize = 4;

/// Export metadata attached to a track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMeta {
    pub name: String,
    /// Wire channel nibble, `0..=15` (9 is the GM percussion channel).
    pub channel: u8,
    pub program: u8,
    /// Added to every note pitch at export.
    pub pitch_offset: i32,
}

impl TrackMeta {
    pub fn new(name: impl Into<String>, channel: u8, program: u8, pitch_offset: i32) -> Self {
        Self {
            name: name.into(),
            channel,
            program,
            pitch_offset,
        }
    }

    pub fn drums() -> Self {
        Self::new("drums", 9, 0, 0)
    }
}

/// One track's loop: `length` slots, each empty or holding a bar.
#[derive(Debug, Clone)]
pub struct Arrangement {
    kind: BarKind,
    slots: Vec<Option<Arc<Bar>>>,
    ctx: CompileContext,
    events: Arc<[ScheduledEvent]>,
    generation: u64,
    meta: TrackMeta,
}

impl Arrangement {
    pub fn new(kind: BarKind, length: usize, meta: TrackMeta) -> Self {
        Self {
            kind,
            slots: vec![None; length],
            ctx: CompileContext::default(),
            events: Arc::from(Vec::new()),
            generation: 0,
            meta,
        }
    }

    /// A drum arrangement gated at `threshold`.
    pub fn drums(length: usize, threshold: f32) -> Result<Self, ValidationError> {
        let mut arrangement = Self::new(BarKind::Drum, length, TrackMeta::drums());
        arrangement.ctx.threshold = validate_threshold(threshold)?;
        Ok(arrangement)
    }

    pub fn kind(&self) -> BarKind {
        self.kind
    }

    /// Number of slots (occupied or not).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True iff every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn slots(&self) -> &[Option<Arc<Bar>>] {
        &self.slots
    }

    pub fn slot(&self, index: usize) -> Option<&Arc<Bar>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn threshold(&self) -> f32 {
        self.ctx.threshold
    }

    pub fn meta(&self) -> &TrackMeta {
        &self.meta
    }

    /// Compiled events in slot order, then chronological order within a slot.
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    /// Bumped on every committed compilation. Export caches key on it.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Place `bar` in the lowest free slot.
    ///
    /// Returns the slot index, or `Ok(None)` when the arrangement is full (the
    /// bar is not placed and nothing changes).
    pub fn add(&mut self, bar: Arc<Bar>) -> Result<Option<usize>, ValidationError> {
        if bar.kind() != self.kind {
            return Err(ValidationError::Kind {
                expected: self.kind,
                found: bar.kind(),
            });
        }
        let Some(index) = self.slots.iter().position(Option::is_none) else {
            log::info!(
                "{} arrangement is full ({} slots), bar not added",
                self.meta.name,
                self.slots.len()
            );
            return Ok(None);
        };
        let mut staged = self.slots.clone();
        staged[index] = Some(bar);
        self.commit(staged, self.ctx)?;
        Ok(Some(index))
    }

    /// Clear slot `index`. Returns `false` if it was already empty.
    pub fn remove(&mut self, index: usize) -> Result<bool, ValidationError> {
        if self.slot(index).is_none() {
            return Ok(false);
        }
        let mut staged = self.slots.clone();
        staged[index] = None;
        self.commit(staged, self.ctx)?;
        Ok(true)
    }

    /// Change the drum gate and recompile every slot. Only drum arrangements
    /// have a gate.
    pub fn set_threshold(&mut self, threshold: f32) -> Result<(), ValidationError> {
        if self.kind != BarKind::Drum {
            return Err(ValidationError::NoThreshold(self.kind));
        }
        let ctx = CompileContext {
            threshold: validate_threshold(threshold)?,
        };
        self.commit(self.slots.clone(), ctx)
    }

    /// Rebuild the event list from the current slots.
    pub fn recompile(&mut self) -> Result<(), ValidationError> {
        self.commit(self.slots.clone(), self.ctx)
    }

    fn commit(
        &mut self,
        slots: Vec<Option<Arc<Bar>>>,
        ctx: CompileContext,
    ) -> Result<(), ValidationError> {
        let events = match compile_slots(&slots, &ctx) {
            Ok(events) => events,
            Err(e) => {
                log::warn!("{} recompilation failed, keeping previous events: {e}", self.meta.name);
                return Err(e);
            }
        };
        log::debug!(
            "{} recompiled: {} events from {} bars",
            self.meta.name,
            events.len(),
            slots.iter().flatten().count()
        );
        self.slots = slots;
        self.ctx = ctx;
        self.events = Arc::from(events);
        self.generation += 1;
        Ok(())
    }
}

/// Compile every occupied slot and concatenate in slot order.
pub fn compile_slots(
    slots: &[Option<Arc<Bar>>],
    ctx: &CompileContext,
) -> Result<Vec<ScheduledEvent>, ValidationError> {
    let mut events = Vec::new();
    for (index, bar) in slots.iter().enumerate() {
        if let Some(bar) = bar {
            events.extend(bar.compile(index, ctx)?);
        }
    }
    Ok(events)
}
