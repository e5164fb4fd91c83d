//! Lock-free hand-off of fired events to a synthesis thread via ring buffer.

use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use super::{DrumHit, NoteOn, PlaybackSink, SampleTrigger};

/// A fired event, as queued for the synthesis thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Firing {
    Drum(DrumHit),
    Note(NoteOn),
    Sample(SampleTrigger),
}

/// Producer half: the transport fires into this on the control thread.
pub struct QueueSink {
    prod: HeapProd<Firing>,
    dropped: usize,
    loaded: Option<Vec<String>>,
}

/// Consumer half: drained by the synthesis side.
pub struct QueueReceiver {
    cons: HeapCons<Firing>,
}

/// Create a sink/receiver pair with room for `capacity` pending firings.
pub fn queue_sink(capacity: usize) -> (QueueSink, QueueReceiver) {
    let rb = HeapRb::<Firing>::new(capacity);
    let (prod, cons) = rb.split();
    (
        QueueSink {
            prod,
            dropped: 0,
            loaded: None,
        },
        QueueReceiver { cons },
    )
}

impl QueueSink {
    /// Restrict playback to the given loaded sample ids.
    pub fn set_loaded_samples(&mut self, ids: Vec<String>) {
        self.loaded = Some(ids);
    }

    /// Number of firings lost because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn push(&mut self, firing: Firing) {
        if self.prod.try_push(firing).is_err() {
            self.dropped += 1;
            log::warn!("playback queue full, dropped firing ({} total)", self.dropped);
        }
    }
}

impl PlaybackSink for QueueSink {
    fn drum(&mut self, hit: DrumHit) {
        self.push(Firing::Drum(hit));
    }

    fn note(&mut self, note: NoteOn) {
        self.push(Firing::Note(note));
    }

    fn sample(&mut self, trigger: SampleTrigger) {
        self.push(Firing::Sample(trigger));
    }

    fn sample_loaded(&self, sample_id: &str) -> bool {
        match &self.loaded {
            Some(ids) => ids.iter().any(|id| id == sample_id),
            None => true,
        }
    }
}

impl QueueReceiver {
    /// Non-blocking poll for the next firing.
    pub fn poll(&mut self) -> Option<Firing> {
        self.cons.try_pop()
    }

    /// Drain all pending firings.
    pub fn drain(&mut self) -> Vec<Firing> {
        let mut firings = Vec::new();
        while let Some(f) = self.cons.try_pop() {
            firings.push(f);
        }
        firings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MusicalTime;

    fn hit(instrument: usize) -> DrumHit {
        DrumHit {
            instrument,
            length: MusicalTime::from_steps(1),
            velocity: 0.9,
            time: MusicalTime::default(),
            frame_offset: 0,
        }
    }

    #[test]
    fn ordering_preserved() {
        let (mut sink, mut rx) = queue_sink(8);
        sink.drum(hit(0));
        sink.drum(hit(1));
        sink.sample(SampleTrigger {
            time: MusicalTime::default(),
            sample_id: "a.wav".into(),
            length: MusicalTime::from_steps(4),
            frame_offset: 0,
        });

        assert_eq!(rx.poll(), Some(Firing::Drum(hit(0))));
        assert_eq!(rx.poll(), Some(Firing::Drum(hit(1))));
        assert!(matches!(rx.poll(), Some(Firing::Sample(_))));
        assert!(rx.poll().is_none());
    }

    #[test]
    fn full_queue_counts_drops() {
        let (mut sink, mut rx) = queue_sink(2);
        for i in 0..5 {
            sink.drum(hit(i));
        }
        assert_eq!(sink.dropped(), 3);
        assert_eq!(rx.drain().len(), 2);
    }

    #[test]
    fn drain_empty_returns_empty() {
        let (_sink, mut rx) = queue_sink(4);
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn loaded_sample_filter() {
        let (mut sink, _rx) = queue_sink(4);
        assert!(sink.sample_loaded("anything.wav"));
        sink.set_loaded_samples(vec!["kick.wav".into()]);
        assert!(sink.sample_loaded("kick.wav"));
        assert!(!sink.sample_loaded("snare.wav"));
    }
}
