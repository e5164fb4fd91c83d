//! Generated bars awaiting placement in an arrangement.
//!
//! Bars are shared with arrangements through `Arc`, so deleting a bar from the
//! pool leaves any arrangement slot holding it untouched. The bar is dropped
//! once no pool or slot refers to it.

use std::sync::Arc;

use crate::bar::{Bar, BarKind};

#[derive(Debug, Clone)]
pub struct BarPool {
    kind: BarKind,
    bars: Vec<Arc<Bar>>,
}

impl BarPool {
    pub fn new(kind: BarKind) -> Self {
        Self {
            kind,
            bars: Vec::new(),
        }
    }

    pub fn kind(&self) -> BarKind {
        self.kind
    }

    /// Append a bar, returning its index. Bars of another kind are refused.
    pub fn push(&mut self, bar: Bar) -> Option<usize> {
        if bar.kind() != self.kind {
            return None;
        }
        self.bars.push(Arc::new(bar));
        Some(self.bars.len() - 1)
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Bar>> {
        self.bars.get(index)
    }

    /// Remove and return the bar at `index`; later bars shift down.
    pub fn remove(&mut self, index: usize) -> Option<Arc<Bar>> {
        (index < self.bars.len()).then(|| self.bars.remove(index))
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Bar>> {
        self.bars.iter()
    }
}
