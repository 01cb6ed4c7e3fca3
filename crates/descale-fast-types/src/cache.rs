use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::FrameResult;
use crate::frame::Frame;
use crate::source::{ClipInfo, FrameSource, SharedSource};

const DEFAULT_CAPACITY: usize = 8;

/// Bounded cache in front of an expensive clip.
///
/// An entry is written once per index and never replaced while it stays
/// resident, so concurrent readers always observe the first computed frame.
/// Old entries are evicted in insertion order.
pub struct CachedSource {
    parent: SharedSource,
    capacity: usize,
    entries: Mutex<VecDeque<(usize, Frame)>>,
}

impl CachedSource {
    pub fn new(parent: SharedSource, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            parent,
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn shared(parent: SharedSource) -> SharedSource {
        Arc::new(Self::new(parent, DEFAULT_CAPACITY))
    }

    fn lookup(&self, index: usize) -> Option<Frame> {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|(cached, _)| *cached == index)
            .map(|(_, frame)| frame.clone())
    }
}

impl FrameSource for CachedSource {
    fn info(&self) -> ClipInfo {
        self.parent.info()
    }

    fn frame(&self, index: usize) -> FrameResult<Frame> {
        if let Some(frame) = self.lookup(index) {
            return Ok(frame);
        }
        // Computed outside the lock; a racing request may compute the same
        // frame, but only the first result is stored.
        let frame = self.parent.frame(index)?;
        let mut entries = self.entries.lock();
        if let Some((_, existing)) = entries.iter().find(|(cached, _)| *cached == index) {
            return Ok(existing.clone());
        }
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back((index, frame.clone()));
        Ok(frame)
    }
}
