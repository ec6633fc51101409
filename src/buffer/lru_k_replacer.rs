use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;

use crate::common::{FrameId, Timestamp};

/// Access history for a single frame.
///
/// Only the last K timestamps are retained, oldest at the front. For a
/// frame with fewer than K recorded accesses the front is its first
/// reference; for a fully qualified frame the front is the K-th most
/// recent access.
#[derive(Debug)]
struct LruKNode {
    history: VecDeque<Timestamp>,
    evictable: bool,
}

impl LruKNode {
    fn new() -> Self {
        Self {
            history: VecDeque::new(),
            evictable: true,
        }
    }
}

/// Replacer state, serialized by a single latch.
struct ReplacerState {
    /// Per-frame access history
    node_store: HashMap<FrameId, LruKNode>,
    /// Number of evictable frames
    current_size: usize,
    /// Logical clock, bumped on every recorded access
    current_timestamp: Timestamp,
}

/// LRU-K replacement policy.
///
/// The replacer evicts the frame whose backward k-distance is the maximum
/// over all evictable frames, where backward k-distance is the time since
/// the K-th most recent access. A frame with fewer than K recorded
/// accesses has +inf k-distance; among those, classical LRU applies and
/// the frame with the earliest first reference goes first.
pub struct LruKReplacer {
    /// K value for the LRU-K algorithm
    k: usize,
    /// Maximum number of frames the replacer can track
    num_frames: usize,
    state: Mutex<ReplacerState>,
}

impl LruKReplacer {
    /// Creates a new LRU-K replacer tracking up to `num_frames` frames.
    pub fn new(k: usize, num_frames: usize) -> Self {
        assert!(k > 0, "LRU-K requires k >= 1");
        Self {
            k,
            num_frames,
            state: Mutex::new(ReplacerState {
                node_store: HashMap::new(),
                current_size: 0,
                current_timestamp: 0,
            }),
        }
    }

    /// Evicts the evictable frame with the largest backward k-distance and
    /// drops it from tracking. Returns None if no frame is evictable.
    pub fn evict(&self) -> Option<FrameId> {
        let mut state = self.state.lock();

        if state.current_size == 0 {
            return None;
        }

        // Sub-K frames (infinite k-distance) take priority, ordered by
        // first reference; fully qualified frames are ordered by their
        // K-th most recent access. Both orderings read off the history
        // front, so a single keyed scan selects the victim.
        let victim = state
            .node_store
            .iter()
            .filter(|(_, node)| node.evictable)
            .min_by_key(|(_, node)| (node.history.len() >= self.k, node.history.front().copied()))
            .map(|(&frame_id, _)| frame_id)?;

        state.node_store.remove(&victim);
        state.current_size -= 1;

        Some(victim)
    }

    /// Records an access to the given frame at the next timestamp.
    /// Frame ids outside the replacer's capacity are ignored.
    pub fn record_access(&self, frame_id: FrameId) {
        if frame_id.as_usize() >= self.num_frames {
            return;
        }

        let mut state = self.state.lock();
        let timestamp = state.current_timestamp;
        state.current_timestamp += 1;

        match state.node_store.entry(frame_id) {
            Entry::Occupied(mut entry) => {
                let node = entry.get_mut();
                node.history.push_back(timestamp);
                if node.history.len() > self.k {
                    node.history.pop_front();
                }
            }
            Entry::Vacant(entry) => {
                let mut node = LruKNode::new();
                node.history.push_back(timestamp);
                entry.insert(node);
                // New nodes start evictable.
                state.current_size += 1;
            }
        }
    }

    /// Sets whether a frame may be chosen as a victim. Unknown frames are
    /// ignored; toggling adjusts the evictable count only on a real change.
    pub fn set_evictable(&self, frame_id: FrameId, evictable: bool) {
        let mut state = self.state.lock();

        if let Some(node) = state.node_store.get_mut(&frame_id) {
            if node.evictable == evictable {
                return;
            }
            node.evictable = evictable;
            if evictable {
                state.current_size += 1;
            } else {
                state.current_size -= 1;
            }
        }
    }

    /// Forcibly drops an evictable frame from tracking, e.g. when its page
    /// is deleted. Removing an unknown or non-evictable frame is a no-op.
    pub fn remove(&self, frame_id: FrameId) {
        let mut state = self.state.lock();

        match state.node_store.get(&frame_id) {
            Some(node) if node.evictable => {}
            _ => return,
        }

        state.node_store.remove(&frame_id);
        state.current_size -= 1;
    }

    /// Returns the number of evictable frames.
    pub fn size(&self) -> usize {
        self.state.lock().current_size
    }

    /// Returns the K value of this replacer.
    pub fn k(&self) -> usize {
        self.k
    }
}
