use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::Mutex;

use crate::common::{BufPoolError, FrameId, PageId, Result, INVALID_PAGE_ID};
use crate::storage::disk::DiskManager;

use super::{BasicPageGuard, LruKReplacer, PageFrame, ReadPageGuard, WritePageGuard};

/// Bookkeeping guarded by the pool latch.
struct PoolState {
    /// Page table: maps resident page IDs to frame IDs
    page_table: HashMap<PageId, FrameId>,
    /// Frames with no resident page, used in stack order
    free_list: Vec<FrameId>,
    /// Monotonic page ID allocator; IDs are never recycled
    next_page_id: u32,
}

/// Pool internals shared with page guards so their drop path can return
/// the pin after the owning manager reference is out of reach.
pub(crate) struct PoolShared {
    /// The buffer pool frames
    frames: Vec<Arc<PageFrame>>,
    /// The pool latch; every manager operation serializes on it
    state: Mutex<PoolState>,
    /// LRU-K replacer for eviction decisions (has its own latch, always
    /// acquired after the pool latch)
    replacer: LruKReplacer,
    disk_manager: Arc<DiskManager>,
}

impl PoolShared {
    /// Picks a frame for reuse: free list first, otherwise eviction. The
    /// victim's mapping is dropped and its content written back if dirty.
    /// Requires the pool latch.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        let frame_id = if let Some(frame_id) = state.free_list.pop() {
            frame_id
        } else if let Some(frame_id) = self.replacer.evict() {
            frame_id
        } else {
            warn!("buffer pool exhausted: every frame is pinned");
            return Err(BufPoolError::PoolExhausted);
        };

        let frame = &self.frames[frame_id.as_usize()];
        let old_page_id = frame.page_id();
        if old_page_id != INVALID_PAGE_ID {
            state.page_table.remove(&old_page_id);
            if frame.is_dirty() {
                debug!(
                    "writing back dirty page {} before reusing frame {}",
                    old_page_id, frame_id
                );
                let data = frame.read_data();
                self.disk_manager.write_page(old_page_id, &data[..])?;
                drop(data);
                frame.set_dirty(false);
            }
        }

        Ok(frame_id)
    }

    /// Returns one pin for the given page. The dirty flag is ORed into the
    /// frame before the underflow check, so a caller-observed failure still
    /// records the modification.
    pub(crate) fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        if page_id == INVALID_PAGE_ID {
            return false;
        }

        let state = self.state.lock();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &self.frames[frame_id.as_usize()];
            frame.or_dirty(is_dirty);

            if frame.pin_count() == 0 {
                return false;
            }
            if let Some(0) = frame.unpin() {
                self.replacer.set_evictable(frame_id, true);
            }
            true
        } else {
            false
        }
    }
}

/// BufferPoolManager keeps a bounded set of disk pages resident in memory.
/// It serves fetch/new/unpin/flush/delete requests over a fixed array of
/// frames, writes modified pages back on reuse or explicit flush, and
/// delegates victim selection to the LRU-K replacer.
///
/// Every operation serializes on a single pool latch; disk I/O happens
/// while it is held. Page latches are independent: guards acquire them
/// only after the pool call returns.
pub struct BufferPoolManager {
    /// Number of frames in the buffer pool
    pool_size: usize,
    shared: Arc<PoolShared>,
}

impl BufferPoolManager {
    /// Creates a buffer pool with `pool_size` frames and an LRU-K replacer
    /// of the given K, backed by `disk_manager`.
    pub fn new(pool_size: usize, k: usize, disk_manager: Arc<DiskManager>) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        let mut free_list = Vec::with_capacity(pool_size);

        for i in 0..pool_size {
            frames.push(Arc::new(PageFrame::new(FrameId::new(i as u32))));
        }
        // Stack order: seed in reverse so frame 0 is handed out first.
        for i in (0..pool_size).rev() {
            free_list.push(FrameId::new(i as u32));
        }

        Self {
            pool_size,
            shared: Arc::new(PoolShared {
                frames,
                state: Mutex::new(PoolState {
                    page_table: HashMap::new(),
                    free_list,
                    next_page_id: 0,
                }),
                replacer: LruKReplacer::new(k, pool_size),
                disk_manager,
            }),
        }
    }

    fn allocate_page(state: &mut PoolState) -> PageId {
        let page_id = PageId::new(state.next_page_id);
        state.next_page_id += 1;
        page_id
    }

    /// Placeholder: page IDs are not recycled.
    fn deallocate_page(_page_id: PageId) {}

    /// Allocates a fresh page ID and binds it to a frame, pinned once.
    /// Fails with `PoolExhausted` when no frame is free or evictable.
    pub fn new_page(&self) -> Result<(PageId, Arc<PageFrame>)> {
        let shared = &self.shared;
        let mut state = shared.state.lock();

        let frame_id = shared.acquire_frame(&mut state)?;
        let frame = &shared.frames[frame_id.as_usize()];

        let page_id = Self::allocate_page(&mut state);
        frame.set_page_id(page_id);
        frame.zero_data();
        frame.set_pin_count(1);
        state.page_table.insert(page_id, frame_id);

        shared.replacer.record_access(frame_id);
        shared.replacer.set_evictable(frame_id, false);

        Ok((page_id, Arc::clone(frame)))
    }

    /// Returns the frame holding `page_id`, pinning it. A resident page is
    /// served from memory; otherwise a frame is reclaimed and the page is
    /// read from disk.
    pub fn fetch_page(&self, page_id: PageId) -> Result<Arc<PageFrame>> {
        if page_id == INVALID_PAGE_ID {
            return Err(BufPoolError::InvalidPageId(page_id));
        }

        let shared = &self.shared;
        let mut state = shared.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &shared.frames[frame_id.as_usize()];
            frame.pin();
            shared.replacer.record_access(frame_id);
            shared.replacer.set_evictable(frame_id, false);
            return Ok(Arc::clone(frame));
        }

        let frame_id = shared.acquire_frame(&mut state)?;
        let frame = &shared.frames[frame_id.as_usize()];

        frame.set_page_id(page_id);
        frame.set_pin_count(1);
        state.page_table.insert(page_id, frame_id);

        shared.replacer.record_access(frame_id);
        shared.replacer.set_evictable(frame_id, false);

        {
            let mut data = frame.write_data();
            data.fill(0);
            shared.disk_manager.read_page(page_id, &mut data[..])?;
        }
        frame.set_dirty(false);

        Ok(Arc::clone(frame))
    }

    /// Returns one pin for the page, recording whether the caller modified
    /// it. False if the page is unknown or its pin count is already zero.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.shared.unpin_page(page_id, is_dirty)
    }

    /// Writes the named page to disk regardless of its dirty state and
    /// clears the dirty bit. Pin count and evictability are untouched.
    /// Ok(false) if the page is not resident.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(false);
        }

        let shared = &self.shared;
        let state = shared.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            let frame = &shared.frames[frame_id.as_usize()];
            let data = frame.read_data();
            shared.disk_manager.write_page(page_id, &data[..])?;
            drop(data);
            frame.set_dirty(false);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Writes every resident page to disk and clears its dirty bit.
    pub fn flush_all_pages(&self) -> Result<()> {
        let shared = &self.shared;
        let _state = shared.state.lock();

        for frame in &shared.frames {
            let page_id = frame.page_id();
            if page_id == INVALID_PAGE_ID {
                continue;
            }
            let data = frame.read_data();
            shared.disk_manager.write_page(page_id, &data[..])?;
            drop(data);
            frame.set_dirty(false);
        }

        Ok(())
    }

    /// Evicts `page_id` from the pool and retires its ID. Vacuously true
    /// for the invalid sentinel and for non-resident pages; false if the
    /// page is still pinned.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        if page_id == INVALID_PAGE_ID {
            return Ok(true);
        }

        let shared = &self.shared;
        let mut state = shared.state.lock();

        let frame_id = match state.page_table.get(&page_id) {
            Some(&frame_id) => frame_id,
            None => {
                Self::deallocate_page(page_id);
                return Ok(true);
            }
        };

        let frame = &shared.frames[frame_id.as_usize()];
        if frame.pin_count() > 0 {
            return Ok(false);
        }

        debug!("deleting page {} from frame {}", page_id, frame_id);
        state.page_table.remove(&page_id);
        state.free_list.push(frame_id);
        shared.replacer.remove(frame_id);
        frame.reset();

        Self::deallocate_page(page_id);
        Ok(true)
    }

    /// Fetches a page behind a guard that only holds the pin.
    pub fn fetch_page_basic(&self, page_id: PageId) -> Result<BasicPageGuard> {
        let frame = self.fetch_page(page_id)?;
        Ok(BasicPageGuard::new(
            Arc::clone(&self.shared),
            page_id,
            frame,
        ))
    }

    /// Fetches a page behind a guard holding the pin and the shared latch.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<ReadPageGuard> {
        Ok(ReadPageGuard::new(self.fetch_page_basic(page_id)?))
    }

    /// Fetches a page behind a guard holding the pin and the exclusive latch.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<WritePageGuard> {
        Ok(WritePageGuard::new(self.fetch_page_basic(page_id)?))
    }

    /// Allocates a fresh page behind a pin-holding guard.
    pub fn new_page_guarded(&self) -> Result<BasicPageGuard> {
        let (page_id, frame) = self.new_page()?;
        Ok(BasicPageGuard::new(
            Arc::clone(&self.shared),
            page_id,
            frame,
        ))
    }

    /// Returns the pool size.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Returns the number of frames with no resident page.
    pub fn free_frame_count(&self) -> usize {
        self.shared.state.lock().free_list.len()
    }

    /// Returns the pin count of a resident page.
    pub fn get_pin_count(&self, page_id: PageId) -> Option<u32> {
        let shared = &self.shared;
        let state = shared.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|&frame_id| shared.frames[frame_id.as_usize()].pin_count())
    }
}
