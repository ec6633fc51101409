use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, PAGE_SIZE};

use super::buffer_pool_manager::PoolShared;
use super::PageFrame;

/// RAII guard owning one pin on a buffer frame.
///
/// Dropping the guard unpins the page, passing along the dirty flag the
/// guard accumulated. Guards are move-only; a move transfers the pin and
/// the release is idempotent, so an explicitly dropped guard's destructor
/// does nothing further.
pub struct BasicPageGuard {
    pool: Arc<PoolShared>,
    page_id: PageId,
    /// The pinned frame; None once the guard has been released
    frame: Option<Arc<PageFrame>>,
    /// Whether this guard modified the page
    is_dirty: bool,
}

impl BasicPageGuard {
    pub(crate) fn new(pool: Arc<PoolShared>, page_id: PageId, frame: Arc<PageFrame>) -> Self {
        Self {
            pool,
            page_id,
            frame: Some(frame),
            is_dirty: false,
        }
    }

    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    pub fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Flags the page as modified; the flag travels with the unpin.
    pub fn mark_dirty(&mut self) {
        self.is_dirty = true;
    }

    /// Reads the page bytes under the frame's shared latch, held only for
    /// the returned guard's lifetime.
    pub fn data(&self) -> RwLockReadGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.frame.as_ref().unwrap().read_data()
    }

    /// Writes the page bytes under the frame's exclusive latch; marks the
    /// guard dirty.
    pub fn data_mut(&mut self) -> RwLockWriteGuard<'_, Box<[u8; PAGE_SIZE]>> {
        self.is_dirty = true;
        self.frame.as_ref().unwrap().write_data()
    }

    pub(crate) fn release(&mut self) {
        if self.frame.take().is_some() {
            self.pool.unpin_page(self.page_id, self.is_dirty);
        }
    }

    /// Returns the pin now instead of at end of scope.
    pub fn drop_guard(mut self) {
        self.release();
    }
}

impl Drop for BasicPageGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// RAII guard for shared access to a page: one pin plus the frame's read
/// latch, released in that order (latch first, then pin).
pub struct ReadPageGuard {
    guard: BasicPageGuard,
    /// Held read latch; None once released
    data: Option<RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl ReadPageGuard {
    pub(crate) fn new(guard: BasicPageGuard) -> Self {
        let data = guard.frame.as_ref().unwrap().read_data();
        // Safety: the latch guard borrows from the frame kept alive by the
        // Arc inside `guard`, and release() drops it before the pin.
        let data: RwLockReadGuard<'static, Box<[u8; PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data) };

        Self {
            guard,
            data: Some(data),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    pub fn data(&self) -> &[u8] {
        &self.data.as_ref().unwrap()[..]
    }

    fn release(&mut self) {
        self.data.take();
        self.guard.release();
    }

    /// Releases the latch and the pin now instead of at end of scope.
    pub fn drop_guard(mut self) {
        self.release();
    }
}

impl Deref for ReadPageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl Drop for ReadPageGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// RAII guard for exclusive access to a page: one pin plus the frame's
/// write latch. Any mutable access marks the page dirty; the latch is
/// released before the pin on drop.
pub struct WritePageGuard {
    guard: BasicPageGuard,
    /// Held write latch; None once released
    data: Option<RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>>>,
}

impl WritePageGuard {
    pub(crate) fn new(guard: BasicPageGuard) -> Self {
        let data = guard.frame.as_ref().unwrap().write_data();
        // Safety: as for ReadPageGuard; the Arc in `guard` outlives the
        // erased latch lifetime.
        let data: RwLockWriteGuard<'static, Box<[u8; PAGE_SIZE]>> =
            unsafe { std::mem::transmute(data) };

        Self {
            guard,
            data: Some(data),
        }
    }

    pub fn page_id(&self) -> PageId {
        self.guard.page_id()
    }

    pub fn data(&self) -> &[u8] {
        &self.data.as_ref().unwrap()[..]
    }

    /// Mutable view of the page bytes; marks the guard dirty.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.guard.is_dirty = true;
        &mut self.data.as_mut().unwrap()[..]
    }

    fn release(&mut self) {
        self.data.take();
        self.guard.release();
    }

    /// Releases the latch and the pin now instead of at end of scope.
    pub fn drop_guard(mut self) {
        self.release();
    }
}

impl Deref for WritePageGuard {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.data()
    }
}

impl DerefMut for WritePageGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.data_mut()
    }
}

impl Drop for WritePageGuard {
    fn drop(&mut self) {
        self.release();
    }
}
