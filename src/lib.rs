//! bufpool - the in-memory page cache of a disk-oriented storage engine
//!
//! Database files are divided into fixed-size pages addressed by
//! [`PageId`]. This crate keeps a bounded number of those pages resident
//! in memory and decides which one to displace when space runs low.
//!
//! # Architecture
//!
//! - **Storage Layer** (`storage`): blocking page I/O
//!   - `DiskManager`: reads and writes 4 KiB pages at fixed file offsets
//!
//! - **Buffer Pool** (`buffer`): memory management for database pages
//!   - `BufferPoolManager`: serves fetch/new/unpin/flush/delete over a
//!     fixed frame array, with writeback on reuse
//!   - `LruKReplacer`: LRU-K victim selection with an LRU fallback for
//!     frames that have not yet been referenced K times
//!   - `PageFrame`: per-frame metadata, payload, and reader-writer latch
//!   - `BasicPageGuard`/`ReadPageGuard`/`WritePageGuard`: RAII handles
//!     that return the pin (and release the latch) on every exit path
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use bufpool::buffer::BufferPoolManager;
//! use bufpool::storage::disk::DiskManager;
//!
//! // A pool of 100 frames with LRU-2 replacement over "test.db".
//! let disk_manager = Arc::new(DiskManager::new("test.db").unwrap());
//! let bpm = BufferPoolManager::new(100, 2, disk_manager);
//!
//! // Allocate a page and write through a guard; the pin is returned
//! // when the guard leaves scope.
//! let page_id = {
//!     let mut guard = bpm.new_page_guarded().unwrap();
//!     guard.data_mut()[0] = 42;
//!     guard.page_id()
//! };
//!
//! bpm.flush_page(page_id).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{BufPoolError, FrameId, PageId, Result};
