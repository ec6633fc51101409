//! Integration tests for the page guards

use std::sync::Arc;
use std::thread;

use bufpool::buffer::BufferPoolManager;
use bufpool::common::BufPoolError;
use bufpool::storage::disk::DiskManager;
use tempfile::NamedTempFile;

fn create_bpm(pool_size: usize) -> (BufferPoolManager, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());
    let bpm = BufferPoolManager::new(pool_size, 2, dm);
    (bpm, temp_file)
}

#[test]
fn test_guard_pin_blocks_eviction() {
    let (bpm, _temp) = create_bpm(2);

    let _g0 = bpm.new_page_guarded().unwrap();
    let _g1 = bpm.new_page_guarded().unwrap();

    assert!(matches!(
        bpm.new_page_guarded(),
        Err(BufPoolError::PoolExhausted)
    ));

    drop(_g0);
    assert!(bpm.new_page_guarded().is_ok());
}

#[test]
fn test_guard_scope_returns_pin_on_early_exit() {
    let (bpm, _temp) = create_bpm(10);

    let page_id = {
        let guard = bpm.new_page_guarded().unwrap();
        guard.page_id()
        // guard dropped here, even though it was never touched again
    };

    assert_eq!(bpm.get_pin_count(page_id), Some(0));
}

#[test]
fn test_write_then_read_through_guards() {
    let (bpm, _temp) = create_bpm(10);

    let page_id = {
        let mut guard = bpm.new_page_guarded().unwrap();
        guard.data_mut()[0] = 0xDE;
        guard.data_mut()[1] = 0xAD;
        guard.page_id()
    };

    {
        let mut guard = bpm.fetch_page_write(page_id).unwrap();
        guard.data_mut()[2] = 0xBE;
        guard.data_mut()[3] = 0xEF;
    }

    let guard = bpm.fetch_page_read(page_id).unwrap();
    assert_eq!(&guard.data()[..4], &[0xDE, 0xAD, 0xBE, 0xEF]);
}

#[test]
fn test_guarded_page_survives_eviction_pressure() {
    let (bpm, _temp) = create_bpm(3);

    let page_id = {
        let mut guard = bpm.new_page_guarded().unwrap();
        guard.data_mut()[0] = 77;
        guard.page_id()
    };

    // Churn enough pages through the pool to evict the guarded write.
    for _ in 0..6 {
        let (pid, _) = bpm.new_page().unwrap();
        bpm.unpin_page(pid, false);
    }

    let guard = bpm.fetch_page_read(page_id).unwrap();
    assert_eq!(guard.data()[0], 77);
}

#[test]
fn test_writer_excludes_readers() {
    let (bpm, _temp) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let page_id = {
        let mut guard = bpm.new_page_guarded().unwrap();
        guard.data_mut()[0] = 1;
        guard.page_id()
    };

    let mut writer = bpm.fetch_page_write(page_id).unwrap();
    writer.data_mut()[0] = 2;

    let reader = {
        let bpm = Arc::clone(&bpm);
        thread::spawn(move || {
            // Blocks until the writer releases the exclusive latch.
            let guard = bpm.fetch_page_read(page_id).unwrap();
            guard.data()[0]
        })
    };

    writer.data_mut()[0] = 3;
    drop(writer);

    // The reader can only ever observe the fully written value.
    assert_eq!(reader.join().unwrap(), 3);
    assert_eq!(bpm.get_pin_count(page_id), Some(0));
}

#[test]
fn test_concurrent_guard_churn() {
    let (bpm, _temp) = create_bpm(10);
    let bpm = Arc::new(bpm);

    let page_id = {
        let guard = bpm.new_page_guarded().unwrap();
        guard.page_id()
    };

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let bpm = Arc::clone(&bpm);
            thread::spawn(move || {
                for i in 0..50 {
                    if (t + i) % 2 == 0 {
                        let mut guard = bpm.fetch_page_write(page_id).unwrap();
                        guard.data_mut()[t] = i as u8;
                    } else {
                        let guard = bpm.fetch_page_read(page_id).unwrap();
                        let _ = guard.data()[t];
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    // Every guard returned its pin.
    assert_eq!(bpm.get_pin_count(page_id), Some(0));
}
