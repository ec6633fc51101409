//! Integration tests for the disk manager

use std::sync::Arc;
use std::thread;

use bufpool::common::{PageId, PAGE_SIZE};
use bufpool::storage::disk::DiskManager;
use tempfile::NamedTempFile;

#[test]
fn test_disk_manager_create_file() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    assert_eq!(dm.num_reads(), 0);
    assert_eq!(dm.num_writes(), 0);
    assert_eq!(dm.db_path(), temp_file.path());
}

#[test]
fn test_disk_manager_read_write_page() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    let page_id = PageId::new(2);

    let mut write_data = [0u8; PAGE_SIZE];
    for (i, byte) in write_data.iter_mut().enumerate() {
        *byte = (i % 256) as u8;
    }
    dm.write_page(page_id, &write_data).unwrap();

    let mut read_data = [0u8; PAGE_SIZE];
    dm.read_page(page_id, &mut read_data).unwrap();

    assert_eq!(write_data, read_data);
    assert_eq!(dm.num_reads(), 1);
    assert_eq!(dm.num_writes(), 1);
}

#[test]
fn test_disk_manager_pages_do_not_overlap() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    for i in 0..10u8 {
        let data = [i; PAGE_SIZE];
        dm.write_page(PageId::new(i as u32), &data).unwrap();
    }

    for i in 0..10u8 {
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(i as u32), &mut data).unwrap();
        assert!(data.iter().all(|&b| b == i));
    }
}

#[test]
fn test_disk_manager_unwritten_page_reads_zeroed() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = DiskManager::new(temp_file.path()).unwrap();

    dm.write_page(PageId::new(0), &[1u8; PAGE_SIZE]).unwrap();

    // A page past the end of the file comes back as zeroes.
    let mut data = [9u8; PAGE_SIZE];
    dm.read_page(PageId::new(100), &mut data).unwrap();
    assert!(data.iter().all(|&b| b == 0));
}

#[test]
fn test_disk_manager_persistence_across_reopen() {
    let temp_file = NamedTempFile::new().unwrap();
    let path = temp_file.path().to_path_buf();

    {
        let dm = DiskManager::new(&path).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        data[0] = 0x5A;
        dm.write_page(PageId::new(3), &data).unwrap();
        dm.sync().unwrap();
    }

    {
        let dm = DiskManager::new(&path).unwrap();
        let mut data = [0u8; PAGE_SIZE];
        dm.read_page(PageId::new(3), &mut data).unwrap();
        assert_eq!(data[0], 0x5A);
    }
}

#[test]
fn test_disk_manager_concurrent_disjoint_pages() {
    let temp_file = NamedTempFile::new().unwrap();
    let dm = Arc::new(DiskManager::new(temp_file.path()).unwrap());

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let dm = Arc::clone(&dm);
            thread::spawn(move || {
                let data = [t as u8; PAGE_SIZE];
                for i in 0..8 {
                    dm.write_page(PageId::new(t * 8 + i), &data).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    for t in 0..4u32 {
        for i in 0..8 {
            let mut data = [0u8; PAGE_SIZE];
            dm.read_page(PageId::new(t * 8 + i), &mut data).unwrap();
            assert!(data.iter().all(|&b| b == t as u8));
        }
    }
}
