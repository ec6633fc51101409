use std::sync::Arc;

use bufpool::buffer::BufferPoolManager;
use bufpool::storage::disk::DiskManager;

fn main() {
    println!("bufpool - buffer pool manager demo");
    println!("==================================\n");

    let db_path = "demo.db";

    let disk_manager = Arc::new(DiskManager::new(db_path).expect("Failed to create disk manager"));
    println!("Created disk manager for: {}", db_path);

    // Buffer pool with 10 frames and LRU-2 replacement
    let bpm = BufferPoolManager::new(10, 2, disk_manager.clone());
    println!("Created buffer pool manager with 10 frames\n");

    // Allocate a page and fill it through a write guard
    let page_id = {
        let mut guard = bpm.new_page_guarded().expect("Failed to allocate page");
        println!("Allocated new page: {}", guard.page_id());

        let message = b"hello from the buffer pool";
        guard.data_mut()[..message.len()].copy_from_slice(message);
        guard.page_id()
    };

    bpm.flush_page(page_id).expect("Failed to flush page");
    println!("Flushed page {} to disk", page_id);
    println!("Disk writes so far: {}", disk_manager.num_writes());

    // Read it back under a shared latch
    {
        let guard = bpm
            .fetch_page_read(page_id)
            .expect("Failed to fetch page for reading");

        let text: Vec<u8> = guard
            .data()
            .iter()
            .copied()
            .take_while(|&b| b != 0)
            .collect();
        println!("Read back: {:?}", String::from_utf8_lossy(&text));
    }

    // Retire the page
    assert!(bpm.delete_page(page_id).expect("Failed to delete page"));
    println!("Deleted page {}", page_id);

    std::fs::remove_file(db_path).ok();
    println!("\nDemo completed successfully!");
}
