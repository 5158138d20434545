// Heapstore: buffer-managed heap-file storage layer

pub mod common;
pub mod heap;
pub mod storage;

// Re-export key items for convenient access
pub use common::types::{Page, PageId, PagePtr, Rid, PAGE_SIZE};
pub use heap::{
    create_heap_file, destroy_heap_file, CompareOp, FilterValue, HeapFile, HeapFileError,
    HeapFileScan, InsertFileScan, ScanFilter,
};
pub use storage::buffer::{BufferError, BufferManager, BufferStats};
pub use storage::disk::{DbFile, DiskError};
pub use storage::page::{PageError, PageManager};
