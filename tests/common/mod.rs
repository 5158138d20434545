use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};
use tempfile::TempDir;

use heapstore::BufferManager;

// Create a scratch directory for heap files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

#[allow(dead_code)]
pub fn heap_path(dir: &TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

// Create a buffer manager for testing
pub fn create_test_pool(pool_size: usize) -> Arc<BufferManager> {
    Arc::new(BufferManager::new(pool_size))
}

// Test records carry a 4-byte little-endian id followed by a payload
#[allow(dead_code)]
pub fn make_record(id: i32, payload: &[u8]) -> Vec<u8> {
    let mut record = vec![0u8; 4 + payload.len()];
    LittleEndian::write_i32(&mut record[0..4], id);
    record[4..].copy_from_slice(payload);
    record
}

#[allow(dead_code)]
pub fn record_id(record: &[u8]) -> i32 {
    LittleEndian::read_i32(&record[0..4])
}
