use thiserror::Error;

use crate::storage::buffer::BufferError;
use crate::storage::disk::DiskError;
use crate::storage::page::PageError;

#[derive(Error, Debug)]
pub enum HeapFileError {
    #[error("record of {0} bytes can never fit on a page")]
    InvalidRecordLength(usize),
    #[error("invalid scan parameter: {0}")]
    BadScanParam(String),
    #[error("scan has no current record")]
    NoCurrentRecord,
    #[error("scan has no marked position")]
    NoMark,
    #[error("heap file corrupted: {0}")]
    Corrupted(String),
    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
    #[error("Page error: {0}")]
    Page(#[from] PageError),
    #[error("Disk error: {0}")]
    Disk(#[from] DiskError),
}
