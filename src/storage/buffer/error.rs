use thiserror::Error;

use crate::common::types::{FrameId, PageId};
use crate::storage::disk::DiskError;

#[derive(Error, Debug)]
pub enum BufferError {
    #[error("Buffer pool exceeded: no evictable frame")]
    BufferExceeded,
    #[error("Page {0} not found in buffer pool")]
    PageNotFound(PageId),
    #[error("Page {0} is not pinned")]
    PageNotPinned(PageId),
    #[error("Page {0} is pinned")]
    PagePinned(PageId),
    #[error("Buffer state corrupted at frame {0}")]
    BadBuffer(FrameId),
    #[error("Disk error: {0}")]
    Disk(#[from] DiskError),
}
