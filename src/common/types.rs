use std::sync::Arc;
use parking_lot::RwLock;

/// Page size in bytes (8KB)
pub const PAGE_SIZE: usize = 8192;

/// Page ID type. Pages are numbered from 1; 0 is never a real page.
pub type PageId = u32;

/// Sentinel for "no page"
pub const INVALID_PAGE_ID: PageId = 0;

/// Buffer pool frame ID type
pub type FrameId = u32;

/// Slot index within one page's slot array
pub type SlotId = u32;

/// Identity of an open file, unique for the lifetime of the process.
/// Used together with a PageId as the buffer pool's lookup key.
pub type FileId = u64;

/// Record identifier: which page, which slot on that page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rid {
    pub page_id: PageId,
    pub slot: SlotId,
}

impl Rid {
    pub fn new(page_id: PageId, slot: SlotId) -> Self {
        Self { page_id, slot }
    }
}

/// Page structure
#[derive(Clone)]
pub struct Page {
    pub data: [u8; PAGE_SIZE],
    pub page_id: PageId,
}

impl Page {
    pub fn new(page_id: PageId) -> Self {
        Self {
            data: [0; PAGE_SIZE],
            page_id,
        }
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("page_id", &self.page_id).finish()
    }
}

/// Smart pointer to a page. Frames hand these out to pinning callers;
/// the pool replaces the contents when the frame is reused, so a caller
/// must hold a pin for as long as it reads through the pointer.
pub type PagePtr = Arc<RwLock<Page>>;
