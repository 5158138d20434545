use std::sync::Arc;

use parking_lot::RwLock;

use crate::common::types::{FileId, FrameId, PageId, PagePtr, INVALID_PAGE_ID};
use crate::storage::disk::DbFile;

/// Descriptor for one buffer pool slot.
///
/// When `valid` is false the frame holds no page and the remaining fields are
/// at their defaults (`pin_count == 0`, `is_dirty == false`, `ref_bit ==
/// false`, `file == None`). The page table has an entry for a (file, page)
/// pair exactly while the frame holding it is valid.
pub struct Frame {
    pub frame_id: FrameId,
    pub file: Option<Arc<DbFile>>,
    pub page_id: PageId,
    pub pin_count: u32,
    pub is_dirty: bool,
    pub ref_bit: bool,
    pub valid: bool,
    pub page: PagePtr,
}

impl Frame {
    pub fn new(frame_id: FrameId, page: PagePtr) -> Self {
        Self {
            frame_id,
            file: None,
            page_id: INVALID_PAGE_ID,
            pin_count: 0,
            is_dirty: false,
            ref_bit: false,
            valid: false,
            page,
        }
    }

    /// Take ownership of a newly loaded page: one pin, clean, referenced.
    pub fn set(&mut self, file: Arc<DbFile>, page_id: PageId) {
        self.file = Some(file);
        self.page_id = page_id;
        self.pin_count = 1;
        self.is_dirty = false;
        self.ref_bit = true;
        self.valid = true;
    }

    /// Return the frame to the invalid state.
    pub fn clear(&mut self) {
        self.file = None;
        self.page_id = INVALID_PAGE_ID;
        self.pin_count = 0;
        self.is_dirty = false;
        self.ref_bit = false;
        self.valid = false;
    }

    pub fn file_id(&self) -> Option<FileId> {
        self.file.as_ref().map(|f| f.id())
    }
}

/// Smart pointer to a frame
pub type FramePtr = Arc<RwLock<Frame>>;
