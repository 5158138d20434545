use std::path::Path;
use std::sync::Arc;

use crate::common::types::Rid;
use crate::heap::error::HeapFileError;
use crate::heap::file::HeapFile;
use crate::storage::buffer::BufferManager;
use crate::storage::page::layout::MAX_RECORD_SIZE;
use crate::storage::page::PageError;

/// Append-only cursor over a heap file. Records always go to the last page
/// of the chain; when it fills up, a fresh page is allocated and linked in.
pub struct InsertFileScan {
    heap: HeapFile,
}

impl InsertFileScan {
    pub fn open(
        path: impl AsRef<Path>,
        pool: Arc<BufferManager>,
    ) -> Result<Self, HeapFileError> {
        let mut heap = HeapFile::open(path, pool)?;
        // Drop the opening pin on the first page; insertion targets the
        // last page of the chain, pinned on first use
        heap.release_current()?;
        Ok(Self { heap })
    }

    pub fn heap(&self) -> &HeapFile {
        &self.heap
    }

    pub fn record_count(&self) -> u32 {
        self.heap.record_count()
    }

    /// Insert a record at the end of the file and return its RID.
    pub fn insert_record(&mut self, data: &[u8]) -> Result<Rid, HeapFileError> {
        // A record that cannot fit even on an empty page is rejected before
        // any buffer traffic
        if data.len() > MAX_RECORD_SIZE {
            return Err(HeapFileError::InvalidRecordLength(data.len()));
        }

        // Lazily position the cursor on the last page of the chain
        if self.heap.cur_page.is_none() {
            let last = self.heap.header.last_page;
            self.heap.move_to(last)?;
        }

        let page = self.heap.cur_page.as_ref().expect("cursor positioned").clone();
        // Scope the write guard so it is released before grow_and_insert
        // re-locks the same page in the overflow arm
        let attempt = {
            let mut guard = page.write();
            self.heap.page_manager.insert_record(&mut guard, data)
        };
        let slot = match attempt {
            Ok(slot) => slot,
            Err(PageError::InsufficientSpace) => self.grow_and_insert(data)?,
            Err(e) => return Err(e.into()),
        };

        self.heap.cur_dirty = true;
        self.heap.update_header(|h| h.record_count += 1);
        Ok(Rid::new(self.heap.cur_page_id, slot))
    }

    /// Extend the chain with a fresh page and insert into it. The old last
    /// page is linked forward and unpinned dirty. A failed insert into the
    /// fresh page leaves it allocated; there is no rollback.
    fn grow_and_insert(&mut self, data: &[u8]) -> Result<u32, HeapFileError> {
        let pool = self.heap.pool.clone();
        let file = self.heap.file.clone();

        let (new_page_id, new_page) = pool.allocate_page(&file)?;
        self.heap.page_manager.init_page(&mut new_page.write());

        self.heap.update_header(|h| {
            h.page_count += 1;
            h.last_page = new_page_id;
        });

        // Link the full page forward to its successor, then hand its pin back
        let old_page = self.heap.cur_page.as_ref().expect("cursor positioned").clone();
        self.heap.page_manager.set_next_page(&mut old_page.write(), Some(new_page_id));
        self.heap.cur_dirty = true;
        if let Err(e) = self.heap.release_current() {
            let _ = pool.unpin_page(&file, new_page_id, true);
            return Err(e);
        }

        self.heap.cur_page = Some(new_page.clone());
        self.heap.cur_page_id = new_page_id;
        self.heap.cur_dirty = false;
        self.heap.cur_rid = None;

        match self.heap.page_manager.insert_record(&mut new_page.write(), data) {
            Ok(slot) => Ok(slot),
            // The record fit an empty page by the length check above
            Err(e) => Err(HeapFileError::Corrupted(format!(
                "insert into freshly allocated page {new_page_id} failed: {e}"
            ))),
        }
    }
}
