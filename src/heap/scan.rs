use std::path::Path;
use std::sync::Arc;

use log::warn;

use crate::common::types::{PageId, Rid};
use crate::heap::error::HeapFileError;
use crate::heap::file::HeapFile;
use crate::heap::filter::ScanFilter;
use crate::storage::buffer::BufferManager;

/// Forward cursor over a heap file's records, optionally filtered.
///
/// The scan walks the page chain front to back, pinning one page at a time
/// through the underlying [`HeapFile`] cursor. Once the end of the chain is
/// reached the scan stays exhausted until rewound by
/// [`start_scan`](Self::start_scan) or [`reset_scan`](Self::reset_scan).
pub struct HeapFileScan {
    heap: HeapFile,
    filter: Option<ScanFilter>,
    mark: Option<(PageId, Option<Rid>)>,
    done: bool,
}

impl HeapFileScan {
    pub fn open(
        path: impl AsRef<Path>,
        pool: Arc<BufferManager>,
    ) -> Result<Self, HeapFileError> {
        Ok(Self {
            heap: HeapFile::open(path, pool)?,
            filter: None,
            mark: None,
            done: false,
        })
    }

    pub fn heap(&self) -> &HeapFile {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut HeapFile {
        &mut self.heap
    }

    pub fn record_count(&self) -> u32 {
        self.heap.record_count()
    }

    /// Rewind the scan and install a new predicate. `None` matches every
    /// record.
    pub fn start_scan(&mut self, filter: Option<ScanFilter>) -> Result<(), HeapFileError> {
        self.heap.release_current()?;
        self.filter = filter;
        self.mark = None;
        self.done = false;
        Ok(())
    }

    /// Advance to the next matching record and return its RID, or `None`
    /// once the chain is exhausted.
    pub fn scan_next(&mut self) -> Result<Option<Rid>, HeapFileError> {
        if self.done {
            return Ok(None);
        }

        // First call after open or a rewind: position on the first data
        // page. An empty first page ends the scan.
        if self.heap.cur_page.is_none() {
            let first = self.heap.header.first_page;
            self.heap.move_to(first)?;
            let page = self.heap.cur_page.as_ref().expect("just positioned").clone();
            if self.heap.page_manager.first_record(&page.read()).is_none() {
                self.heap.release_current()?;
                self.done = true;
                return Ok(None);
            }
        }

        loop {
            let page = self.heap.cur_page.as_ref().expect("scan positioned").clone();

            let next_slot = {
                let guard = page.read();
                match self.heap.cur_rid {
                    Some(rid) => self.heap.page_manager.next_record(&guard, rid.slot),
                    None => self.heap.page_manager.first_record(&guard),
                }
            };

            let rid = match next_slot {
                Some(slot) => Rid::new(self.heap.cur_page_id, slot),
                None => {
                    // Current page is spent; follow the forward link
                    let next_page = self.heap.page_manager.next_page(&page.read());
                    match next_page {
                        Some(next_id) => {
                            self.heap.move_to(next_id)?;
                            continue;
                        }
                        None => {
                            self.heap.release_current()?;
                            self.done = true;
                            return Ok(None);
                        }
                    }
                }
            };

            self.heap.cur_rid = Some(rid);
            let record = self.heap.page_manager.get_record(&page.read(), rid.slot)?;
            if self.matches(&record) {
                return Ok(Some(rid));
            }
        }
    }

    /// Bytes of the record the cursor is on.
    pub fn get_record(&self) -> Result<Vec<u8>, HeapFileError> {
        let (page, rid) = match (&self.heap.cur_page, self.heap.cur_rid) {
            (Some(page), Some(rid)) => (page, rid),
            _ => return Err(HeapFileError::NoCurrentRecord),
        };
        Ok(self.heap.page_manager.get_record(&page.read(), rid.slot)?)
    }

    /// Delete the record the cursor is on. The cursor does not advance;
    /// slot numbering is stable under deletion, so the next
    /// [`scan_next`](Self::scan_next) continues from the same position.
    pub fn delete_record(&mut self) -> Result<(), HeapFileError> {
        let (page, rid) = match (&self.heap.cur_page, self.heap.cur_rid) {
            (Some(page), Some(rid)) => (page.clone(), rid),
            _ => return Err(HeapFileError::NoCurrentRecord),
        };

        self.heap.page_manager.delete_record(&mut page.write(), rid.slot)?;
        self.heap.cur_dirty = true;
        // Saturate: a header that under-reports the count must not wrap
        self.heap.update_header(|h| h.record_count = h.record_count.saturating_sub(1));
        Ok(())
    }

    /// Force the cursor's page to be written back when unpinned.
    pub fn mark_dirty(&mut self) -> Result<(), HeapFileError> {
        if self.heap.cur_page.is_none() {
            return Err(HeapFileError::NoCurrentRecord);
        }
        self.heap.cur_dirty = true;
        Ok(())
    }

    /// Snapshot the cursor position for a later [`reset_scan`](Self::reset_scan).
    pub fn mark_scan(&mut self) -> Result<(), HeapFileError> {
        if self.heap.cur_page.is_none() {
            return Err(HeapFileError::NoCurrentRecord);
        }
        self.mark = Some((self.heap.cur_page_id, self.heap.cur_rid));
        Ok(())
    }

    /// Return the cursor to the marked position. Within the marked page
    /// this is pure repositioning; across pages the current pin is swapped
    /// for the marked page, which is taken as clean from this cursor's
    /// point of view.
    pub fn reset_scan(&mut self) -> Result<(), HeapFileError> {
        let (page_id, rid) = self.mark.ok_or(HeapFileError::NoMark)?;

        if self.heap.cur_page.is_some() && self.heap.cur_page_id == page_id {
            self.heap.cur_rid = rid;
        } else {
            self.heap.move_to(page_id)?;
            self.heap.cur_rid = rid;
        }
        self.done = false;
        Ok(())
    }

    /// Release the scan's page pin. Safe to call repeatedly; a finished or
    /// never-started scan has nothing to release.
    pub fn end_scan(&mut self) -> Result<(), HeapFileError> {
        self.heap.release_current()
    }

    fn matches(&self, record: &[u8]) -> bool {
        self.filter.as_ref().is_none_or(|f| f.matches(record))
    }
}

impl Drop for HeapFileScan {
    fn drop(&mut self) {
        if let Err(e) = self.end_scan() {
            warn!("failed to end scan on {}: {}", self.heap.name(), e);
        }
    }
}
