use std::path::Path;
use std::sync::Arc;

use log::warn;

use crate::common::types::{PageId, PagePtr, Rid, INVALID_PAGE_ID};
use crate::heap::error::HeapFileError;
use crate::heap::file_header::{FileHeader, MAX_NAME_LEN};
use crate::storage::buffer::BufferManager;
use crate::storage::disk::DbFile;
use crate::storage::page::PageManager;

/// Create an empty heap file at `path`: a header page followed by one empty
/// data page, flushed to disk. Fails if the file already exists.
pub fn create_heap_file(
    path: impl AsRef<Path>,
    pool: &Arc<BufferManager>,
) -> Result<(), HeapFileError> {
    let path = path.as_ref();
    let file = Arc::new(DbFile::create(path)?);
    let page_manager = PageManager::new();

    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.truncate(MAX_NAME_LEN);

    // Header page first so it lands at the start of the file
    let (header_page_id, header_page) = pool.allocate_page(&file)?;
    let (data_page_id, data_page) = pool.allocate_page(&file)?;
    page_manager.init_page(&mut data_page.write());

    let header = FileHeader {
        name,
        first_page: data_page_id,
        last_page: data_page_id,
        page_count: 1,
        record_count: 0,
    };
    header.encode(&mut header_page.write().data);

    pool.unpin_page(&file, header_page_id, true)?;
    pool.unpin_page(&file, data_page_id, true)?;
    pool.flush_file(&file)?;

    Ok(())
}

/// Remove a heap file from disk. Any open handles must be dropped first.
pub fn destroy_heap_file(path: impl AsRef<Path>) -> Result<(), HeapFileError> {
    DbFile::destroy(path)?;
    Ok(())
}

/// An open heap file: an unordered, forward-chained sequence of slotted
/// pages behind the buffer pool.
///
/// The header page stays pinned for the whole lifetime of the object. At
/// most one data page is pinned besides it, tracked by the cursor fields;
/// sequential access to the cursor's page costs no buffer traffic and a
/// jump to another page costs exactly one unpin/fetch pair.
pub struct HeapFile {
    pub(crate) file: Arc<DbFile>,
    pub(crate) pool: Arc<BufferManager>,
    pub(crate) page_manager: PageManager,
    pub(crate) header_page: PagePtr,
    pub(crate) header_page_id: PageId,
    pub(crate) header: FileHeader,
    pub(crate) hdr_dirty: bool,
    pub(crate) cur_page: Option<PagePtr>,
    pub(crate) cur_page_id: PageId,
    pub(crate) cur_dirty: bool,
    pub(crate) cur_rid: Option<Rid>,
}

impl HeapFile {
    /// Open an existing heap file, pinning its header page and its first
    /// data page.
    pub fn open(
        path: impl AsRef<Path>,
        pool: Arc<BufferManager>,
    ) -> Result<Self, HeapFileError> {
        let file = Arc::new(DbFile::open(path)?);

        let header_page_id = file.first_page()?;
        let header_page = pool.fetch_page(&file, header_page_id)?;

        let header = match FileHeader::decode(&header_page.read().data) {
            Ok(h) => h,
            Err(e) => {
                let _ = pool.unpin_page(&file, header_page_id, false);
                return Err(e);
            }
        };

        let cur_page_id = header.first_page;
        let cur_page = match pool.fetch_page(&file, cur_page_id) {
            Ok(p) => p,
            Err(e) => {
                let _ = pool.unpin_page(&file, header_page_id, false);
                return Err(e.into());
            }
        };

        Ok(Self {
            file,
            pool,
            page_manager: PageManager::new(),
            header_page,
            header_page_id,
            header,
            hdr_dirty: false,
            cur_page: Some(cur_page),
            cur_page_id,
            cur_dirty: false,
            cur_rid: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn record_count(&self) -> u32 {
        self.header.record_count
    }

    pub fn page_count(&self) -> u32 {
        self.header.page_count
    }

    pub fn file(&self) -> &Arc<DbFile> {
        &self.file
    }

    /// Fetch an arbitrary record. A request on the cursor's page is served
    /// from the held pin; anything else swaps the cursor to the record's
    /// page.
    pub fn get_record(&mut self, rid: Rid) -> Result<Vec<u8>, HeapFileError> {
        if self.cur_page.is_none() || self.cur_page_id != rid.page_id {
            self.move_to(rid.page_id)?;
        }
        self.cur_rid = Some(rid);

        let page = self.cur_page.as_ref().expect("cursor positioned above");
        let data = self.page_manager.get_record(&page.read(), rid.slot)?;
        Ok(data)
    }

    /// Unpin the cursor's page, if any, reporting its accumulated dirty flag.
    pub(crate) fn release_current(&mut self) -> Result<(), HeapFileError> {
        if self.cur_page.take().is_some() {
            let page_id = self.cur_page_id;
            let dirty = self.cur_dirty;
            self.cur_page_id = INVALID_PAGE_ID;
            self.cur_dirty = false;
            self.cur_rid = None;
            self.pool.unpin_page(&self.file, page_id, dirty)?;
        }
        Ok(())
    }

    /// Point the cursor at `page_id`, releasing whatever it held before.
    pub(crate) fn move_to(&mut self, page_id: PageId) -> Result<(), HeapFileError> {
        self.release_current()?;
        let page = self.pool.fetch_page(&self.file, page_id)?;
        self.cur_page = Some(page);
        self.cur_page_id = page_id;
        self.cur_dirty = false;
        self.cur_rid = None;
        Ok(())
    }

    /// Apply a header mutation and re-encode it into the pinned header page.
    pub(crate) fn update_header(&mut self, f: impl FnOnce(&mut FileHeader)) {
        f(&mut self.header);
        self.header.encode(&mut self.header_page.write().data);
        self.hdr_dirty = true;
    }
}

impl Drop for HeapFile {
    fn drop(&mut self) {
        if let Err(e) = self.release_current() {
            warn!("failed to unpin data page of {}: {}", self.header.name, e);
        }
        if let Err(e) = self
            .pool
            .unpin_page(&self.file, self.header_page_id, self.hdr_dirty)
        {
            warn!("failed to unpin header page of {}: {}", self.header.name, e);
        }
    }
}
