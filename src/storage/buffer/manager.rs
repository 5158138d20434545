use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::warn;
use parking_lot::{Mutex, RwLock};

use crate::common::types::{FileId, FrameId, Page, PageId, PagePtr};
use crate::storage::buffer::error::BufferError;
use crate::storage::buffer::frame::{Frame, FramePtr};
use crate::storage::disk::DbFile;

/// Access counters, readable through [`BufferManager::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub accesses: u64,
    pub disk_reads: u64,
    pub disk_writes: u64,
}

#[derive(Default)]
struct StatCounters {
    accesses: AtomicU64,
    disk_reads: AtomicU64,
    disk_writes: AtomicU64,
}

/// Buffer pool manager with clock (second-chance) replacement.
///
/// Pages are identified by (file, page number) and served out of a fixed
/// pool of frames. A fetched or allocated page is pinned; every pin must be
/// matched by exactly one [`unpin_page`](Self::unpin_page), which is also
/// where the dirty flag is reported. Pinned frames are never evicted.
pub struct BufferManager {
    pool_size: usize,
    frames: Vec<FramePtr>,
    page_table: RwLock<HashMap<(FileId, PageId), FrameId>>,
    clock_hand: Mutex<usize>,
    stats: StatCounters,
}

impl BufferManager {
    pub fn new(pool_size: usize) -> Self {
        assert!(pool_size > 0, "buffer pool must have at least one frame");

        let mut frames = Vec::with_capacity(pool_size);
        for i in 0..pool_size {
            let frame_id = i as FrameId;
            let page = Arc::new(RwLock::new(Page::new(0)));
            frames.push(Arc::new(RwLock::new(Frame::new(frame_id, page))));
        }

        Self {
            pool_size,
            frames,
            page_table: RwLock::new(HashMap::new()),
            // First advance lands the hand on frame 0
            clock_hand: Mutex::new(pool_size - 1),
            stats: StatCounters::default(),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Fetch a page, from the pool on a hit or from disk on a miss.
    /// The returned page is pinned.
    pub fn fetch_page(&self, file: &Arc<DbFile>, page_id: PageId) -> Result<PagePtr, BufferError> {
        self.stats.accesses.fetch_add(1, Ordering::Relaxed);
        let key = (file.id(), page_id);

        // Hit: bump the pin count and give the page a second chance
        if let Some(&frame_id) = self.page_table.read().get(&key) {
            let mut frame = self.frames[frame_id as usize].write();
            frame.ref_bit = true;
            frame.pin_count += 1;
            return Ok(frame.page.clone());
        }

        // Miss: claim a frame and read the page into it
        let frame_id = self.allocate_frame()?;
        let mut frame = self.frames[frame_id as usize].write();
        {
            let mut page = frame.page.write();
            *page = Page::new(page_id);
            file.read_page(page_id, &mut page)?;
        }
        self.stats.disk_reads.fetch_add(1, Ordering::Relaxed);

        frame.set(file.clone(), page_id);
        self.page_table.write().insert(key, frame_id);

        Ok(frame.page.clone())
    }

    /// Release one pin on a page, recording whether the caller dirtied it.
    /// The dirty flag only accumulates; it is cleared by write-back alone.
    pub fn unpin_page(&self, file: &DbFile, page_id: PageId, dirty: bool) -> Result<(), BufferError> {
        let key = (file.id(), page_id);
        let frame_id = match self.page_table.read().get(&key) {
            Some(&id) => id,
            None => return Err(BufferError::PageNotFound(page_id)),
        };

        let mut frame = self.frames[frame_id as usize].write();
        if frame.pin_count == 0 {
            return Err(BufferError::PageNotPinned(page_id));
        }
        frame.pin_count -= 1;
        if dirty {
            frame.is_dirty = true;
        }

        Ok(())
    }

    /// Allocate a fresh page in `file` and pin it in a frame. The frame's
    /// bytes are zeroed but not formatted; the caller initializes the page.
    pub fn allocate_page(&self, file: &Arc<DbFile>) -> Result<(PageId, PagePtr), BufferError> {
        self.stats.accesses.fetch_add(1, Ordering::Relaxed);

        let page_id = file.allocate_page()?;
        let frame_id = self.allocate_frame()?;

        let mut frame = self.frames[frame_id as usize].write();
        {
            let mut page = frame.page.write();
            *page = Page::new(page_id);
        }
        frame.set(file.clone(), page_id);
        self.page_table.write().insert((file.id(), page_id), frame_id);

        Ok((page_id, frame.page.clone()))
    }

    /// Drop a page from the pool (if resident) and deallocate it on disk.
    /// Succeeds when the page is not resident; fails `PagePinned` when some
    /// caller still holds a pin on it.
    pub fn dispose_page(&self, file: &Arc<DbFile>, page_id: PageId) -> Result<(), BufferError> {
        let key = (file.id(), page_id);

        {
            let mut page_table = self.page_table.write();
            if let Some(&frame_id) = page_table.get(&key) {
                let mut frame = self.frames[frame_id as usize].write();
                if frame.pin_count > 0 {
                    return Err(BufferError::PagePinned(page_id));
                }
                frame.clear();
                page_table.remove(&key);
            }
        }

        file.dispose_page(page_id)?;
        Ok(())
    }

    /// Write back and drop every resident page of `file`. Fails `PagePinned`
    /// on the first pinned frame encountered; frames already processed stay
    /// flushed and invalidated.
    pub fn flush_file(&self, file: &DbFile) -> Result<(), BufferError> {
        let file_id = file.id();

        for frame_ptr in &self.frames {
            let mut frame = frame_ptr.write();
            if frame.file_id() != Some(file_id) {
                continue;
            }
            if !frame.valid {
                // A frame claiming this file while invalid means the pool's
                // bookkeeping is broken
                return Err(BufferError::BadBuffer(frame.frame_id));
            }
            if frame.pin_count > 0 {
                return Err(BufferError::PagePinned(frame.page_id));
            }

            if frame.is_dirty {
                let page = frame.page.read().clone();
                file.write_page(&page)?;
                self.stats.disk_writes.fetch_add(1, Ordering::Relaxed);
                frame.is_dirty = false;
            }

            self.page_table.write().remove(&(file_id, frame.page_id));
            frame.clear();
        }

        Ok(())
    }

    /// Snapshot of the access counters.
    pub fn stats(&self) -> BufferStats {
        BufferStats {
            accesses: self.stats.accesses.load(Ordering::Relaxed),
            disk_reads: self.stats.disk_reads.load(Ordering::Relaxed),
            disk_writes: self.stats.disk_writes.load(Ordering::Relaxed),
        }
    }

    /// Whether a page is currently resident in the pool.
    pub fn contains_page(&self, file: &DbFile, page_id: PageId) -> bool {
        self.frame_of(file, page_id).is_some()
    }

    /// Frame currently holding a page, if resident.
    pub fn frame_of(&self, file: &DbFile, page_id: PageId) -> Option<FrameId> {
        self.page_table.read().get(&(file.id(), page_id)).copied()
    }

    /// Claim a frame via the clock algorithm.
    ///
    /// The hand advances before each probe. An invalid frame is claimed
    /// immediately; a referenced frame loses its reference bit and gets a
    /// second chance; a pinned frame is skipped; an unpinned, unreferenced
    /// frame is the victim, written back first when dirty. Two full sweeps
    /// without a claim mean every frame is pinned.
    fn allocate_frame(&self) -> Result<FrameId, BufferError> {
        let mut hand = self.clock_hand.lock();

        for _ in 0..self.pool_size * 2 {
            *hand = (*hand + 1) % self.pool_size;
            let mut frame = self.frames[*hand].write();

            if !frame.valid {
                return Ok(*hand as FrameId);
            }
            if frame.ref_bit {
                frame.ref_bit = false;
                continue;
            }
            if frame.pin_count > 0 {
                continue;
            }

            // Victim found
            if frame.is_dirty {
                let file = frame.file.clone().ok_or(BufferError::BadBuffer(frame.frame_id))?;
                let page = frame.page.read().clone();
                file.write_page(&page)?;
                self.stats.disk_writes.fetch_add(1, Ordering::Relaxed);
                frame.is_dirty = false;
            }

            let file_id = frame.file_id().ok_or(BufferError::BadBuffer(frame.frame_id))?;
            self.page_table.write().remove(&(file_id, frame.page_id));
            frame.clear();
            return Ok(*hand as FrameId);
        }

        Err(BufferError::BufferExceeded)
    }
}

impl Drop for BufferManager {
    /// Best-effort write-back of everything still dirty. Pins are not
    /// checked; at teardown there is no caller left to honor them.
    fn drop(&mut self) {
        for frame_ptr in &self.frames {
            let frame = frame_ptr.read();
            if !frame.valid || !frame.is_dirty {
                continue;
            }
            if let Some(file) = frame.file.as_ref() {
                let page = frame.page.read().clone();
                if let Err(e) = file.write_page(&page) {
                    warn!(
                        "failed to flush page {} of file {:?} at shutdown: {}",
                        frame.page_id,
                        file.path(),
                        e
                    );
                }
            }
        }
    }
}
