use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use thiserror::Error;

use crate::common::types::{FileId, Page, PageId, INVALID_PAGE_ID, PAGE_SIZE};

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Error, Debug)]
pub enum DiskError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid page ID: {0}")]
    InvalidPageId(PageId),
    #[error("page {0} is past the end of the file")]
    PageOutOfBounds(PageId),
    #[error("file {0} already exists")]
    FileExists(PathBuf),
    #[error("file has no pages")]
    EmptyFile,
}

/// One open paged file on disk. Pages are fixed-size and numbered from 1;
/// page N lives at byte offset (N - 1) * PAGE_SIZE.
///
/// Every open handle carries a process-unique [`FileId`]; the buffer pool
/// keys its lookup table on (FileId, PageId).
pub struct DbFile {
    id: FileId,
    path: PathBuf,
    file: Mutex<File>,
}

impl DbFile {
    /// Create a new, empty file. Fails if the path already exists.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::AlreadyExists {
                    DiskError::FileExists(path.to_path_buf())
                } else {
                    DiskError::Io(e)
                }
            })?;
        Ok(Self::from_handle(path, file))
    }

    /// Open an existing file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DiskError> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self::from_handle(path, file))
    }

    /// Remove a file from disk. The caller must have dropped all handles
    /// and flushed or invalidated any buffered pages first.
    pub fn destroy(path: impl AsRef<Path>) -> Result<(), DiskError> {
        std::fs::remove_file(path)?;
        Ok(())
    }

    fn from_handle(path: &Path, file: File) -> Self {
        Self {
            id: NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed),
            path: path.to_path_buf(),
            file: Mutex::new(file),
        }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a page from disk into the supplied buffer.
    pub fn read_page(&self, page_id: PageId, page: &mut Page) -> Result<(), DiskError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskError::InvalidPageId(page_id));
        }

        let offset = Self::page_offset(page_id);
        let mut file = self.file.lock();

        let file_size = file.metadata()?.len();
        if offset + PAGE_SIZE as u64 > file_size {
            return Err(DiskError::PageOutOfBounds(page_id));
        }

        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut page.data)?;
        page.page_id = page_id;

        Ok(())
    }

    /// Write a page to disk.
    pub fn write_page(&self, page: &Page) -> Result<(), DiskError> {
        if page.page_id == INVALID_PAGE_ID {
            return Err(DiskError::InvalidPageId(page.page_id));
        }

        let offset = Self::page_offset(page.page_id);
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(&page.data)?;
        file.flush()?;

        Ok(())
    }

    /// Extend the file by one zeroed page and return its ID.
    pub fn allocate_page(&self) -> Result<PageId, DiskError> {
        let mut file = self.file.lock();

        let file_size = file.metadata()?.len();
        let new_page_id = (file_size / PAGE_SIZE as u64) as PageId + 1;

        file.seek(SeekFrom::End(0))?;
        let zeros = [0u8; PAGE_SIZE];
        file.write_all(&zeros)?;
        file.flush()?;

        Ok(new_page_id)
    }

    /// Deallocate a page. The page's bytes are zeroed in place; page IDs are
    /// sequential and never recycled, so the slot simply goes unused.
    pub fn dispose_page(&self, page_id: PageId) -> Result<(), DiskError> {
        if page_id == INVALID_PAGE_ID {
            return Err(DiskError::InvalidPageId(page_id));
        }

        let offset = Self::page_offset(page_id);
        let mut file = self.file.lock();

        let file_size = file.metadata()?.len();
        if offset + PAGE_SIZE as u64 > file_size {
            return Err(DiskError::PageOutOfBounds(page_id));
        }

        file.seek(SeekFrom::Start(offset))?;
        let zeros = [0u8; PAGE_SIZE];
        file.write_all(&zeros)?;
        file.flush()?;

        Ok(())
    }

    /// ID of the file's first page. Fails on a file with no pages.
    pub fn first_page(&self) -> Result<PageId, DiskError> {
        if self.page_count()? == 0 {
            return Err(DiskError::EmptyFile);
        }
        Ok(1)
    }

    /// Number of pages currently allocated in the file.
    pub fn page_count(&self) -> Result<u32, DiskError> {
        let file = self.file.lock();
        let file_size = file.metadata()?.len();
        Ok((file_size / PAGE_SIZE as u64) as u32)
    }

    fn page_offset(page_id: PageId) -> u64 {
        (page_id as u64 - 1) * PAGE_SIZE as u64
    }
}

impl std::fmt::Debug for DbFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbFile")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish()
    }
}
