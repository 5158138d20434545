use byteorder::{ByteOrder, LittleEndian};

use crate::common::types::{PageId, PAGE_SIZE};
use crate::heap::error::HeapFileError;

const NAME_OFFSET: usize = 20;
pub const MAX_NAME_LEN: usize = 256;

/// Heap file metadata, persisted as the payload of the file's header page
/// (always the file's first on-disk page). Held decoded while the file is
/// open and encoded back into the pinned header page on every structural
/// change; the buffer pool writes it out when the page's dirty flag demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub name: String,
    pub first_page: PageId,
    pub last_page: PageId,
    pub page_count: u32,
    pub record_count: u32,
}

impl FileHeader {
    pub fn encode(&self, data: &mut [u8; PAGE_SIZE]) {
        LittleEndian::write_u32(&mut data[0..4], self.first_page);
        LittleEndian::write_u32(&mut data[4..8], self.last_page);
        LittleEndian::write_u32(&mut data[8..12], self.page_count);
        LittleEndian::write_u32(&mut data[12..16], self.record_count);

        let name = self.name.as_bytes();
        debug_assert!(name.len() <= MAX_NAME_LEN);
        LittleEndian::write_u32(&mut data[16..20], name.len() as u32);
        data[NAME_OFFSET..NAME_OFFSET + name.len()].copy_from_slice(name);
    }

    pub fn decode(data: &[u8; PAGE_SIZE]) -> Result<Self, HeapFileError> {
        let first_page = LittleEndian::read_u32(&data[0..4]);
        let last_page = LittleEndian::read_u32(&data[4..8]);
        let page_count = LittleEndian::read_u32(&data[8..12]);
        let record_count = LittleEndian::read_u32(&data[12..16]);

        let name_len = LittleEndian::read_u32(&data[16..20]) as usize;
        if name_len > MAX_NAME_LEN {
            return Err(HeapFileError::Corrupted(format!(
                "header page has name length {name_len}"
            )));
        }
        let name = std::str::from_utf8(&data[NAME_OFFSET..NAME_OFFSET + name_len])
            .map_err(|_| HeapFileError::Corrupted("header page has non-UTF-8 name".into()))?
            .to_string();

        Ok(Self {
            name,
            first_page,
            last_page,
            page_count,
            record_count,
        })
    }
}
