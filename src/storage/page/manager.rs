use crate::common::types::{Page, PageId, SlotId};
use crate::storage::page::error::PageError;
use crate::storage::page::header::PageHeader;
use crate::storage::page::layout::{RecordLocation, HEADER_SIZE, RECORD_OFFSET_SIZE};
use crate::common::types::PAGE_SIZE;

/// Operations on one slotted page's byte buffer.
///
/// Record data grows forward from just past the header; the slot array grows
/// backward from the end of the page. Slots are append-only: deleting a
/// record tombstones its slot (length 0) without moving anything, so slot
/// indices stay stable for the lifetime of the page.
pub struct PageManager;

impl Default for PageManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PageManager {
    pub fn new() -> Self {
        Self {}
    }

    /// Format a page as an empty slotted page with no forward link.
    pub fn init_page(&self, page: &mut Page) {
        let header = PageHeader::new();
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    pub fn insert_record(&self, page: &mut Page, data: &[u8]) -> Result<SlotId, PageError> {
        let mut header = self.get_header(page);

        // Record size plus the slot entry for the record
        let record_size = data.len() as u32;
        let total_space_needed = record_size + RECORD_OFFSET_SIZE as u32;

        if header.free_space_size < total_space_needed {
            return Err(PageError::InsufficientSpace);
        }

        // Slot entries are laid out from the end of the page
        let slot_array_pos = PAGE_SIZE - RECORD_OFFSET_SIZE * (header.record_count as usize + 1);

        let record_loc = RecordLocation {
            offset: header.free_space_offset,
            length: record_size,
        };

        // Write record data
        let data_end = header.free_space_offset as usize + data.len();
        page.data[header.free_space_offset as usize..data_end].copy_from_slice(data);

        // Write slot entry
        page.data[slot_array_pos..slot_array_pos + RECORD_OFFSET_SIZE]
            .copy_from_slice(&record_loc.to_bytes());

        // Update header
        header.free_space_offset += record_size;
        header.free_space_size -= total_space_needed;
        header.record_count += 1;
        self.put_header(page, &header);

        Ok(header.record_count - 1)
    }

    pub fn delete_record(&self, page: &mut Page, slot: SlotId) -> Result<(), PageError> {
        let header = self.get_header(page);

        if slot >= header.record_count {
            return Err(PageError::InvalidSlotId(slot));
        }

        let slot_pos = Self::slot_position(slot);
        let mut record_loc = self.get_record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Already deleted
        }

        // Tombstone only. The record bytes and the slot entry both stay
        // behind until the page is reused, so free space is unchanged;
        // crediting the slot's bytes here would let a later insert grow the
        // data area into the live slot array.
        record_loc.length = 0;
        page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE].copy_from_slice(&record_loc.to_bytes());

        Ok(())
    }

    pub fn get_record(&self, page: &Page, slot: SlotId) -> Result<Vec<u8>, PageError> {
        let header = self.get_header(page);

        if slot >= header.record_count {
            return Err(PageError::InvalidSlotId(slot));
        }

        let slot_pos = Self::slot_position(slot);
        let record_loc = self.get_record_location(page, slot_pos);

        if record_loc.length == 0 {
            return Err(PageError::RecordNotFound); // Deleted record
        }

        let start = record_loc.offset as usize;
        let end = start + record_loc.length as usize;
        Ok(page.data[start..end].to_vec())
    }

    /// First live (non-tombstoned) slot on the page, if any.
    pub fn first_record(&self, page: &Page) -> Option<SlotId> {
        self.next_live_slot(page, 0)
    }

    /// Next live slot after `slot`; `None` at end of page.
    pub fn next_record(&self, page: &Page, slot: SlotId) -> Option<SlotId> {
        self.next_live_slot(page, slot + 1)
    }

    fn next_live_slot(&self, page: &Page, from: SlotId) -> Option<SlotId> {
        let header = self.get_header(page);
        for slot in from..header.record_count {
            let loc = self.get_record_location(page, Self::slot_position(slot));
            if loc.length > 0 {
                return Some(slot);
            }
        }
        None
    }

    pub fn set_next_page(&self, page: &mut Page, next: Option<PageId>) {
        let mut header = self.get_header(page);
        header.next_page_id = next;
        self.put_header(page, &header);
    }

    pub fn next_page(&self, page: &Page) -> Option<PageId> {
        self.get_header(page).next_page_id
    }

    pub fn get_header(&self, page: &Page) -> PageHeader {
        PageHeader::from_bytes(&page.data[0..HEADER_SIZE])
    }

    pub fn get_free_space(&self, page: &Page) -> u32 {
        self.get_header(page).free_space_size
    }

    fn put_header(&self, page: &mut Page, header: &PageHeader) {
        page.data[0..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    fn slot_position(slot: SlotId) -> usize {
        PAGE_SIZE - RECORD_OFFSET_SIZE * (slot as usize + 1)
    }

    fn get_record_location(&self, page: &Page, slot_pos: usize) -> RecordLocation {
        RecordLocation::from_bytes(&page.data[slot_pos..slot_pos + RECORD_OFFSET_SIZE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::INVALID_PAGE_ID;
    use crate::storage::page::layout::MAX_RECORD_SIZE;

    fn fresh_page() -> (PageManager, Page) {
        let pm = PageManager::new();
        let mut page = Page::new(1);
        pm.init_page(&mut page);
        (pm, page)
    }

    #[test]
    fn insert_and_get_round_trip() {
        let (pm, mut page) = fresh_page();
        let slot = pm.insert_record(&mut page, b"hello").unwrap();
        assert_eq!(slot, 0);
        assert_eq!(pm.get_record(&page, slot).unwrap(), b"hello");
    }

    #[test]
    fn delete_tombstones_without_shifting_slots() {
        let (pm, mut page) = fresh_page();
        let a = pm.insert_record(&mut page, b"aaa").unwrap();
        let b = pm.insert_record(&mut page, b"bbb").unwrap();
        let c = pm.insert_record(&mut page, b"ccc").unwrap();

        pm.delete_record(&mut page, b).unwrap();

        assert_eq!(pm.get_record(&page, a).unwrap(), b"aaa");
        assert_eq!(pm.get_record(&page, c).unwrap(), b"ccc");
        assert!(matches!(pm.get_record(&page, b), Err(PageError::RecordNotFound)));
        assert!(matches!(pm.delete_record(&mut page, b), Err(PageError::RecordNotFound)));
    }

    #[test]
    fn record_iteration_skips_tombstones() {
        let (pm, mut page) = fresh_page();
        for data in [b"r0", b"r1", b"r2"] {
            pm.insert_record(&mut page, data).unwrap();
        }
        pm.delete_record(&mut page, 1).unwrap();

        let first = pm.first_record(&page).unwrap();
        assert_eq!(first, 0);
        assert_eq!(pm.next_record(&page, first), Some(2));
        assert_eq!(pm.next_record(&page, 2), None);
    }

    #[test]
    fn empty_page_has_no_records() {
        let (pm, page) = fresh_page();
        assert_eq!(pm.first_record(&page), None);
    }

    #[test]
    fn page_fills_up() {
        let (pm, mut page) = fresh_page();
        let record = vec![7u8; 1024];
        let mut inserted = 0;
        loop {
            match pm.insert_record(&mut page, &record) {
                Ok(_) => inserted += 1,
                Err(PageError::InsufficientSpace) => break,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert!(inserted > 0);
        // A max-size record fits exactly on a fresh page
        let mut page2 = Page::new(2);
        pm.init_page(&mut page2);
        pm.insert_record(&mut page2, &vec![0u8; MAX_RECORD_SIZE]).unwrap();
        assert_eq!(pm.get_free_space(&page2), 0);
    }

    #[test]
    fn delete_does_not_reclaim_space() {
        let (pm, mut page) = fresh_page();
        let keep = pm.insert_record(&mut page, &vec![0xABu8; 64]).unwrap();
        let doomed = pm.insert_record(&mut page, &vec![0xCDu8; 64]).unwrap();

        let free_before = pm.get_free_space(&page);
        pm.delete_record(&mut page, doomed).unwrap();
        // Neither the record bytes nor the slot entry come back
        assert_eq!(pm.get_free_space(&page), free_before);

        // An insert sized past the true free space must be refused; if the
        // deleted slot's entry were credited back, this would be accepted and
        // its tail would land on top of the live slot array.
        let free = pm.get_free_space(&page) as usize;
        let too_big = vec![0x11u8; free];
        assert!(matches!(
            pm.insert_record(&mut page, &too_big),
            Err(PageError::InsufficientSpace)
        ));

        // Exactly filling the remaining space still works and leaves the
        // survivors readable
        let fits = vec![0x22u8; free - RECORD_OFFSET_SIZE];
        let slot = pm.insert_record(&mut page, &fits).unwrap();
        assert_eq!(pm.get_free_space(&page), 0);
        assert_eq!(pm.get_record(&page, slot).unwrap(), fits);
        assert_eq!(pm.get_record(&page, keep).unwrap(), vec![0xABu8; 64]);
    }

    #[test]
    fn forward_link_round_trip() {
        let (pm, mut page) = fresh_page();
        assert_eq!(pm.next_page(&page), None);
        pm.set_next_page(&mut page, Some(42));
        assert_eq!(pm.next_page(&page), Some(42));
        pm.set_next_page(&mut page, None);
        assert_eq!(pm.next_page(&page), None);
        assert_ne!(page.page_id, INVALID_PAGE_ID);
    }
}
