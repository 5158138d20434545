use thiserror::Error;

use crate::common::types::SlotId;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("Not enough space in page")]
    InsufficientSpace,
    #[error("Record not found")]
    RecordNotFound,
    #[error("Invalid slot ID: {0}")]
    InvalidSlotId(SlotId),
}
