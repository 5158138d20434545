pub mod error;
pub mod file;
pub mod file_header;
pub mod filter;
pub mod insert;
pub mod scan;

pub use error::HeapFileError;
pub use file::{create_heap_file, destroy_heap_file, HeapFile};
pub use file_header::FileHeader;
pub use filter::{CompareOp, FilterValue, ScanFilter};
pub use insert::InsertFileScan;
pub use scan::HeapFileScan;
