pub mod error;
pub mod header;
pub mod layout;
pub mod manager;

pub use error::PageError;
pub use header::PageHeader;
pub use manager::PageManager;
