pub mod error;
pub mod frame;
pub mod manager;

pub use error::BufferError;
pub use frame::{Frame, FramePtr};
pub use manager::{BufferManager, BufferStats};
