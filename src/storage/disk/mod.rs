pub mod db_file;

pub use db_file::{DbFile, DiskError};
