//! Utility modules for file I/O and source decoding.

pub mod encoding;
pub mod file_helper;
