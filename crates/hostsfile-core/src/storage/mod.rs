//! Storage layer
//!
//! Moves hosts file content between disk and the store. The store never
//! touches the filesystem directly; it reads lines, writes lines and copies
//! files through this module.

pub mod persistence;

pub use persistence::{copy_file, is_writable, read_lines, split_lines, write_lines};
