//! Script container layout.
//!
//! All multi-byte integers are little-endian:
//! - 0x00: `ESCR1_00` magic (8 bytes)
//! - 0x08: u32 index_count
//! - 0x0C: [index_count] u32 offsets into the data region
//! - u32 code_size, then [code_size] bytecode
//! - u32 data_size, then [data_size] NUL-terminated strings

mod builder;
mod container;

pub use builder::ContainerBuilder;
pub use container::{ContainerError, ScriptContainer, MAGIC};
