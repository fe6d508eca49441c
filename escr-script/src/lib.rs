//! escr-script
//!
//! Reader for `ESCR1_00` script containers: splits the file into its index table,
//! bytecode and string data, walks the bytecode one instruction at a time, and
//! resolves string-literal references.
//!
//! Everything here borrows from the caller's buffer; nothing is copied out of it.
//! The user-opcode half of the instruction set is game-specific, so callers supply an
//! [`OpcodeTable`] when they start decoding.

pub mod decode;
pub mod format;
pub mod opcode;
pub mod strings;

pub use decode::{decode, decode_one, DecodeError, Instruction, Instructions};
pub use format::{ContainerBuilder, ContainerError, ScriptContainer, MAGIC};
pub use opcode::{OpcodeInfo, OpcodeKind, OpcodeTable, ReservedOpcode, UserOpcode, RESERVED_COUNT};
pub use strings::{StringLookupError, StringTable, STRING_NOT_FOUND_SENTINEL};
