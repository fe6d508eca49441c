//! Bytecode stream decoding.
//!
//! Each instruction is one opcode byte, optionally followed by a little-endian u32.
//! Width depends on the [`OpcodeTable`], so a table that is wrong for the file does not
//! fail here; it shows up downstream as unknown opcodes and wild branch targets.

use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use crate::format::{ContainerError, ScriptContainer};
use crate::opcode::OpcodeTable;

const OPCODE_SIZE: usize = 1;
const OPERAND_SIZE: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("truncated instruction at 0x{offset:08X}: operand runs past code_size=0x{code_size:X}")]
    TruncatedInstruction { offset: u32, code_size: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    /// Position within the code region.
    pub offset: u32,
    pub opcode: u32,
    pub operand: Option<u32>,
}

impl Instruction {
    /// Encoded width in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        match self.operand {
            Some(_) => OPCODE_SIZE + OPERAND_SIZE,
            None => OPCODE_SIZE,
        }
    }

    /// Offset of the next instruction.
    #[inline]
    pub fn end(&self) -> u32 {
        self.offset + self.size() as u32
    }
}

/// Decode the instruction at `cursor`.
///
/// Returns `Ok(None)` once `cursor` reaches the end of the code region, otherwise the
/// instruction and the cursor for the next one.
pub fn decode_one(
    container: &ScriptContainer<'_>,
    table: &OpcodeTable,
    cursor: usize,
) -> Result<Option<(Instruction, usize)>, DecodeError> {
    let code = container.code();
    let Some(&op) = code.get(cursor) else {
        return Ok(None);
    };
    let opcode = op as u32;
    let mut next = cursor + OPCODE_SIZE;

    let operand = if table.has_immediate_operand(opcode) {
        if next + OPERAND_SIZE > code.len() {
            return Err(DecodeError::TruncatedInstruction {
                offset: cursor as u32,
                code_size: container.code_size(),
            });
        }
        let v = LittleEndian::read_u32(&code[next..next + OPERAND_SIZE]);
        next += OPERAND_SIZE;
        Some(v)
    } else {
        None
    };

    let inst = Instruction { offset: cursor as u32, opcode, operand };
    log::trace!("decoded {:?}", inst);
    Ok(Some((inst, next)))
}

/// Lazy, single-pass walk over a container's code region.
///
/// Yields instructions in order; stops after the end of the region or after the first
/// error, which is yielded once. Instructions produced before an error remain valid.
pub struct Instructions<'a> {
    container: ScriptContainer<'a>,
    table: &'a OpcodeTable,
    cursor: usize,
    done: bool,
}

impl<'a> Instructions<'a> {
    pub fn new(container: ScriptContainer<'a>, table: &'a OpcodeTable) -> Self {
        Self { container, table, cursor: 0, done: false }
    }

    /// Offset of the next byte to decode.
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl Iterator for Instructions<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match decode_one(&self.container, self.table, self.cursor) {
            Ok(Some((inst, next))) => {
                self.cursor = next;
                Some(Ok(inst))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Instructions<'_> {}

/// Parse `bytes` as a container and start decoding its code region.
///
/// Container errors are returned before any instruction is produced.
pub fn decode<'a>(bytes: &'a [u8], table: &'a OpcodeTable) -> Result<Instructions<'a>, ContainerError> {
    let container = ScriptContainer::parse(bytes)?;
    Ok(Instructions::new(container, table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::ContainerBuilder;
    use crate::opcode::{UserOpcode, RESERVED_COUNT};
    use pretty_assertions::assert_eq;

    fn decode_code(code: &[u8], table: &OpcodeTable) -> Vec<Result<Instruction, DecodeError>> {
        let bytes = ContainerBuilder::new().code(code).build();
        decode(&bytes, table).unwrap().collect()
    }

    #[test]
    fn single_end() {
        let bytes = ContainerBuilder::new().code(&[0x00]).build();
        let c = ScriptContainer::parse(&bytes).unwrap();
        let table = OpcodeTable::default();

        let (inst, next) = decode_one(&c, &table, 0).unwrap().unwrap();
        assert_eq!(inst, Instruction { offset: 0, opcode: 0, operand: None });
        assert_eq!(next, 1);
        assert_eq!(decode_one(&c, &table, next), Ok(None));
    }

    #[test]
    fn push_immediate() {
        let out = decode_code(&[0x05, 0x2a, 0x00, 0x00, 0x00], &OpcodeTable::default());
        assert_eq!(out, vec![Ok(Instruction { offset: 0, opcode: 5, operand: Some(42) })]);
    }

    #[test]
    fn push_missing_one_byte() {
        let out = decode_code(&[0x05, 0x01, 0x00, 0x00], &OpcodeTable::default());
        assert_eq!(out, vec![Err(DecodeError::TruncatedInstruction { offset: 0, code_size: 4 })]);
    }

    #[test]
    fn truncation_keeps_earlier_instructions() {
        let out = decode_code(&[0x04, 0x01, 0xff, 0xff], &OpcodeTable::default());
        assert_eq!(
            out,
            vec![
                Ok(Instruction { offset: 0, opcode: 4, operand: None }),
                Err(DecodeError::TruncatedInstruction { offset: 1, code_size: 4 }),
            ]
        );
    }

    #[test]
    fn user_opcode_width_follows_table() {
        let table = OpcodeTable::new(vec![UserOpcode::new("WAIT", 2), UserOpcode::new("MSG", -1)]);
        let wait = RESERVED_COUNT as u8;
        let msg = wait + 1;
        let out = decode_code(&[wait, msg, 0x10, 0x00, 0x00, 0x00, 0x00], &table);
        assert_eq!(
            out,
            vec![
                Ok(Instruction { offset: 0, opcode: wait as u32, operand: None }),
                Ok(Instruction { offset: 1, opcode: msg as u32, operand: Some(0x10) }),
                Ok(Instruction { offset: 6, opcode: 0, operand: None }),
            ]
        );
    }

    #[test]
    fn unknown_opcode_is_one_byte() {
        let out = decode_code(&[0xf0, 0x00], &OpcodeTable::default());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Ok(Instruction { offset: 0, opcode: 0xf0, operand: None }));
    }

    #[test]
    fn iterator_is_fused_after_error() {
        let bytes = ContainerBuilder::new().code(&[0x01, 0x00]).build();
        let table = OpcodeTable::default();
        let mut it = decode(&bytes, &table).unwrap();
        assert!(matches!(it.next(), Some(Err(_))));
        assert_eq!(it.next(), None);
        assert_eq!(it.next(), None);
        assert_eq!(it.cursor(), 0);
    }

    #[test]
    fn container_error_comes_first() {
        let table = OpcodeTable::default();
        assert!(matches!(decode(b"NOTESCR1", &table), Err(ContainerError::InvalidMagic)));
    }

    #[test]
    fn instruction_width() {
        let a = Instruction { offset: 3, opcode: 1, operand: Some(0) };
        let b = Instruction { offset: 8, opcode: 0, operand: None };
        assert_eq!((a.size(), a.end()), (5, 8));
        assert_eq!((b.size(), b.end()), (1, 9));
    }
}
