use byteorder::{ByteOrder, LittleEndian};

pub const MAGIC: &[u8; 8] = b"ESCR1_00";

const U32_SIZE: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("not an ESCR1_00 file")]
    InvalidMagic,

    #[error("truncated container: {section} needs 0x{needed:X} bytes at offset 0x{offset:X}, file_len=0x{len:X}")]
    TruncatedContainer {
        section: &'static str,
        offset: usize,
        needed: usize,
        len: usize,
    },
}

/// Typed views over a loaded `ESCR1_00` buffer.
///
/// Only the section sizes are validated here; index table entries are checked lazily by
/// [`crate::StringTable`].
#[derive(Clone, Copy, Debug)]
pub struct ScriptContainer<'a> {
    bytes: &'a [u8],
    index_table: &'a [u8],
    code: &'a [u8],
    data: &'a [u8],
}

/// Bounds-checked forward reader over the container header.
struct SectionReader<'a> {
    bytes: &'a [u8],
    off: usize,
}

impl<'a> SectionReader<'a> {
    fn take(&mut self, section: &'static str, needed: usize) -> Result<&'a [u8], ContainerError> {
        let end = self
            .off
            .checked_add(needed)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(ContainerError::TruncatedContainer {
                section,
                offset: self.off,
                needed,
                len: self.bytes.len(),
            })?;
        let slice = &self.bytes[self.off..end];
        self.off = end;
        Ok(slice)
    }

    fn read_u32(&mut self, section: &'static str) -> Result<u32, ContainerError> {
        Ok(LittleEndian::read_u32(self.take(section, U32_SIZE)?))
    }

    /// Read a u32 length prefix followed by `len * stride` bytes.
    fn read_section(&mut self, section: &'static str, stride: usize) -> Result<&'a [u8], ContainerError> {
        let len_off = self.off;
        let count = self.read_u32(section)? as usize;
        let needed = count.checked_mul(stride).ok_or(ContainerError::TruncatedContainer {
            section,
            offset: len_off,
            needed: usize::MAX,
            len: self.bytes.len(),
        })?;
        self.take(section, needed)
    }
}

impl<'a> ScriptContainer<'a> {
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ContainerError> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(ContainerError::InvalidMagic);
        }

        let mut rdr = SectionReader { bytes, off: MAGIC.len() };
        let index_table = rdr.read_section("index table", U32_SIZE)?;
        let code = rdr.read_section("code", 1)?;
        let data = rdr.read_section("data", 1)?;

        Ok(Self { bytes, index_table, code, data })
    }

    #[inline]
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    #[inline]
    pub fn index_count(&self) -> u32 {
        (self.index_table.len() / U32_SIZE) as u32
    }

    /// Offset into the data region for string id `id`.
    pub fn index_offset(&self, id: u32) -> Option<u32> {
        let start = (id as usize).checked_mul(U32_SIZE)?;
        let raw = self.index_table.get(start..start + U32_SIZE)?;
        Some(LittleEndian::read_u32(raw))
    }

    /// All index table entries in file order.
    pub fn index_table(&self) -> impl Iterator<Item = u32> + 'a {
        self.index_table.chunks_exact(U32_SIZE).map(LittleEndian::read_u32)
    }

    #[inline]
    pub fn code(&self) -> &'a [u8] {
        self.code
    }

    #[inline]
    pub fn code_size(&self) -> u32 {
        self.code.len() as u32
    }

    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    #[inline]
    pub fn data_size(&self) -> u32 {
        self.data.len() as u32
    }

    /// Bytes left over after the data region. Zero for a well-formed file.
    pub fn trailing_bytes(&self) -> usize {
        let used = MAGIC.len() + U32_SIZE * 3 + self.index_table.len() + self.code.len() + self.data.len();
        self.bytes.len() - used
    }
}
