//! String literal lookup.
//!
//! String id `n` is entry `n` of the index table, which holds an offset into the data
//! region. The literal runs from there up to the next NUL.

use crate::format::ScriptContainer;

/// Substituted for strings that are missing or stored empty.
pub const STRING_NOT_FOUND_SENTINEL: &[u8] = b"STRING_DATA_NOT_FOUND";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StringLookupError {
    #[error("string id {id} not found in index table")]
    NotFound { id: u32 },

    /// An empty stored string means "absent", same as `NotFound`.
    #[error("string id {id} is empty")]
    Empty { id: u32 },

    #[error("string id {id} points at data offset 0x{offset:X}, past data_size=0x{data_size:X}")]
    OffsetOutOfRange { id: u32, offset: u32, data_size: u32 },
}

impl StringLookupError {
    /// The lookup failed because the string is absent, not because the container is broken.
    pub fn is_absent(&self) -> bool {
        matches!(self, StringLookupError::NotFound { .. } | StringLookupError::Empty { .. })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct StringTable<'a> {
    container: ScriptContainer<'a>,
}

impl<'a> StringTable<'a> {
    pub fn new(container: ScriptContainer<'a>) -> Self {
        Self { container }
    }

    pub fn len(&self) -> u32 {
        self.container.index_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Raw bytes of string `id`, without the terminator.
    ///
    /// A string missing its terminator runs to the end of the data region.
    pub fn resolve(&self, id: u32) -> Result<&'a [u8], StringLookupError> {
        let offset = self.container.index_offset(id).ok_or(StringLookupError::NotFound { id })?;
        let data = self.container.data();
        let tail = data.get(offset as usize..).filter(|t| !t.is_empty()).ok_or(
            StringLookupError::OffsetOutOfRange { id, offset, data_size: self.container.data_size() },
        )?;

        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        if end == 0 {
            return Err(StringLookupError::Empty { id });
        }
        Ok(&tail[..end])
    }

    /// Like [`StringTable::resolve`], but absent strings come back as
    /// [`STRING_NOT_FOUND_SENTINEL`] after a warning. Broken offsets still fail.
    pub fn resolve_or_sentinel(&self, id: u32) -> Result<&'a [u8], StringLookupError> {
        match self.resolve(id) {
            Ok(s) => Ok(s),
            Err(e) if e.is_absent() => {
                log::warn!("{e}");
                Ok(STRING_NOT_FOUND_SENTINEL)
            }
            Err(e) => Err(e),
        }
    }

    /// Every string id with its lookup result, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, Result<&'a [u8], StringLookupError>)> + 'a {
        let table = *self;
        (0..table.len()).map(move |id| (id, table.resolve(id)))
    }
}
