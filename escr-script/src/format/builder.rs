use super::MAGIC;

/// Assembles an `ESCR1_00` image from bytecode and string literals.
///
/// Strings are laid out back to back in the data region in the order they are added,
/// each followed by a NUL; string id `n` is the `n`th call to [`ContainerBuilder::string`].
#[derive(Clone, Debug, Default)]
pub struct ContainerBuilder {
    offsets: Vec<u32>,
    code: Vec<u8>,
    data: Vec<u8>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string literal under the next free string id.
    pub fn string(mut self, s: &[u8]) -> Self {
        self.offsets.push(self.data.len() as u32);
        self.data.extend_from_slice(s);
        self.data.push(0);
        self
    }

    /// Add an index entry pointing at an arbitrary data offset.
    pub fn raw_index(mut self, offset: u32) -> Self {
        self.offsets.push(offset);
        self
    }

    /// Append raw bytes to the data region without touching the index table.
    pub fn raw_data(mut self, bytes: &[u8]) -> Self {
        self.data.extend_from_slice(bytes);
        self
    }

    pub fn code(mut self, bytes: &[u8]) -> Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Append an opcode with no immediate operand.
    pub fn op(mut self, opcode: u8) -> Self {
        self.code.push(opcode);
        self
    }

    /// Append an opcode followed by a little-endian u32 operand.
    pub fn op_imm(mut self, opcode: u8, operand: u32) -> Self {
        self.code.push(opcode);
        self.code.extend_from_slice(&operand.to_le_bytes());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            MAGIC.len() + 12 + self.offsets.len() * 4 + self.code.len() + self.data.len(),
        );
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&(self.offsets.len() as u32).to_le_bytes());
        for off in &self.offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        out.extend_from_slice(&(self.code.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.code);
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }
}
