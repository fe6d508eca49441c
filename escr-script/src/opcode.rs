//! Opcode space.
//!
//! Codes below [`RESERVED_COUNT`] are built into the VM. Everything above is registered
//! by the host game, so the decoder needs the game's table to know which of those carry
//! an immediate operand. An incomplete table makes the stream desynchronize silently;
//! [`OpcodeTable::is_known`] lets callers spot the symptoms.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, FromRepr, IntoStaticStr};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, FromRepr, IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ReservedOpcode {
    End = 0,
    Jump,
    JumpZ,
    Call,
    Ret,
    Push,
    Pop,
    Str,
    SetVar,
    GetVar,
    SetFlag,
    GetFlag,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Not,
    And,
    Or,
    Xor,
    Shr,
    Shl,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    LNot,
    LAnd,
    LOr,
    FileLine,
}

pub const RESERVED_COUNT: u32 = ReservedOpcode::COUNT as u32;

impl ReservedOpcode {
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    /// Whether a u32 follows the opcode byte in the stream.
    pub fn has_immediate(self) -> bool {
        matches!(
            self,
            ReservedOpcode::Jump
                | ReservedOpcode::JumpZ
                | ReservedOpcode::Call
                | ReservedOpcode::Push
                | ReservedOpcode::Str
                | ReservedOpcode::FileLine
        )
    }

    /// The operand is a code offset.
    pub fn is_branch(self) -> bool {
        matches!(self, ReservedOpcode::Jump | ReservedOpcode::JumpZ | ReservedOpcode::Call)
    }
}

impl TryFrom<u32> for ReservedOpcode {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        u8::try_from(v).ok().and_then(ReservedOpcode::from_repr).ok_or(())
    }
}

/// One entry of a game's user-opcode table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOpcode {
    pub name: String,
    /// Stack argument count. Negative means the opcode also carries an immediate u32.
    ///
    /// Older titles used this field for a plain parameter count; files built that way
    /// will not decode cleanly with this rule.
    #[serde(default)]
    pub params: i32,
}

impl UserOpcode {
    pub fn new(name: impl Into<String>, params: i32) -> Self {
        Self { name: name.into(), params }
    }

    #[inline]
    pub fn has_immediate(&self) -> bool {
        self.params < 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeKind<'t> {
    Reserved(ReservedOpcode),
    User(&'t UserOpcode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo<'t> {
    pub code: u32,
    pub kind: OpcodeKind<'t>,
}

impl<'t> OpcodeInfo<'t> {
    pub fn name(&self) -> &'t str {
        match self.kind {
            OpcodeKind::Reserved(op) => op.mnemonic(),
            OpcodeKind::User(user) => &user.name,
        }
    }

    pub fn has_immediate(&self) -> bool {
        match self.kind {
            OpcodeKind::Reserved(op) => op.has_immediate(),
            OpcodeKind::User(user) => user.has_immediate(),
        }
    }

    pub fn reserved(&self) -> Option<ReservedOpcode> {
        match self.kind {
            OpcodeKind::Reserved(op) => Some(op),
            OpcodeKind::User(_) => None,
        }
    }
}

/// Reserved opcodes plus one game's user opcodes; entry `i` is code `RESERVED_COUNT + i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OpcodeTable {
    user: Vec<UserOpcode>,
}

impl OpcodeTable {
    pub fn new(user: Vec<UserOpcode>) -> Self {
        Self { user }
    }

    pub fn user_opcodes(&self) -> &[UserOpcode] {
        &self.user
    }

    /// Total number of described codes, reserved ones included.
    pub fn code_count(&self) -> u32 {
        RESERVED_COUNT + self.user.len() as u32
    }

    pub fn describe(&self, code: u32) -> Option<OpcodeInfo<'_>> {
        let kind = match ReservedOpcode::try_from(code) {
            Ok(op) => OpcodeKind::Reserved(op),
            Err(()) => {
                let idx = code.checked_sub(RESERVED_COUNT)? as usize;
                OpcodeKind::User(self.user.get(idx)?)
            }
        };
        Some(OpcodeInfo { code, kind })
    }

    #[inline]
    pub fn is_known(&self, code: u32) -> bool {
        code < self.code_count()
    }

    /// Whether `code` is followed by a u32 operand. Codes the table does not describe
    /// are treated as operand-less.
    pub fn has_immediate_operand(&self, code: u32) -> bool {
        self.describe(code).is_some_and(|info| info.has_immediate())
    }

    pub fn mnemonic(&self, code: u32) -> Cow<'_, str> {
        match self.describe(code) {
            Some(info) => Cow::Borrowed(info.name()),
            None => Cow::Owned(format!("OP_{code:02X}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn table() -> OpcodeTable {
        OpcodeTable::new(vec![
            UserOpcode::new("WAIT", 1),
            UserOpcode::new("PRINT", -1),
            UserOpcode::new("CLEAR", 0),
        ])
    }

    #[test]
    fn reserved_range() {
        assert_eq!(RESERVED_COUNT, 33);
        assert_eq!(ReservedOpcode::try_from(0u32), Ok(ReservedOpcode::End));
        assert_eq!(ReservedOpcode::try_from(5u32), Ok(ReservedOpcode::Push));
        assert_eq!(ReservedOpcode::try_from(32u32), Ok(ReservedOpcode::FileLine));
        assert_eq!(ReservedOpcode::try_from(33u32), Err(()));
        assert_eq!(ReservedOpcode::try_from(0x105u32), Err(()));
    }

    #[test]
    fn only_six_reserved_opcodes_carry_operands() {
        let with_operand: Vec<&str> = (0..RESERVED_COUNT)
            .filter(|&c| table().has_immediate_operand(c))
            .map(|c| ReservedOpcode::try_from(c).unwrap().mnemonic())
            .collect();
        assert_eq!(with_operand, vec!["JUMP", "JUMPZ", "CALL", "PUSH", "STR", "FILELINE"]);
    }

    #[test]
    fn user_operand_follows_param_sign() {
        let t = table();
        assert!(!t.has_immediate_operand(RESERVED_COUNT));
        assert!(t.has_immediate_operand(RESERVED_COUNT + 1));
        assert!(!t.has_immediate_operand(RESERVED_COUNT + 2));
        assert!(!t.has_immediate_operand(RESERVED_COUNT + 3));
    }

    #[test]
    fn unknown_codes() {
        let t = table();
        assert!(t.is_known(RESERVED_COUNT + 2));
        assert!(!t.is_known(RESERVED_COUNT + 3));
        assert_eq!(t.describe(0xff), None);
        assert_eq!(t.mnemonic(0xff), "OP_FF");
        assert_eq!(t.mnemonic(RESERVED_COUNT + 1), "PRINT");
        assert_eq!(t.mnemonic(7), "STR");
        assert_eq!(t.mnemonic(2), "JUMPZ");
    }

    #[test]
    fn describe_user_opcode() {
        let t = table();
        let info = t.describe(RESERVED_COUNT + 1).unwrap();
        assert_eq!(info.name(), "PRINT");
        assert_eq!(info.reserved(), None);
        assert!(info.has_immediate());
    }
}
