use std::io::Write;

use anyhow::Result;
use escr_nls::{Decoder, Encoding, TextDecoder};
use escr_script::{
    DecodeError, Instruction, Instructions, OpcodeTable, ReservedOpcode, ScriptContainer, StringTable,
};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Yaml,
}

/// Presentation toggles for one run.
#[derive(Debug, Clone, Default)]
pub struct ListingOptions {
    /// Print the text of `STR` operands next to the instruction.
    pub show_strings: bool,
    /// Convert half-width kana to full-width before decoding strings.
    pub kana: bool,
    pub nls: Encoding,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingEntry {
    pub address: u32,
    pub opcode: u32,
    pub mnemonic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operand: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StringEntry {
    pub id: u32,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
    /// Set when decoding stopped early; `entries` holds everything before the cut.
    pub truncated: Option<DecodeError>,
    /// Desync symptoms seen while decoding.
    pub warnings: usize,
}

pub struct Disassembler<'a> {
    container: ScriptContainer<'a>,
    table: &'a OpcodeTable,
    strings: StringTable<'a>,
    options: ListingOptions,
    decoder: Decoder,
}

impl<'a> Disassembler<'a> {
    pub fn new(bytes: &'a [u8], table: &'a OpcodeTable, options: ListingOptions) -> Result<Self> {
        let container = ScriptContainer::parse(bytes)?;
        if container.trailing_bytes() != 0 {
            log::warn!(
                "{} bytes after the data region (file_len=0x{:X})",
                container.trailing_bytes(),
                bytes.len()
            );
        }
        log::info!(
            "strings={} code_size=0x{:X} data_size=0x{:X}",
            container.index_count(),
            container.code_size(),
            container.data_size()
        );

        Ok(Self {
            container,
            table,
            strings: StringTable::new(container),
            decoder: Decoder::new(options.nls),
            options,
        })
    }

    pub fn disassemble(&self) -> Result<Listing> {
        let mut listing = Listing::default();
        for inst in Instructions::new(self.container, self.table) {
            let inst = match inst {
                Ok(inst) => inst,
                Err(e) => {
                    listing.truncated = Some(e);
                    break;
                }
            };
            if !self.check(&inst) {
                listing.warnings += 1;
            }
            listing.entries.push(self.entry(&inst)?);
        }
        Ok(listing)
    }

    pub fn dump_strings(&self) -> Result<Vec<StringEntry>> {
        (0..self.strings.len())
            .map(|id| Ok(StringEntry { id, text: self.string_text(id)? }))
            .collect()
    }

    fn entry(&self, inst: &Instruction) -> Result<ListingEntry> {
        let is_str = inst.opcode == ReservedOpcode::Str as u32;
        let text = match inst.operand {
            Some(id) if is_str && self.options.show_strings => Some(self.string_text(id)?),
            _ => None,
        };
        Ok(ListingEntry {
            address: inst.offset,
            opcode: inst.opcode,
            mnemonic: self.table.mnemonic(inst.opcode).into_owned(),
            operand: inst.operand,
            text,
        })
    }

    /// Resolve a string id into display text. Absent strings become the sentinel; a
    /// broken index entry is a container error and aborts.
    fn string_text(&self, id: u32) -> Result<String> {
        let raw = self.strings.resolve_or_sentinel(id)?;
        let text = if self.options.kana {
            let converted = escr_nls::transcode(raw);
            self.decoder.decode(&converted).into_owned()
        } else {
            self.decoder.decode(raw).into_owned()
        };
        Ok(text)
    }

    /// Log desync symptoms. Returns false if anything looked wrong.
    fn check(&self, inst: &Instruction) -> bool {
        let Some(info) = self.table.describe(inst.opcode) else {
            log::warn!(
                "unknown opcode 0x{:02X} at 0x{:08X}; the opcode table may not match this script",
                inst.opcode,
                inst.offset
            );
            return false;
        };
        match (info.reserved(), inst.operand) {
            (Some(op), Some(target)) if op.is_branch() && target >= self.container.code_size() => {
                log::warn!(
                    "{} at 0x{:08X} targets 0x{:08X}, past code_size=0x{:X}",
                    op.mnemonic(),
                    inst.offset,
                    target,
                    self.container.code_size()
                );
                false
            }
            _ => true,
        }
    }
}

fn is_branch(opcode: u32) -> bool {
    ReservedOpcode::try_from(opcode).is_ok_and(ReservedOpcode::is_branch)
}

pub fn write_text(w: &mut impl Write, entries: &[ListingEntry]) -> Result<()> {
    for e in entries {
        let mut line = format!("{:08X}  {:<12}", e.address, e.mnemonic);
        match e.operand {
            Some(v) if is_branch(e.opcode) => line += &format!(" 0x{:08X}", v),
            Some(v) => line += &format!(" {}", v),
            None => {}
        }
        if let Some(text) = &e.text {
            line += &format!("  ; {:?}", text);
        }
        writeln!(w, "{}", line.trim_end())?;
    }
    Ok(())
}

pub fn write_yaml(w: &mut impl Write, entries: &[ListingEntry]) -> Result<()> {
    serde_yaml::to_writer(w, entries)?;
    Ok(())
}

pub fn write_strings(w: &mut impl Write, strings: &[StringEntry]) -> Result<()> {
    for s in strings {
        writeln!(w, "{:>6}  {:?}", s.id, s.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use escr_script::{ContainerBuilder, UserOpcode, RESERVED_COUNT};
    use pretty_assertions::assert_eq;

    fn options(show_strings: bool, kana: bool) -> ListingOptions {
        ListingOptions { show_strings, kana, nls: Encoding::ShiftJis }
    }

    fn script() -> Vec<u8> {
        ContainerBuilder::new()
            .string(b"Hi!")
            .string(b"")
            .string(b"\xb1\xb2")
            .op_imm(ReservedOpcode::Str as u8, 0)
            .op_imm(ReservedOpcode::Str as u8, 1)
            .op_imm(ReservedOpcode::Str as u8, 2)
            .op_imm(RESERVED_COUNT as u8, 9)
            .op_imm(ReservedOpcode::Call as u8, 0)
            .op(ReservedOpcode::End as u8)
            .build()
    }

    fn table() -> OpcodeTable {
        OpcodeTable::new(vec![UserOpcode::new("MES", -1)])
    }

    #[test]
    fn text_listing_with_strings() -> Result<()> {
        let bytes = script();
        let table = table();
        let d = Disassembler::new(&bytes, &table, options(true, false))?;
        let listing = d.disassemble()?;
        assert_eq!(listing.truncated, None);
        assert_eq!(listing.warnings, 0);

        let mut out = Vec::new();
        write_text(&mut out, &listing.entries)?;
        let out = String::from_utf8(out)?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "00000000  STR          0  ; \"Hi!\"",
                "00000005  STR          1  ; \"STRING_DATA_NOT_FOUND\"",
                "0000000A  STR          2  ; \"ｱｲ\"",
                "0000000F  MES          9",
                "00000014  CALL         0x00000000",
                "00000019  END",
            ]
        );
        Ok(())
    }

    #[test]
    fn kana_conversion_is_opt_in() -> Result<()> {
        let bytes = script();
        let table = table();
        let d = Disassembler::new(&bytes, &table, options(true, true))?;
        let listing = d.disassemble()?;
        assert_eq!(listing.entries[0].text.as_deref(), Some("Hi！"));
        assert_eq!(listing.entries[2].text.as_deref(), Some("あい"));
        Ok(())
    }

    #[test]
    fn strings_hidden_by_default() -> Result<()> {
        let bytes = script();
        let table = table();
        let listing = Disassembler::new(&bytes, &table, ListingOptions::default())?.disassemble()?;
        assert!(listing.entries.iter().all(|e| e.text.is_none()));
        Ok(())
    }

    #[test]
    fn desync_symptoms_are_counted() -> Result<()> {
        let bytes = ContainerBuilder::new()
            .op_imm(ReservedOpcode::Jump as u8, 0x1000)
            .op(0xee)
            .op(ReservedOpcode::End as u8)
            .build();
        let table = OpcodeTable::default();
        let listing = Disassembler::new(&bytes, &table, ListingOptions::default())?.disassemble()?;
        assert_eq!(listing.entries.len(), 3);
        assert_eq!(listing.warnings, 2);
        assert_eq!(listing.entries[1].mnemonic, "OP_EE");
        Ok(())
    }

    #[test]
    fn truncation_keeps_partial_listing() -> Result<()> {
        let bytes = ContainerBuilder::new().op(ReservedOpcode::Ret as u8).code(&[0x05, 0x00]).build();
        let table = OpcodeTable::default();
        let listing = Disassembler::new(&bytes, &table, ListingOptions::default())?.disassemble()?;
        assert_eq!(listing.entries.len(), 1);
        assert_eq!(listing.truncated, Some(DecodeError::TruncatedInstruction { offset: 1, code_size: 3 }));
        Ok(())
    }

    #[test]
    fn broken_string_offset_aborts() -> Result<()> {
        let bytes = ContainerBuilder::new()
            .raw_index(0x40)
            .op_imm(ReservedOpcode::Str as u8, 0)
            .build();
        let table = OpcodeTable::default();
        let d = Disassembler::new(&bytes, &table, options(true, false))?;
        assert!(d.disassemble().is_err());
        Ok(())
    }

    #[test]
    fn yaml_listing() -> Result<()> {
        let entries = vec![ListingEntry {
            address: 0,
            opcode: 5,
            mnemonic: "PUSH".to_string(),
            operand: Some(42),
            text: None,
        }];
        let mut out = Vec::new();
        write_yaml(&mut out, &entries)?;
        assert_eq!(String::from_utf8(out)?, "- address: 0\n  opcode: 5\n  mnemonic: PUSH\n  operand: 42\n");
        Ok(())
    }

    #[test]
    fn string_dump() -> Result<()> {
        let bytes = script();
        let table = table();
        let d = Disassembler::new(&bytes, &table, ListingOptions::default())?;
        let strings = d.dump_strings()?;
        assert_eq!(strings.len(), 3);
        assert_eq!(strings[1], StringEntry { id: 1, text: "STRING_DATA_NOT_FOUND".to_string() });
        Ok(())
    }
}
