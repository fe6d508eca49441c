//! Text helpers for ESCR1 string data.
//!
//! String literals in script containers are legacy multi-byte text (usually Shift-JIS).
//! [`kana`] rewrites half-width kana into full-width form at the byte level, and
//! [`Decoder`] turns the raw bytes into UTF-8 for display.

pub mod kana;

use anyhow::{anyhow, Result};
use encoding_rs::{Encoding as RsEncoding, GBK, SHIFT_JIS, UTF_8};
use std::borrow::Cow;
use std::str::FromStr;

pub use kana::transcode;

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;

    /// Decode C-style string: stop at the first NUL (0x00).
    fn decode_cstr<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        self.decode(&bytes[..end])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    ShiftJis,
    Gbk,
    Utf8,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GBK,
            Encoding::Utf8 => UTF_8,
        }
    }
}

impl FromStr for Encoding {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sjis" | "shift_jis" | "shift-jis" => Ok(Encoding::ShiftJis),
            "gbk" => Ok(Encoding::Gbk),
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            _ => Err(anyhow!("unknown NLS: {s}")),
        }
    }
}

/// A simple decoder bound to one encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.enc {
            Encoding::Utf8 => String::from_utf8_lossy(bytes),
            Encoding::ShiftJis | Encoding::Gbk => {
                let (cow, _, had_errors) = self.enc.as_encoding_rs().decode(bytes);
                if had_errors {
                    log::warn!("failed to decode string as {:?}", self.enc);
                }
                cow
            }
        }
    }
}
