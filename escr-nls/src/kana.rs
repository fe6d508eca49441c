//! Half-width to full-width kana conversion over raw Shift-JIS bytes.
//!
//! Script text stores kana as single-byte half-width codes (0xA1..=0xDF in Shift-JIS).
//! The engine displays them as full-width hiragana, so the listing does the same.
//! The walk is byte-level and must skip over two-byte sequences: a trail byte can take
//! any value in the table's range and must never be remapped on its own.

/// Escape marker; the byte after it is emitted as-is.
pub const ESCAPE: u8 = 0x1b;

/// (half-width byte, full-width Shift-JIS pair)
pub const KANA_TABLE: [(u8, [u8; 2]); 64] = [
    // 0xA0 is the engine's full-width space, not a stray NBSP.
    (0xa0, [0x81, 0x40]), (0x21, [0x81, 0x49]), (0x3f, [0x81, 0x48]), (0xa5, [0x81, 0x63]),
    (0xa1, [0x81, 0x42]), (0xa2, [0x81, 0x75]), (0xa3, [0x81, 0x76]), (0xa4, [0x81, 0x41]),
    (0xa6, [0x82, 0xf0]), (0xa7, [0x82, 0x9f]), (0xa8, [0x82, 0xa1]), (0xa9, [0x82, 0xa3]),
    (0xaa, [0x82, 0xa5]), (0xab, [0x82, 0xa7]), (0xac, [0x82, 0xe1]), (0xad, [0x82, 0xe3]),
    (0xae, [0x82, 0xe5]), (0xaf, [0x82, 0xc1]), (0xb0, [0x81, 0x5b]), (0xb1, [0x82, 0xa0]),
    (0xb2, [0x82, 0xa2]), (0xb3, [0x82, 0xa4]), (0xb4, [0x82, 0xa6]), (0xb5, [0x82, 0xa8]),
    (0xb6, [0x82, 0xa9]), (0xb7, [0x82, 0xab]), (0xb8, [0x82, 0xad]), (0xb9, [0x82, 0xaf]),
    (0xba, [0x82, 0xb1]), (0xbb, [0x82, 0xb3]), (0xbc, [0x82, 0xb5]), (0xbd, [0x82, 0xb7]),
    (0xbe, [0x82, 0xb9]), (0xbf, [0x82, 0xbb]), (0xc0, [0x82, 0xbd]), (0xc1, [0x82, 0xbf]),
    (0xc2, [0x82, 0xc2]), (0xc3, [0x82, 0xc4]), (0xc4, [0x82, 0xc6]), (0xc5, [0x82, 0xc8]),
    (0xc6, [0x82, 0xc9]), (0xc7, [0x82, 0xca]), (0xc8, [0x82, 0xcb]), (0xc9, [0x82, 0xcc]),
    (0xca, [0x82, 0xcd]), (0xcb, [0x82, 0xd0]), (0xcc, [0x82, 0xd3]), (0xcd, [0x82, 0xd6]),
    (0xce, [0x82, 0xd9]), (0xcf, [0x82, 0xdc]), (0xd0, [0x82, 0xdd]), (0xd1, [0x82, 0xde]),
    (0xd2, [0x82, 0xdf]), (0xd3, [0x82, 0xe0]), (0xd4, [0x82, 0xe2]), (0xd5, [0x82, 0xe4]),
    (0xd6, [0x82, 0xe6]), (0xd7, [0x82, 0xe7]), (0xd8, [0x82, 0xe8]), (0xd9, [0x82, 0xe9]),
    (0xda, [0x82, 0xea]), (0xdb, [0x82, 0xeb]), (0xdc, [0x82, 0xed]), (0xdd, [0x82, 0xf1]),
];

const LOOKUP: [Option<[u8; 2]>; 256] = build_lookup();

const fn build_lookup() -> [Option<[u8; 2]>; 256] {
    let mut lookup = [None; 256];
    let mut i = 0;
    while i < KANA_TABLE.len() {
        let (half, full) = KANA_TABLE[i];
        lookup[half as usize] = Some(full);
        i += 1;
    }
    lookup
}

/// Whether `b` starts a two-byte Shift-JIS sequence.
#[inline]
pub fn is_lead_byte(b: u8) -> bool {
    matches!(b, 0x81..=0x9f | 0xe0..=0xef)
}

/// Full-width replacement for a half-width byte, if the table has one.
#[inline]
pub fn fullwidth(b: u8) -> Option<[u8; 2]> {
    LOOKUP[b as usize]
}

/// Convert half-width kana in `input` to full-width.
///
/// Stops at the first NUL, which is not copied. A lead byte at the very end of the input
/// is copied alone, and a trailing escape marker emits nothing.
pub fn transcode(input: &[u8]) -> Vec<u8> {
    let end = input.iter().position(|&b| b == 0).unwrap_or(input.len());
    let input = &input[..end];

    let mut out = Vec::with_capacity(input.len() * 2 + 1);
    let mut i = 0;
    while i < input.len() {
        let b = input[i];
        if is_lead_byte(b) {
            let pair_end = (i + 2).min(input.len());
            out.extend_from_slice(&input[i..pair_end]);
            i = pair_end;
        } else if b == ESCAPE {
            if let Some(&escaped) = input.get(i + 1) {
                out.push(escaped);
            }
            i += 2;
        } else if let Some(full) = fullwidth(b) {
            out.extend_from_slice(&full);
            i += 1;
        } else {
            out.push(b);
            i += 1;
        }
    }
    out
}
