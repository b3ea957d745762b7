//! Variable-width LZW as used by GIF image data
use crate::error::{Error, Result};

/// Code space of a GIF LZW stream
const MAX_CODES: usize = 4096;
/// Widest code GIF allows
const MAX_CODE_WIDTH: u8 = 12;
/// Longest data sub-block
const MAX_BLOCK_LEN: usize = 0xFF;
/// Marks an empty link in the code table
const NO_CODE: u16 = 0;

/// Smallest LZW minimum code size able to hold `palette_len` indices.
/// GIF never goes below 2.
pub fn minimum_code_size(palette_len: usize) -> u8 {
    let mut size = 2;
    while (1usize << size) < palette_len && size < 8 {
        size += 1;
    }
    size
}

/// Compresses palette indices into GIF sub-blocks, including the
/// zero-length block terminator.
pub fn compress(indices: &[u8], min_code_size: u8) -> Result<Vec<u8>> {
    let mut encoder = LzwEncoder::new(min_code_size);
    encoder.encode(indices)?;
    Ok(encoder.finish())
}

/// Prefix tree of the current code table.
///
/// Codes below `clear` are the single-index roots; every later code hangs
/// below its prefix in a first-child / next-sibling list. Lookups walk the
/// list in insertion order.
struct CodeTable {
    first_child: Vec<u16>,
    next_sibling: Vec<u16>,
    suffix: Vec<u8>,
}

impl CodeTable {
    fn new() -> CodeTable {
        CodeTable {
            first_child: vec![NO_CODE; MAX_CODES],
            next_sibling: vec![NO_CODE; MAX_CODES],
            suffix: vec![0; MAX_CODES],
        }
    }

    fn reset(&mut self) {
        self.first_child.fill(NO_CODE);
    }

    fn find(&self, prefix: u16, k: u8) -> Option<u16> {
        let mut code = self.first_child[prefix as usize];
        while code != NO_CODE {
            if self.suffix[code as usize] == k {
                return Some(code);
            }
            code = self.next_sibling[code as usize];
        }
        None
    }

    fn insert(&mut self, prefix: u16, k: u8, code: u16) {
        self.suffix[code as usize] = k;
        self.next_sibling[code as usize] = self.first_child[prefix as usize];
        self.first_child[prefix as usize] = code;
    }
}

/// Packs codes LSB first into length-prefixed sub-blocks
struct SubBlockWriter {
    out: Vec<u8>,
    block: Vec<u8>,
    acc: u32,
    bits: u8,
}

impl SubBlockWriter {
    fn new() -> SubBlockWriter {
        SubBlockWriter {
            out: Vec::new(),
            block: Vec::with_capacity(MAX_BLOCK_LEN),
            acc: 0,
            bits: 0,
        }
    }

    fn write_code(&mut self, code: u16, width: u8) {
        self.acc |= u32::from(code) << self.bits;
        self.bits += width;
        while self.bits >= 8 {
            self.push_byte(self.acc as u8);
            self.acc >>= 8;
            self.bits -= 8;
        }
    }

    fn push_byte(&mut self, byte: u8) {
        self.block.push(byte);
        if self.block.len() == MAX_BLOCK_LEN {
            self.flush_block();
        }
    }

    fn flush_block(&mut self) {
        if !self.block.is_empty() {
            self.out.push(self.block.len() as u8);
            self.out.append(&mut self.block);
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.bits > 0 {
            self.push_byte(self.acc as u8);
        }
        self.flush_block();
        self.out.push(0);
        self.out
    }
}

/// LZW encoder state for one image
pub struct LzwEncoder {
    min_code_size: u8,
    clear_code: u16,
    end_code: u16,
    next_code: u16,
    width: u8,
    table: CodeTable,
    writer: SubBlockWriter,
}

impl LzwEncoder {
    /// `min_code_size` is clamped to the 2..=8 range GIF allows.
    pub fn new(min_code_size: u8) -> LzwEncoder {
        let min_code_size = min_code_size.clamp(2, 8);
        let clear_code = 1 << min_code_size;
        LzwEncoder {
            min_code_size,
            clear_code,
            end_code: clear_code + 1,
            next_code: clear_code + 2,
            width: min_code_size + 1,
            table: CodeTable::new(),
            writer: SubBlockWriter::new(),
        }
    }

    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    fn emit(&mut self, code: u16) {
        self.writer.write_code(code, self.width);
    }

    fn clear(&mut self) {
        self.emit(self.clear_code);
        self.table.reset();
        self.next_code = self.end_code + 1;
        self.width = self.min_code_size + 1;
    }

    fn check(&self, index: u8) -> Result<()> {
        if u16::from(index) >= self.clear_code {
            return Err(Error::IndexOutOfRange {
                index,
                code_size: self.min_code_size,
            });
        }
        Ok(())
    }

    /// Encodes a complete index stream, framed by Clear and End codes.
    pub fn encode(&mut self, indices: &[u8]) -> Result<()> {
        self.clear();
        let Some((&first, rest)) = indices.split_first() else {
            self.emit(self.end_code);
            return Ok(());
        };
        self.check(first)?;
        let mut prefix = u16::from(first);
        for &k in rest {
            self.check(k)?;
            if let Some(code) = self.table.find(prefix, k) {
                prefix = code;
                continue;
            }
            self.emit(prefix);
            if self.next_code as usize == MAX_CODES - 1 {
                self.clear();
            } else {
                if self.next_code >= 1 << self.width {
                    self.width += 1;
                }
                self.table.insert(prefix, k, self.next_code);
                self.next_code += 1;
            }
            prefix = u16::from(k);
        }
        self.emit(prefix);
        // the decoder adds one more entry after reading the last code and
        // widens before it reads End
        if self.next_code >= 1 << self.width && self.width < MAX_CODE_WIDTH {
            self.width += 1;
        }
        self.emit(self.end_code);
        Ok(())
    }

    /// Flushes pending bits and returns the framed data
    pub fn finish(self) -> Vec<u8> {
        self.writer.finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// Splits framed data back into the raw code stream
    fn unframe(data: &[u8]) -> Vec<u8> {
        let mut raw = Vec::new();
        let mut rest = data;
        loop {
            let len = rest[0] as usize;
            if len == 0 {
                assert_eq!(rest.len(), 1, "data after terminator");
                return raw;
            }
            raw.extend_from_slice(&rest[1..=len]);
            rest = &rest[len + 1..];
        }
    }

    /// Reference decoder for the code stream
    fn expand(data: &[u8], min_code_size: u8) -> Vec<u8> {
        let raw = unframe(data);
        let clear = 1u16 << min_code_size;
        let end = clear + 1;
        let mut width = min_code_size + 1;
        let mut table: Vec<Vec<u8>> = Vec::new();
        let reset = |table: &mut Vec<Vec<u8>>| {
            table.clear();
            table.extend((0..clear + 2).map(|c| vec![c as u8]));
        };
        reset(&mut table);
        let mut out = Vec::new();
        let mut prev: Option<u16> = None;
        let (mut acc, mut bits, mut pos) = (0u32, 0u8, 0usize);
        loop {
            while bits < width {
                acc |= u32::from(raw[pos]) << bits;
                pos += 1;
                bits += 8;
            }
            let code = (acc & ((1 << width) - 1)) as u16;
            acc >>= width;
            bits -= width;
            if code == clear {
                reset(&mut table);
                width = min_code_size + 1;
                prev = None;
                continue;
            }
            if code == end {
                return out;
            }
            let entry = match prev {
                None => table[code as usize].clone(),
                Some(p) => {
                    let entry = if (code as usize) < table.len() {
                        table[code as usize].clone()
                    } else {
                        let mut e = table[p as usize].clone();
                        e.push(e[0]);
                        e
                    };
                    let mut added = table[p as usize].clone();
                    added.push(entry[0]);
                    table.push(added);
                    if table.len() == 1 << width && width < MAX_CODE_WIDTH {
                        width += 1;
                    }
                    entry
                }
            };
            out.extend_from_slice(&entry);
            prev = Some(code);
        }
    }

    #[test]
    fn code_sizes() {
        assert_eq!(minimum_code_size(1), 2);
        assert_eq!(minimum_code_size(4), 2);
        assert_eq!(minimum_code_size(5), 3);
        assert_eq!(minimum_code_size(128), 7);
        assert_eq!(minimum_code_size(256), 8);
    }

    #[test]
    fn empty_stream_is_clear_then_end() {
        let data = compress(&[], 2).unwrap();
        // clear (4) and end (5) at 3 bits: 0b101_100
        assert_eq!(data, [1, 0b0010_1100, 0]);
        assert!(expand(&data, 2).is_empty());
    }

    #[test]
    fn short_stream() {
        let indices = [1, 1, 1, 1, 2, 0, 3];
        let data = compress(&indices, 2).unwrap();
        assert_eq!(expand(&data, 2), indices);
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert!(matches!(
            compress(&[0, 4], 2),
            Err(Error::IndexOutOfRange { index: 4, code_size: 2 })
        ));
    }

    #[test]
    fn fills_and_resets_the_table() {
        // pseudo random indices force many distinct strings
        let mut state = 0x1234_5678u32;
        let indices: Vec<u8> = (0..60_000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        let data = compress(&indices, 8).unwrap();
        assert_eq!(expand(&data, 8), indices);
    }

    #[test]
    fn widening_right_before_end() {
        // every length from a few codes up to several width changes
        for len in 0..600 {
            let indices: Vec<u8> = (0..len).map(|i| ((i * 7) % 5) as u8).collect();
            let data = compress(&indices, 3).unwrap();
            assert_eq!(expand(&data, 3), indices, "length {}", len);
        }
    }

    #[test]
    fn sub_blocks_are_bounded() {
        let indices: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        let data = compress(&indices, 8).unwrap();
        let mut rest = &data[..];
        while rest[0] != 0 {
            let len = rest[0] as usize;
            assert!(len <= MAX_BLOCK_LEN);
            rest = &rest[len + 1..];
        }
        assert_eq!(expand(&data, 8), indices);
    }

    #[test]
    fn deterministic() {
        let indices: Vec<u8> = (0..5000u32).map(|i| (i * i % 17) as u8).collect();
        assert_eq!(compress(&indices, 5).unwrap(), compress(&indices, 5).unwrap());
    }
}
