use std::io;
use std::io::prelude::*;

use crate::error::{Error, Result};
use crate::quant::Palette;
use crate::traits::WriteBytesExt;
use crate::types::{Block, DisposalMethod, Extension, Repeat};

use super::EncodedFrame;

pub enum ExtensionData {
    Control { flags: u8, delay: u16, trns: u8 },
    Repetitions(Repeat),
}

impl ExtensionData {
    pub fn new_control_ext(
        delay: u16,
        dispose: DisposalMethod,
        needs_user_input: bool,
        trns: Option<u8>,
    ) -> ExtensionData {
        let mut flags = 0;
        let trns = match trns {
            Some(trns) => {
                flags |= 1;
                trns
            }
            None => 0,
        };
        flags |= (needs_user_input as u8) << 1;
        flags |= (dispose as u8) << 2;
        ExtensionData::Control { flags, delay, trns }
    }
}

/// Block level GIF writer.
///
/// Blocks go out in the order the methods are called; the header and
/// logical screen descriptor are written before the first block.
pub struct Encoder<W: Write> {
    w: W,
    header_written: bool,
    global_palette: bool,
    width: u16,
    height: u16,
}

impl<W: Write> Encoder<W> {
    pub fn new(w: W, width: u16, height: u16) -> Self {
        Encoder {
            w,
            header_written: false,
            global_palette: false,
            width,
            height,
        }
    }

    /// Writes the header with the global color table. Must come before any
    /// other block.
    pub fn write_global_palette(&mut self, palette: &Palette) -> io::Result<()> {
        if self.header_written {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "the global color table must directly follow the screen descriptor",
            ));
        }
        let size = flag_size(palette.len());
        self.write_screen_desc(0b1000_0000 | (size << 4) | size)?;
        self.global_palette = true;
        self.write_color_table(&palette.to_rgb_bytes(), size)
    }

    /// Writes a complete frame to the image
    ///
    /// Note: This function also writes the frame's graphic control extension.
    pub fn write_frame(&mut self, frame: &EncodedFrame) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::DimensionMismatch {
                expected: (self.width, self.height),
                found: frame.dimensions(),
            });
        }
        if !self.global_palette {
            return Err(Error::Stream(io::Error::new(
                io::ErrorKind::InvalidInput,
                "The GIF format requires a color palette but none was given.",
            )));
        }
        self.write_extension(ExtensionData::new_control_ext(
            frame.delay,
            frame.dispose,
            false,
            None,
        ))?;
        self.w.write_le(Block::Image as u8)?;
        self.w.write_le(0u16)?; // left
        self.w.write_le(0u16)?; // top
        self.w.write_le(frame.width)?;
        self.w.write_le(frame.height)?;
        // no local table, not interlaced
        self.w.write_le(0u8)?;
        self.w.write_le(frame.min_code_size())?;
        self.w.write_all(frame.data())?;
        Ok(())
    }

    fn write_color_table(&mut self, table: &[u8], size: u8) -> io::Result<()> {
        let num_colors = table.len() / 3;
        self.w.write_all(&table[..num_colors * 3])?;
        // pad to the size declared in the flags
        for _ in num_colors..(2 << size) {
            self.w.write_all(&[0, 0, 0])?;
        }
        Ok(())
    }

    /// Writes an extension to the image
    pub fn write_extension(&mut self, extension: ExtensionData) -> io::Result<()> {
        use self::ExtensionData::*;
        // `Finite(0)` means play once, which needs no extension at all
        if let Repetitions(repeat) = extension {
            if repeat.loop_count().is_none() {
                return Ok(());
            }
        }
        self.write_screen_desc(0)?;
        self.w.write_le(Block::Extension as u8)?;
        match extension {
            Control { flags, delay, trns } => {
                self.w.write_le(Extension::Control as u8)?;
                self.w.write_le(4u8)?;
                self.w.write_le(flags)?;
                self.w.write_le(delay)?;
                self.w.write_le(trns)?;
            }
            Repetitions(repeat) => {
                self.w.write_le(Extension::Application as u8)?;
                self.w.write_le(11u8)?;
                self.w.write_all(b"NETSCAPE2.0")?;
                self.w.write_le(3u8)?;
                self.w.write_le(1u8)?;
                self.w.write_le(repeat.loop_count().unwrap_or(0))?;
            }
        }
        self.w.write_le(0u8)
    }

    /// Writes a raw extension, splitting `data` into sub-blocks
    pub fn write_raw_extension(&mut self, func: u8, data: &[u8]) -> io::Result<()> {
        self.write_screen_desc(0)?;
        self.w.write_le(Block::Extension as u8)?;
        self.w.write_le(func)?;
        for chunk in data.chunks(0xFF) {
            self.w.write_le(chunk.len() as u8)?;
            self.w.write_all(chunk)?;
        }
        self.w.write_le(0u8)
    }

    /// Writes the header and logical screen descriptor once
    fn write_screen_desc(&mut self, flags: u8) -> io::Result<()> {
        if !self.header_written {
            self.w.write_all(b"GIF89a")?;
            self.w.write_le(self.width)?;
            self.w.write_le(self.height)?;
            self.w.write_le(flags)?; // packed field
            self.w.write_le(0u8)?; // bg index
            self.w.write_le(0u8)?; // aspect ratio
            self.header_written = true;
        }
        Ok(())
    }

    /// Writes the trailer and hands back the writer
    pub fn finish(mut self) -> io::Result<W> {
        self.write_screen_desc(0)?;
        self.w.write_le(Block::Trailer as u8)?;
        self.w.flush()?;
        Ok(self.w)
    }
}

/// Color table size converted to flag bits
pub fn flag_size(size: usize) -> u8 {
    (0..7).find(|&bits| (2usize << bits) >= size).unwrap_or(7)
}
