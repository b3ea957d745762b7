//! LZW compression and GIF container assembly
use tracing::debug;

use crate::error::Result;
use crate::quant::{IndexedFrame, Palette};
use crate::types::{DisposalMethod, Repeat};

mod encoder;
pub mod lzw;

pub use self::encoder::{flag_size, Encoder, ExtensionData};

/// A compressed frame ready to be muxed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub width: u16,
    pub height: u16,
    /// Display time in hundredths of a second
    pub delay: u16,
    pub dispose: DisposalMethod,
    min_code_size: u8,
    data: Vec<u8>,
}

impl EncodedFrame {
    /// LZW-compresses `frame` for a table of `palette_len` colors.
    ///
    /// Frames cover the whole canvas, so they are drawn in place
    /// (`DisposalMethod::Keep`).
    pub fn compress(frame: &IndexedFrame, palette_len: usize, delay: u16) -> Result<EncodedFrame> {
        let min_code_size = lzw::minimum_code_size(palette_len);
        let data = lzw::compress(frame.indices(), min_code_size)?;
        Ok(EncodedFrame {
            width: frame.width(),
            height: frame.height(),
            delay,
            dispose: DisposalMethod::Keep,
            min_code_size,
            data,
        })
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }

    /// Sub-block framed LZW data, terminator included
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Assembles a complete GIF in memory.
///
/// Every frame must match the canvas; nothing is returned unless the whole
/// stream could be built.
pub fn mux<'a, I>(frames: I, palette: &Palette, width: u16, height: u16, repeat: Repeat) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a EncodedFrame>,
{
    let mut encoder = Encoder::new(Vec::new(), width, height);
    encoder.write_global_palette(palette)?;
    encoder.write_extension(ExtensionData::Repetitions(repeat))?;
    let mut count = 0;
    for frame in frames {
        encoder.write_frame(frame)?;
        count += 1;
    }
    let out = encoder.finish()?;
    debug!("muxed {} frames into {} bytes", count, out.len());
    Ok(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::Error;
    use crate::quant::{quantize, Quantizer, MAX_COLORS};
    use crate::raster::RasterImage;

    fn encoded(size: u16, color: [u8; 3]) -> (EncodedFrame, Palette) {
        let image = RasterImage::solid(size, size, color).unwrap();
        let palette = Quantizer::MedianCut.build_palette(&[&image], MAX_COLORS);
        let frame = EncodedFrame::compress(&quantize(&image, &palette), palette.len(), 14).unwrap();
        (frame, palette)
    }

    #[test]
    fn layout() {
        let (frame, palette) = encoded(2, [255, 0, 0]);
        let gif = mux([&frame], &palette, 2, 2, Repeat::Infinite).unwrap();
        assert_eq!(&gif[..6], b"GIF89a");
        // 2x2 canvas, global table of 2 entries, color resolution 1 bit
        assert_eq!(&gif[6..13], [2, 0, 2, 0, 0x80, 0, 0]);
        assert_eq!(&gif[13..19], [255, 0, 0, 0, 0, 0]);
        assert_eq!(&gif[19..22], [0x21, 0xFF, 11]);
        let gce = 19 + 19;
        assert_eq!(&gif[gce..gce + 8], [0x21, 0xF9, 4, 0b100, 14, 0, 0, 0]);
        let desc = gce + 8;
        assert_eq!(&gif[desc..desc + 11], [0x2C, 0, 0, 0, 0, 2, 0, 2, 0, 0, 2]);
        assert_eq!(gif[desc + 11..], [frame.data(), &[0x3B][..]].concat()[..]);
    }

    #[test]
    fn rejects_frames_off_canvas() {
        let (frame, palette) = encoded(3, [0, 0, 0]);
        match mux([&frame], &palette, 2, 2, Repeat::Infinite) {
            Err(Error::DimensionMismatch { expected, found }) => {
                assert_eq!(expected, (2, 2));
                assert_eq!(found, (3, 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn play_once_has_no_loop_block() {
        let (frame, palette) = encoded(1, [0, 0, 0]);
        let gif = mux([&frame], &palette, 1, 1, Repeat::Finite(0)).unwrap();
        assert_eq!(&gif[19..21], [0x21, 0xF9]);
    }
}
