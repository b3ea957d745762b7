//! # Boomerang GIF encoder
//!
//! Turns a short burst of captured frames into an animated GIF that plays
//! forward and then backward (`1 2 3 4 3 2`, looping).
//!
//! Frames are collected in a `FrameStore`, which can be fed from a capture
//! thread while an `Exporter` turns the previous burst into a file.
//!
//! ```
//! use boomerang::{Exporter, RasterImage, Reader};
//!
//! let frames: Vec<_> = [[255, 0, 0], [0, 255, 0], [0, 0, 255]]
//!     .iter()
//!     .map(|&color| RasterImage::solid(8, 8, color))
//!     .collect::<Result<_, _>>()?;
//!
//! let gif = Exporter::new().encode(&frames)?;
//! let shown = Reader::new(&gif[..]).read_to_end().unwrap().len();
//! assert_eq!(shown, 4);
//! # Ok::<(), boomerang::Error>(())
//! ```

#[macro_use]
extern crate enum_primitive;

mod config;
mod error;
mod export;
mod quant;
mod raster;
pub mod reader;
mod sequence;
mod store;
mod traits;
mod types;
pub mod writer;

pub use crate::config::{
    ExportConfig, FrameDelay, FrameRate, MaxColors, SourceCleanup, DEFAULT_FRAME_DELAY,
};
pub use crate::error::{Error, Result};
pub use crate::export::Exporter;
pub use crate::quant::{quantize, IndexedFrame, Palette, Quantizer, MAX_COLORS};
pub use crate::raster::RasterImage;
pub use crate::sequence::{boomerang, boomerang_order};
pub use crate::store::{FrameRecord, FrameSnapshot, FrameSource, FrameStore};
pub use crate::traits::{HasParameters, Parameter};
pub use crate::types::{Block, DisposalMethod, Extension, Repeat};

/// Decoder configuration parameters
pub use crate::reader::ColorOutput;
pub use crate::reader::{DecodingError, Reader};
pub use crate::writer::{mux, EncodedFrame, Encoder};

#[cfg(test)]
#[test]
fn round_trip() {
    let frames: Vec<_> = (0..3u8)
        .map(|i| {
            let pixels = (0..6 * 4)
                .flat_map(|p: u8| [p.wrapping_mul(40), i * 90, 255 - p])
                .collect();
            RasterImage::from_rgb(6, 4, pixels).unwrap()
        })
        .collect();
    let gif = Exporter::new().encode(&frames).unwrap();

    let mut reader = Reader::new(&gif[..]);
    reader.set(ColorOutput::TrueColor);
    let decoded = reader.read_to_end().unwrap();
    assert_eq!(decoded.len(), 4);
    // 24 colors per frame, 72 in total: the palette is exact
    for (frame, expected) in decoded.iter().zip([0, 1, 2, 1]) {
        let rgb: Vec<u8> = frame
            .buffer
            .chunks(4)
            .flat_map(|px| px[..3].to_vec())
            .collect();
        assert_eq!(rgb, frames[expected].as_rgb());
    }
}
