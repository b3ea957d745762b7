//! Shared palette construction and nearest-color mapping
use std::collections::{BTreeMap, HashMap};

use color_quant::NeuQuant;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::raster::{RasterImage, RGB_CHANNELS};

mod median_cut;

pub use self::median_cut::median_cut;

/// GIF color tables hold at most 256 entries
pub const MAX_COLORS: usize = 256;

/// NeuQuant needs this many sampled pixels to run its learning cycles
const NEUQUANT_MIN_SAMPLES: usize = 256;

/// Ordered color table, 1 to 256 entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 3]>,
}

impl Palette {
    /// Returns `None` for an empty table or one with more than 256 colors.
    pub fn new(colors: Vec<[u8; 3]>) -> Option<Palette> {
        if colors.is_empty() || colors.len() > MAX_COLORS {
            return None;
        }
        Some(Palette { colors })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[[u8; 3]] {
        &self.colors
    }

    pub fn get(&self, index: u8) -> Option<[u8; 3]> {
        self.colors.get(index as usize).copied()
    }

    /// Packed RGB table as written to the file
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.colors.iter().flatten().copied().collect()
    }

    /// Index of the entry closest to `color` by squared Euclidean distance.
    /// Equal distances resolve to the lowest index.
    pub fn nearest(&self, color: [u8; 3]) -> u8 {
        let mut best = (0, u32::MAX);
        for (i, entry) in self.colors.iter().enumerate() {
            let dist = distance(*entry, color);
            if dist < best.1 {
                best = (i, dist);
                if dist == 0 {
                    break;
                }
            }
        }
        best.0 as u8
    }
}

fn distance(a: [u8; 3], b: [u8; 3]) -> u32 {
    a.iter()
        .zip(&b)
        .map(|(&x, &y)| {
            let d = i32::from(x) - i32::from(y);
            (d * d) as u32
        })
        .sum()
}

/// A frame as palette indices, one per pixel in row-major order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFrame {
    width: u16,
    height: u16,
    indices: Vec<u8>,
}

impl IndexedFrame {
    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }
}

/// Palette construction strategy used once the frames hold more distinct
/// colors than the palette can.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantizer {
    /// Recursive median cut of the combined histogram
    MedianCut,
    /// Kohonen neural network; `sample_factor` 1 is the slowest and best,
    /// 30 the fastest.
    NeuQuant { sample_factor: i32 },
}

impl Default for Quantizer {
    fn default() -> Quantizer {
        Quantizer::MedianCut
    }
}

impl Quantizer {
    /// NeuQuant with the sampling of the classic animated GIF encoder
    pub fn neuquant() -> Quantizer {
        Quantizer::NeuQuant { sample_factor: 10 }
    }

    /// Builds one palette covering every pixel of every frame.
    ///
    /// If the frames use no more than `max_colors` distinct colors the
    /// palette is exactly those colors in ascending RGB order.
    pub fn build_palette<F: AsRef<RasterImage>>(&self, frames: &[F], max_colors: usize) -> Palette {
        let max_colors = max_colors.clamp(1, MAX_COLORS);
        let hist = histogram(frames);
        debug!("{} distinct colors across {} frames", hist.len(), frames.len());

        let colors = if hist.len() <= max_colors {
            hist.into_keys().collect()
        } else {
            match *self {
                Quantizer::NeuQuant { sample_factor } => {
                    let sample_factor = sample_factor.clamp(1, 30);
                    let pixels: usize = frames.iter().map(|f| f.as_ref().pixel_count()).sum();
                    if max_colors >= 4 && pixels / sample_factor as usize >= NEUQUANT_MIN_SAMPLES {
                        neuquant(frames, sample_factor, max_colors)
                    } else {
                        median_cut(hist.into_iter().collect(), max_colors)
                    }
                }
                Quantizer::MedianCut => median_cut(hist.into_iter().collect(), max_colors),
            }
        };
        // empty input still yields a usable table
        Palette::new(colors).unwrap_or_else(|| Palette {
            colors: vec![[0, 0, 0]],
        })
    }
}

/// Pixel count per color over all frames, in ascending color order
fn histogram<F: AsRef<RasterImage>>(frames: &[F]) -> BTreeMap<[u8; 3], u64> {
    let mut hist = BTreeMap::new();
    for frame in frames {
        for pix in frame.as_ref().pixels() {
            *hist.entry(pix).or_insert(0) += 1;
        }
    }
    hist
}

fn neuquant<F: AsRef<RasterImage>>(frames: &[F], sample_factor: i32, max_colors: usize) -> Vec<[u8; 3]> {
    let mut rgba = Vec::new();
    for frame in frames {
        for pix in frame.as_ref().as_rgb().chunks_exact(RGB_CHANNELS) {
            rgba.extend_from_slice(&[pix[0], pix[1], pix[2], 0xFF]);
        }
    }
    let nq = NeuQuant::new(sample_factor, max_colors, &rgba);
    nq.color_map_rgb()
        .chunks_exact(RGB_CHANNELS)
        .map(|c| [c[0], c[1], c[2]])
        .collect()
}

/// Maps every pixel of `frame` to its nearest palette entry.
pub fn quantize(frame: &RasterImage, palette: &Palette) -> IndexedFrame {
    // lookup memo only; results never depend on its iteration order
    let mut memo: HashMap<[u8; 3], u8> = HashMap::new();
    let indices = frame
        .pixels()
        .map(|pix| *memo.entry(pix).or_insert_with(|| palette.nearest(pix)))
        .collect();
    IndexedFrame {
        width: frame.width(),
        height: frame.height(),
        indices,
    }
}
