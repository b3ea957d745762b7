//! Export settings
use serde::{Deserialize, Serialize};

use crate::export::Exporter;
use crate::quant::{Quantizer, MAX_COLORS};
use crate::traits::Parameter;
use crate::types::Repeat;

/// 7 frames per second
pub const DEFAULT_FRAME_DELAY: u16 = 14;

/// When the captured files of an export are deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceCleanup {
    /// As soon as every frame is decoded, before quantization. Also on a
    /// decode failure; the export cannot be retried.
    AfterDecode,
    /// Only once the animation is fully assembled. If decoding or encoding
    /// fails the files stay on disk and can be appended again.
    AfterMux,
}

impl Default for SourceCleanup {
    fn default() -> SourceCleanup {
        SourceCleanup::AfterDecode
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Display time of every frame in hundredths of a second
    pub frame_delay: u16,
    pub repeat: Repeat,
    pub quantizer: Quantizer,
    /// Upper bound of the shared palette, 1 to 256
    pub max_colors: u16,
    pub cleanup: SourceCleanup,
}

impl Default for ExportConfig {
    fn default() -> ExportConfig {
        ExportConfig {
            frame_delay: DEFAULT_FRAME_DELAY,
            repeat: Repeat::Infinite,
            quantizer: Quantizer::MedianCut,
            max_colors: MAX_COLORS as u16,
            cleanup: SourceCleanup::AfterDecode,
        }
    }
}

/// Frame delay in centiseconds
#[derive(Debug, Clone, Copy)]
pub struct FrameDelay(pub u16);

/// Frames per second, converted to the nearest centisecond delay
#[derive(Debug, Clone, Copy)]
pub struct FrameRate(pub f32);

/// Palette size limit
#[derive(Debug, Clone, Copy)]
pub struct MaxColors(pub u16);

impl FrameRate {
    pub fn delay(self) -> u16 {
        if self.0.is_nan() || self.0 <= 0.0 {
            return DEFAULT_FRAME_DELAY;
        }
        (100.0 / self.0).round().clamp(1.0, f32::from(u16::MAX)) as u16
    }
}

impl Parameter<Exporter> for FrameDelay {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().frame_delay = self.0
    }
}

impl Parameter<Exporter> for FrameRate {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().frame_delay = self.delay()
    }
}

impl Parameter<Exporter> for MaxColors {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().max_colors = self.0.clamp(1, MAX_COLORS as u16)
    }
}

impl Parameter<Exporter> for Repeat {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().repeat = self
    }
}

impl Parameter<Exporter> for Quantizer {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().quantizer = self
    }
}

impl Parameter<Exporter> for SourceCleanup {
    fn set_param(self, this: &mut Exporter) {
        this.config_mut().cleanup = self
    }
}
