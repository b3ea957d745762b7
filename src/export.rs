//! Boomerang export: captured frames in, looping GIF out
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::{ExportConfig, SourceCleanup};
use crate::error::{Error, Result};
use crate::quant::quantize;
use crate::raster::RasterImage;
use crate::sequence::boomerang_order;
use crate::store::{FrameSnapshot, FrameStore};
use crate::traits::HasParameters;
use crate::writer::{mux, EncodedFrame};

/// Encodes frame sequences into boomerang GIFs.
///
/// Settings are changed through `HasParameters::set` or taken from an
/// `ExportConfig`.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    config: ExportConfig,
}

impl HasParameters for Exporter {}

impl Exporter {
    pub fn new() -> Exporter {
        Exporter::default()
    }

    pub fn with_config(config: ExportConfig) -> Exporter {
        Exporter { config }
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    pub(crate) fn config_mut(&mut self) -> &mut ExportConfig {
        &mut self.config
    }

    /// Encodes `frames` played forward and then backward.
    ///
    /// All frames share one palette and must have the size of the first
    /// frame. Each distinct frame is quantized and compressed once; the
    /// mirrored half reuses the compressed data.
    pub fn encode<F: AsRef<RasterImage>>(&self, frames: &[F]) -> Result<Vec<u8>> {
        let order = boomerang_order(frames.len())?;
        let (width, height) = frames[0].as_ref().dimensions();
        for frame in frames {
            let found = frame.as_ref().dimensions();
            if found != (width, height) {
                return Err(Error::InvalidFrame {
                    expected: (width, height),
                    found,
                });
            }
        }

        let palette = self
            .config
            .quantizer
            .build_palette(frames, usize::from(self.config.max_colors));
        let encoded = frames
            .iter()
            .map(|frame| {
                let indexed = quantize(frame.as_ref(), &palette);
                EncodedFrame::compress(&indexed, palette.len(), self.config.frame_delay)
            })
            .collect::<Result<Vec<_>>>()?;
        debug!(
            "compressed {} frames to {} bytes",
            encoded.len(),
            encoded.iter().map(|f| f.data().len()).sum::<usize>()
        );

        mux(
            order.iter().map(|&i| &encoded[i]),
            &palette,
            width,
            height,
            self.config.repeat,
        )
    }

    /// Decodes a snapshot and encodes it, deleting the captured files as
    /// configured by `SourceCleanup`.
    pub fn encode_snapshot(&self, snapshot: FrameSnapshot) -> Result<Vec<u8>> {
        match self.config.cleanup {
            SourceCleanup::AfterDecode => {
                let frames = snapshot.decode();
                snapshot.release();
                self.encode(&frames?)
            }
            SourceCleanup::AfterMux => {
                let frames = snapshot.decode()?;
                let gif = self.encode(&frames)?;
                snapshot.release();
                Ok(gif)
            }
        }
    }

    /// Exports the current generation of `store` to `destination`.
    ///
    /// The store is cleared before encoding starts, so capturing can go on
    /// while the export runs. Encoding happens on the blocking pool. The file
    /// only shows up under `destination` once it is complete.
    pub async fn export(&self, store: &FrameStore, destination: impl AsRef<Path>) -> Result<PathBuf> {
        let destination = destination.as_ref().to_path_buf();
        let snapshot = store.snapshot_and_clear()?;
        info!(
            "exporting {} frames ({}x{}) to {}",
            snapshot.len(),
            snapshot.dimensions().0,
            snapshot.dimensions().1,
            destination.display()
        );

        let exporter = self.clone();
        let gif = tokio::task::spawn_blocking(move || exporter.encode_snapshot(snapshot)).await??;
        write_atomic(&destination, &gif).await?;

        info!("wrote {} bytes to {}", gif.len(), destination.display());
        Ok(destination)
    }
}

/// Path the output is staged at before the final rename
fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let partial = partial_path(path);
    let written = match tokio::fs::write(&partial, data).await {
        Ok(()) => tokio::fs::rename(&partial, path).await,
        Err(err) => Err(err),
    };
    if let Err(err) = written {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(Error::io(path, err));
    }
    Ok(())
}
