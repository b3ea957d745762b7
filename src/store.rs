//! Captured frames of the current session
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::raster::{checked_dimensions, RasterImage};

/// Where the pixels of a captured frame live
#[derive(Debug, Clone)]
pub enum FrameSource {
    /// A photo on disk, decoded at export time
    File(PathBuf),
    /// An already decoded frame
    Memory(Arc<RasterImage>),
}

impl FrameSource {
    /// Loads the pixels behind this source.
    pub fn decode(&self) -> Result<Arc<RasterImage>> {
        match self {
            FrameSource::File(path) => RasterImage::open(path).map(Arc::new),
            FrameSource::Memory(image) => Ok(Arc::clone(image)),
        }
    }

    /// Deletes the backing file, if any. A file that is already gone counts
    /// as removed.
    fn remove(&self) {
        if let FrameSource::File(path) = self {
            match fs::remove_file(path) {
                Ok(()) => debug!("removed captured frame {}", path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("failed to remove {}: {}", path.display(), err),
            }
        }
    }
}

/// One captured frame and its position in the session
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub index: u64,
    pub width: u16,
    pub height: u16,
    pub source: FrameSource,
}

/// The records of one generation
#[derive(Debug, Default)]
struct Session {
    records: Vec<FrameRecord>,
    next_index: u64,
}

impl Session {
    fn canvas(&self) -> Option<(u16, u16)> {
        self.records.first().map(|r| (r.width, r.height))
    }
}

/// Ordered frame collection shared between the capture worker and exports.
///
/// Every mutation goes through one mutex, so `snapshot_and_clear` is a
/// single step: a concurrent `append` lands either in the snapshot or in the
/// next generation, never in both and never nowhere.
#[derive(Debug, Default)]
pub struct FrameStore {
    session: Mutex<Session>,
}

impl FrameStore {
    pub fn new() -> FrameStore {
        FrameStore::default()
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a decoded frame and returns its sequence index.
    pub fn append(&self, image: RasterImage) -> Result<u64> {
        let (width, height) = image.dimensions();
        self.push(width, height, FrameSource::Memory(Arc::new(image)))
    }

    /// Adds a captured image file and returns its sequence index. Only the
    /// header is read here; pixels are decoded at export time.
    pub fn append_file(&self, path: impl Into<PathBuf>) -> Result<u64> {
        let path = path.into();
        let (width, height) =
            image::image_dimensions(&path).map_err(|err| Error::decode_failure(&path, err))?;
        let (width, height) =
            checked_dimensions(width, height).map_err(|err| Error::decode_failure(&path, err))?;
        self.push(width, height, FrameSource::File(path))
    }

    fn push(&self, width: u16, height: u16, source: FrameSource) -> Result<u64> {
        let mut session = self.lock();
        if let Some(expected) = session.canvas() {
            if expected != (width, height) {
                return Err(Error::InvalidFrame {
                    expected,
                    found: (width, height),
                });
            }
        }
        let index = session.next_index;
        session.next_index += 1;
        session.records.push(FrameRecord {
            index,
            width,
            height,
            source,
        });
        debug!("captured frame {} ({}x{})", index, width, height);
        Ok(index)
    }

    /// Discards the session and deletes every captured file. Calling it on
    /// an empty store is a no-op.
    pub fn reset(&self) {
        let records = {
            let mut session = self.lock();
            mem::take(&mut *session).records
        };
        if !records.is_empty() {
            debug!("discarding {} captured frames", records.len());
        }
        for record in &records {
            record.source.remove();
        }
    }

    /// Hands the current generation over for export and starts a new one.
    ///
    /// Sequence indices keep counting so that files named after
    /// `next_index` never collide with frames still being exported.
    pub fn snapshot_and_clear(&self) -> Result<FrameSnapshot> {
        let mut session = self.lock();
        let (width, height) = session.canvas().ok_or(Error::EmptySequence)?;
        let records = mem::take(&mut session.records);
        debug!(
            "snapshot of {} frames, next index {}",
            records.len(),
            session.next_index
        );
        Ok(FrameSnapshot {
            records,
            width,
            height,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Sequence index the next captured frame will receive
    pub fn next_index(&self) -> u64 {
        self.lock().next_index
    }

    /// Collision-free file name for the next capture, e.g. `"3.jpg"`
    pub fn next_file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.next_index(), extension)
    }

    /// Canvas size established by the first frame of the session
    pub fn canvas(&self) -> Option<(u16, u16)> {
        self.lock().canvas()
    }

    /// Source of the most recent capture, for previews
    pub fn last(&self) -> Option<FrameSource> {
        self.lock().records.last().map(|r| r.source.clone())
    }
}

/// Frozen, ordered copy of a generation taken at export time
#[derive(Debug)]
pub struct FrameSnapshot {
    records: Vec<FrameRecord>,
    width: u16,
    height: u16,
}

impl FrameSnapshot {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Shared canvas size of every frame
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    /// Decodes all frames in order. The first unreadable frame aborts the
    /// whole decode.
    pub fn decode(&self) -> Result<Vec<Arc<RasterImage>>> {
        self.records
            .iter()
            .map(|record| {
                let image = record.source.decode()?;
                if image.dimensions() != (self.width, self.height) {
                    return Err(Error::decode_failure(
                        source_path(&record.source),
                        format!(
                            "decoded as {}x{}, captured as {}x{}",
                            image.width(),
                            image.height(),
                            self.width,
                            self.height
                        ),
                    ));
                }
                Ok(image)
            })
            .collect()
    }

    /// Deletes the files backing this snapshot.
    pub fn release(self) {
        for record in &self.records {
            record.source.remove();
        }
    }
}

fn source_path(source: &FrameSource) -> &Path {
    match source {
        FrameSource::File(path) => path,
        FrameSource::Memory(_) => Path::new("<memory>"),
    }
}
