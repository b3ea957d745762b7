use std::fs;
use std::path::{Path, PathBuf};

use boomerang::{
    Error, ExportConfig, Exporter, FrameStore, HasParameters, RasterImage, Reader, SourceCleanup,
};
use image::{Rgb, RgbImage};

fn solid(color: [u8; 3]) -> RasterImage {
    RasterImage::solid(16, 12, color).unwrap()
}

/// Saves a solid PNG under the store's next file name
fn capture(store: &FrameStore, dir: &Path, color: [u8; 3]) -> PathBuf {
    let path = dir.join(store.next_file_name("png"));
    RgbImage::from_pixel(16, 12, Rgb(color)).save(&path).unwrap();
    store.append_file(&path).unwrap();
    path
}

#[tokio::test]
async fn writes_a_boomerang() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    for color in [[255, 0, 0], [0, 255, 0], [0, 0, 255]] {
        store.append(solid(color)).unwrap();
    }

    let destination = dir.path().join("boomerang.gif");
    let written = Exporter::new().export(&store, &destination).await.unwrap();
    assert_eq!(written, destination);

    let data = fs::read(&destination).unwrap();
    let mut reader = Reader::new(&data[..]);
    let frames = reader.read_to_end().unwrap();
    assert_eq!(frames.len(), 4);
    assert_eq!(frames[3].buffer, frames[1].buffer);
    assert!(frames.iter().all(|f| f.delay == 14));
    assert_eq!((reader.width(), reader.height()), (16, 12));
    assert_eq!(reader.loop_count(), Some(0));

    assert!(!dir.path().join("boomerang.gif.part").exists());
    assert!(store.is_empty());
    assert_eq!(store.next_index(), 3);
}

#[tokio::test]
async fn empty_store_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    let destination = dir.path().join("out.gif");

    let result = Exporter::new().export(&store, &destination).await;
    assert!(matches!(result, Err(Error::EmptySequence)));
    assert!(!destination.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    assert!(store.is_empty());
    assert_eq!(store.next_index(), 0);
}

#[tokio::test]
async fn write_failure_reports_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    store.append(solid([1, 2, 3])).unwrap();
    let destination = dir.path().join("missing").join("out.gif");

    match Exporter::new().export(&store, &destination).await {
        Err(Error::Io { path, .. }) => assert_eq!(path, destination),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!destination.exists());
}

#[tokio::test]
async fn replaces_an_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("out.gif");
    fs::write(&destination, b"stale").unwrap();

    let store = FrameStore::new();
    store.append(solid([9, 9, 9])).unwrap();
    Exporter::new().export(&store, &destination).await.unwrap();

    let data = fs::read(&destination).unwrap();
    assert_eq!(&data[..6], b"GIF89a");
    assert_eq!(Reader::new(&data[..]).read_to_end().unwrap().len(), 1);
}

#[tokio::test]
async fn captured_files_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    let files: Vec<_> = [[200, 0, 0], [0, 200, 0]]
        .iter()
        .map(|&color| capture(&store, dir.path(), color))
        .collect();
    assert_eq!(files[1].file_name().unwrap(), "1.png");

    let destination = dir.path().join("out.gif");
    Exporter::new().export(&store, &destination).await.unwrap();
    assert!(files.iter().all(|f| !f.exists()));

    let data = fs::read(&destination).unwrap();
    assert_eq!(Reader::new(&data[..]).read_to_end().unwrap().len(), 2);
}

#[tokio::test]
async fn decode_failure_after_decode_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    let first = capture(&store, dir.path(), [10, 20, 30]);
    let second = capture(&store, dir.path(), [30, 20, 10]);
    fs::write(&second, b"not a png").unwrap();

    let destination = dir.path().join("out.gif");
    match Exporter::new().export(&store, &destination).await {
        Err(Error::DecodeFailure { path, .. }) => assert_eq!(path, second),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!destination.exists());
    assert!(!first.exists());
    assert!(!second.exists());
}

#[tokio::test]
async fn decode_failure_after_mux_cleanup_keeps_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    let first = capture(&store, dir.path(), [10, 20, 30]);
    let second = capture(&store, dir.path(), [30, 20, 10]);
    fs::write(&first, b"truncated").unwrap();

    let mut exporter = Exporter::new();
    exporter.set(SourceCleanup::AfterMux);
    let destination = dir.path().join("out.gif");
    match exporter.export(&store, &destination).await {
        Err(Error::DecodeFailure { path, .. }) => assert_eq!(path, first),
        other => panic!("unexpected {:?}", other),
    }
    assert!(!destination.exists());
    assert!(first.exists());
    assert!(second.exists());

    // the intact frame can be captured again
    store.append_file(&second).unwrap();
    exporter.export(&store, &destination).await.unwrap();
    assert!(!second.exists());
    assert!(destination.exists());
}

#[tokio::test]
async fn capture_continues_after_export() {
    let dir = tempfile::tempdir().unwrap();
    let store = FrameStore::new();
    let exporter = Exporter::with_config(ExportConfig {
        frame_delay: 20,
        ..ExportConfig::default()
    });

    store.append(solid([0, 0, 0])).unwrap();
    store.append(solid([255, 255, 255])).unwrap();
    exporter
        .export(&store, dir.path().join("first.gif"))
        .await
        .unwrap();

    // a new generation may use another canvas
    let index = store
        .append(RasterImage::solid(4, 4, [1, 1, 1]).unwrap())
        .unwrap();
    assert_eq!(index, 2);
    let second = exporter
        .export(&store, dir.path().join("second.gif"))
        .await
        .unwrap();

    let data = fs::read(second).unwrap();
    let mut reader = Reader::new(&data[..]);
    let frames = reader.read_to_end().unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].delay, 20);
    assert_eq!((reader.width(), reader.height()), (4, 4));
}
