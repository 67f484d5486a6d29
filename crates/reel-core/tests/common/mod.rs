#![allow(dead_code)]

use reel_core::capture::Capture;
use reel_core::render::Frame;
use reel_core::{AssetLoader, ReelResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Serves files from memory; anything else is a fetch failure.
#[derive(Default)]
pub struct MockAssetLoader {
    files: HashMap<String, Vec<u8>>,
}

impl MockAssetLoader {
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into().into_bytes());
    }

    pub fn insert_bytes(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }
}

impl AssetLoader for MockAssetLoader {
    fn load_bytes(&self, path: &str) -> anyhow::Result<Vec<u8>> {
        match self.files.get(path) {
            Some(contents) => Ok(contents.clone()),
            None => anyhow::bail!("File not found: {}", path),
        }
    }
}

/// `count` rows marching along x from `offset`.
pub fn line_csv(count: usize, offset: f32) -> String {
    (0..count)
        .map(|i| format!("{},{},0\n", offset + i as f32, offset))
        .collect()
}

/// Two-vertex OBJ with a single edge.
pub fn segment_obj(length: f32) -> String {
    format!("v 0 0 0\nv {} 0 0\nl 1 2\n", length)
}

/// Single-color PNG panorama.
pub fn uniform_png(rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(16, 8, image::Rgba(rgba));
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

#[derive(Debug, Default)]
pub struct Recording {
    pub frames: Vec<u64>,
    pub finished: bool,
}

/// Records frame indices and whether the capture was finalized.
pub struct RecordingCapture(pub Arc<Mutex<Recording>>);

impl Capture for RecordingCapture {
    fn capture(&mut self, frame: &Frame) -> ReelResult<()> {
        self.0.lock().unwrap().frames.push(frame.index);
        Ok(())
    }

    fn finish(self: Box<Self>) -> ReelResult<()> {
        self.0.lock().unwrap().finished = true;
        Ok(())
    }
}
