//! # Capture Module
//!
//! Records rendered frames to disk.
//!
//! ## Backends
//! - `FfmpegCapture`: Pipes raw RGBA into an `ffmpeg` child process. Frames are
//!   handed to a writer thread over a bounded channel so a slow encoder
//!   applies backpressure instead of buffering the whole movie.
//! - `PngSequenceCapture`: One numbered PNG per frame.
//! - `NullCapture`: Discards frames.
//!
//! ## Licensing
//! `ffmpeg` is invoked as an external program; nothing is linked.

use crate::errors::{ReelError, ReelResult};
use crate::render::Frame;
use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Sender};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Receives every rendered frame while capture is active.
pub trait Capture {
    fn capture(&mut self, frame: &Frame) -> ReelResult<()>;

    /// Finalizes and saves the recording.
    fn finish(self: Box<Self>) -> ReelResult<()>;
}

/// Global FFmpeg driver.
pub struct FFmpegDriver;

impl FFmpegDriver {
    pub fn ensure_available() -> Result<()> {
        let output = Command::new(Self::binary())
            .arg("-version")
            .output()
            .context("Failed to execute 'ffmpeg'. Is it in your PATH?")?;

        if !output.status.success() {
            return Err(anyhow::anyhow!("ffmpeg returned error status"));
        }
        Ok(())
    }

    pub fn binary() -> &'static str {
        "ffmpeg"
    }
}

#[derive(Debug, Clone)]
pub struct EncoderSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Frames buffered between the render loop and the encoder.
    pub queue_depth: usize,
}

impl EncoderSettings {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            queue_depth: 8,
        }
    }

    /// Codec arguments chosen from the destination extension.
    fn codec_args(dest: &Path) -> &'static [&'static str] {
        match dest.extension().and_then(|e| e.to_str()) {
            Some("webm") => &["-c:v", "libvpx-vp9", "-b:v", "0", "-crf", "30"],
            _ => &["-c:v", "libx264", "-pix_fmt", "yuv420p"],
        }
    }
}

pub struct FfmpegCapture {
    tx: Option<Sender<Vec<u8>>>,
    writer: Option<JoinHandle<Result<()>>>,
    child: std::process::Child,
    dest: PathBuf,
    frame_len: usize,
    frames: u64,
}

impl FfmpegCapture {
    pub fn start(dest: &Path, settings: &EncoderSettings) -> ReelResult<Self> {
        FFmpegDriver::ensure_available().map_err(ReelError::Capture)?;

        // ffmpeg -y -f rawvideo -pixel_format rgba -video_size WxH -framerate FPS -i pipe:0 <codec> dest
        let mut child = Command::new(FFmpegDriver::binary())
            .arg("-y")
            .arg("-f")
            .arg("rawvideo")
            .arg("-pixel_format")
            .arg("rgba")
            .arg("-video_size")
            .arg(format!("{}x{}", settings.width, settings.height))
            .arg("-framerate")
            .arg(settings.fps.to_string())
            .arg("-i")
            .arg("pipe:0")
            .args(EncoderSettings::codec_args(dest))
            .arg(dest)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to spawn ffmpeg video encoder")
            .map_err(ReelError::Capture)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ReelError::Capture(anyhow::anyhow!("Encoder stdin closed")))?;

        let (tx, rx) = bounded::<Vec<u8>>(settings.queue_depth.max(1));
        let writer = thread::spawn(move || -> Result<()> {
            for frame in rx {
                stdin.write_all(&frame).context("Failed to write frame to ffmpeg")?;
            }
            stdin.flush()?;
            Ok(())
        });

        info!("Capturing to {:?}", dest);
        Ok(Self {
            tx: Some(tx),
            writer: Some(writer),
            child,
            dest: dest.to_path_buf(),
            frame_len: settings.width as usize * settings.height as usize * 4,
            frames: 0,
        })
    }
}

impl Capture for FfmpegCapture {
    fn capture(&mut self, frame: &Frame) -> ReelResult<()> {
        if frame.rgba.len() != self.frame_len {
            return Err(ReelError::Capture(anyhow::anyhow!(
                "frame is {} bytes, encoder expects {}",
                frame.rgba.len(),
                self.frame_len
            )));
        }
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ReelError::Capture(anyhow::anyhow!("Encoder already finished")))?;
        tx.send(frame.rgba.clone())
            .map_err(|_| ReelError::Capture(anyhow::anyhow!("Encoder writer thread exited")))?;
        self.frames += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> ReelResult<()> {
        // Dropping the sender closes the channel; the writer then closes stdin (EOF).
        drop(self.tx.take());
        if let Some(writer) = self.writer.take() {
            writer
                .join()
                .map_err(|_| ReelError::Capture(anyhow::anyhow!("Encoder writer thread panicked")))?
                .map_err(ReelError::Capture)?;
        }

        let status = self.child.wait().map_err(|e| ReelError::Capture(e.into()))?;
        if !status.success() {
            return Err(ReelError::Capture(anyhow::anyhow!("Video encoding failed")));
        }
        info!("Saved {} frames to {:?}", self.frames, self.dest);
        Ok(())
    }
}

/// Writes `frame_00000.png`, `frame_00001.png`, ... into a directory.
pub struct PngSequenceCapture {
    dir: PathBuf,
    frames: u64,
}

impl PngSequenceCapture {
    pub fn start(dir: &Path) -> ReelResult<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create capture directory {:?}", dir))
            .map_err(ReelError::Capture)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            frames: 0,
        })
    }

    pub fn frame_path(&self, n: u64) -> PathBuf {
        self.dir.join(format!("frame_{:05}.png", n))
    }
}

impl Capture for PngSequenceCapture {
    fn capture(&mut self, frame: &Frame) -> ReelResult<()> {
        let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.rgba.clone())
            .ok_or_else(|| ReelError::Capture(anyhow::anyhow!("frame buffer size mismatch")))?;
        let path = self.frame_path(self.frames);
        image
            .save(&path)
            .with_context(|| format!("Failed to write {:?}", path))
            .map_err(ReelError::Capture)?;
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> ReelResult<()> {
        info!("Wrote {} frames to {:?}", self.frames, self.dir);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NullCapture {
    pub frames: u64,
}

impl Capture for NullCapture {
    fn capture(&mut self, _frame: &Frame) -> ReelResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> ReelResult<()> {
        Ok(())
    }
}

/// Number of frames a capture of `seconds` at `fps` spans.
pub fn capture_frame_count(seconds: f64, fps: u32) -> u64 {
    let frames = (seconds * fps as f64).round();
    if frames < 1.0 {
        warn!("Capture of {}s at {} fps spans no frames; capturing one", seconds, fps);
        1
    } else {
        frames as u64
    }
}
