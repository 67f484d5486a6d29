//! Star-field sky dome.
//!
//! The texture is an equirectangular panorama wrapped on the inside of a
//! sphere whose poles lie on the ±z spin axis. The dome is far larger than
//! any camera orbit, so a texel is picked from the view direction alone.

use crate::errors::{ReelError, ReelResult};
use glam::Vec3;
use std::f32::consts::{PI, TAU};
use std::fmt;

#[derive(Clone, PartialEq)]
pub struct SkyTexture {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SkyTexture {
    /// Decodes a PNG or JPEG panorama.
    pub fn decode(source: &str, bytes: &[u8]) -> ReelResult<Self> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ReelError::Parse {
                path: source.to_string(),
                line: 0,
                message: e.to_string(),
            })?
            .to_rgba8();
        Self::from_rgba(image.width(), image.height(), image.into_raw())
    }

    pub fn from_rgba(width: u32, height: u32, rgba: Vec<u8>) -> ReelResult<Self> {
        if width == 0 || height == 0 || rgba.len() != (width * height * 4) as usize {
            return Err(ReelError::InvalidConfiguration(format!(
                "sky texture {}x{} with {} bytes",
                width,
                height,
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel seen looking along `direction` from inside the dome.
    ///
    /// Row 0 is the +z pole. Columns run with the azimuth measured from -x,
    /// which is where the panorama's seam sits.
    pub fn sample(&self, direction: Vec3) -> [u8; 4] {
        let d = direction.normalize_or_zero();
        let theta = d.z.clamp(-1.0, 1.0).acos();
        let azimuth = (-d.y).atan2(-d.x).rem_euclid(TAU);

        let x = ((azimuth / TAU * self.width as f32) as u32).min(self.width - 1);
        let y = ((theta / PI * self.height as f32) as u32).min(self.height - 1);
        let i = ((y * self.width + x) * 4) as usize;
        [self.rgba[i], self.rgba[i + 1], self.rgba[i + 2], self.rgba[i + 3]]
    }
}

impl fmt::Debug for SkyTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkyTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}
