//! Decodes a source image into the row-major RGBA pixel grid the sender loop streams.

use std::path::Path;

use tracing::instrument;

use crate::error::ImageError;

/// A decoded source image: width, height, and a row-major array of 32-bit RGBA words in the
/// same little-endian-per-word layout the server's framebuffer uses.
pub struct FluterImage {
    pub width: u16,
    pub height: u16,
    pixels: Vec<u32>,
}

impl FluterImage {
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImageError> {
        let path = path.as_ref();
        let decoded = image::open(path).map_err(|source| ImageError::Load {
            path: path.display().to_string(),
            source,
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        if width > u16::MAX as u32 || height > u16::MAX as u32 {
            return Err(ImageError::TooLarge {
                path: path.display().to_string(),
                width,
                height,
            });
        }

        let rgba = decoded.to_rgba8();
        let pixels = rgba
            .pixels()
            .map(|p| p.0[0] as u32 | (p.0[1] as u32) << 8 | (p.0[2] as u32) << 16 | (p.0[3] as u32) << 24)
            .collect();

        Ok(Self {
            width: width as u16,
            height: height as u16,
            pixels,
        })
    }

    /// Row-major RGBA word at `(x, y)`. Only defined for in-bounds coordinates.
    #[inline(always)]
    pub fn pixel(&self, x: u16, y: u16) -> u32 {
        self.pixels[x as usize + y as usize * self.width as usize]
    }

    #[cfg(test)]
    pub(crate) fn from_pixels(width: u16, height: u16, pixels: Vec<u32>) -> Self {
        Self { width, height, pixels }
    }
}
