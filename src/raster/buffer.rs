use std::io::Cursor;

use anyhow::Context;

use crate::foundation::error::{PsdError, PsdResult};

/// Owned straight-alpha RGBA8 pixel buffer.
///
/// `has_transparency` is computed once when the raster is built and is true iff
/// some pixel has alpha below 255.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    data: Vec<u8>,
    has_transparency: bool,
}

impl Raster {
    /// Zero-sized raster.
    pub fn empty() -> Self {
        Self::default()
    }

    /// `width × height` buffer initialized to transparent black.
    pub fn transparent(width: u32, height: u32) -> PsdResult<Self> {
        let len = rgba_len(width, height)?;
        Ok(Self {
            width,
            height,
            data: vec![0u8; len],
            has_transparency: len > 0,
        })
    }

    /// Wrap an interleaved RGBA8 buffer; its length must be `width * height * 4`.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> PsdResult<Self> {
        let len = rgba_len(width, height)?;
        if data.len() != len {
            return Err(PsdError::validation(format!(
                "rgba8 buffer is {} bytes, expected {len} for {width}x{height}",
                data.len()
            )));
        }
        let has_transparency = data.chunks_exact(4).any(|px| px[3] < 255);
        Ok(Self {
            width,
            height,
            data,
            has_transparency,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_transparency(&self) -> bool {
        self.has_transparency
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let px = &self.data[idx..idx + 4];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Mutable access for the compositor; callers must call [`Raster::refresh_transparency`]
    /// once they are done writing.
    pub(crate) fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn refresh_transparency(&mut self) {
        self.has_transparency = self.data.chunks_exact(4).any(|px| px[3] < 255);
    }

    pub fn to_rgba_image(&self) -> PsdResult<image::RgbaImage> {
        image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| PsdError::validation("raster does not fit an RgbaImage"))
    }

    /// Encode as PNG. Zero-area rasters cannot be encoded.
    pub fn encode_png(&self) -> PsdResult<Vec<u8>> {
        if self.is_empty() {
            return Err(PsdError::validation("cannot encode an empty raster as png"));
        }
        let mut out = Vec::new();
        image::DynamicImage::ImageRgba8(self.to_rgba_image()?)
            .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .context("encode raster as png")?;
        Ok(out)
    }
}

fn rgba_len(width: u32, height: u32) -> PsdResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| PsdError::resource_limit(format!("raster {width}x{height} overflows")))
}

#[cfg(test)]
#[path = "../../tests/unit/raster/buffer.rs"]
mod tests;
