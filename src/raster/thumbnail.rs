use image::{ImageBuffer, Rgba};

use crate::{
    foundation::error::{PsdError, PsdResult},
    raster::buffer::Raster,
};

/// Target size whose longest side is at most `max_dim`, preserving aspect ratio.
///
/// Never upsamples; the short side is rounded and kept at least 1 pixel.
pub fn thumbnail_size(width: u32, height: u32, max_dim: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_dim || longest == 0 {
        return (width, height);
    }
    let scale = |side: u32| -> u32 {
        let scaled = (u64::from(side) * u64::from(max_dim) + u64::from(longest) / 2)
            / u64::from(longest);
        (scaled as u32).clamp(1, max_dim)
    };
    if width >= height {
        (max_dim, scale(height))
    } else {
        (scale(width), max_dim)
    }
}

/// Downsample `src` so its longest side is at most `max_dim`.
///
/// Colors are averaged weighted by alpha: the box filter runs on 16-bit premultiplied
/// samples and the result is converted back to straight RGBA8. Rasters already within
/// bounds (including empty ones) come back as a copy.
pub fn make_thumbnail(src: &Raster, max_dim: u32) -> PsdResult<Raster> {
    if max_dim == 0 {
        return Err(PsdError::validation("thumbnail max dimension must be >= 1"));
    }
    let (w, h) = thumbnail_size(src.width(), src.height(), max_dim);
    if src.is_empty() || (w, h) == (src.width(), src.height()) {
        return Ok(src.clone());
    }

    let premul: Vec<u16> = src.data().chunks_exact(4).flat_map(premultiply).collect();
    let img = ImageBuffer::<Rgba<u16>, Vec<u16>>::from_raw(src.width(), src.height(), premul)
        .ok_or_else(|| anyhow::anyhow!("premultiplied buffer does not match raster size"))?;
    let small = image::imageops::thumbnail(&img, w, h).into_raw();
    let data: Vec<u8> = small.chunks_exact(4).flat_map(unpremultiply).collect();
    Raster::from_rgba8(w, h, data)
}

/// Straight RGBA8 to premultiplied 16-bit: color = c * a, alpha = a * 257.
fn premultiply(px: &[u8]) -> [u16; 4] {
    let a = u16::from(px[3]);
    [
        u16::from(px[0]) * a,
        u16::from(px[1]) * a,
        u16::from(px[2]) * a,
        a * 257,
    ]
}

fn unpremultiply(px: &[u16]) -> [u8; 4] {
    let a = u32::from(px[3]);
    let alpha = ((a + 128) / 257) as u8;
    if alpha == 0 {
        return [0; 4];
    }
    // c * a8 / a8 with a8 = a / 257
    let color = |v: u16| ((u32::from(v) * 257 + a / 2) / a).min(255) as u8;
    [color(px[0]), color(px[1]), color(px[2]), alpha]
}

#[cfg(test)]
#[path = "../../tests/unit/raster/thumbnail.rs"]
mod tests;
