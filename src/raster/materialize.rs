use crate::{
    foundation::{
        core::{BitDepth, ColorMode, FormatVersion, Rect},
        error::{DecodeWarning, WarningKind},
    },
    model::document::LayerId,
    raster::{
        buffer::Raster,
        channel::{ChannelIssue, PlaneGeometry, decode_channel},
    },
};

/// Channel id of the transparency plane.
pub const ALPHA_CHANNEL_ID: i16 = -1;

/// One channel's id and its raw block (compression id + payload).
#[derive(Clone, Copy, Debug)]
pub struct ChannelBlock<'a> {
    pub id: i16,
    pub data: &'a [u8],
}

/// Everything needed to build one layer's raster, independent of every other layer.
#[derive(Clone, Debug)]
pub struct MaterializeJob<'a> {
    pub layer: LayerId,
    pub rect: Rect,
    pub channels: Vec<ChannelBlock<'a>>,
}

/// Document-wide sample layout shared by all layers.
#[derive(Clone, Copy, Debug)]
pub struct PixelFormat {
    pub color_mode: ColorMode,
    pub depth: BitDepth,
    pub version: FormatVersion,
}

#[derive(Clone, Debug)]
pub struct Materialized {
    pub layer: LayerId,
    pub raster: Raster,
    pub warnings: Vec<DecodeWarning>,
}

#[derive(Default)]
struct Planes {
    color: [Option<Vec<u8>>; 4],
    alpha: Option<Vec<u8>>,
}

/// Decode a layer's channels and interleave them into an RGBA8 raster sized to the
/// layer rectangle.
///
/// A raw channel whose size disagrees with the rectangle degrades the whole layer to
/// an empty raster. Unsupported compressions become zero planes.
pub fn materialize_layer(job: &MaterializeJob<'_>, format: PixelFormat) -> Materialized {
    let mut warnings = Vec::new();
    let done = |raster, warnings| Materialized {
        layer: job.layer,
        raster,
        warnings,
    };

    if job.rect.is_empty() {
        return done(Raster::empty(), warnings);
    }

    let geometry = PlaneGeometry {
        width: job.rect.width(),
        height: job.rect.height(),
        depth: format.depth,
        version: format.version,
    };

    let mut planes = Planes::default();
    for channel in &job.channels {
        let slot = match channel.id {
            ALPHA_CHANNEL_ID => None,
            id @ 0..=3 => Some(id as usize),
            // user masks (-2, -3) and spot channels do not contribute color
            _ => continue,
        };

        let decoded = decode_channel(channel.data, geometry);
        match decoded.issue {
            None => {}
            Some(ChannelIssue::UnsupportedCompression(id)) => warnings.push(DecodeWarning::new(
                WarningKind::UnsupportedCompression,
                Some(job.layer),
                format!("channel {} uses compression {id}; zero-filled", channel.id),
            )),
            Some(ChannelIssue::LengthMismatch { expected, actual }) => {
                warnings.push(DecodeWarning::new(
                    WarningKind::StructuralInconsistency,
                    Some(job.layer),
                    format!(
                        "channel {} holds {actual} bytes, rectangle needs {expected}; layer left empty",
                        channel.id
                    ),
                ));
                return done(Raster::empty(), warnings);
            }
            Some(ChannelIssue::Padded { produced, expected }) => {
                warnings.push(DecodeWarning::new(
                    WarningKind::PaddedChannel,
                    Some(job.layer),
                    format!(
                        "channel {} rle data ended after {produced} of {expected} bytes",
                        channel.id
                    ),
                ))
            }
        }

        match slot {
            Some(i) => planes.color[i] = Some(decoded.samples),
            None => planes.alpha = Some(decoded.samples),
        }
    }

    let pixels = geometry.sample_count();
    let mut rgba = vec![0u8; pixels * 4];
    match format.color_mode {
        ColorMode::Rgb => interleave_rgb(&mut rgba, &planes),
        ColorMode::Cmyk => interleave_cmyk(&mut rgba, &planes),
        ColorMode::Grayscale | ColorMode::Duotone | ColorMode::Bitmap => {
            interleave_gray(&mut rgba, &planes)
        }
        other => {
            warnings.push(DecodeWarning::new(
                WarningKind::UnsupportedColorMode,
                Some(job.layer),
                format!("{other:?} layer decoded as grayscale from channel 0"),
            ));
            interleave_gray(&mut rgba, &planes);
        }
    }

    match &planes.alpha {
        Some(alpha) => {
            for (px, &a) in rgba.chunks_exact_mut(4).zip(alpha) {
                px[3] = a;
            }
        }
        None => {
            for px in rgba.chunks_exact_mut(4) {
                px[3] = 255;
            }
        }
    }

    match Raster::from_rgba8(geometry.width, geometry.height, rgba) {
        Ok(raster) => done(raster, warnings),
        Err(e) => {
            warnings.push(DecodeWarning::new(
                WarningKind::StructuralInconsistency,
                Some(job.layer),
                format!("raster assembly failed: {e}"),
            ));
            done(Raster::empty(), warnings)
        }
    }
}

fn interleave_rgb(rgba: &mut [u8], planes: &Planes) {
    for (c, plane) in planes.color.iter().take(3).enumerate() {
        let Some(plane) = plane else {
            continue;
        };
        for (px, &v) in rgba.chunks_exact_mut(4).zip(plane) {
            px[c] = v;
        }
    }
}

fn interleave_gray(rgba: &mut [u8], planes: &Planes) {
    let Some(gray) = &planes.color[0] else {
        return;
    };
    for (px, &v) in rgba.chunks_exact_mut(4).zip(gray) {
        px[0] = v;
        px[1] = v;
        px[2] = v;
    }
}

// CMYK planes are stored inverted (255 = no ink).
fn interleave_cmyk(rgba: &mut [u8], planes: &Planes) {
    let ink =
        |plane: &Option<Vec<u8>>, i: usize| plane.as_ref().map_or(255u16, |p| u16::from(p[i]));
    for (i, px) in rgba.chunks_exact_mut(4).enumerate() {
        let k = ink(&planes.color[3], i);
        for c in 0..3 {
            px[c] = mul_div255(ink(&planes.color[c], i), k);
        }
    }
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/raster/materialize.rs"]
mod tests;
