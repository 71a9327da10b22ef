use crate::{
    decode::{header::FileHeader, reader::ByteReader},
    foundation::{
        core::{ColorMode, Rect},
        error::{DecodeWarning, WarningKind},
    },
    model::document::LayerId,
    raster::{
        buffer::Raster,
        channel::{Compression, PlaneGeometry, unpack_bits},
        materialize::{
            ALPHA_CHANNEL_ID, ChannelBlock, MaterializeJob, PixelFormat, materialize_layer,
        },
    },
};

/// Decode the image-data section (the application's flattened image).
///
/// Planes are split out of the section and fed through the layer materializer as raw
/// channels, so color-mode handling is shared with layers. Returns `None` when the
/// section is absent or uses a compression this decoder does not read.
pub fn decode_merged_image(
    r: &mut ByteReader<'_>,
    header: &FileHeader,
    merged_alpha: bool,
    warnings: &mut Vec<DecodeWarning>,
) -> Option<Raster> {
    if r.remaining() < 2 {
        return None;
    }
    let compression = Compression::from_u16(r.read_u16().ok()?);

    let geometry = PlaneGeometry {
        width: header.width,
        height: header.height,
        depth: header.depth,
        version: header.version,
    };
    let color = if header.color_mode == ColorMode::Indexed {
        1
    } else {
        header.color_mode.color_channels()
    };
    let with_alpha = merged_alpha && header.channels > color;
    let wanted = usize::from(color.min(header.channels)) + usize::from(with_alpha);
    let plane_len = geometry.stored_len();

    let planes: Vec<Vec<u8>> = match compression {
        Compression::Raw => {
            let data = r.rest();
            (0..wanted)
                .map(|i| {
                    let start = (i * plane_len).min(data.len());
                    let end = ((i + 1) * plane_len).min(data.len());
                    let mut plane = data[start..end].to_vec();
                    plane.resize(plane_len, 0);
                    plane
                })
                .collect()
        }
        Compression::Rle => {
            let entry = if header.version.is_psb() { 4 } else { 2 };
            let table = usize::from(header.channels) * header.height as usize * entry;
            let stream = r.rest().get(table..).unwrap_or(&[]);
            let (all, produced) = unpack_bits(stream, plane_len * wanted);
            if produced < all.len() {
                warnings.push(DecodeWarning::new(
                    WarningKind::PaddedChannel,
                    None,
                    format!("merged image rle data ended after {produced} of {} bytes", all.len()),
                ));
            }
            all.chunks(plane_len.max(1)).map(<[u8]>::to_vec).collect()
        }
        other => {
            warnings.push(DecodeWarning::new(
                WarningKind::UnsupportedCompression,
                None,
                format!("merged image uses compression {}; not decoded", other.id()),
            ));
            return None;
        }
    };

    // Re-wrap each plane as a raw channel block: compression id 0 + payload.
    let blocks: Vec<(i16, Vec<u8>)> = planes
        .into_iter()
        .enumerate()
        .map(|(i, plane)| {
            let id = if with_alpha && i == wanted - 1 {
                ALPHA_CHANNEL_ID
            } else {
                i as i16
            };
            let mut block = Vec::with_capacity(plane.len() + 2);
            block.extend_from_slice(&[0, 0]);
            block.extend_from_slice(&plane);
            (id, block)
        })
        .collect();

    let job = MaterializeJob {
        layer: LayerId(u32::MAX),
        rect: Rect::from_size(header.width, header.height),
        channels: blocks
            .iter()
            .map(|(id, data)| ChannelBlock {
                id: *id,
                data: data.as_slice(),
            })
            .collect(),
    };
    let format = PixelFormat {
        color_mode: header.color_mode,
        depth: header.depth,
        version: header.version,
    };
    let out = materialize_layer(&job, format);
    warnings.extend(out.warnings.into_iter().map(|w| DecodeWarning { layer: None, ..w }));
    (!out.raster.is_empty()).then_some(out.raster)
}

#[cfg(test)]
#[path = "../../tests/unit/decode/merged.rs"]
mod tests;
