use rayon::prelude::*;

use crate::{
    decode::{
        header::{parse_header, parse_image_resources, skip_color_mode_data},
        merged::decode_merged_image,
        options::{DecodeOptions, DecodeThreading, ResourceLimits, build_thread_pool},
        reader::ByteReader,
        records::{LayerRecord, parse_layer_and_mask},
        tree::{build_layer_tree, effectively_hidden},
    },
    foundation::error::{PsdError, PsdResult},
    model::document::Document,
    raster::{
        buffer::Raster,
        materialize::{MaterializeJob, Materialized, PixelFormat, materialize_layer},
    },
};

/// Decode a complete PSD/PSB byte buffer into a [`Document`].
///
/// Stages:
/// 1. header, color-mode data and image resources
/// 2. layer records and their channel blocks
/// 3. resource-limit checks (before any raster is allocated)
/// 4. per-layer materialization, optionally on a rayon pool
/// 5. group tree reconstruction and the merged image
///
/// Fatal problems return an error and no document. Everything recoverable is recorded
/// in [`Document::warnings`].
#[tracing::instrument(skip(bytes, opts), fields(len = bytes.len()))]
pub fn decode_document(bytes: &[u8], opts: &DecodeOptions) -> PsdResult<Document> {
    opts.validate()?;

    let mut r = ByteReader::new(bytes);
    let header = parse_header(&mut r)?;
    let canvas = u64::from(header.width) * u64::from(header.height);
    if canvas > opts.limits.max_total_pixels {
        return Err(PsdError::resource_limit(format!(
            "canvas of {canvas} pixels exceeds the total limit of {}",
            opts.limits.max_total_pixels
        )));
    }

    skip_color_mode_data(&mut r)?;
    let resources = parse_image_resources(&mut r)?;

    let mut warnings = Vec::new();
    let info = parse_layer_and_mask(
        &mut r,
        header.version,
        opts.limits.max_layer_count,
        &mut warnings,
    )?;
    tracing::debug!(records = info.records.len(), "layer info parsed");

    let hidden = effectively_hidden(&info.records);
    let wanted: Vec<bool> = info
        .records
        .iter()
        .zip(&hidden)
        .map(|(rec, &hidden)| wants_raster(rec, hidden, opts))
        .collect();
    check_limits(&info.records, &wanted, canvas, &opts.limits)?;

    let format = PixelFormat {
        color_mode: header.color_mode,
        depth: header.depth,
        version: header.version,
    };
    let jobs: Vec<MaterializeJob<'_>> = info
        .records
        .iter()
        .zip(&info.channel_data)
        .zip(&wanted)
        .filter(|(_, wanted)| **wanted)
        .map(|((rec, blocks), _)| MaterializeJob {
            layer: rec.id,
            rect: rec.rect,
            channels: blocks.clone(),
        })
        .collect();

    let mut rasters: Vec<Option<Raster>> = vec![None; info.records.len()];
    for done in run_jobs(&jobs, format, &opts.threading)? {
        warnings.extend(done.warnings);
        if let Some(slot) = rasters.get_mut(done.layer.0 as usize) {
            *slot = Some(done.raster);
        }
    }

    let merged_image = if opts.decode_merged_image {
        decode_merged_image(&mut r, &header, info.merged_alpha, &mut warnings)
    } else {
        None
    };

    let layers = build_layer_tree(info.records, &mut rasters, &mut warnings);
    tracing::debug!(warnings = warnings.len(), "document decoded");

    Ok(Document {
        width: header.width,
        height: header.height,
        version: header.version,
        color_mode: header.color_mode,
        depth: header.depth,
        resolution: resources.resolution,
        merged_alpha: info.merged_alpha,
        layers,
        merged_image,
        warnings,
    })
}

/// Group markers and adjustment layers never carry pixels; everything else does when
/// the options ask for images. Zero-area layers still get an (empty) raster.
fn wants_raster(rec: &LayerRecord, hidden: bool, opts: &DecodeOptions) -> bool {
    opts.extract_images
        && rec.section.is_none()
        && rec.adjustment.is_none()
        && !(opts.skip_hidden_layers && hidden)
        && (rec.has_channel_data() || rec.rect.is_empty())
}

fn check_limits(
    records: &[LayerRecord],
    wanted: &[bool],
    canvas: u64,
    limits: &ResourceLimits,
) -> PsdResult<()> {
    let mut total = canvas;
    for (rec, _) in records.iter().zip(wanted).filter(|(_, w)| **w) {
        let area = rec.rect.area();
        if area > limits.max_layer_pixels {
            return Err(PsdError::resource_limit(format!(
                "layer '{}' has {area} pixels, limit is {}",
                rec.name, limits.max_layer_pixels
            )));
        }
        total = total.saturating_add(area);
    }
    if total > limits.max_total_pixels {
        return Err(PsdError::resource_limit(format!(
            "{total} pixels across canvas and layers exceeds the limit of {}",
            limits.max_total_pixels
        )));
    }
    Ok(())
}

/// Materialize every job. Output order always matches job order.
fn run_jobs(
    jobs: &[MaterializeJob<'_>],
    format: PixelFormat,
    threading: &DecodeThreading,
) -> PsdResult<Vec<Materialized>> {
    if !threading.parallel || jobs.len() < 2 {
        return Ok(jobs.iter().map(|job| materialize_layer(job, format)).collect());
    }

    let pool = build_thread_pool(threading.threads)?;
    Ok(pool.install(|| {
        jobs.par_iter()
            .map(|job| materialize_layer(job, format))
            .collect::<Vec<_>>()
    }))
}

#[cfg(test)]
#[path = "../../tests/unit/decode/document.rs"]
mod tests;
