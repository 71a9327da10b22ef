use rayon::prelude::*;

use crate::{
    composite::blend::{BlendMode, blend_row},
    foundation::{core::Rect, error::PsdResult},
    model::document::{Document, Layer, LayerKind},
    raster::buffer::Raster,
};

/// Flatten the document's visible layers onto a transparent canvas the size of the
/// document.
///
/// Layers are applied bottom-to-top. A layer contributes only when it and every
/// ancestor group are visible. Groups in pass-through mode at full opacity composite
/// their children straight onto the canvas; any other group is flattened on its own
/// transparent canvas first and then blended as a unit.
///
/// The result depends only on the document: rows are blended in parallel but every
/// pixel sees the same sequence of operations.
#[tracing::instrument(skip(doc), fields(width = doc.width, height = doc.height))]
pub fn composite_document(doc: &Document) -> PsdResult<Raster> {
    let mut canvas = Raster::transparent(doc.width, doc.height)?;
    composite_layers(&mut canvas, &doc.layers)?;
    canvas.refresh_transparency();
    Ok(canvas)
}

/// Composite `layers` (bottom-to-top siblings) onto `canvas`, whose origin is the
/// document origin.
pub fn composite_layers(canvas: &mut Raster, layers: &[Layer]) -> PsdResult<()> {
    for layer in layers {
        if !layer.visible {
            continue;
        }
        let opacity = layer.effective_opacity();
        match &layer.kind {
            LayerKind::Group(group) => {
                if !isolates(layer) {
                    composite_layers(canvas, &group.children)?;
                    continue;
                }
                if opacity <= 0.0 {
                    continue;
                }
                let mut scratch = Raster::transparent(canvas.width(), canvas.height())?;
                composite_layers(&mut scratch, &group.children)?;
                blit(canvas, &scratch, (0, 0), layer.blend_mode, opacity)?;
            }
            LayerKind::Adjustment(_) => {
                tracing::trace!(layer = layer.id.0, "adjustment layer not applied");
            }
            LayerKind::Image(_) | LayerKind::Text(_) => {
                let Some(raster) = layer.raster() else {
                    continue;
                };
                if raster.is_empty() || opacity <= 0.0 {
                    continue;
                }
                blit(
                    canvas,
                    raster,
                    (layer.rect.left, layer.rect.top),
                    layer.blend_mode,
                    opacity,
                )?;
            }
        }
    }
    Ok(())
}

fn isolates(group: &Layer) -> bool {
    group.blend_mode != BlendMode::PassThrough || group.effective_opacity() < 1.0
}

/// Blend `src`, placed with its top-left corner at `at`, onto the overlapping part of
/// `canvas`. Pixels outside the canvas are dropped.
fn blit(
    canvas: &mut Raster,
    src: &Raster,
    at: (i32, i32),
    mode: BlendMode,
    opacity: f32,
) -> PsdResult<()> {
    let src_rect = Rect::new(
        at.0,
        at.1,
        at.0.saturating_add(i32::try_from(src.width()).unwrap_or(i32::MAX)),
        at.1.saturating_add(i32::try_from(src.height()).unwrap_or(i32::MAX)),
    );
    let canvas_rect = Rect::from_size(canvas.width(), canvas.height());
    let Some(clip) = canvas_rect.intersect(src_rect) else {
        return Ok(());
    };

    let dst_stride = canvas.width() as usize * 4;
    let src_stride = src.width() as usize * 4;
    let span = clip.width() as usize * 4;
    let dst_x = clip.left as usize * 4;
    let src_x = (clip.left - src_rect.left) as usize * 4;
    let src_y = (clip.top - src_rect.top) as usize;
    let src_data = src.data();

    let (first, last) = (clip.top as usize, clip.bottom as usize);
    let rows = &mut canvas.data_mut()[first * dst_stride..last * dst_stride];
    rows.par_chunks_mut(dst_stride)
        .enumerate()
        .try_for_each(|(i, row)| {
            let start = (src_y + i) * src_stride + src_x;
            blend_row(
                &mut row[dst_x..dst_x + span],
                &src_data[start..start + span],
                mode,
                opacity,
            )
        })
}

#[cfg(test)]
#[path = "../../tests/unit/composite/compositor.rs"]
mod tests;
