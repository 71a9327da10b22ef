use crate::{
    composite::blend::BlendMode,
    decode::records::{LayerRecord, SectionDivider},
    foundation::{
        core::Rect,
        error::{DecodeWarning, WarningKind},
    },
    model::document::{AdjustmentLayer, GroupLayer, ImageLayer, Layer, LayerKind, TextLayer},
    raster::buffer::Raster,
};

/// An open group while walking records: the folder record and the children seen so far
/// (top-to-bottom).
struct Frame {
    header: LayerRecord,
    children: Vec<Layer>,
}

/// Rebuild the layer tree from flat records.
///
/// Records are stored bottom-to-top, so the folder record (divider 1 or 2) sits above
/// its children and the bounding end marker (divider 3) below them. Walking the list in
/// reverse makes the folder record the opening marker and the end marker the closing
/// one; an explicit stack handles arbitrary depth. `rasters` is indexed by record and
/// drained as layers take ownership.
pub fn build_layer_tree(
    records: Vec<LayerRecord>,
    rasters: &mut [Option<Raster>],
    warnings: &mut Vec<DecodeWarning>,
) -> Vec<Layer> {
    let mut root: Vec<Layer> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for rec in records.into_iter().rev() {
        match rec.section {
            Some(divider) if divider.is_start() => stack.push(Frame {
                header: rec,
                children: Vec::new(),
            }),
            Some(SectionDivider::BoundingEnd) => match stack.pop() {
                Some(frame) => {
                    let group = close_group(frame, warnings);
                    push_child(&mut stack, &mut root, group);
                }
                None => warnings.push(DecodeWarning::new(
                    WarningKind::StructuralInconsistency,
                    Some(rec.id),
                    "group end marker without an open group; ignored",
                )),
            },
            _ => {
                let raster = rasters
                    .get_mut(rec.id.0 as usize)
                    .and_then(Option::take);
                let leaf = leaf_layer(rec, raster, warnings);
                push_child(&mut stack, &mut root, leaf);
            }
        }
    }

    while let Some(frame) = stack.pop() {
        warnings.push(DecodeWarning::new(
            WarningKind::StructuralInconsistency,
            Some(frame.header.id),
            format!("group '{}' has no end marker; closed implicitly", frame.header.name),
        ));
        let group = close_group(frame, warnings);
        push_child(&mut stack, &mut root, group);
    }

    root.reverse();
    root
}

/// Per record: hidden itself or inside a hidden group. Indexed like `records`.
pub fn effectively_hidden(records: &[LayerRecord]) -> Vec<bool> {
    let mut out = vec![false; records.len()];
    let mut stack: Vec<bool> = Vec::new();
    for (i, rec) in records.iter().enumerate().rev() {
        let parent_hidden = stack.last().copied().unwrap_or(false);
        match rec.section {
            Some(divider) if divider.is_start() => {
                let hidden = parent_hidden || rec.is_hidden();
                out[i] = hidden;
                stack.push(hidden);
            }
            Some(SectionDivider::BoundingEnd) => {
                out[i] = parent_hidden;
                stack.pop();
            }
            _ => out[i] = parent_hidden || rec.is_hidden(),
        }
    }
    out
}

fn push_child(stack: &mut [Frame], root: &mut Vec<Layer>, layer: Layer) {
    match stack.last_mut() {
        Some(frame) => frame.children.push(layer),
        None => root.push(layer),
    }
}

fn close_group(frame: Frame, warnings: &mut Vec<DecodeWarning>) -> Layer {
    let Frame {
        header,
        mut children,
    } = frame;
    children.reverse();
    let expanded = header.section == Some(SectionDivider::OpenFolder);
    let key = header.section_blend_key.unwrap_or(header.blend_key);
    base_layer(
        &header,
        key,
        Rect::default(),
        LayerKind::Group(GroupLayer { children, expanded }),
        warnings,
    )
}

fn leaf_layer(
    rec: LayerRecord,
    raster: Option<Raster>,
    warnings: &mut Vec<DecodeWarning>,
) -> Layer {
    let kind = if let Some(text) = rec.text.clone() {
        LayerKind::Text(TextLayer { text, raster })
    } else if let Some(key) = rec.adjustment.clone() {
        LayerKind::Adjustment(AdjustmentLayer { key })
    } else {
        LayerKind::Image(ImageLayer { raster })
    };
    base_layer(&rec, rec.blend_key, rec.rect, kind, warnings)
}

fn base_layer(
    rec: &LayerRecord,
    key: [u8; 4],
    rect: Rect,
    kind: LayerKind,
    warnings: &mut Vec<DecodeWarning>,
) -> Layer {
    let blend_key = String::from_utf8_lossy(&key).to_string();
    let blend_mode = BlendMode::from_key(&key).unwrap_or_else(|| {
        warnings.push(DecodeWarning::new(
            WarningKind::UnknownBlendMode,
            Some(rec.id),
            format!("blend key '{blend_key}' not recognized; using normal"),
        ));
        BlendMode::Normal
    });

    Layer {
        id: rec.id,
        name: rec.name.clone(),
        rect,
        opacity: f32::from(rec.opacity) / 255.0,
        fill_opacity: f32::from(rec.fill_opacity) / 255.0,
        blend_mode,
        blend_key,
        visible: !rec.is_hidden(),
        clipped: rec.clipping != 0,
        kind,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/tree.rs"]
mod tests;
