use crate::{
    composite::blend::BlendMode,
    foundation::{
        core::{BitDepth, ColorMode, FormatVersion, Rect, Resolution},
        error::DecodeWarning,
    },
    raster::buffer::Raster,
};

/// Layer identifier: the index of the layer's record in stored (bottom-to-top) order.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct LayerId(pub u32);

/// A decoded document: header metadata plus the owned layer tree.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Document {
    pub width: u32,
    pub height: u32,
    pub version: FormatVersion,
    pub color_mode: ColorMode,
    pub depth: BitDepth,
    pub resolution: Option<Resolution>,
    /// Set when the stored layer count was negative: the merged image's first extra
    /// channel is real transparency.
    pub merged_alpha: bool,
    /// Top-level layers, bottom-to-top.
    pub layers: Vec<Layer>,
    /// The application's own flattened image, when present and decoded.
    #[serde(skip)]
    pub merged_image: Option<Raster>,
    pub warnings: Vec<DecodeWarning>,
}

impl Document {
    /// Canvas rectangle `(0, 0, width, height)`.
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Depth-first walk over every layer, parents before children, bottom-to-top.
    pub fn iter_layers(&self) -> LayerIter<'_> {
        LayerIter {
            stack: vec![self.layers.iter()],
        }
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.iter_layers().find(|l| l.id == id)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<&Layer> {
        self.iter_layers().find(|l| l.name == name)
    }

    pub fn layer_count(&self) -> usize {
        self.iter_layers().count()
    }
}

/// Iterator returned by [`Document::iter_layers`].
pub struct LayerIter<'a> {
    stack: Vec<std::slice::Iter<'a, Layer>>,
}

impl<'a> Iterator for LayerIter<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(layer) => {
                    if let LayerKind::Group(g) = &layer.kind {
                        self.stack.push(g.children.iter());
                    }
                    return Some(layer);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

/// One node of the layer tree.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    /// Document-space bounds; a group's rect is empty.
    pub rect: Rect,
    /// 0.0..=1.0
    pub opacity: f32,
    /// Fill opacity (`iOpa`), multiplied with `opacity` when compositing.
    pub fill_opacity: f32,
    pub blend_mode: BlendMode,
    /// Blend key as stored, kept for modes that decoded to a fallback.
    pub blend_key: String,
    pub visible: bool,
    /// Clipped to the nearest unclipped layer below it (clipping-mask member).
    pub clipped: bool,
    pub kind: LayerKind,
}

impl Layer {
    pub fn raster(&self) -> Option<&Raster> {
        match &self.kind {
            LayerKind::Image(l) => l.raster.as_ref(),
            LayerKind::Text(l) => l.raster.as_ref(),
            LayerKind::Group(_) | LayerKind::Adjustment(_) => None,
        }
    }

    pub fn children(&self) -> &[Layer] {
        match &self.kind {
            LayerKind::Group(g) => &g.children,
            _ => &[],
        }
    }

    /// `Some(true)` when the materialized raster has any alpha below 255.
    pub fn has_transparency(&self) -> Option<bool> {
        self.raster().map(Raster::has_transparency)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, LayerKind::Group(_))
    }

    pub fn text(&self) -> Option<&TextInfo> {
        match &self.kind {
            LayerKind::Text(t) => Some(&t.text),
            _ => None,
        }
    }

    /// Opacity applied when this layer is blended.
    pub fn effective_opacity(&self) -> f32 {
        (self.opacity * self.fill_opacity).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerKind {
    Image(ImageLayer),
    Text(TextLayer),
    Group(GroupLayer),
    Adjustment(AdjustmentLayer),
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct ImageLayer {
    #[serde(skip)]
    pub raster: Option<Raster>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct TextLayer {
    pub text: TextInfo,
    #[serde(skip)]
    pub raster: Option<Raster>,
}

#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct GroupLayer {
    /// Bottom-to-top.
    pub children: Vec<Layer>,
    /// Folder was open (section divider 1) rather than closed (2).
    pub expanded: bool,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct AdjustmentLayer {
    /// Additional-info key that marked the adjustment, e.g. `levl` or `hue2`.
    pub key: String,
}

/// Text metadata recovered from a type layer.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TextInfo {
    pub content: String,
    /// Points, already scaled by the layer's text transform.
    pub font_size: Option<f32>,
    pub font_family: Option<String>,
    /// Straight RGBA.
    pub fill_color: Option<[u8; 4]>,
}

#[cfg(test)]
#[path = "../../tests/unit/model/document.rs"]
mod tests;
