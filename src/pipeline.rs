use rayon::prelude::*;

use crate::{
    composite::compositor::composite_document,
    decode::{
        document::decode_document,
        options::{DecodeOptions, build_thread_pool},
    },
    foundation::error::{PsdError, PsdResult},
    model::document::{Document, Layer, LayerId, LayerKind},
    raster::{buffer::Raster, thumbnail::make_thumbnail},
};

/// Options for [`ingest`]: decode options plus thumbnail generation.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IngestOptions {
    #[serde(flatten)]
    pub decode: DecodeOptions,
    pub generate_thumbnails: bool,
    /// Longest side of every thumbnail, in pixels.
    pub thumbnail_max_dim: u32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            generate_thumbnails: false,
            thumbnail_max_dim: 256,
        }
    }
}

impl IngestOptions {
    pub fn validate(&self) -> PsdResult<()> {
        self.decode.validate()?;
        if self.thumbnail_max_dim == 0 {
            return Err(PsdError::validation("thumbnail_max_dim must be >= 1"));
        }
        Ok(())
    }
}

/// Output of [`ingest`].
#[derive(Clone, Debug)]
pub struct Ingested {
    pub document: Document,
    /// Flattened canvas, `document.width × document.height`.
    pub composite: Raster,
    pub thumbnails: Option<Thumbnails>,
}

#[derive(Clone, Debug)]
pub struct Thumbnails {
    pub composite: Raster,
    /// One entry per layer with a non-empty raster, in depth-first tree order.
    pub layers: Vec<LayerThumbnail>,
}

#[derive(Clone, Debug)]
pub struct LayerThumbnail {
    pub id: LayerId,
    pub raster: Raster,
}

/// Decode, composite and optionally thumbnail a document in one call.
///
/// When no layer paints anything (a file saved without layers, or one whose layers are
/// all hidden) and the file carries a merged image of the canvas size, that image is
/// used as the composite.
#[tracing::instrument(skip(bytes, opts), fields(len = bytes.len()))]
pub fn ingest(bytes: &[u8], opts: &IngestOptions) -> PsdResult<Ingested> {
    opts.validate()?;
    let document = decode_document(bytes, &opts.decode)?;

    let composite = match merged_fallback(&document) {
        Some(merged) => {
            tracing::debug!("no paintable layers; using the merged image");
            merged.clone()
        }
        None => composite_document(&document)?,
    };

    let thumbnails = if opts.generate_thumbnails {
        Some(make_thumbnails(&document, &composite, opts)?)
    } else {
        None
    };

    Ok(Ingested {
        document,
        composite,
        thumbnails,
    })
}

fn merged_fallback(doc: &Document) -> Option<&Raster> {
    let merged = doc.merged_image.as_ref()?;
    if merged.width() != doc.width || merged.height() != doc.height {
        return None;
    }
    (!any_paints(&doc.layers)).then_some(merged)
}

/// Whether any visible layer under visible ancestors carries pixels.
fn any_paints(layers: &[Layer]) -> bool {
    layers.iter().filter(|l| l.visible).any(|l| match &l.kind {
        LayerKind::Group(g) => any_paints(&g.children),
        _ => l.raster().is_some_and(|r| !r.is_empty()),
    })
}

fn make_thumbnails(
    doc: &Document,
    composite: &Raster,
    opts: &IngestOptions,
) -> PsdResult<Thumbnails> {
    let max_dim = opts.thumbnail_max_dim;
    let sources: Vec<(LayerId, &Raster)> = doc
        .iter_layers()
        .filter_map(|l| l.raster().filter(|r| !r.is_empty()).map(|r| (l.id, r)))
        .collect();

    let thumb = |&(id, raster): &(LayerId, &Raster)| -> PsdResult<LayerThumbnail> {
        Ok(LayerThumbnail {
            id,
            raster: make_thumbnail(raster, max_dim)?,
        })
    };

    let threading = &opts.decode.threading;
    let layers = if threading.parallel && sources.len() > 1 {
        let pool = build_thread_pool(threading.threads)?;
        pool.install(|| sources.par_iter().map(thumb).collect::<PsdResult<Vec<_>>>())?
    } else {
        sources.iter().map(thumb).collect::<PsdResult<Vec<_>>>()?
    };

    Ok(Thumbnails {
        composite: make_thumbnail(composite, max_dim)?,
        layers,
    })
}
