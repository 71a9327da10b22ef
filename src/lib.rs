//! psdcomp decodes layered Photoshop documents (PSD and PSB) and flattens them.
//!
//! # Pipeline overview
//!
//! 1. **Decode**: `&[u8] -> Document` (header, image resources, layer records, channel
//!    data, group tree, merged image)
//! 2. **Composite**: `Document -> Raster` (visible layers blended bottom-to-top onto a
//!    transparent canvas)
//! 3. **Thumbnail** (optional): downsampled copies of the composite and every layer
//!
//! [`ingest`] runs all three in one call.
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Bounded**: every offset is checked against the buffer and [`ResourceLimits`] are
//!   enforced before any raster is allocated.
//! - **Deterministic**: the same bytes and options always produce the same pixels,
//!   whether layers decode sequentially or on a thread pool.
//! - **Straight RGBA8** end-to-end: rasters are not premultiplied.
#![forbid(unsafe_code)]

mod composite;
mod decode;
mod foundation;
mod model;
mod pipeline;
mod raster;

pub use composite::blend::{BlendMode, Rgba8, blend, blend_row};
pub use composite::compositor::{composite_document, composite_layers};
pub use decode::document::decode_document;
pub use decode::options::{DecodeOptions, DecodeThreading, ResourceLimits};
pub use decode::text::parse_type_tool;
pub use foundation::core::{BitDepth, ColorMode, FormatVersion, Rect, Resolution};
pub use foundation::error::{DecodeWarning, PsdError, PsdResult, WarningKind};
pub use model::document::{
    AdjustmentLayer, Document, GroupLayer, ImageLayer, Layer, LayerId, LayerIter, LayerKind,
    TextInfo, TextLayer,
};
pub use pipeline::{IngestOptions, Ingested, LayerThumbnail, Thumbnails, ingest};
pub use raster::buffer::Raster;
pub use raster::channel::unpack_bits;
pub use raster::thumbnail::{make_thumbnail, thumbnail_size};
