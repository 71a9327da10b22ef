use crate::foundation::error::{PsdError, PsdResult};

/// Caller-configured guards against degenerate or hostile input.
///
/// All checks run before any raster is allocated.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of layer records (group markers included).
    pub max_layer_count: u32,
    /// Maximum pixel area of any single layer.
    pub max_layer_pixels: u64,
    /// Maximum canvas area plus the summed area of all layers.
    pub max_total_pixels: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_layer_count: 8192,
            max_layer_pixels: 1 << 28,
            max_total_pixels: 1 << 30,
        }
    }
}

impl ResourceLimits {
    pub fn unlimited() -> Self {
        Self {
            max_layer_count: u32::MAX,
            max_layer_pixels: u64::MAX,
            max_total_pixels: u64::MAX,
        }
    }
}

/// Per-layer decode parallelism.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeThreading {
    /// Decode layer channels on a rayon pool.
    pub parallel: bool,
    /// Pool size; `None` lets rayon decide.
    pub threads: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    pub limits: ResourceLimits,
    /// Materialize layer rasters. When false the tree carries metadata only.
    pub extract_images: bool,
    /// Leave hidden layers without a raster.
    pub skip_hidden_layers: bool,
    /// Decode the image-data section into [`crate::Document::merged_image`].
    pub decode_merged_image: bool,
    pub threading: DecodeThreading,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            limits: ResourceLimits::default(),
            extract_images: true,
            skip_hidden_layers: false,
            decode_merged_image: true,
            threading: DecodeThreading::default(),
        }
    }
}

impl DecodeOptions {
    pub fn validate(&self) -> PsdResult<()> {
        if self.threading.threads == Some(0) {
            return Err(PsdError::validation(
                "decode threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }
}

pub(crate) fn build_thread_pool(threads: Option<usize>) -> PsdResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(PsdError::validation(
            "decode threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| PsdError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/decode/options.rs"]
mod tests;
