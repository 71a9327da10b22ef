use crate::model::document::LayerId;

/// Convenience result type used across psdcomp.
pub type PsdResult<T> = Result<T, PsdError>;

/// Fatal errors. Any of these aborts the decode and no partial document is returned.
#[derive(thiserror::Error, Debug)]
pub enum PsdError {
    /// The first four bytes are not `8BPS`.
    #[error("invalid signature: expected '8BPS', found {found:02x?}")]
    InvalidSignature {
        /// Bytes found at offset 0.
        found: [u8; 4],
    },

    /// A required field extends past the end of the buffer.
    #[error(
        "truncated input: needed {requested} bytes at offset {offset}, only {available} available"
    )]
    TruncatedInput {
        /// Absolute offset of the failed read.
        offset: usize,
        /// Bytes the read asked for.
        requested: usize,
        /// Bytes left in the buffer at that point.
        available: usize,
    },

    /// A caller-configured guard tripped before allocation.
    #[error("resource limit exceeded: {0}")]
    ResourceLimitExceeded(String),

    /// Well-formed container with header values this decoder does not read.
    #[error("unsupported document: {0}")]
    Unsupported(String),

    /// Invalid caller-provided options.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PsdError {
    /// Build a [`PsdError::ResourceLimitExceeded`] value.
    pub fn resource_limit(msg: impl Into<String>) -> Self {
        Self::ResourceLimitExceeded(msg.into())
    }

    /// Build a [`PsdError::Unsupported`] value.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }

    /// Build a [`PsdError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether this error came from a malformed or short input buffer.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature { .. } | Self::TruncatedInput { .. }
        )
    }
}

/// Category of a non-fatal decode problem.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Channel used a compression id other than raw or RLE; it was zero-filled.
    UnsupportedCompression,
    /// Mismatched group markers, bad lengths or unreadable sub-blocks.
    StructuralInconsistency,
    /// RLE data ran out early; the channel was zero-padded.
    PaddedChannel,
    /// Color mode decoded through the grayscale fallback.
    UnsupportedColorMode,
    /// Blend key not recognized; Normal was used.
    UnknownBlendMode,
}

/// A per-layer or per-section problem that did not stop the decode.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecodeWarning {
    /// What went wrong.
    pub kind: WarningKind,
    /// Layer the warning refers to, if any.
    pub layer: Option<LayerId>,
    /// Human-readable detail.
    pub message: String,
}

impl DecodeWarning {
    /// Build a warning and emit it through `tracing`.
    pub fn new(kind: WarningKind, layer: Option<LayerId>, message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(?kind, layer = layer.map(|l| l.0), "{message}");
        Self {
            kind,
            layer,
            message,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
