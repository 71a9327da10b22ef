use crate::foundation::error::{PsdError, PsdResult};

/// Bounding rectangle in document space. `right`/`bottom` are exclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    /// Build a rectangle; inverted edges collapse to zero area at `(left, top)`.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right: right.max(left),
            bottom: bottom.max(top),
        }
    }

    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(
            0,
            0,
            i32::try_from(width).unwrap_or(i32::MAX),
            i32::try_from(height).unwrap_or(i32::MAX),
        )
    }

    pub fn width(self) -> u32 {
        (i64::from(self.right) - i64::from(self.left)).max(0) as u32
    }

    pub fn height(self) -> u32 {
        (i64::from(self.bottom) - i64::from(self.top)).max(0) as u32
    }

    pub fn area(self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(self) -> bool {
        self.area() == 0
    }

    /// Overlap of two rectangles, `None` when they do not intersect.
    pub fn intersect(self, other: Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect {
            left,
            top,
            right,
            bottom,
        })
    }
}

/// Container variant: classic PSD or large-document PSB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FormatVersion {
    Psd,
    Psb,
}

impl FormatVersion {
    pub fn from_u16(v: u16) -> PsdResult<Self> {
        match v {
            1 => Ok(Self::Psd),
            2 => Ok(Self::Psb),
            other => Err(PsdError::unsupported(format!(
                "file version {other} (expected 1 or 2)"
            ))),
        }
    }

    pub fn is_psb(self) -> bool {
        matches!(self, Self::Psb)
    }

    /// Largest canvas side the format allows.
    pub fn max_dimension(self) -> u32 {
        match self {
            Self::Psd => 30_000,
            Self::Psb => 300_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ColorMode {
    Bitmap,
    Grayscale,
    Indexed,
    Rgb,
    Cmyk,
    Multichannel,
    Duotone,
    Lab,
    /// Mode id outside the documented table.
    Other(u16),
}

impl ColorMode {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::Bitmap,
            1 => Self::Grayscale,
            2 => Self::Indexed,
            3 => Self::Rgb,
            4 => Self::Cmyk,
            7 => Self::Multichannel,
            8 => Self::Duotone,
            9 => Self::Lab,
            other => Self::Other(other),
        }
    }

    /// Number of color (non-alpha) channels in the merged image.
    pub fn color_channels(self) -> u16 {
        match self {
            Self::Rgb | Self::Lab => 3,
            Self::Cmyk => 4,
            _ => 1,
        }
    }
}

/// Bits per channel sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BitDepth {
    One,
    Eight,
    Sixteen,
    ThirtyTwo,
}

impl BitDepth {
    pub fn from_u16(v: u16) -> PsdResult<Self> {
        match v {
            1 => Ok(Self::One),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            32 => Ok(Self::ThirtyTwo),
            other => Err(PsdError::unsupported(format!(
                "bit depth {other} (expected 1, 8, 16 or 32)"
            ))),
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            Self::One => 1,
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::ThirtyTwo => 32,
        }
    }

    /// Stored bytes for one row of `width` samples.
    pub fn row_bytes(self, width: u32) -> usize {
        match self {
            Self::One => (width as usize).div_ceil(8),
            Self::Eight => width as usize,
            Self::Sixteen => width as usize * 2,
            Self::ThirtyTwo => width as usize * 4,
        }
    }
}

/// Document resolution in dots per inch.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Resolution {
    pub horizontal_dpi: f64,
    pub vertical_dpi: f64,
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
