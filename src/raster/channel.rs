use crate::foundation::core::{BitDepth, FormatVersion};

/// Channel compression id (first two bytes of every channel block).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compression {
    Raw,
    Rle,
    Zip,
    ZipPredicted,
    Unknown(u16),
}

impl Compression {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0 => Self::Raw,
            1 => Self::Rle,
            2 => Self::Zip,
            3 => Self::ZipPredicted,
            other => Self::Unknown(other),
        }
    }

    pub fn id(self) -> u16 {
        match self {
            Self::Raw => 0,
            Self::Rle => 1,
            Self::Zip => 2,
            Self::ZipPredicted => 3,
            Self::Unknown(v) => v,
        }
    }
}

/// Problem noticed while decoding one channel. None of these are fatal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelIssue {
    /// Compression other than raw/RLE; samples are all zero.
    UnsupportedCompression(u16),
    /// Raw payload size does not match the declared rectangle.
    LengthMismatch { expected: usize, actual: usize },
    /// RLE stream ended early; the tail was zero-padded.
    Padded { produced: usize, expected: usize },
}

/// Planar 8-bit samples for one channel, `width * height` long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedChannel {
    pub samples: Vec<u8>,
    pub issue: Option<ChannelIssue>,
}

/// Geometry of the plane a channel block describes.
#[derive(Clone, Copy, Debug)]
pub struct PlaneGeometry {
    pub width: u32,
    pub height: u32,
    pub depth: BitDepth,
    pub version: FormatVersion,
}

impl PlaneGeometry {
    /// Stored bytes for the whole plane at the native depth.
    pub fn stored_len(self) -> usize {
        self.depth.row_bytes(self.width) * self.height as usize
    }

    pub fn sample_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one entry in an RLE row-length table.
    fn row_count_size(self) -> usize {
        if self.version.is_psb() { 4 } else { 2 }
    }
}

/// Decode one channel block (compression id + payload) into 8-bit planar samples.
///
/// Raw data is truncated or zero-padded to the expected size and flagged when the
/// size disagrees. RLE data skips the per-row length table and then decodes one
/// continuous PackBits stream until the plane is full.
pub fn decode_channel(block: &[u8], geometry: PlaneGeometry) -> DecodedChannel {
    let expected = geometry.stored_len();
    let zeros = || vec![0u8; geometry.sample_count()];

    if block.len() < 2 {
        return DecodedChannel {
            samples: zeros(),
            issue: (expected > 0).then_some(ChannelIssue::LengthMismatch {
                expected,
                actual: 0,
            }),
        };
    }

    let compression = Compression::from_u16(u16::from_be_bytes([block[0], block[1]]));
    let payload = &block[2..];

    let (stored, issue) = match compression {
        Compression::Raw => {
            let issue = (payload.len() != expected).then_some(ChannelIssue::LengthMismatch {
                expected,
                actual: payload.len(),
            });
            let mut stored = payload[..payload.len().min(expected)].to_vec();
            stored.resize(expected, 0);
            (stored, issue)
        }
        Compression::Rle => {
            let table = geometry.height as usize * geometry.row_count_size();
            let stream = payload.get(table..).unwrap_or(&[]);
            let (stored, produced) = unpack_bits(stream, expected);
            let issue =
                (produced < expected).then_some(ChannelIssue::Padded { produced, expected });
            (stored, issue)
        }
        other => {
            return DecodedChannel {
                samples: zeros(),
                issue: Some(ChannelIssue::UnsupportedCompression(other.id())),
            };
        }
    };

    DecodedChannel {
        samples: to_8bit(&stored, geometry),
        issue,
    }
}

/// PackBits decoder. Returns exactly `expected` bytes (zero-padded when the input
/// runs out) and the number of bytes actually produced from the stream.
pub fn unpack_bits(input: &[u8], expected: usize) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(expected);
    let mut i = 0usize;

    while out.len() < expected && i < input.len() {
        let control = input[i];
        i += 1;
        match control {
            0..=127 => {
                let n = usize::from(control) + 1;
                let end = (i + n).min(input.len());
                let take = (end - i).min(expected - out.len());
                out.extend_from_slice(&input[i..i + take]);
                i = end;
            }
            128 => {}
            129..=255 => {
                let Some(&value) = input.get(i) else {
                    break;
                };
                i += 1;
                let n = (257 - usize::from(control)).min(expected - out.len());
                out.extend(std::iter::repeat_n(value, n));
            }
        }
    }

    let produced = out.len();
    out.resize(expected, 0);
    (out, produced)
}

/// Reduce stored samples to one byte per pixel.
pub(crate) fn to_8bit(stored: &[u8], geometry: PlaneGeometry) -> Vec<u8> {
    match geometry.depth {
        BitDepth::Eight => stored.to_vec(),
        BitDepth::Sixteen => stored.chunks_exact(2).map(|c| c[0]).collect(),
        BitDepth::ThirtyTwo => stored
            .chunks_exact(4)
            .map(|c| {
                let v = f32::from_be_bytes([c[0], c[1], c[2], c[3]]);
                if v.is_finite() {
                    (v.clamp(0.0, 1.0) * 255.0).round() as u8
                } else {
                    0
                }
            })
            .collect(),
        BitDepth::One => {
            let row_bytes = geometry.depth.row_bytes(geometry.width);
            let mut out = Vec::with_capacity(geometry.sample_count());
            if row_bytes == 0 {
                return out;
            }
            for row in stored.chunks_exact(row_bytes) {
                for x in 0..geometry.width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    out.push(if bit == 1 { 0 } else { 255 });
                }
            }
            out
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/channel.rs"]
mod tests;
