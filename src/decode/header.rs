use crate::{
    decode::reader::ByteReader,
    foundation::{
        core::{BitDepth, ColorMode, FormatVersion, Resolution},
        error::{PsdError, PsdResult},
    },
};

pub const SIGNATURE: &[u8; 4] = b"8BPS";
pub const RESOURCE_SIGNATURE: &[u8; 4] = b"8BIM";
pub const RESOLUTION_INFO_ID: u16 = 0x03ED;

/// Fixed 26-byte file header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub version: FormatVersion,
    pub channels: u16,
    pub height: u32,
    pub width: u32,
    pub depth: BitDepth,
    pub color_mode: ColorMode,
}

pub fn parse_header(r: &mut ByteReader<'_>) -> PsdResult<FileHeader> {
    let found = r.read_signature()?;
    if &found != SIGNATURE {
        return Err(PsdError::InvalidSignature { found });
    }

    let version = FormatVersion::from_u16(r.read_u16()?)?;
    r.skip(6)?;
    let channels = r.read_u16()?;
    let height = r.read_u32()?;
    let width = r.read_u32()?;
    let depth = BitDepth::from_u16(r.read_u16()?)?;
    let color_mode = ColorMode::from_u16(r.read_u16()?);

    if !(1..=56).contains(&channels) {
        return Err(PsdError::unsupported(format!(
            "channel count {channels} (expected 1..=56)"
        )));
    }
    let max = version.max_dimension();
    if width == 0 || height == 0 || width > max || height > max {
        return Err(PsdError::unsupported(format!(
            "canvas {width}x{height} outside 1..={max}"
        )));
    }

    Ok(FileHeader {
        version,
        channels,
        height,
        width,
        depth,
        color_mode,
    })
}

/// The color-mode data section is opaque here (palettes, duotone specs).
pub fn skip_color_mode_data(r: &mut ByteReader<'_>) -> PsdResult<()> {
    let len = r.read_u32()?;
    r.skip_u64(u64::from(len))
}

/// Metadata pulled from the image-resources section.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ImageResources {
    pub resolution: Option<Resolution>,
}

/// Walk the image-resources section, keeping only resolution info.
///
/// The section is always consumed by its declared length. A malformed block inside it
/// stops the walk without failing the decode.
pub fn parse_image_resources(r: &mut ByteReader<'_>) -> PsdResult<ImageResources> {
    let len = r.read_u32()?;
    let mut section = r.sub_reader(u64::from(len))?;
    let mut out = ImageResources::default();

    while section.remaining() >= 12 {
        match read_resource_block(&mut section) {
            Ok(Some((id, data))) if id == RESOLUTION_INFO_ID => {
                out.resolution = parse_resolution(data);
            }
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                tracing::debug!(
                    offset = section.absolute_position(),
                    "image resources: stopping at unreadable block"
                );
                break;
            }
        }
    }
    Ok(out)
}

fn read_resource_block<'a>(r: &mut ByteReader<'a>) -> PsdResult<Option<(u16, &'a [u8])>> {
    let sig = r.read_signature()?;
    if &sig != RESOURCE_SIGNATURE {
        return Ok(None);
    }
    let id = r.read_u16()?;
    r.read_pascal_string(2)?;
    let size = r.read_u32()? as usize;
    let start = r.position();
    let data = r.read_bytes(size)?;
    // data is padded to even length; a final block may omit the pad byte
    let end = start.saturating_add(size).saturating_add(size % 2);
    r.seek(end.min(r.len()))?;
    Ok(Some((id, data)))
}

/// ResolutionInfo: 16.16 fixed hRes, u16 unit, u16 width unit, then the same for vertical.
fn parse_resolution(data: &[u8]) -> Option<Resolution> {
    let mut r = ByteReader::new(data);
    let h = r.read_u32().ok()?;
    let h_unit = r.read_u16().ok()?;
    r.skip(2).ok()?;
    let v = r.read_u32().ok()?;
    let v_unit = r.read_u16().ok()?;

    let to_dpi = |fixed: u32, unit: u16| {
        let value = f64::from(fixed) / 65536.0;
        // unit 2 is pixels per centimeter
        if unit == 2 { value * 2.54 } else { value }
    };
    Some(Resolution {
        horizontal_dpi: to_dpi(h, h_unit),
        vertical_dpi: to_dpi(v, v_unit),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/decode/header.rs"]
mod tests;
