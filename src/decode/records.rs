use crate::{
    decode::{reader::ByteReader, text::parse_type_tool},
    foundation::{
        core::{FormatVersion, Rect},
        error::{DecodeWarning, PsdError, PsdResult, WarningKind},
    },
    model::document::{LayerId, TextInfo},
    raster::materialize::ChannelBlock,
};

const BLOCK_SIGNATURES: [&[u8; 4]; 2] = [b"8BIM", b"8B64"];

/// Additional-info keys whose length field is 64-bit in PSB files.
const LONG_KEYS: [&[u8; 4]; 13] = [
    b"LMsk", b"Lr16", b"Lr32", b"Layr", b"Mt16", b"Mt32", b"Mtrn", b"Alph", b"FMsk", b"lnk2",
    b"FEid", b"FXid", b"PxSD",
];

/// Keys that mark adjustment and fill layers.
const ADJUSTMENT_KEYS: [&[u8; 4]; 20] = [
    b"SoCo", b"GdFl", b"PtFl", b"brit", b"levl", b"curv", b"expA", b"vibA", b"hue ", b"hue2",
    b"blnc", b"blwh", b"phfl", b"mixr", b"clrL", b"nvrt", b"post", b"thrs", b"grdm", b"selc",
];

/// Global additional-info keys that may hold the layer info of 16/32-bit documents.
const DEEP_LAYER_KEYS: [&[u8; 4]; 3] = [b"Lr16", b"Lr32", b"Layr"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: i16,
    /// Stored length including the two-byte compression id.
    pub length: u64,
}

/// Value of an `lsct`/`lsdk` block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SectionDivider {
    OpenFolder,
    ClosedFolder,
    BoundingEnd,
}

impl SectionDivider {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::OpenFolder),
            2 => Some(Self::ClosedFolder),
            3 => Some(Self::BoundingEnd),
            _ => None,
        }
    }

    pub fn is_start(self) -> bool {
        matches!(self, Self::OpenFolder | Self::ClosedFolder)
    }
}

/// One flat layer record as stored, before tree reconstruction.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerRecord {
    pub id: LayerId,
    pub rect: Rect,
    pub channels: Vec<ChannelInfo>,
    pub blend_key: [u8; 4],
    pub opacity: u8,
    pub fill_opacity: u8,
    /// 0 = base, 1 = clipped to the layer below.
    pub clipping: u8,
    pub flags: u8,
    pub name: String,
    pub section: Option<SectionDivider>,
    /// Blend key embedded in the section divider, overriding `blend_key` for groups.
    pub section_blend_key: Option<[u8; 4]>,
    pub text: Option<TextInfo>,
    pub adjustment: Option<String>,
}

impl LayerRecord {
    fn new(id: LayerId) -> Self {
        Self {
            id,
            rect: Rect::default(),
            channels: Vec::new(),
            blend_key: *b"norm",
            opacity: 255,
            fill_opacity: 255,
            clipping: 0,
            flags: 0,
            name: String::new(),
            section: None,
            section_blend_key: None,
            text: None,
            adjustment: None,
        }
    }

    /// Flags bit 1: the layer's eye toggle is off.
    pub fn is_hidden(&self) -> bool {
        self.flags & 0x02 != 0
    }

    pub fn has_channel_data(&self) -> bool {
        self.channels.iter().any(|c| c.length > 2)
    }
}

/// Records plus the channel blocks that follow them, in record order.
#[derive(Clone, Debug, Default)]
pub struct LayerInfo<'a> {
    pub records: Vec<LayerRecord>,
    pub channel_data: Vec<Vec<ChannelBlock<'a>>>,
    /// The stored layer count was negative.
    pub merged_alpha: bool,
}

/// Parse the layer-and-mask-information section.
///
/// The outer reader always advances past the whole section, so the merged image data
/// that follows can be read even when the layer info is empty.
pub fn parse_layer_and_mask<'a>(
    r: &mut ByteReader<'a>,
    version: FormatVersion,
    max_layers: u32,
    warnings: &mut Vec<DecodeWarning>,
) -> PsdResult<LayerInfo<'a>> {
    let wide = version.is_psb();
    let section_len = r.read_length(wide)?;
    let mut section = r.sub_reader(section_len)?;
    if section.is_empty() {
        return Ok(LayerInfo::default());
    }

    let info_len = section.read_length(wide)?;
    let mut info = section.sub_reader(info_len)?;
    let mut parsed = if info.is_empty() {
        LayerInfo::default()
    } else {
        parse_layer_info(&mut info, version, max_layers, warnings)?
    };

    // Global layer mask info, then global additional info.
    if section.remaining() >= 4 {
        let mask_len = section.read_u32()?;
        section.skip_u64(u64::from(mask_len))?;
    }

    while parsed.records.is_empty() && section.remaining() >= 12 {
        skip_padding(&mut section);
        let Ok((key, mut block)) = read_info_block(&mut section, version) else {
            tracing::debug!("global additional info: stopping at unreadable block");
            break;
        };
        if DEEP_LAYER_KEYS.contains(&&key) && !block.is_empty() {
            tracing::debug!(key = %String::from_utf8_lossy(&key), "layer info in global block");
            parsed = parse_layer_info(&mut block, version, max_layers, warnings)?;
        }
    }

    Ok(parsed)
}

/// Layer count, the records, then every record's channel blocks.
pub fn parse_layer_info<'a>(
    r: &mut ByteReader<'a>,
    version: FormatVersion,
    max_layers: u32,
    warnings: &mut Vec<DecodeWarning>,
) -> PsdResult<LayerInfo<'a>> {
    let raw_count = r.read_i16()?;
    let merged_alpha = raw_count < 0;
    let count = raw_count.unsigned_abs();
    if u32::from(count) > max_layers {
        return Err(PsdError::resource_limit(format!(
            "{count} layers exceeds the limit of {max_layers}"
        )));
    }
    tracing::debug!(count, merged_alpha, "layer records");

    let mut records = Vec::with_capacity(usize::from(count));
    for i in 0..u32::from(count) {
        records.push(parse_record(r, version, LayerId(i), warnings)?);
    }

    let mut channel_data = Vec::with_capacity(records.len());
    for record in &records {
        let mut blocks = Vec::with_capacity(record.channels.len());
        for channel in &record.channels {
            let len = usize::try_from(channel.length).map_err(|_| PsdError::TruncatedInput {
                offset: r.absolute_position(),
                requested: usize::MAX,
                available: r.remaining(),
            })?;
            blocks.push(ChannelBlock {
                id: channel.id,
                data: r.read_bytes(len)?,
            });
        }
        channel_data.push(blocks);
    }

    Ok(LayerInfo {
        records,
        channel_data,
        merged_alpha,
    })
}

fn parse_record(
    r: &mut ByteReader<'_>,
    version: FormatVersion,
    id: LayerId,
    warnings: &mut Vec<DecodeWarning>,
) -> PsdResult<LayerRecord> {
    let mut rec = LayerRecord::new(id);

    let top = r.read_i32()?;
    let left = r.read_i32()?;
    let bottom = r.read_i32()?;
    let right = r.read_i32()?;
    if right < left || bottom < top {
        warnings.push(DecodeWarning::new(
            WarningKind::StructuralInconsistency,
            Some(id),
            format!("inverted bounds ({left},{top})-({right},{bottom}); treated as empty"),
        ));
    }
    rec.rect = Rect::new(left, top, right, bottom);

    let channel_count = r.read_u16()?;
    for _ in 0..channel_count {
        rec.channels.push(ChannelInfo {
            id: r.read_i16()?,
            length: r.read_length(version.is_psb())?,
        });
    }

    let sig = r.read_signature()?;
    if &sig != b"8BIM" {
        return Err(PsdError::unsupported(format!(
            "layer record {} has blend signature {sig:02x?}; records are out of sync",
            id.0
        )));
    }
    rec.blend_key = r.read_signature()?;
    rec.opacity = r.read_u8()?;
    rec.clipping = r.read_u8()?;
    rec.flags = r.read_u8()?;
    r.skip(1)?;

    let extra_len = r.read_u32()?;
    let mut extra = r.sub_reader(u64::from(extra_len))?;
    if let Err(e) = parse_extra(&mut extra, &mut rec, version, warnings) {
        warnings.push(DecodeWarning::new(
            WarningKind::StructuralInconsistency,
            Some(id),
            format!("extra layer data unreadable: {e}"),
        ));
    }
    Ok(rec)
}

fn parse_extra(
    r: &mut ByteReader<'_>,
    rec: &mut LayerRecord,
    version: FormatVersion,
    warnings: &mut Vec<DecodeWarning>,
) -> PsdResult<()> {
    let mask_len = r.read_u32()?;
    r.skip_u64(u64::from(mask_len))?;
    let ranges_len = r.read_u32()?;
    r.skip_u64(u64::from(ranges_len))?;
    rec.name = r.read_pascal_string(4)?;

    while r.remaining() >= 12 {
        skip_padding(r);
        let (key, mut block) = read_info_block(r, version)?;
        match &key {
            b"lsct" | b"lsdk" => {
                rec.section = SectionDivider::from_u32(block.read_u32()?);
                if block.remaining() >= 8 && BLOCK_SIGNATURES.contains(&&block.read_signature()?) {
                    rec.section_blend_key = Some(block.read_signature()?);
                }
            }
            b"luni" => {
                let name = block.read_unicode_string()?;
                if !name.is_empty() {
                    rec.name = name;
                }
            }
            b"iOpa" => rec.fill_opacity = block.read_u8()?,
            b"TySh" => {
                let text = parse_type_tool(block.rest()).unwrap_or_else(|e| {
                    warnings.push(DecodeWarning::new(
                        WarningKind::StructuralInconsistency,
                        Some(rec.id),
                        format!("type tool data unreadable: {e}"),
                    ));
                    TextInfo::default()
                });
                rec.text = Some(text);
            }
            k if ADJUSTMENT_KEYS.contains(&k) => {
                rec.adjustment = Some(String::from_utf8_lossy(k).to_string());
            }
            _ => {}
        }
    }
    Ok(())
}

/// `8BIM`/`8B64` signature, key, length and body of one additional-info block.
fn read_info_block<'a>(
    r: &mut ByteReader<'a>,
    version: FormatVersion,
) -> PsdResult<([u8; 4], ByteReader<'a>)> {
    let sig = r.read_signature()?;
    if !BLOCK_SIGNATURES.contains(&&sig) {
        return Err(PsdError::unsupported(format!(
            "additional info signature {sig:02x?}"
        )));
    }
    let key = r.read_signature()?;
    let wide = version.is_psb() && LONG_KEYS.contains(&&key);
    let len = r.read_length(wide)?;
    let block = r.sub_reader(len)?;
    Ok((key, block))
}

/// Some writers pad blocks past their declared length; signatures never start with 0.
fn skip_padding(r: &mut ByteReader<'_>) {
    for _ in 0..3 {
        if r.rest().first() != Some(&0) {
            break;
        }
        if r.skip(1).is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/records.rs"]
mod tests;
