use crate::{
    decode::{descriptor::read_descriptor, reader::ByteReader},
    foundation::error::{PsdError, PsdResult},
    model::document::TextInfo,
};

/// Parse a `TySh` (type tool object) block into text metadata.
pub fn parse_type_tool(data: &[u8]) -> PsdResult<TextInfo> {
    let mut r = ByteReader::new(data);
    let version = r.read_u16()?;
    if version != 1 {
        return Err(PsdError::unsupported(format!("type tool version {version}")));
    }
    let mut transform = [0f64; 6];
    for v in &mut transform {
        *v = r.read_f64()?;
    }
    let _text_version = r.read_u16()?;
    let _descriptor_version = r.read_u32()?;
    let desc = read_descriptor(&mut r)?;

    let content = desc
        .get("Txt ")
        .and_then(|v| v.as_text())
        .unwrap_or_default()
        .replace('\r', "\n");

    let mut info = TextInfo {
        content,
        ..TextInfo::default()
    };
    if let Some(engine) = desc.get("EngineData").and_then(|v| v.as_raw()) {
        let scale = transform[3];
        let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
        info.font_size = engine_font_size(engine).map(|s| (f64::from(s) * scale) as f32);
        info.font_family = engine_font_family(engine);
        info.fill_color = engine_fill_color(engine);
    }
    Ok(info)
}

pub fn engine_font_size(engine: &[u8]) -> Option<f32> {
    let at = find(engine, b"/FontSize", 0)?;
    parse_number(engine, at + b"/FontSize".len()).map(|(v, _)| v)
}

/// First font name listed under `/FontSet`.
pub fn engine_font_family(engine: &[u8]) -> Option<String> {
    let set = find(engine, b"/FontSet", 0)?;
    let name = find(engine, b"/Name", set)?;
    let open = find(engine, b"(", name)?;
    let name = parse_string(engine, open + 1)?;
    (!name.is_empty()).then_some(name)
}

/// First `/FillColor` as straight RGBA. Engine data stores `[a r g b]` in 0..=1.
pub fn engine_fill_color(engine: &[u8]) -> Option<[u8; 4]> {
    let fill = find(engine, b"/FillColor", 0)?;
    let values = find(engine, b"/Values", fill)?;
    let mut pos = find(engine, b"[", values)? + 1;
    let mut argb = [0f32; 4];
    for v in &mut argb {
        let (n, next) = parse_number(engine, pos)?;
        *v = n;
        pos = next;
    }
    let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Some([c(argb[1]), c(argb[2]), c(argb[3]), c(argb[0])])
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn parse_number(data: &[u8], from: usize) -> Option<(f32, usize)> {
    let mut i = from;
    while i < data.len() && data[i].is_ascii_whitespace() {
        i += 1;
    }
    let start = i;
    while i < data.len() && (data[i].is_ascii_digit() || data[i] == b'.' || data[i] == b'-') {
        i += 1;
    }
    let s = std::str::from_utf8(&data[start..i]).ok()?;
    s.parse::<f32>().ok().map(|v| (v, i))
}

/// Engine-data string body after `(`; UTF-16BE when it starts with a BOM.
fn parse_string(data: &[u8], from: usize) -> Option<String> {
    let mut raw = Vec::new();
    let mut i = from;
    loop {
        let b = *data.get(i)?;
        match b {
            b'\\' => {
                raw.push(*data.get(i + 1)?);
                i += 2;
            }
            b')' => break,
            _ => {
                raw.push(b);
                i += 1;
            }
        }
    }

    let text = if raw.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = raw[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        raw.iter().map(|&b| char::from(b)).collect()
    };
    Some(text.trim_end_matches('\0').to_string())
}

#[cfg(test)]
#[path = "../../tests/unit/decode/text.rs"]
mod tests;
