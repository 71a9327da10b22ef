use super::*;

fn header_bytes(version: u16, channels: u16, height: u32, width: u32, depth: u16, mode: u16) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"8BPS");
    out.extend_from_slice(&version.to_be_bytes());
    out.extend_from_slice(&[0; 6]);
    out.extend_from_slice(&channels.to_be_bytes());
    out.extend_from_slice(&height.to_be_bytes());
    out.extend_from_slice(&width.to_be_bytes());
    out.extend_from_slice(&depth.to_be_bytes());
    out.extend_from_slice(&mode.to_be_bytes());
    out
}

fn resource_block(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"8BIM");
    out.extend_from_slice(&id.to_be_bytes());
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn resolution_payload(h_dpi: u32, unit: u16) -> Vec<u8> {
    let mut out = Vec::new();
    for _ in 0..2 {
        out.extend_from_slice(&(h_dpi << 16).to_be_bytes());
        out.extend_from_slice(&unit.to_be_bytes());
        out.extend_from_slice(&1u16.to_be_bytes());
    }
    out
}

#[test]
fn parses_rgb_header() {
    let bytes = header_bytes(1, 4, 30, 40, 8, 3);
    let mut r = ByteReader::new(&bytes);
    let h = parse_header(&mut r).unwrap();
    assert_eq!(h.version, FormatVersion::Psd);
    assert_eq!(h.channels, 4);
    assert_eq!((h.width, h.height), (40, 30));
    assert_eq!(h.depth, BitDepth::Eight);
    assert_eq!(h.color_mode, ColorMode::Rgb);
    assert_eq!(r.position(), 26);
}

#[test]
fn rejects_bad_signature() {
    let mut bytes = header_bytes(1, 3, 1, 1, 8, 3);
    bytes[..4].copy_from_slice(b"\x89PNG");
    let err = parse_header(&mut ByteReader::new(&bytes)).unwrap_err();
    assert!(matches!(err, PsdError::InvalidSignature { found } if &found == b"\x89PNG"));
}

#[test]
fn rejects_unknown_version_and_depth() {
    let bytes = header_bytes(3, 3, 1, 1, 8, 3);
    assert!(matches!(
        parse_header(&mut ByteReader::new(&bytes)),
        Err(PsdError::Unsupported(_))
    ));
    let bytes = header_bytes(1, 3, 1, 1, 12, 3);
    assert!(matches!(
        parse_header(&mut ByteReader::new(&bytes)),
        Err(PsdError::Unsupported(_))
    ));
}

#[test]
fn dimension_limit_depends_on_version() {
    let bytes = header_bytes(1, 3, 40_000, 10, 8, 3);
    assert!(parse_header(&mut ByteReader::new(&bytes)).is_err());
    let bytes = header_bytes(2, 3, 40_000, 10, 8, 3);
    let h = parse_header(&mut ByteReader::new(&bytes)).unwrap();
    assert!(h.version.is_psb());
}

#[test]
fn rejects_zero_channels_and_zero_size() {
    let bytes = header_bytes(1, 0, 1, 1, 8, 3);
    assert!(parse_header(&mut ByteReader::new(&bytes)).is_err());
    let bytes = header_bytes(1, 3, 0, 1, 8, 3);
    assert!(parse_header(&mut ByteReader::new(&bytes)).is_err());
}

#[test]
fn truncated_header_is_input_error() {
    let bytes = header_bytes(1, 3, 1, 1, 8, 3);
    let err = parse_header(&mut ByteReader::new(&bytes[..20])).unwrap_err();
    assert!(err.is_input_error());
}

#[test]
fn color_mode_data_is_skipped() {
    let mut bytes = 3u32.to_be_bytes().to_vec();
    bytes.extend_from_slice(&[1, 2, 3, 9]);
    let mut r = ByteReader::new(&bytes);
    skip_color_mode_data(&mut r).unwrap();
    assert_eq!(r.read_u8().unwrap(), 9);
}

#[test]
fn resolution_resource_is_decoded() {
    let mut section = resource_block(0x0404, &[1, 2, 3]);
    section.extend(resource_block(RESOLUTION_INFO_ID, &resolution_payload(72, 1)));
    let mut bytes = (section.len() as u32).to_be_bytes().to_vec();
    bytes.extend(section);
    bytes.push(0xee);

    let mut r = ByteReader::new(&bytes);
    let res = parse_image_resources(&mut r).unwrap();
    let dpi = res.resolution.unwrap();
    assert!((dpi.horizontal_dpi - 72.0).abs() < 1e-9);
    assert!((dpi.vertical_dpi - 72.0).abs() < 1e-9);
    assert_eq!(r.read_u8().unwrap(), 0xee);
}

#[test]
fn resolution_in_pixels_per_cm_converts_to_dpi() {
    let section = resource_block(RESOLUTION_INFO_ID, &resolution_payload(100, 2));
    let mut bytes = (section.len() as u32).to_be_bytes().to_vec();
    bytes.extend(section);
    let res = parse_image_resources(&mut ByteReader::new(&bytes)).unwrap();
    assert!((res.resolution.unwrap().horizontal_dpi - 254.0).abs() < 1e-9);
}

#[test]
fn garbage_resource_block_stops_walk_but_section_is_consumed() {
    let section = b"XXXXjunkjunkjunk".to_vec();
    let mut bytes = (section.len() as u32).to_be_bytes().to_vec();
    bytes.extend(section);
    bytes.push(0x42);
    let mut r = ByteReader::new(&bytes);
    let res = parse_image_resources(&mut r).unwrap();
    assert_eq!(res.resolution, None);
    assert_eq!(r.read_u8().unwrap(), 0x42);
}

#[test]
fn odd_resource_without_trailing_pad_ends_the_walk_cleanly() {
    let mut section = resource_block(RESOLUTION_INFO_ID, &resolution_payload(300, 1));
    let mut last = resource_block(0x0404, &[1, 2, 3]);
    last.pop();
    section.extend(last);
    let mut bytes = (section.len() as u32).to_be_bytes().to_vec();
    bytes.extend(section);
    bytes.push(0x5a);

    let mut r = ByteReader::new(&bytes);
    let res = parse_image_resources(&mut r).unwrap();
    assert!((res.resolution.unwrap().horizontal_dpi - 300.0).abs() < 1e-9);
    assert_eq!(r.read_u8().unwrap(), 0x5a);
}
