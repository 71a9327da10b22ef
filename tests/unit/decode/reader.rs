use super::*;

#[test]
fn reads_big_endian_integers() {
    let data = [0x12, 0x34, 0xff, 0xfe, 0, 0, 0x01, 0x00];
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_u16().unwrap(), 0x1234);
    assert_eq!(r.read_i16().unwrap(), -2);
    assert_eq!(r.read_u32().unwrap(), 256);
    assert_eq!(r.remaining(), 0);
}

#[test]
fn failed_read_reports_offset_and_keeps_cursor() {
    let data = [1, 2, 3];
    let mut r = ByteReader::new(&data);
    r.skip(1).unwrap();
    let err = r.read_u32().unwrap_err();
    match err {
        PsdError::TruncatedInput {
            offset,
            requested,
            available,
        } => {
            assert_eq!(offset, 1);
            assert_eq!(requested, 4);
            assert_eq!(available, 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(r.position(), 1);
}

#[test]
fn pascal_string_respects_padding() {
    // len 3 + "abc" = 4 bytes, already a multiple of 4
    let data = [3, b'a', b'b', b'c', 0xaa];
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_pascal_string(4).unwrap(), "abc");
    assert_eq!(r.position(), 4);

    // len 1 + "x" = 2 bytes, padded to 4
    let data = [1, b'x', 0, 0, 0xbb];
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_pascal_string(4).unwrap(), "x");
    assert_eq!(r.read_u8().unwrap(), 0xbb);
}

#[test]
fn empty_pascal_string_with_even_padding() {
    let data = [0, 0, 7];
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_pascal_string(2).unwrap(), "");
    assert_eq!(r.read_u8().unwrap(), 7);
}

#[test]
fn unicode_string_decodes_utf16_and_trims_nul() {
    let data = [0, 0, 0, 3, 0, b'H', 0, b'i', 0, 0];
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_unicode_string().unwrap(), "Hi");
    assert_eq!(r.remaining(), 0);
}

#[test]
fn unicode_string_with_huge_count_is_truncation() {
    let data = [0xff, 0xff, 0xff, 0xff, 0, 1];
    let mut r = ByteReader::new(&data);
    assert!(matches!(
        r.read_unicode_string(),
        Err(PsdError::TruncatedInput { .. })
    ));
    assert_eq!(r.position(), 0);
}

#[test]
fn length_width_depends_on_format() {
    let data = [0, 0, 0, 0, 0, 0, 0, 9];
    assert_eq!(ByteReader::new(&data).read_length(true).unwrap(), 9);
    assert_eq!(ByteReader::new(&data).read_length(false).unwrap(), 0);
}

#[test]
fn sub_reader_errors_use_absolute_offsets() {
    let data = [0u8; 10];
    let mut r = ByteReader::new(&data);
    r.skip(4).unwrap();
    let mut sub = r.sub_reader(3).unwrap();
    assert_eq!(r.position(), 7);
    sub.skip(2).unwrap();
    match sub.read_u16().unwrap_err() {
        PsdError::TruncatedInput { offset, .. } => assert_eq!(offset, 6),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn sub_reader_longer_than_input_fails() {
    let data = [0u8; 4];
    let mut r = ByteReader::new(&data);
    assert!(r.sub_reader(5).is_err());
    assert_eq!(r.position(), 0);
}

#[test]
fn fixed_string_trims_trailing_nuls() {
    let data = *b"ab\0\0";
    let mut r = ByteReader::new(&data);
    assert_eq!(r.read_fixed_string(4).unwrap(), "ab");
}

#[test]
fn seek_moves_within_bounds_only() {
    let data = [1u8, 2, 3, 4];
    let mut r = ByteReader::new(&data);
    r.seek(3).unwrap();
    assert_eq!(r.read_u8().unwrap(), 4);
    r.seek(r.len()).unwrap();
    assert_eq!(r.remaining(), 0);
    assert!(matches!(r.seek(5), Err(PsdError::TruncatedInput { .. })));
    assert_eq!(r.position(), 4);
}
