use super::*;

fn key(out: &mut Vec<u8>, k: &str) {
    if k.len() == 4 {
        out.extend_from_slice(&0u32.to_be_bytes());
    } else {
        out.extend_from_slice(&(k.len() as u32).to_be_bytes());
    }
    out.extend_from_slice(k.as_bytes());
}

fn unicode(out: &mut Vec<u8>, s: &str) {
    let units: Vec<u16> = s.encode_utf16().collect();
    out.extend_from_slice(&(units.len() as u32).to_be_bytes());
    for u in units {
        out.extend_from_slice(&u.to_be_bytes());
    }
}

fn header(out: &mut Vec<u8>, class: &str, count: u32) {
    unicode(out, "");
    key(out, class);
    out.extend_from_slice(&count.to_be_bytes());
}

#[test]
fn reads_scalar_items() {
    let mut b = Vec::new();
    header(&mut b, "TxLr", 4);
    key(&mut b, "Txt ");
    b.extend_from_slice(b"TEXT");
    unicode(&mut b, "hello");
    key(&mut b, "long");
    b.extend_from_slice(b"long");
    b.extend_from_slice(&(-7i32).to_be_bytes());
    key(&mut b, "flag");
    b.extend_from_slice(b"bool");
    b.push(1);
    key(&mut b, "Sz  ");
    b.extend_from_slice(b"UntF");
    b.extend_from_slice(b"#Pnt");
    b.extend_from_slice(&12.5f64.to_be_bytes());

    let d = read_descriptor(&mut ByteReader::new(&b)).unwrap();
    assert_eq!(d.class_id, "TxLr");
    assert_eq!(d.get("Txt ").and_then(DescValue::as_text), Some("hello"));
    assert_eq!(d.get("long"), Some(&DescValue::Integer(-7)));
    assert_eq!(d.get("flag"), Some(&DescValue::Bool(true)));
    assert_eq!(
        d.get("Sz  "),
        Some(&DescValue::UnitFloat {
            unit: "#Pnt".to_string(),
            value: 12.5
        })
    );
    assert_eq!(d.get("missing"), None);
}

#[test]
fn reads_long_keys_raw_data_and_nested_objects() {
    let mut b = Vec::new();
    header(&mut b, "root", 2);
    key(&mut b, "EngineData");
    b.extend_from_slice(b"tdta");
    b.extend_from_slice(&3u32.to_be_bytes());
    b.extend_from_slice(b"<<>");
    key(&mut b, "inner");
    b.extend_from_slice(b"Objc");
    header(&mut b, "Clr ", 1);
    key(&mut b, "list");
    b.extend_from_slice(b"VlLs");
    b.extend_from_slice(&2u32.to_be_bytes());
    b.extend_from_slice(b"doub");
    b.extend_from_slice(&1.0f64.to_be_bytes());
    b.extend_from_slice(b"enum");
    key(&mut b, "Ornt");
    key(&mut b, "Hrzn");

    let d = read_descriptor(&mut ByteReader::new(&b)).unwrap();
    assert_eq!(d.get("EngineData").and_then(DescValue::as_raw), Some(&b"<<>"[..]));
    let Some(DescValue::Object(inner)) = d.get("inner") else {
        panic!("expected nested object");
    };
    assert_eq!(inner.class_id, "Clr ");
    let Some(DescValue::List(items)) = inner.get("list") else {
        panic!("expected list");
    };
    assert_eq!(items[0], DescValue::Double(1.0));
    assert_eq!(
        items[1],
        DescValue::Enum {
            type_id: "Ornt".to_string(),
            value: "Hrzn".to_string()
        }
    );
}

#[test]
fn unknown_value_type_is_unsupported() {
    let mut b = Vec::new();
    header(&mut b, "root", 1);
    key(&mut b, "what");
    b.extend_from_slice(b"zzzz");
    assert!(matches!(
        read_descriptor(&mut ByteReader::new(&b)),
        Err(PsdError::Unsupported(_))
    ));
}

#[test]
fn deeply_nested_lists_are_rejected() {
    let mut b = Vec::new();
    header(&mut b, "root", 1);
    key(&mut b, "deep");
    for _ in 0..(MAX_DEPTH + 2) {
        b.extend_from_slice(b"VlLs");
        b.extend_from_slice(&1u32.to_be_bytes());
    }
    b.extend_from_slice(b"bool");
    b.push(0);
    assert!(matches!(
        read_descriptor(&mut ByteReader::new(&b)),
        Err(PsdError::Unsupported(_))
    ));
}

#[test]
fn truncated_descriptor_is_input_error() {
    let mut b = Vec::new();
    header(&mut b, "root", 1);
    key(&mut b, "Txt ");
    b.extend_from_slice(b"TEXT");
    b.extend_from_slice(&10u32.to_be_bytes());
    let err = read_descriptor(&mut ByteReader::new(&b)).unwrap_err();
    assert!(err.is_input_error());
}
