use crate::{
    decode::reader::ByteReader,
    foundation::error::{PsdError, PsdResult},
};

/// Nesting bound for descriptor objects and lists.
const MAX_DEPTH: usize = 32;

/// Action descriptor ("class descriptor") as embedded in type-layer blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Descriptor {
    pub class_id: String,
    pub items: Vec<(String, DescValue)>,
}

impl Descriptor {
    pub fn get(&self, key: &str) -> Option<&DescValue> {
        self.items.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DescValue {
    Integer(i32),
    LargeInteger(i64),
    Double(f64),
    UnitFloat { unit: String, value: f64 },
    UnitFloats { unit: String, values: Vec<f64> },
    Bool(bool),
    Text(String),
    Enum { type_id: String, value: String },
    Class { name: String, class_id: String },
    Object(Descriptor),
    List(Vec<DescValue>),
    RawData(Vec<u8>),
}

impl DescValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::RawData(d) => Some(d),
            _ => None,
        }
    }
}

pub fn read_descriptor(r: &mut ByteReader<'_>) -> PsdResult<Descriptor> {
    read_descriptor_at(r, 0)
}

fn read_descriptor_at(r: &mut ByteReader<'_>, depth: usize) -> PsdResult<Descriptor> {
    if depth > MAX_DEPTH {
        return Err(PsdError::unsupported("descriptor nesting too deep"));
    }
    r.read_unicode_string()?;
    let class_id = read_key(r)?;
    let count = r.read_u32()?;

    let mut items = Vec::new();
    for _ in 0..count {
        let key = read_key(r)?;
        let value = read_value(r, depth)?;
        items.push((key, value));
    }
    Ok(Descriptor { class_id, items })
}

/// Key or class id: a `u32` length, where 0 means a four-byte key follows.
fn read_key(r: &mut ByteReader<'_>) -> PsdResult<String> {
    let len = r.read_u32()?;
    let len = if len == 0 { 4 } else { len as usize };
    r.read_fixed_string(len)
}

fn read_value(r: &mut ByteReader<'_>, depth: usize) -> PsdResult<DescValue> {
    if depth > MAX_DEPTH {
        return Err(PsdError::unsupported("descriptor nesting too deep"));
    }
    let ty = r.read_signature()?;
    Ok(match &ty {
        b"long" => DescValue::Integer(r.read_i32()?),
        b"comp" => DescValue::LargeInteger(r.read_i64()?),
        b"doub" => DescValue::Double(r.read_f64()?),
        b"UntF" => DescValue::UnitFloat {
            unit: r.read_fixed_string(4)?,
            value: r.read_f64()?,
        },
        b"UnFl" => {
            let unit = r.read_fixed_string(4)?;
            let n = r.read_u32()?;
            let mut values = Vec::new();
            for _ in 0..n {
                values.push(r.read_f64()?);
            }
            DescValue::UnitFloats { unit, values }
        }
        b"bool" => DescValue::Bool(r.read_u8()? != 0),
        b"TEXT" => DescValue::Text(r.read_unicode_string()?),
        b"enum" => DescValue::Enum {
            type_id: read_key(r)?,
            value: read_key(r)?,
        },
        b"type" | b"GlbC" => DescValue::Class {
            name: r.read_unicode_string()?,
            class_id: read_key(r)?,
        },
        b"Objc" | b"GlbO" => DescValue::Object(read_descriptor_at(r, depth + 1)?),
        b"VlLs" => {
            let n = r.read_u32()?;
            let mut list = Vec::new();
            for _ in 0..n {
                list.push(read_value(r, depth + 1)?);
            }
            DescValue::List(list)
        }
        b"tdta" | b"alis" | b"Pth " => {
            let len = r.read_u32()? as usize;
            DescValue::RawData(r.read_bytes(len)?.to_vec())
        }
        other => {
            return Err(PsdError::unsupported(format!(
                "descriptor value type '{}'",
                String::from_utf8_lossy(other)
            )));
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/decode/descriptor.rs"]
mod tests;
