//! Photoshop action-descriptor reader
//!
//! ABR v6+ stores brush parameters as serialized action descriptors inside
//! the `desc` section. This is the subset of value types that brush presets
//! actually use; unknown types abort the descriptor (the caller falls back
//! to image-only brushes).

use indexmap::IndexMap;

use crate::error::ParseError;
use crate::reader::{ByteReader, Endian};

pub type Descriptor = IndexMap<String, DescriptorValue>;

#[derive(Debug, Clone)]
pub enum DescriptorValue {
    Descriptor(Descriptor),
    List(Vec<DescriptorValue>),
    Double(f64),
    UnitFloat { unit: String, value: f64 },
    String(String),
    Boolean(bool),
    Integer(i32),
    LargeInteger(i64),
    Enum { type_id: String, value: String },
    Class { name: String, class_id: String },
    RawData(Vec<u8>),
    Reference,
}

/// Read a key: 4-byte OSType when the length prefix is zero, otherwise a
/// variable-length ASCII name.
fn read_key(reader: &mut ByteReader<'_>) -> Result<String, ParseError> {
    let len = reader.read_u32(Endian::Big)?;
    let bytes = if len == 0 {
        reader.read_bytes(4)?
    } else {
        reader.read_bytes(len as usize)?
    };
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn read_type(reader: &mut ByteReader<'_>) -> Result<String, ParseError> {
    Ok(String::from_utf8_lossy(reader.read_bytes(4)?).into_owned())
}

/// Parse a top-level descriptor, which carries a leading version field.
pub fn parse_descriptor(reader: &mut ByteReader<'_>) -> Result<Descriptor, ParseError> {
    let version = reader.read_u32(Endian::Big)?;
    if version != 16 {
        return Err(ParseError::CorruptFile(format!(
            "unknown descriptor version {}",
            version
        )));
    }
    parse_descriptor_body(reader)
}

/// Parse a descriptor body: class name, class ID, then counted key/value
/// items. Nested `Objc` values are bodies without the version field.
fn parse_descriptor_body(reader: &mut ByteReader<'_>) -> Result<Descriptor, ParseError> {
    let _name = reader.read_utf16_string(Endian::Big)?;
    let _class_id = read_key(reader)?;

    let count = reader.read_u32(Endian::Big)?;
    let mut items = IndexMap::new();
    for _ in 0..count {
        let key = read_key(reader)?;
        let value_type = read_type(reader)?;
        items.insert(key, parse_value(reader, &value_type)?);
    }
    Ok(items)
}

fn parse_value(
    reader: &mut ByteReader<'_>,
    value_type: &str,
) -> Result<DescriptorValue, ParseError> {
    match value_type {
        "Objc" | "GlbO" => Ok(DescriptorValue::Descriptor(parse_descriptor_body(reader)?)),
        "VlLs" => {
            let count = reader.read_u32(Endian::Big)?;
            // Each item costs at least a 4-byte type tag, which bounds how
            // large a genuine list can be.
            let mut list = Vec::with_capacity((count as usize).min(reader.remaining() / 4));
            for _ in 0..count {
                let item_type = read_type(reader)?;
                list.push(parse_value(reader, &item_type)?);
            }
            Ok(DescriptorValue::List(list))
        }
        "Doub" => Ok(DescriptorValue::Double(reader.read_f64(Endian::Big)?)),
        "UntF" => {
            let unit = read_type(reader)?; // '#Prc', '#Pxl', '#Ang', ...
            let value = reader.read_f64(Endian::Big)?;
            Ok(DescriptorValue::UnitFloat { unit, value })
        }
        "TEXT" => Ok(DescriptorValue::String(
            reader.read_utf16_string(Endian::Big)?,
        )),
        "bool" => Ok(DescriptorValue::Boolean(reader.read_u8()? != 0)),
        "long" => Ok(DescriptorValue::Integer(reader.read_i32(Endian::Big)?)),
        "Comp" => Ok(DescriptorValue::LargeInteger(reader.read_i64(Endian::Big)?)),
        "enum" => {
            let type_id = read_key(reader)?;
            let value = read_key(reader)?;
            Ok(DescriptorValue::Enum { type_id, value })
        }
        "type" | "GlbC" => {
            let name = reader.read_utf16_string(Endian::Big)?;
            let class_id = read_key(reader)?;
            Ok(DescriptorValue::Class { name, class_id })
        }
        "tdta" => {
            let len = reader.read_u32(Endian::Big)?;
            Ok(DescriptorValue::RawData(
                reader.read_bytes(len as usize)?.to_vec(),
            ))
        }
        "obj " => {
            // References barely occur in brush presets; consume the common
            // shapes so the stream stays in sync.
            let count = reader.read_u32(Endian::Big)?;
            for _ in 0..count {
                let ref_type = read_type(reader)?;
                match ref_type.as_str() {
                    "prop" => {
                        let _class = reader.read_utf16_string(Endian::Big)?;
                        let _key = read_key(reader)?;
                        let _id = read_key(reader)?;
                    }
                    "Clss" => {
                        let _name = reader.read_utf16_string(Endian::Big)?;
                        let _key = read_key(reader)?;
                    }
                    "Enmr" => {
                        let _class = reader.read_utf16_string(Endian::Big)?;
                        let _key = read_key(reader)?;
                        let _id = read_key(reader)?;
                        let _value = read_key(reader)?;
                    }
                    other => {
                        return Err(ParseError::CorruptFile(format!(
                            "unhandled reference type {:?}",
                            other
                        )))
                    }
                }
            }
            Ok(DescriptorValue::Reference)
        }
        other => Err(ParseError::CorruptFile(format!(
            "unknown descriptor value type {:?}",
            other
        ))),
    }
}

impl DescriptorValue {
    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            DescriptorValue::Descriptor(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            DescriptorValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DescriptorValue::Double(v) => Some(*v),
            DescriptorValue::UnitFloat { value, .. } => Some(*value),
            DescriptorValue::Integer(v) => Some(*v as f64),
            DescriptorValue::LargeInteger(v) => Some(*v as f64),
            _ => None,
        }
    }
}
