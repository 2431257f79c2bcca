use std::{
    borrow::Borrow,
    io::{Read, Write},
};

use super::{read, write};
use crate::{
    codec::CodecError,
    record::{self, Field, Kind, Value},
};

const TAG_BOOL: u8 = 1;
const TAG_I32: u8 = 2;
const TAG_I64: u8 = 3;
const TAG_U32: u8 = 4;
const TAG_U64: u8 = 5;
const TAG_F32: u8 = 6;
const TAG_F64: u8 = 7;
const TAG_STR: u8 = 8;
const TAG_BYTES: u8 = 9;
const TAG_LIST: u8 = 10;
const TAG_RECORD: u8 = 11;

fn tag(kind: &Kind) -> u8 {
    match kind {
        Kind::Bool => TAG_BOOL,
        Kind::I32 => TAG_I32,
        Kind::I64 => TAG_I64,
        Kind::U32 => TAG_U32,
        Kind::U64 => TAG_U64,
        Kind::F32 => TAG_F32,
        Kind::F64 => TAG_F64,
        Kind::Str => TAG_STR,
        Kind::Bytes => TAG_BYTES,
        Kind::List(_) => TAG_LIST,
        Kind::Record(_) => TAG_RECORD,
    }
}

/// Writes one tagged value. The caller has checked `value` against `kind`.
pub fn write<W: Write>(writer: &mut W, kind: &Kind, value: &Value) -> Result<(), CodecError> {
    write::u8(writer, tag(kind))?;
    match (kind, value) {
        (Kind::Bool, Value::Bool(v)) => write::u8(writer, u8::from(*v))?,
        (Kind::I32, Value::I32(v)) => write::i32(writer, *v)?,
        (Kind::I64, Value::I64(v)) => write::i64(writer, *v)?,
        (Kind::U32, Value::U32(v)) => write::u32(writer, *v)?,
        (Kind::U64, Value::U64(v)) => write::u64(writer, *v)?,
        (Kind::F32, Value::F32(v)) => write::f32(writer, *v)?,
        (Kind::F64, Value::F64(v)) => write::f64(writer, *v)?,
        (Kind::Str, Value::Str(v)) => write::string(writer, v)?,
        (Kind::Bytes, Value::Bytes(v)) => write::array(writer, v)?,
        (Kind::List(inner), Value::List(items)) => {
            let len = u32::try_from(items.len())
                .map_err(|_| CodecError::Encoding(format!("list of {} items", items.len())))?;
            write::u32(writer, len)?;
            for item in items {
                self::write(writer, inner, item)?;
            }
        }
        (Kind::Record(schema), Value::Record(entries)) => {
            write_fields(writer, schema.fields, |field| {
                record::entry(entries, field.name).ok_or_else(|| {
                    CodecError::Encoding(format!("{} has no field {}", schema.name, field.name))
                })
            })?;
        }
        (kind, value) => {
            return Err(CodecError::Encoding(format!(
                "{} cannot be written as {}",
                value.describe(),
                kind
            )));
        }
    }
    Ok(())
}

/// Writes the stored fields of one record: a count, then each field's name
/// and tagged value.
pub fn write_fields<W, V>(
    writer: &mut W,
    fields: &'static [Field],
    mut fetch: impl FnMut(&'static Field) -> Result<V, CodecError>,
) -> Result<(), CodecError>
where
    W: Write,
    V: Borrow<Value>,
{
    let stored: Vec<&'static Field> = fields.iter().filter(|f| f.binary).collect();
    write::u32(writer, stored.len() as u32)?;
    for field in stored {
        let value = fetch(field)?;
        let value = value.borrow();
        if !value.matches(&field.kind) {
            return Err(CodecError::Encoding(format!(
                "field {} declared as {} holds {}",
                field.name,
                field.kind,
                value.describe()
            )));
        }
        write::string(writer, field.name)?;
        self::write(writer, &field.kind, value)?;
    }
    Ok(())
}

/// Reads one tagged value, failing unless the tag matches `kind`. Nested
/// records start from their raw `Default` state.
pub fn read<R: Read>(reader: &mut R, kind: &Kind) -> Result<Value, CodecError> {
    let found = read::u8(reader)?;
    if found != tag(kind) {
        return Err(CodecError::Decoding(format!(
            "expected {} (tag {}), found tag {}",
            kind,
            tag(kind),
            found
        )));
    }
    let value = match kind {
        Kind::Bool => match read::u8(reader)? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => {
                return Err(CodecError::Decoding(format!("invalid bool byte {}", other)));
            }
        },
        Kind::I32 => Value::I32(read::i32(reader)?),
        Kind::I64 => Value::I64(read::i64(reader)?),
        Kind::U32 => Value::U32(read::u32(reader)?),
        Kind::U64 => Value::U64(read::u64(reader)?),
        Kind::F32 => Value::F32(read::f32(reader)?),
        Kind::F64 => Value::F64(read::f64(reader)?),
        Kind::Str => Value::Str(read::string(reader)?),
        Kind::Bytes => Value::Bytes(read::array(reader)?),
        Kind::List(inner) => {
            let len = read::u32(reader)?;
            let mut items = Vec::new();
            for _ in 0..len {
                items.push(self::read(reader, inner)?);
            }
            Value::List(items)
        }
        Kind::Record(schema) => {
            let mut entries = schema.raw().map_err(|e| CodecError::Decoding(e.to_string()))?;
            read_fields(reader, schema.name, schema.fields, |field, value| {
                record::replace(&mut entries, field.name, value)
                    .map_err(|e| CodecError::Decoding(e.to_string()))
            })?;
            Value::Record(entries)
        }
    };
    Ok(value)
}

/// Reads a block written by [`write_fields`], handing each value to
/// `assign`. The block must hold every stored field exactly once.
pub fn read_fields<R: Read>(
    reader: &mut R,
    owner: &str,
    fields: &'static [Field],
    mut assign: impl FnMut(&'static Field, Value) -> Result<(), CodecError>,
) -> Result<(), CodecError> {
    let count = read::u32(reader)? as usize;
    let expected = fields.iter().filter(|f| f.binary).count();
    if count != expected {
        return Err(CodecError::Decoding(format!(
            "{} stores {} fields, payload has {}",
            owner, expected, count
        )));
    }

    let mut seen: Vec<&str> = Vec::with_capacity(expected);
    for _ in 0..count {
        let name = read::string(reader)?;
        let field = fields
            .iter()
            .find(|f| f.binary && f.name == name)
            .ok_or_else(|| CodecError::Decoding(format!("unknown field {}", name)))?;
        if seen.contains(&field.name) {
            return Err(CodecError::Decoding(format!("duplicate field {}", name)));
        }
        let value = self::read(reader, &field.kind)?;
        assign(field, value)?;
        seen.push(field.name);
    }
    Ok(())
}
