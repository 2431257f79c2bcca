use quick_xml::{
    Reader,
    events::{BytesStart, BytesText, Event},
};
use std::io::BufRead;

use super::{ITEM, parse_scalar};
use crate::{
    codec::CodecError,
    record::{self, Field, Kind, Record, TextRole, Value},
};

/// Builds the record through its construction path, then overwrites the
/// fields found in the document.
pub fn decode<R: Record, S: BufRead>(source: &mut S) -> Result<R, CodecError> {
    let mut reader = Reader::from_reader(source);
    let mut record = R::construct();
    let mut assign = |field: &'static Field, value: Value| {
        record
            .set(field.name, value)
            .map_err(|e| CodecError::Decoding(e.to_string()))
    };
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(root) => {
                check_root::<R>(&root)?;
                read_record(&mut reader, &root, false, R::FIELDS, &mut assign)?;
                break;
            }
            Event::Empty(root) => {
                check_root::<R>(&root)?;
                read_record(&mut reader, &root, true, R::FIELDS, &mut assign)?;
                break;
            }
            Event::Text(text) => ensure_blank(&text)?,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => {
                return Err(CodecError::Decoding("document has no root element".into()));
            }
            other => {
                return Err(CodecError::Decoding(format!(
                    "unexpected {:?} before the root element",
                    other
                )));
            }
        }
        buf.clear();
    }

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Eof => break,
            Event::Text(text) => ensure_blank(&text)?,
            Event::Comment(_) | Event::PI(_) => {}
            other => {
                return Err(CodecError::Decoding(format!(
                    "unexpected {:?} after the root element",
                    other
                )));
            }
        }
    }
    Ok(record)
}

fn check_root<R: Record>(root: &BytesStart) -> Result<(), CodecError> {
    if root.name().as_ref() != R::NAME.as_bytes() {
        return Err(CodecError::Decoding(format!(
            "root element is {}, expected {}",
            String::from_utf8_lossy(root.name().as_ref()),
            R::NAME
        )));
    }
    Ok(())
}

type Assign<'a> = dyn FnMut(&'static Field, Value) -> Result<(), CodecError> + 'a;

/// Reads a record element whose start tag was just consumed: its attributes,
/// then its children unless the tag was empty.
fn read_record<B: BufRead>(
    reader: &mut Reader<B>,
    start: &BytesStart,
    empty: bool,
    fields: &'static [Field],
    assign: &mut Assign<'_>,
) -> Result<(), CodecError> {
    let owner = owned_name(start)?;
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| CodecError::Decoding(e.to_string()))?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        let field = fields
            .iter()
            .find(|f| f.text == TextRole::Attribute && f.name == key)
            .ok_or_else(|| {
                CodecError::Decoding(format!("unknown attribute {} on {}", key, owner))
            })?;
        let value = parse_scalar(field.name, &attr.unescape_value()?, &field.kind)?;
        assign(field, value)?;
    }
    if empty {
        return Ok(());
    }

    let mut seen: Vec<&str> = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let (child, empty) = match reader.read_event_into(&mut buf)? {
            Event::Start(e) => (e, false),
            Event::Empty(e) => (e, true),
            Event::End(_) => return Ok(()),
            Event::Text(text) => {
                ensure_blank(&text)?;
                continue;
            }
            Event::Comment(_) | Event::PI(_) => continue,
            Event::Eof => {
                return Err(CodecError::Decoding(format!("{} is never closed", owner)));
            }
            other => {
                return Err(CodecError::Decoding(format!(
                    "unexpected {:?} inside {}",
                    other, owner
                )));
            }
        };

        let name = owned_name(&child)?;
        let field = fields
            .iter()
            .find(|f| f.text == TextRole::Element && f.name == name)
            .ok_or_else(|| CodecError::Decoding(format!("unknown element {}", name)))?;
        if seen.contains(&field.name) {
            return Err(CodecError::Decoding(format!("duplicate element {}", name)));
        }
        let value = read_value(reader, &child, empty, field.name, &field.kind)?;
        assign(field, value)?;
        seen.push(field.name);
    }
}

/// Reads the value of an element whose start tag was just consumed. Nested
/// records start from their constructed state.
fn read_value<B: BufRead>(
    reader: &mut Reader<B>,
    start: &BytesStart,
    empty: bool,
    name: &str,
    kind: &Kind,
) -> Result<Value, CodecError> {
    if let Kind::Record(schema) = kind {
        let mut entries = schema
            .constructed()
            .map_err(|e| CodecError::Decoding(e.to_string()))?;
        let mut assign = |field: &'static Field, value: Value| {
            record::replace(&mut entries, field.name, value)
                .map_err(|e| CodecError::Decoding(e.to_string()))
        };
        read_record(reader, start, empty, schema.fields, &mut assign)?;
        return Ok(Value::Record(entries));
    }
    if empty {
        return empty_value(name, kind);
    }

    let mut buf = Vec::new();
    if let Kind::List(inner) = kind {
        let mut items = Vec::new();
        loop {
            buf.clear();
            let (item, empty) = match reader.read_event_into(&mut buf)? {
                Event::Start(e) => (e, false),
                Event::Empty(e) => (e, true),
                Event::End(_) => return Ok(Value::List(items)),
                Event::Text(text) => {
                    ensure_blank(&text)?;
                    continue;
                }
                Event::Comment(_) => continue,
                other => {
                    return Err(CodecError::Decoding(format!(
                        "unexpected {:?} in list {}",
                        other, name
                    )));
                }
            };
            let tag = owned_name(&item)?;
            if tag != ITEM {
                return Err(CodecError::Decoding(format!(
                    "list {} holds {}, expected {}",
                    name, tag, ITEM
                )));
            }
            items.push(read_value(reader, &item, empty, name, inner)?);
        }
    }

    let mut content = String::new();
    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Text(text) => content.push_str(&text.unescape()?),
            Event::CData(data) => content.push_str(
                std::str::from_utf8(&data).map_err(|e| CodecError::Decoding(e.to_string()))?,
            ),
            Event::Comment(_) => {}
            Event::End(_) => break,
            other => {
                return Err(CodecError::Decoding(format!(
                    "unexpected {:?} in field {}",
                    other, name
                )));
            }
        }
    }
    parse_scalar(name, &content, kind)
}

fn empty_value(name: &str, kind: &Kind) -> Result<Value, CodecError> {
    match kind {
        Kind::Str => Ok(Value::Str(String::new())),
        Kind::Bytes => Ok(Value::Bytes(Vec::new())),
        Kind::List(_) => Ok(Value::List(Vec::new())),
        _ => Err(CodecError::Decoding(format!(
            "field {} is empty, expected {}",
            name, kind
        ))),
    }
}

fn owned_name(start: &BytesStart) -> Result<String, CodecError> {
    String::from_utf8(start.name().as_ref().to_vec())
        .map_err(|e| CodecError::Decoding(e.to_string()))
}

fn ensure_blank(text: &BytesText) -> Result<(), CodecError> {
    if text.iter().all(u8::is_ascii_whitespace) {
        Ok(())
    } else {
        Err(CodecError::Decoding(format!(
            "unexpected text '{}'",
            String::from_utf8_lossy(text)
        )))
    }
}
