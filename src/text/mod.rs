//! XML rendition of a record.
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <Settings version="3">
//!   <name>main</name>
//!   <paths>
//!     <item>/tmp</item>
//!   </paths>
//! </Settings>
//! ```
//!
//! The root tag is [`Record::NAME`]. Attribute fields sit on the root tag,
//! element fields become child tags, ignored fields are left out. Lists nest
//! their values in `item` tags and bytes are written as base64. A nested
//! record is an element named after its field, laid out like the root.

mod reader;

use base64::prelude::*;
use quick_xml::{
    Writer,
    escape::escape,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use std::{
    borrow::Borrow,
    io::{BufRead, Write},
};

use crate::{
    codec::{Codec, CodecError, Format},
    record::{self, Field, Kind, Record, TextRole, Value},
};

pub(crate) const ITEM: &str = "item";

pub struct TextCodec;

impl Codec for TextCodec {
    const FORMAT: Format = Format::Text;

    fn encode<R: Record, W: Write>(record: &R, sink: &mut W) -> Result<(), CodecError> {
        let mut writer = Writer::new_with_indent(sink, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        write_record(&mut writer, R::NAME, R::FIELDS, |field| {
            record
                .get(field.name)
                .map_err(|e| CodecError::Encoding(e.to_string()))
        })
    }

    fn decode<R: Record, S: BufRead>(source: &mut S) -> Result<R, CodecError> {
        reader::decode(source)
    }
}

/// Writes one record as the element `tag`: attribute fields on the tag
/// itself, element fields as children.
fn write_record<W, V>(
    writer: &mut Writer<W>,
    tag: &str,
    fields: &'static [Field],
    mut fetch: impl FnMut(&'static Field) -> Result<V, CodecError>,
) -> Result<(), CodecError>
where
    W: Write,
    V: Borrow<Value>,
{
    let mut start = BytesStart::new(tag);
    let mut elements = Vec::new();
    for field in fields {
        match field.text {
            TextRole::Ignored => {}
            TextRole::Attribute => {
                if !field.kind.is_scalar() {
                    return Err(CodecError::Encoding(format!(
                        "attribute {} must be a scalar, declared as {}",
                        field.name, field.kind
                    )));
                }
                let value = checked(field, fetch(field)?)?;
                let text = escape_text(&scalar_text(field.name, value.borrow())?, true);
                start.push_attribute((field.name.as_bytes(), text.as_bytes()));
            }
            TextRole::Element => elements.push((field, checked(field, fetch(field)?)?)),
        }
    }

    if elements.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for (field, value) in &elements {
        write_element(writer, field.name, &field.kind, value.borrow())?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn checked<V: Borrow<Value>>(field: &Field, value: V) -> Result<V, CodecError> {
    if !value.borrow().matches(&field.kind) {
        return Err(CodecError::Encoding(format!(
            "field {} declared as {} holds {}",
            field.name,
            field.kind,
            value.borrow().describe()
        )));
    }
    Ok(value)
}

fn write_element<W: Write>(
    writer: &mut Writer<W>,
    name: &str,
    kind: &Kind,
    value: &Value,
) -> Result<(), CodecError> {
    let text = match (kind, value) {
        (Kind::Record(schema), Value::Record(entries)) => {
            return write_record(writer, name, schema.fields, |field| {
                record::entry(entries, field.name).ok_or_else(|| {
                    CodecError::Encoding(format!("{} has no field {}", schema.name, field.name))
                })
            });
        }
        (_, Value::List(items)) if items.is_empty() => String::new(),
        (Kind::List(inner), Value::List(items)) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for item in items {
                write_element(writer, ITEM, inner, item)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
            return Ok(());
        }
        (_, scalar) => scalar_text(name, scalar)?,
    };

    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(name)))?;
    } else {
        writer.write_event(Event::Start(BytesStart::new(name)))?;
        writer.write_event(Event::Text(BytesText::from_escaped(escape_text(&text, false))))?;
        writer.write_event(Event::End(BytesEnd::new(name)))?;
    }
    Ok(())
}

/// Whether XML 1.0 can carry `c` at all, escaped or not.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escapes markup characters. Carriage returns, and in attributes also tabs
/// and newlines, become character references so readers do not normalize
/// them away.
fn escape_text(raw: &str, attribute: bool) -> String {
    let escaped = escape(raw);
    let mut out = String::with_capacity(escaped.len());
    for c in escaped.chars() {
        match c {
            '\r' => out.push_str("&#13;"),
            '\n' if attribute => out.push_str("&#10;"),
            '\t' if attribute => out.push_str("&#9;"),
            c => out.push(c),
        }
    }
    out
}

fn scalar_text(name: &str, value: &Value) -> Result<String, CodecError> {
    let text = match value {
        Value::Bool(v) => v.to_string(),
        Value::I32(v) => v.to_string(),
        Value::I64(v) => v.to_string(),
        Value::U32(v) => v.to_string(),
        Value::U64(v) => v.to_string(),
        Value::F32(v) => v.to_string(),
        Value::F64(v) => v.to_string(),
        Value::Bytes(v) => BASE64_STANDARD.encode(v),
        Value::Str(v) => {
            if let Some(c) = v.chars().find(|c| !is_xml_char(*c)) {
                return Err(CodecError::Encoding(format!(
                    "field {} contains U+{:04X}, which XML cannot represent",
                    name, c as u32
                )));
            }
            v.clone()
        }
        Value::List(_) | Value::Record(_) => {
            return Err(CodecError::Encoding(format!(
                "field {} holds {} where a scalar is required",
                name,
                value.describe()
            )));
        }
    };
    Ok(text)
}

pub(crate) fn parse_scalar(name: &str, text: &str, kind: &Kind) -> Result<Value, CodecError> {
    fn bad(name: &str, kind: &Kind, text: &str, err: impl std::fmt::Display) -> CodecError {
        CodecError::Decoding(format!(
            "field {}: '{}' is not a valid {}: {}",
            name, text, kind, err
        ))
    }

    let trimmed = text.trim();
    let value = match kind {
        Kind::Bool => match trimmed {
            "true" | "1" => Value::Bool(true),
            "false" | "0" => Value::Bool(false),
            _ => return Err(bad(name, kind, text, "expected true or false")),
        },
        Kind::I32 => Value::I32(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::I64 => Value::I64(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::U32 => Value::U32(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::U64 => Value::U64(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::F32 => Value::F32(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::F64 => Value::F64(trimmed.parse().map_err(|e| bad(name, kind, text, e))?),
        Kind::Str => Value::Str(text.to_string()),
        Kind::Bytes => Value::Bytes(
            BASE64_STANDARD
                .decode(trimmed)
                .map_err(|e| bad(name, kind, text, e))?,
        ),
        Kind::List(_) | Kind::Record(_) => {
            return Err(CodecError::Decoding(format!(
                "field {} is a {} and needs nested elements",
                name, kind
            )));
        }
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode, encode};
    use crate::record::{FieldError, Vec3};

    #[derive(Debug, Default, PartialEq)]
    struct Profile {
        id: u32,
        name: String,
        scores: Vec<i64>,
        avatar: Vec<u8>,
        secret: String,
        retries: i32,
    }

    impl Record for Profile {
        const NAME: &'static str = "Profile";
        const FIELDS: &'static [Field] = &[
            Field::new("id", Kind::U32).attribute(),
            Field::new("name", Kind::Str),
            Field::new("scores", Kind::List(&Kind::I64)),
            Field::new("avatar", Kind::Bytes),
            Field::new("secret", Kind::Str).ignored(),
            Field::new("retries", Kind::I32),
        ];

        fn construct() -> Self {
            Profile {
                secret: "unset".into(),
                retries: 3,
                ..Default::default()
            }
        }

        fn get(&self, field: &str) -> Result<Value, FieldError> {
            match field {
                "id" => Ok(Value::U32(self.id)),
                "name" => Ok(Value::Str(self.name.clone())),
                "scores" => Ok(Value::List(
                    self.scores.iter().copied().map(Value::I64).collect(),
                )),
                "avatar" => Ok(Value::Bytes(self.avatar.clone())),
                "secret" => Ok(Value::Str(self.secret.clone())),
                "retries" => Ok(Value::I32(self.retries)),
                _ => Err(FieldError::Unknown(field.into())),
            }
        }

        fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
            match (field, value) {
                ("id", Value::U32(v)) => self.id = v,
                ("name", Value::Str(v)) => self.name = v,
                ("scores", Value::List(items)) => {
                    self.scores = items
                        .into_iter()
                        .filter_map(|v| match v {
                            Value::I64(n) => Some(n),
                            _ => None,
                        })
                        .collect()
                }
                ("avatar", Value::Bytes(v)) => self.avatar = v,
                ("secret", Value::Str(v)) => self.secret = v,
                ("retries", Value::I32(v)) => self.retries = v,
                (name, _) => return Err(FieldError::Unknown(name.into())),
            }
            Ok(())
        }
    }

    fn profile() -> Profile {
        Profile {
            id: 42,
            name: "Ann <&> \"Lee\"".into(),
            scores: vec![-1, 0, 9_000_000_000],
            avatar: vec![0, 159, 146, 150],
            secret: "hunter2".into(),
            retries: 5,
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Placement {
        label: String,
        origin: Vec3,
        profile: Profile,
    }

    impl Record for Placement {
        const NAME: &'static str = "Placement";
        const FIELDS: &'static [Field] = &[
            Field::new("label", Kind::Str).attribute(),
            Field::new("origin", Kind::Record(&Vec3::SCHEMA)),
            Field::new("profile", Kind::Record(&Profile::SCHEMA)),
        ];

        fn construct() -> Self {
            Placement {
                profile: Profile::construct(),
                ..Default::default()
            }
        }

        fn get(&self, field: &str) -> Result<Value, FieldError> {
            match field {
                "label" => Ok(Value::Str(self.label.clone())),
                "origin" => Ok(Value::Record(self.origin.to_entries()?)),
                "profile" => Ok(Value::Record(self.profile.to_entries()?)),
                _ => Err(FieldError::Unknown(field.into())),
            }
        }

        fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
            match (field, value) {
                ("label", Value::Str(v)) => self.label = v,
                ("origin", Value::Record(entries)) => self.origin = Vec3::from_entries(entries)?,
                ("profile", Value::Record(entries)) => {
                    self.profile = Profile::from_entries(entries)?
                }
                (name, _) => return Err(FieldError::Unknown(name.into())),
            }
            Ok(())
        }
    }

    fn to_string(bytes: &[u8]) -> String {
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn document_layout() {
        let text = to_string(&encode::<TextCodec, _>(&profile()).unwrap());
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="utf-8"?>"#));
        assert!(text.contains(r#"<Profile id="42">"#));
        assert!(text.contains("<item>9000000000</item>"));
        assert!(text.contains("<retries>5</retries>"));
        assert!(!text.contains("<id>"));
    }

    #[test]
    fn ignored_field_is_absent_and_keeps_constructed_value() {
        let bytes = encode::<TextCodec, _>(&profile()).unwrap();
        assert!(!to_string(&bytes).contains("hunter2"));
        let decoded: Profile = decode::<TextCodec, _>(&bytes).unwrap();
        assert_eq!(decoded.secret, "unset");
    }

    #[test]
    fn round_trip_keeps_participating_fields() {
        let original = profile();
        let decoded: Profile =
            decode::<TextCodec, _>(&encode::<TextCodec, _>(&original).unwrap()).unwrap();
        assert_eq!(decoded.id, original.id);
        assert_eq!(decoded.name, original.name);
        assert_eq!(decoded.scores, original.scores);
        assert_eq!(decoded.avatar, original.avatar);
        assert_eq!(decoded.retries, original.retries);
    }

    #[test]
    fn empty_values_round_trip() {
        let original = Profile::default();
        let bytes = encode::<TextCodec, _>(&original).unwrap();
        assert!(to_string(&bytes).contains("<name/>"));
        let decoded: Profile = decode::<TextCodec, _>(&bytes).unwrap();
        assert_eq!(decoded.name, "");
        assert!(decoded.scores.is_empty());
        assert!(decoded.avatar.is_empty());
        assert_eq!(decoded.retries, 0);
    }

    #[test]
    fn missing_elements_keep_constructed_values() {
        let doc = br#"<?xml version="1.0" encoding="utf-8"?><Profile id="1"><name>x</name></Profile>"#;
        let decoded: Profile = decode::<TextCodec, _>(doc).unwrap();
        assert_eq!(decoded.id, 1);
        assert_eq!(decoded.name, "x");
        assert_eq!(decoded.retries, 3);
    }

    #[test]
    fn attribute_only_record_is_an_empty_root() {
        let bytes = encode::<TextCodec, _>(&Vec3::new(1.5, -2.0, 0.25)).unwrap();
        assert!(to_string(&bytes).contains(r#"<Vec3 x="1.5" y="-2" z="0.25"/>"#));
        let decoded: Vec3 = decode::<TextCodec, _>(&bytes).unwrap();
        assert_eq!(decoded, Vec3::new(1.5, -2.0, 0.25));
    }

    #[test]
    fn control_characters_cannot_be_encoded() {
        let mut record = profile();
        record.name = "bell\u{7}".into();
        assert!(matches!(
            encode::<TextCodec, _>(&record),
            Err(CodecError::Encoding(_))
        ));
    }

    #[test]
    fn c1_controls_round_trip() {
        let mut record = profile();
        record.name = "\u{85}next\u{9F}".into();
        let decoded: Profile =
            decode::<TextCodec, _>(&encode::<TextCodec, _>(&record).unwrap()).unwrap();
        assert_eq!(decoded.name, record.name);
    }

    #[test]
    fn noncharacters_cannot_be_encoded() {
        for name in ["\u{FFFE}", "a\u{FFFF}"] {
            let mut record = profile();
            record.name = name.into();
            assert!(matches!(
                encode::<TextCodec, _>(&record),
                Err(CodecError::Encoding(_))
            ));
        }
    }

    #[test]
    fn whitespace_survives_as_character_references() {
        let record = Placement {
            label: "a\nb\tc\r".into(),
            profile: Profile {
                name: "x\r\ny".into(),
                ..profile()
            },
            ..Default::default()
        };
        let bytes = encode::<TextCodec, _>(&record).unwrap();
        let text = to_string(&bytes);
        assert!(text.contains(r#"label="a&#10;b&#9;c&#13;""#));
        assert!(text.contains("<name>x&#13;\ny</name>"));

        let decoded: Placement = decode::<TextCodec, _>(&bytes).unwrap();
        assert_eq!(decoded.label, record.label);
        assert_eq!(decoded.profile.name, record.profile.name);
    }

    #[test]
    fn nested_records_are_elements() {
        let record = Placement {
            label: "spawn".into(),
            origin: Vec3::new(1.0, 2.0, 3.0),
            profile: profile(),
        };
        let bytes = encode::<TextCodec, _>(&record).unwrap();
        let text = to_string(&bytes);
        assert!(text.contains(r#"<origin x="1" y="2" z="3"/>"#));
        assert!(text.contains(r#"<profile id="42">"#));
        assert!(!text.contains("hunter2"));

        let decoded: Placement = decode::<TextCodec, _>(&bytes).unwrap();
        assert_eq!(decoded.origin, record.origin);
        assert_eq!(decoded.profile.name, record.profile.name);
        assert_eq!(decoded.profile.scores, record.profile.scores);
        assert_eq!(decoded.profile.secret, "unset");
    }

    #[test]
    fn nested_records_start_from_constructed_values() {
        let doc = br#"<Placement label="a"><origin y="4"/><profile><name>n</name></profile></Placement>"#;
        let decoded: Placement = decode::<TextCodec, _>(doc).unwrap();
        assert_eq!(decoded.origin, Vec3::new(0.0, 4.0, 0.0));
        assert_eq!(decoded.profile.name, "n");
        assert_eq!(decoded.profile.retries, 3);
        assert_eq!(decoded.profile.secret, "unset");

        let decoded: Placement = decode::<TextCodec, _>(b"<Placement/>").unwrap();
        assert_eq!(decoded.profile.retries, 3);
    }

    #[test]
    fn decodes_through_a_small_read_buffer() {
        let bytes = encode::<TextCodec, _>(&profile()).unwrap();
        let mut source = std::io::BufReader::with_capacity(3, &bytes[..]);
        let decoded: Profile = TextCodec::decode(&mut source).unwrap();
        assert_eq!(decoded.name, profile().name);
        assert_eq!(decoded.scores, profile().scores);
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let cases: &[&[u8]] = &[
            b"",
            b"not xml at all",
            b"<Profile><name>x</Profile>",
            b"<Other/>",
            b"<Profile><unknown>1</unknown></Profile>",
            b"<Profile><retries>many</retries></Profile>",
            b"<Profile><secret>x</secret></Profile>",
            b"<Profile><name>a</name><name>b</name></Profile>",
            b"<Profile><scores><item>1</item><other/></scores></Profile>",
            b"<Profile/><Profile/>",
            b"<Profile bogus=\"1\"/>",
            b"<Profile><name><b>x</b></name></Profile>",
        ];
        let nested: &[&[u8]] = &[
            b"<Placement><origin w=\"1\"/></Placement>",
            b"<Placement><origin x=\"one\"/></Placement>",
            b"<Placement><origin><x>1</x></origin></Placement>",
            b"<Placement><profile><secret>x</secret></profile></Placement>",
            b"<Placement><origin/><origin/></Placement>",
        ];
        for case in nested {
            let result = decode::<TextCodec, Placement>(case);
            assert!(
                matches!(result, Err(CodecError::Decoding(_))),
                "accepted {:?}",
                to_string(case)
            );
        }
        for case in cases {
            let result = decode::<TextCodec, Profile>(case);
            assert!(
                matches!(result, Err(CodecError::Decoding(_))),
                "accepted {:?}",
                to_string(case)
            );
        }
    }
}
