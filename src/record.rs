use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FieldError {
    #[error("Record has no field named {0}")]
    Unknown(String),
    #[error("Field {0} holds a value that cannot be persisted: {1}")]
    Unsupported(String, String),
    #[error("Field {field} expects {expected}, got {found}")]
    Mismatch {
        field: String,
        expected: Kind,
        found: String,
    },
}

/// Shape of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Str,
    Bytes,
    List(&'static Kind),
    /// Another record, stored inline.
    Record(&'static Schema),
}

impl Kind {
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Kind::List(_) | Kind::Record(_))
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Bool => f.write_str("bool"),
            Kind::I32 => f.write_str("i32"),
            Kind::I64 => f.write_str("i64"),
            Kind::U32 => f.write_str("u32"),
            Kind::U64 => f.write_str("u64"),
            Kind::F32 => f.write_str("f32"),
            Kind::F64 => f.write_str("f64"),
            Kind::Str => f.write_str("string"),
            Kind::Bytes => f.write_str("bytes"),
            Kind::List(inner) => write!(f, "list<{}>", inner),
            Kind::Record(schema) => f.write_str(schema.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    /// Fields of a nested record by name, in declaration order.
    Record(Vec<(String, Value)>),
}

impl Value {
    /// Checks the value against a declared kind, descending into lists and
    /// nested records.
    pub fn matches(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool)
            | (Value::I32(_), Kind::I32)
            | (Value::I64(_), Kind::I64)
            | (Value::U32(_), Kind::U32)
            | (Value::U64(_), Kind::U64)
            | (Value::F32(_), Kind::F32)
            | (Value::F64(_), Kind::F64)
            | (Value::Str(_), Kind::Str)
            | (Value::Bytes(_), Kind::Bytes) => true,
            (Value::List(items), Kind::List(inner)) => items.iter().all(|v| v.matches(inner)),
            (Value::Record(entries), Kind::Record(schema)) => {
                entries.len() == schema.fields.len()
                    && entries.iter().zip(schema.fields).all(|((name, value), field)| {
                        name == field.name && value.matches(&field.kind)
                    })
            }
            _ => false,
        }
    }

    /// Short description of what the value holds, for error messages.
    pub fn describe(&self) -> String {
        match self {
            Value::Bool(_) => "bool".into(),
            Value::I32(_) => "i32".into(),
            Value::I64(_) => "i64".into(),
            Value::U32(_) => "u32".into(),
            Value::U64(_) => "u64".into(),
            Value::F32(_) => "f32".into(),
            Value::F64(_) => "f64".into(),
            Value::Str(_) => "string".into(),
            Value::Bytes(_) => "bytes".into(),
            Value::List(items) => match items.first() {
                Some(first) => format!("list<{}>", first.describe()),
                None => "empty list".into(),
            },
            Value::Record(entries) => format!("record of {} fields", entries.len()),
        }
    }
}

/// Looks up a nested record's field by name.
pub(crate) fn entry<'a>(entries: &'a [(String, Value)], name: &str) -> Option<&'a Value> {
    entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

/// Overwrites a nested record's field in place.
pub(crate) fn replace(
    entries: &mut [(String, Value)],
    name: &str,
    value: Value,
) -> Result<(), FieldError> {
    let slot = entries
        .iter_mut()
        .find(|(n, _)| n == name)
        .ok_or_else(|| FieldError::Unknown(name.to_string()))?;
    slot.1 = value;
    Ok(())
}

/// How the text codec treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRole {
    /// Nested tag named after the field.
    Element,
    /// Attribute on the root tag. Scalars only.
    Attribute,
    /// Never written, never read.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    /// `false` marks the field transient: the binary codec skips it.
    pub binary: bool,
    pub text: TextRole,
}

impl Field {
    pub const fn new(name: &'static str, kind: Kind) -> Self {
        Field {
            name,
            kind,
            binary: true,
            text: TextRole::Element,
        }
    }

    pub const fn transient(mut self) -> Self {
        self.binary = false;
        self
    }

    pub const fn attribute(mut self) -> Self {
        self.text = TextRole::Attribute;
        self
    }

    pub const fn ignored(mut self) -> Self {
        self.text = TextRole::Ignored;
        self
    }
}

/// A data-bearing type the codecs can persist.
///
/// `Default::default()` is the raw state of the record: every field at the
/// zero value of its type, no initializer run. Derive it. The binary codec
/// rebuilds records from this state, so fields it does not store come back
/// zeroed.
///
/// [`Record::construct`] is the normal construction path, including any
/// sentinel values the type assigns. The text codec starts from it and then
/// overwrites the fields present in the document.
pub trait Record: Default {
    const NAME: &'static str;
    const FIELDS: &'static [Field];

    fn construct() -> Self {
        Self::default()
    }

    fn get(&self, field: &str) -> Result<Value, FieldError>;

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError>;

    /// Layout used by records that hold this one, as in
    /// `Kind::Record(&Vec3::SCHEMA)`.
    const SCHEMA: Schema = Schema::of::<Self>();

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|f| f.name == name)
    }

    /// Every declared field with its current value. This is what a holding
    /// record's `get` returns inside [`Value::Record`].
    fn to_entries(&self) -> Result<Vec<(String, Value)>, FieldError> {
        Self::FIELDS
            .iter()
            .map(|f| self.get(f.name).map(|v| (f.name.to_string(), v)))
            .collect()
    }

    /// Rebuilds a record from the entries a codec decoded. Every entry is
    /// applied on top of `Default`; the codecs have already seeded the
    /// entries the payload did not carry.
    fn from_entries(entries: Vec<(String, Value)>) -> Result<Self, FieldError> {
        let mut record = Self::default();
        for (name, value) in entries {
            record.set(&name, value)?;
        }
        Ok(record)
    }
}

type Entries = fn() -> Result<Vec<(String, Value)>, FieldError>;

/// Field layout of a record type, for fields that hold another record.
///
/// Schemas compare by record name.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
    raw: Entries,
    constructed: Entries,
}

impl Schema {
    pub const fn of<R: Record>() -> Self {
        Schema {
            name: R::NAME,
            fields: R::FIELDS,
            raw: raw_entries::<R>,
            constructed: constructed_entries::<R>,
        }
    }

    /// Field values of the record's `Default` state.
    pub fn raw(&self) -> Result<Vec<(String, Value)>, FieldError> {
        (self.raw)()
    }

    /// Field values of a record built by [`Record::construct`].
    pub fn constructed(&self) -> Result<Vec<(String, Value)>, FieldError> {
        (self.constructed)()
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Schema {}

fn raw_entries<R: Record>() -> Result<Vec<(String, Value)>, FieldError> {
    R::default().to_entries()
}

fn constructed_entries<R: Record>() -> Result<Vec<(String, Value)>, FieldError> {
    R::construct().to_entries()
}

/// Builds the mismatch error for a `set` arm that received the wrong value.
pub fn mismatch(field: &Field, value: &Value) -> FieldError {
    FieldError::Mismatch {
        field: field.name.to_string(),
        expected: field.kind,
        found: value.describe(),
    }
}

/// Three-component vector record.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vec3 { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    pub fn from_array([x, y, z]: [f32; 3]) -> Self {
        Vec3 { x, y, z }
    }
}

impl Record for Vec3 {
    const NAME: &'static str = "Vec3";
    const FIELDS: &'static [Field] = &[
        Field::new("x", Kind::F32).attribute(),
        Field::new("y", Kind::F32).attribute(),
        Field::new("z", Kind::F32).attribute(),
    ];

    fn get(&self, field: &str) -> Result<Value, FieldError> {
        match field {
            "x" => Ok(Value::F32(self.x)),
            "y" => Ok(Value::F32(self.y)),
            "z" => Ok(Value::F32(self.z)),
            _ => Err(FieldError::Unknown(field.to_string())),
        }
    }

    fn set(&mut self, field: &str, value: Value) -> Result<(), FieldError> {
        let slot = match field {
            "x" => &mut self.x,
            "y" => &mut self.y,
            "z" => &mut self.z,
            _ => return Err(FieldError::Unknown(field.to_string())),
        };
        match value {
            Value::F32(v) => {
                *slot = v;
                Ok(())
            }
            other => Err(FieldError::Mismatch {
                field: field.to_string(),
                expected: Kind::F32,
                found: other.describe(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_describes_nested_and_empty_lists() {
        let grid = Field::new("grid", Kind::List(&Kind::List(&Kind::I32)));
        let nested = Value::List(vec![Value::List(vec![Value::Str("x".into())])]);
        assert_eq!(
            mismatch(&grid, &nested).to_string(),
            "Field grid expects list<list<i32>>, got list<list<string>>"
        );

        let ids = Field::new("ids", Kind::U64);
        assert_eq!(
            mismatch(&ids, &Value::List(Vec::new())).to_string(),
            "Field ids expects u64, got empty list"
        );
    }

    #[test]
    fn record_values_match_their_schema() {
        let kind = Kind::Record(&Vec3::SCHEMA);
        let value = Value::Record(Vec3::new(1.0, 2.0, 3.0).to_entries().unwrap());
        assert!(value.matches(&kind));
        assert_eq!(kind.to_string(), "Vec3");
        assert!(!kind.is_scalar());

        let Value::Record(mut entries) = value else {
            unreachable!()
        };
        entries.swap(0, 1);
        assert!(!Value::Record(entries).matches(&kind));
    }

    #[test]
    fn entries_rebuild_the_record() {
        let entries = Vec3::new(1.0, -2.0, 0.5).to_entries().unwrap();
        assert_eq!(entries[1], ("y".to_string(), Value::F32(-2.0)));
        assert_eq!(Vec3::from_entries(entries).unwrap(), Vec3::new(1.0, -2.0, 0.5));
        assert_eq!(Vec3::SCHEMA.raw().unwrap().len(), 3);
    }
}
