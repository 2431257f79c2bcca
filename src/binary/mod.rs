pub mod read;
pub mod write;

mod header;
mod value;

pub use header::Header;

use std::io::{BufRead, Read, Write};

use crate::{
    codec::{Codec, CodecError, Format},
    record::Record,
};

pub trait Binary {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), CodecError>;
    fn deserialize<R: Read>(reader: &mut R) -> Result<Self, CodecError>
    where
        Self: Sized;
    fn check(&self) -> Result<(), CodecError> {
        Ok(())
    }
}

/// Dense little-endian encoding. Transient fields are not stored, and decoding
/// starts from the record's raw `Default` state.
pub struct BinaryCodec;

impl Codec for BinaryCodec {
    const FORMAT: Format = Format::Binary;

    fn encode<R: Record, W: Write>(record: &R, sink: &mut W) -> Result<(), CodecError> {
        Header::new(R::NAME).serialize(sink)?;
        value::write_fields(sink, R::FIELDS, |field| {
            record
                .get(field.name)
                .map_err(|e| CodecError::Encoding(e.to_string()))
        })
    }

    fn decode<R: Record, S: BufRead>(source: &mut S) -> Result<R, CodecError> {
        let header = Header::deserialize(source)?;
        header.check()?;
        if header.type_name != R::NAME {
            return Err(CodecError::Decoding(format!(
                "payload holds {}, expected {}",
                header.type_name,
                R::NAME
            )));
        }

        let mut record = R::default();
        value::read_fields(source, R::NAME, R::FIELDS, |field, value| {
            record
                .set(field.name, value)
                .map_err(|e| CodecError::Decoding(e.to_string()))
        })?;

        if !read::at_end(source)? {
            return Err(CodecError::Decoding(
                "trailing bytes after the last field".into(),
            ));
        }
        Ok(record)
    }
}
