use std::{
    fmt,
    io::{BufRead, Cursor, ErrorKind, Write},
};
use thiserror::Error;

use crate::record::Record;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Record cannot be encoded: {0}")]
    Encoding(String),
    #[error("Payload cannot be decoded: {0}")]
    Decoding(String),
    #[error("Failed to read/write stream: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for CodecError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::UnexpectedEof => {
                CodecError::Decoding(format!("payload truncated: {}", err))
            }
            ErrorKind::InvalidData => CodecError::Decoding(err.to_string()),
            ErrorKind::InvalidInput => CodecError::Encoding(err.to_string()),
            _ => CodecError::Io(err),
        }
    }
}

impl From<quick_xml::Error> for CodecError {
    fn from(err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(io) => {
                CodecError::from(std::io::Error::new(io.kind(), io.to_string()))
            }
            other => CodecError::Decoding(other.to_string()),
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for CodecError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CodecError::Decoding(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Text,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Binary => f.write_str("binary"),
            Format::Text => f.write_str("text"),
        }
    }
}

/// One persisted format: a paired encoder and decoder.
pub trait Codec {
    const FORMAT: Format;

    fn encode<R: Record, W: Write>(record: &R, sink: &mut W) -> Result<(), CodecError>;

    /// Decodes a whole record. Never returns a partially populated value.
    fn decode<R: Record, S: BufRead>(source: &mut S) -> Result<R, CodecError>;
}

pub fn encode<C: Codec, R: Record>(record: &R) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    C::encode(record, &mut out)?;
    Ok(out)
}

pub fn decode<C: Codec, R: Record>(bytes: &[u8]) -> Result<R, CodecError> {
    C::decode(&mut Cursor::new(bytes))
}
