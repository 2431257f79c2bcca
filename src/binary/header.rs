use std::io::{Read, Write};

use super::{Binary, read, write};
use crate::codec::CodecError;

const MAGIC: &str = "RECF";
pub(crate) const FORMAT_VERSION: u8 = 1;

#[derive(Debug)]
pub struct Header {
    pub magic: String,
    pub version: u8,
    pub type_name: String,
}

impl Header {
    pub fn new(type_name: &str) -> Self {
        Header {
            magic: MAGIC.to_string(),
            version: FORMAT_VERSION,
            type_name: type_name.to_string(),
        }
    }

    pub fn check_version(&self) -> Result<(), CodecError> {
        if self.version != FORMAT_VERSION {
            return Err(CodecError::Decoding(format!(
                "format version mismatch: expected {}, got {}",
                FORMAT_VERSION, self.version
            )));
        }
        Ok(())
    }
}

impl Binary for Header {
    fn serialize<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write::string_raw(writer, &self.magic)?;
        write::u8(writer, 0)?;
        write::u8(writer, self.version)?;
        write::string(writer, &self.type_name)?;
        Ok(())
    }

    fn deserialize<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        let magic = read::string_raw(reader, MAGIC.len() as u32)
            .map_err(|e| CodecError::Decoding(format!("Failed to read magic: {}", e)))?;
        let _ = read::u8(reader)?;
        let version = read::u8(reader)
            .map_err(|e| CodecError::Decoding(format!("Failed to read version: {}", e)))?;
        let type_name = read::string(reader)
            .map_err(|e| CodecError::Decoding(format!("Failed to read type name: {}", e)))?;

        Ok(Header {
            magic,
            version,
            type_name,
        })
    }

    fn check(&self) -> Result<(), CodecError> {
        if self.magic != MAGIC {
            return Err(CodecError::Decoding(format!(
                "Invalid magic number: expected '{}', got '{}'",
                MAGIC, self.magic
            )));
        }
        self.check_version()
    }
}
