use std::io::{Result, Write};

pub fn u8<W: Write>(writer: &mut W, value: u8) -> Result<()> {
    writer.write_all(&[value])
}

pub fn u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn u64<W: Write>(writer: &mut W, value: u64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn i32<W: Write>(writer: &mut W, value: i32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn i64<W: Write>(writer: &mut W, value: i64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn f32<W: Write>(writer: &mut W, value: f32) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn f64<W: Write>(writer: &mut W, value: f64) -> Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn string<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    array(writer, value.as_bytes())
}

pub fn string_raw<W: Write>(writer: &mut W, value: &str) -> Result<()> {
    writer.write_all(value.as_bytes())
}

pub fn array<W: Write>(writer: &mut W, value: &[u8]) -> Result<()> {
    let len = u32::try_from(value.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} bytes exceed the u32 length prefix", value.len()),
        )
    })?;
    self::u32(writer, len)?;
    writer.write_all(value)
}
