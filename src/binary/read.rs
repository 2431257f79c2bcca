use std::io::{Error, ErrorKind, Read, Result};

pub fn u8<R: Read>(reader: &mut R) -> Result<u8> {
    let mut buf = [0; 1];
    reader.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub fn u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

pub fn i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn i64<R: Read>(reader: &mut R) -> Result<i64> {
    let mut buf = [0; 8];
    reader.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

pub fn f32<R: Read>(reader: &mut R) -> Result<f32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

pub fn f64<R: Read>(reader: &mut R) -> Result<f64> {
    let mut buf = [0; 8];
    reader.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

pub fn string<R: Read>(reader: &mut R) -> Result<String> {
    let len = u32(reader)?;
    string_raw(reader, len)
}

pub fn string_raw<R: Read>(reader: &mut R, len: u32) -> Result<String> {
    let buf = exact(reader, len)?;
    String::from_utf8(buf).map_err(|e| Error::new(ErrorKind::InvalidData, e))
}

pub fn array<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let len = u32(reader)?;
    exact(reader, len)
}

/// Reads exactly `len` bytes. The buffer grows with the data actually
/// present, so a corrupt length prefix cannot force a large allocation.
pub fn exact<R: Read>(reader: &mut R, len: u32) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(u64::from(len)).read_to_end(&mut buf)?;
    if buf.len() != len as usize {
        return Err(Error::new(
            ErrorKind::UnexpectedEof,
            format!("expected {} bytes, found {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

/// Returns `true` when the reader has no bytes left.
pub fn at_end<R: Read>(reader: &mut R) -> Result<bool> {
    let mut buf = [0; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(n) => return Ok(n == 0),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}
