use std::io::Cursor;

use super::TransportError;
use crate::{codec::Codec, record::Record};

/// Read-only source over bytes already in memory, such as bundled assets.
pub struct BufferTransport;

impl BufferTransport {
    pub fn read_through<C: Codec, R: Record>(buffer: &[u8]) -> Result<R, TransportError> {
        let mut cursor = Cursor::new(buffer);
        Ok(C::decode(&mut cursor)?)
    }
}
