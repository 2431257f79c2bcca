//! Save and load plain records as files or in-memory buffers, in a compact
//! binary form or as XML.
//!
//! A record type describes its fields once through [`Record`]; the six
//! operations on [`Persist`] (also available as free functions) pick the
//! format and the source. None of them return errors: writes report `bool`,
//! reads report `Option`, and the cause of a failure is logged through
//! `tracing`.
//!
//! The two formats rebuild records differently. The binary codec starts from
//! the record's raw `Default` state and fills in the stored fields; the text
//! codec starts from [`Record::construct`], so construction-time values
//! survive for fields the document does not carry.

pub mod binary;
mod codec;
mod persist;
pub mod record;
pub mod text;
pub mod transport;

pub use binary::BinaryCodec;
pub use codec::{Codec, CodecError, Format, decode, encode};
pub use persist::{
    Options, Persist, PersistBuilder, read_binary_from_buffer, read_binary_from_file,
    read_text_from_buffer, read_text_from_file, write_binary_to_file, write_text_to_file,
};
pub use record::{Field, FieldError, Kind, Record, Schema, TextRole, Value, Vec3};
pub use text::TextCodec;

pub mod prelude {
    use super::*;

    pub use binary::BinaryCodec;
    pub use codec::{Codec, CodecError, Format};
    pub use persist::{Options, Persist, PersistBuilder};
    pub use record::{Field, FieldError, Kind, Record, Schema, TextRole, Value, Vec3};
    pub use text::TextCodec;
    pub use transport::{BufferTransport, FileTransport, TransportError};
}
