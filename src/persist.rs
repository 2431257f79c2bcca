use std::path::Path;
use tracing::{debug, warn};

use crate::{
    binary::BinaryCodec,
    codec::Codec,
    record::Record,
    text::TextCodec,
    transport::{BufferTransport, FileTransport},
};

#[derive(Debug, Clone)]
pub struct Options {
    /// Create missing parent directories before writing.
    pub create_parent_dirs: bool,
    /// `fsync` written files before reporting success.
    pub sync_on_write: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            create_parent_dirs: false,
            sync_on_write: true,
        }
    }
}

#[derive(Default)]
pub struct PersistBuilder {
    options: Options,
}

impl PersistBuilder {
    pub fn create_parent_dirs(mut self, enabled: bool) -> Self {
        self.options.create_parent_dirs = enabled;
        self
    }

    pub fn sync_on_write(mut self, enabled: bool) -> Self {
        self.options.sync_on_write = enabled;
        self
    }

    pub fn build(self) -> Persist {
        Persist::with_options(self.options)
    }
}

/// Saves and loads records in binary or XML form.
///
/// Every operation reports failure through its return value only: writes
/// return `false`, reads return `None`. The cause is logged at `warn` level.
/// A failed write leaves no file behind.
#[derive(Debug, Clone, Default)]
pub struct Persist {
    files: FileTransport,
}

impl Persist {
    pub fn builder() -> PersistBuilder {
        PersistBuilder::default()
    }

    pub fn with_options(options: Options) -> Self {
        Persist {
            files: FileTransport::new(options.create_parent_dirs, options.sync_on_write),
        }
    }

    pub fn write_binary_to_file<R: Record>(&self, path: impl AsRef<Path>, record: &R) -> bool {
        self.write::<BinaryCodec, R>(path.as_ref(), record)
    }

    pub fn read_binary_from_file<R: Record>(&self, path: impl AsRef<Path>) -> Option<R> {
        self.read::<BinaryCodec, R>(path.as_ref())
    }

    pub fn read_binary_from_buffer<R: Record>(&self, buffer: &[u8]) -> Option<R> {
        read_buffer::<BinaryCodec, R>(buffer)
    }

    pub fn write_text_to_file<R: Record>(&self, path: impl AsRef<Path>, record: &R) -> bool {
        self.write::<TextCodec, R>(path.as_ref(), record)
    }

    pub fn read_text_from_file<R: Record>(&self, path: impl AsRef<Path>) -> Option<R> {
        self.read::<TextCodec, R>(path.as_ref())
    }

    pub fn read_text_from_buffer<R: Record>(&self, buffer: &[u8]) -> Option<R> {
        read_buffer::<TextCodec, R>(buffer)
    }

    fn write<C: Codec, R: Record>(&self, path: &Path, record: &R) -> bool {
        match self.files.write_through::<C, R>(path, record) {
            Ok(()) => {
                debug!(
                    path = %path.display(),
                    format = %C::FORMAT,
                    record = R::NAME,
                    "record written"
                );
                true
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    format = %C::FORMAT,
                    record = R::NAME,
                    kind = e.kind(),
                    error = %e,
                    "failed to write record"
                );
                false
            }
        }
    }

    fn read<C: Codec, R: Record>(&self, path: &Path) -> Option<R> {
        match self.files.read_through::<C, R>(path) {
            Ok(record) => {
                debug!(
                    path = %path.display(),
                    format = %C::FORMAT,
                    record = R::NAME,
                    "record read"
                );
                Some(record)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    format = %C::FORMAT,
                    record = R::NAME,
                    kind = e.kind(),
                    error = %e,
                    "failed to read record"
                );
                None
            }
        }
    }
}

fn read_buffer<C: Codec, R: Record>(buffer: &[u8]) -> Option<R> {
    match BufferTransport::read_through::<C, R>(buffer) {
        Ok(record) => {
            debug!(
                len = buffer.len(),
                format = %C::FORMAT,
                record = R::NAME,
                "record read from buffer"
            );
            Some(record)
        }
        Err(e) => {
            warn!(
                len = buffer.len(),
                format = %C::FORMAT,
                record = R::NAME,
                kind = e.kind(),
                error = %e,
                "failed to read record from buffer"
            );
            None
        }
    }
}

pub fn write_binary_to_file<R: Record>(path: impl AsRef<Path>, record: &R) -> bool {
    Persist::default().write_binary_to_file(path, record)
}

pub fn read_binary_from_file<R: Record>(path: impl AsRef<Path>) -> Option<R> {
    Persist::default().read_binary_from_file(path)
}

pub fn read_binary_from_buffer<R: Record>(buffer: &[u8]) -> Option<R> {
    read_buffer::<BinaryCodec, R>(buffer)
}

pub fn write_text_to_file<R: Record>(path: impl AsRef<Path>, record: &R) -> bool {
    Persist::default().write_text_to_file(path, record)
}

pub fn read_text_from_file<R: Record>(path: impl AsRef<Path>) -> Option<R> {
    Persist::default().read_text_from_file(path)
}

pub fn read_text_from_buffer<R: Record>(buffer: &[u8]) -> Option<R> {
    read_buffer::<TextCodec, R>(buffer)
}
