use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{trace, warn};

use super::TransportError;
use crate::{codec::Codec, record::Record};

#[derive(Debug, Clone)]
pub struct FileTransport {
    create_parent_dirs: bool,
    sync: bool,
}

impl Default for FileTransport {
    fn default() -> Self {
        FileTransport {
            create_parent_dirs: false,
            sync: true,
        }
    }
}

impl FileTransport {
    pub fn new(create_parent_dirs: bool, sync: bool) -> Self {
        FileTransport {
            create_parent_dirs,
            sync,
        }
    }

    /// Creates or truncates `path` and encodes `record` into it. On any
    /// failure after creation the file is closed and removed.
    pub fn write_through<C: Codec, R: Record>(
        &self,
        path: &Path,
        record: &R,
    ) -> Result<(), TransportError> {
        if self.create_parent_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TransportError::Io(parent.to_path_buf(), e))?;
            }
        }

        let mut pending = PendingFile::create(path)?;
        C::encode(record, &mut pending)?;
        pending.commit(self.sync)
    }

    /// Opens the existing file at `path` and decodes one record from it.
    pub fn read_through<C: Codec, R: Record>(&self, path: &Path) -> Result<R, TransportError> {
        let file = File::open(path).map_err(|e| TransportError::from_io(path, e))?;
        let mut reader = BufReader::new(file);
        Ok(C::decode(&mut reader)?)
    }
}

/// A freshly created file that is deleted on drop unless committed.
struct PendingFile<'a> {
    path: &'a Path,
    writer: Option<BufWriter<File>>,
    committed: bool,
}

impl<'a> PendingFile<'a> {
    fn create(path: &'a Path) -> Result<Self, TransportError> {
        let file = File::create(path).map_err(|e| TransportError::from_io(path, e))?;
        Ok(PendingFile {
            path,
            writer: Some(BufWriter::new(file)),
            committed: false,
        })
    }

    fn commit(mut self, sync: bool) -> Result<(), TransportError> {
        if let Some(writer) = self.writer.take() {
            let file = writer
                .into_inner()
                .map_err(|e| TransportError::Io(self.path.to_path_buf(), e.into_error()))?;
            if sync {
                file.sync_all()
                    .map_err(|e| TransportError::Io(self.path.to_path_buf(), e))?;
            }
        }
        self.committed = true;
        Ok(())
    }
}

impl Write for PendingFile<'_> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self.writer.as_mut() {
            Some(writer) => writer.write(buf),
            None => Err(std::io::Error::other("pending file already closed")),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for PendingFile<'_> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        // Close before unlinking.
        drop(self.writer.take());
        match std::fs::remove_file(self.path) {
            Ok(()) => trace!(path = %self.path.display(), "removed partially written file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove partially written file"
            ),
        }
    }
}
