use std::fs::File;
use std::io::{self, Cursor, Seek, SeekFrom, Write};

use tracing::warn;
use zip::ZipWriter;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;

/// An archive target that can throw away everything written to it.
pub trait Discard {
    fn discard(&mut self) -> io::Result<()>;
}

impl Discard for File {
    fn discard(&mut self) -> io::Result<()> {
        self.set_len(0)?;
        self.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl Discard for Cursor<Vec<u8>> {
    fn discard(&mut self) -> io::Result<()> {
        self.get_mut().clear();
        self.set_position(0);
        Ok(())
    }
}

impl<T: Discard + ?Sized> Discard for &mut T {
    fn discard(&mut self) -> io::Result<()> {
        (**self).discard()
    }
}

/// Streaming ZIP writer owned by a single export.
///
/// Entries are written one at a time as they arrive. The sink is closed
/// exactly once: `finish` on success, `abort` on failure, or `Drop` if the
/// export future is cancelled before either runs. Closing without `finish`
/// empties the target, so a failed export never leaves a readable archive.
pub struct ArchiveSink<W: Write + Seek + Discard> {
    writer: Option<ZipWriter<W>>,
    options: SimpleFileOptions,
    entries: usize,
    bytes: u64,
}

impl<W: Write + Seek + Discard> ArchiveSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Some(ZipWriter::new(inner)),
            options: SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated),
            entries: 0,
            bytes: 0,
        }
    }

    /// Writes one complete entry. The path is used verbatim.
    pub fn add_entry(&mut self, path: &str, content: &[u8]) -> ZipResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(zip::result::ZipError::Io(std::io::Error::other(
                "archive sink already closed",
            )));
        };

        let options = self
            .options
            .clone()
            .large_file(content.len() as u64 >= u32::MAX as u64);
        writer.start_file(path, options)?;
        writer.write_all(content)?;

        self.entries += 1;
        self.bytes += content.len() as u64;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Writes the central directory and hands back the underlying writer.
    pub fn finish(mut self) -> ZipResult<W> {
        match self.writer.take() {
            Some(writer) => writer.finish(),
            None => Err(zip::result::ZipError::Io(std::io::Error::other(
                "archive sink already closed",
            ))),
        }
    }

    /// Closes the sink and empties the target of any partial output.
    pub fn abort(mut self) {
        self.close_quietly();
    }

    fn close_quietly(&mut self) {
        let Some(mut writer) = self.writer.take() else {
            return;
        };
        let _ = writer.abort_file();
        match writer.finish() {
            Ok(mut target) => {
                if let Err(e) = target.discard() {
                    warn!(error = %e, "Failed to discard partial archive");
                }
            }
            Err(e) => warn!(error = %e, "Failed to close partial archive"),
        }
    }
}

impl<W: Write + Seek + Discard> Drop for ArchiveSink<W> {
    fn drop(&mut self) {
        self.close_quietly();
    }
}
