use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};

use crate::container::patch_lengths;
use crate::header::HEADER_SIZE;
use crate::{AudioContainer, AudioFormat, ContainerKind, Error, Result};

/// Append-only writer over a container.
///
/// For WAV files the trailing cue metadata is cut off when the writer opens
/// and written back, followed by the header length patch, by [`StreamingWriter::finish`].
pub struct StreamingWriter {
    container: AudioContainer,
    out: Option<BufWriter<File>>,
    bytes_written: u64,
    metadata_written: bool,
}

impl StreamingWriter {
    pub fn open(container: &AudioContainer) -> Result<Self> {
        if container.kind() == ContainerKind::Wav {
            strip_metadata(container)?;
        }

        let file = OpenOptions::new().append(true).open(container.path())?;
        Ok(Self {
            container: container.clone(),
            out: Some(BufWriter::new(file)),
            bytes_written: 0,
            metadata_written: false,
        })
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let out = self
            .out
            .as_mut()
            .ok_or_else(|| Error::invalid("writer already finished"))?;
        out.write_all(bytes)?;
        self.bytes_written += bytes.len() as u64;
        Ok(())
    }

    pub fn format(&self) -> AudioFormat {
        self.container.format()
    }

    /// Adds a marker emitted with the cue metadata on [`StreamingWriter::finish`].
    pub fn add_cue(&mut self, location: u32, label: impl Into<String>) {
        self.container.add_cue(location, label);
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn frames_written(&self) -> u32 {
        self.container.format().frames_for_bytes(self.bytes_written)
    }

    pub fn is_finished(&self) -> bool {
        self.out.is_none()
    }

    /// Flushes buffered audio and, for WAV, appends metadata and patches the
    /// header lengths. Fails with [`Error::ReadersOpen`] while mapped readers
    /// are alive; the writer stays usable and `finish` can be retried.
    pub fn finish(&mut self) -> Result<()> {
        let Some(out) = self.out.as_mut() else {
            return Ok(());
        };
        out.flush()?;

        if self.container.kind() == ContainerKind::Wav {
            let readers = self.container.readers_open();
            if readers > 0 {
                return Err(Error::ReadersOpen(readers));
            }

            let file_len = std::fs::metadata(self.container.path())?.len();
            let metadata = self.container.cues().encode();
            let audio_len = if self.metadata_written {
                file_len.saturating_sub(HEADER_SIZE as u64 + metadata.len() as u64)
            } else {
                file_len.saturating_sub(HEADER_SIZE as u64)
            };
            let audio_len =
                u32::try_from(audio_len).map_err(|_| Error::invalid("audio exceeds 4 GiB"))?;

            if !self.metadata_written {
                out.write_all(&metadata)?;
                out.flush()?;
                self.metadata_written = true;
            }
            self.container.finalize_length(audio_len)?;
        }

        self.out = None;
        tracing::debug!(
            path = %self.container.path().display(),
            bytes = self.bytes_written,
            "writer_finished"
        );
        Ok(())
    }
}

impl Write for StreamingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        StreamingWriter::write(self, buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.out.as_mut() {
            Some(out) => out.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for StreamingWriter {
    fn drop(&mut self) {
        if let Err(error) = self.finish() {
            tracing::warn!(
                path = %self.container.path().display(),
                %error,
                "writer_finish_on_drop_failed"
            );
        }
    }
}

/// Cuts the trailing metadata block so new samples land directly after the
/// existing audio, and makes the header declare no metadata.
fn strip_metadata(container: &AudioContainer) -> Result<()> {
    let audio_len = container.audio_len()?;
    let audio_end = HEADER_SIZE as u64 + audio_len;

    let mut file = OpenOptions::new().write(true).open(container.path())?;
    if file.metadata()?.len() > audio_end {
        let audio_len =
            u32::try_from(audio_len).map_err(|_| Error::invalid("audio exceeds 4 GiB"))?;
        patch_lengths(&mut file, audio_len, 0)?;
        file.set_len(audio_end)?;
        tracing::debug!(path = %container.path().display(), "metadata_stripped_for_append");
    }
    Ok(())
}
