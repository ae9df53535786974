use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cue::CUE;
use crate::header::{DATA_SIZE_OFFSET, HEADER_SIZE, RIFF_SIZE_OFFSET, WavHeader};
use crate::{AudioFormat, CuePoint, CueSet, Error, MappedReader, Result, StreamingWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    Wav,
    Pcm,
}

impl ContainerKind {
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let extension = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "wav" => Some(Self::Wav),
            "pcm" => Some(Self::Pcm),
            _ => None,
        }
    }

    pub fn header_len(&self) -> u64 {
        match self {
            Self::Wav => HEADER_SIZE as u64,
            Self::Pcm => 0,
        }
    }
}

/// One file holding one continuous, append-only recording.
///
/// Frame counts are always derived from the file on disk, so a clone held by
/// a reader sees audio appended through any writer.
#[derive(Debug, Clone)]
pub struct AudioContainer {
    path: PathBuf,
    kind: ContainerKind,
    format: AudioFormat,
    cues: CueSet,
    readers: Arc<AtomicUsize>,
}

impl AudioContainer {
    /// Creates an empty container, overwriting whatever is at `path`.
    pub fn create(path: impl AsRef<Path>, kind: ContainerKind, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::create(&path)?;
        if kind == ContainerKind::Wav {
            file.write_all(&WavHeader::new(format).to_bytes())?;
        }
        file.sync_all()?;

        tracing::debug!(path = %path.display(), ?kind, "container_created");
        Ok(Self::from_parts(path, kind, format, CueSet::new()))
    }

    /// Opens an existing container. `format` is only consulted for raw PCM,
    /// which carries no header of its own.
    pub fn open(path: impl AsRef<Path>, kind: ContainerKind, format: AudioFormat) -> Result<Self> {
        match kind {
            ContainerKind::Wav => Self::open_wav(path),
            ContainerKind::Pcm => Self::open_pcm(path, format),
        }
    }

    pub fn open_or_create(
        path: impl AsRef<Path>,
        kind: ContainerKind,
        format: AudioFormat,
    ) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path, kind, format)
        } else {
            Self::create(path, kind, format)
        }
    }

    pub fn open_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();
        let header = read_header(&mut file, file_len)?;

        let metadata_len = header.declared_metadata_len() as u64;
        let cues = if metadata_len > 0 {
            let start = HEADER_SIZE as u64 + header.data_len as u64;
            let available = file_len.saturating_sub(start).min(metadata_len);
            let mut bytes = vec![0u8; available as usize];
            file.seek(SeekFrom::Start(start))?;
            file.read_exact(&mut bytes)?;

            CueSet::decode(&bytes).inspect_err(|error| {
                tracing::error!(path = %path.display(), %error, "cue_metadata_parse_failed");
            })?
        } else if file_len > HEADER_SIZE as u64 + header.data_len as u64 {
            match recover_trailing_cues(&mut file, &header, file_len)? {
                Some((audio_len, cues)) => {
                    let mut file = OpenOptions::new().write(true).open(&path)?;
                    let metadata_len = u32::try_from(file_len - HEADER_SIZE as u64 - audio_len as u64)
                        .map_err(|_| Error::invalid("metadata block exceeds 4 GiB"))?;
                    patch_lengths(&mut file, audio_len, metadata_len)?;
                    tracing::warn!(path = %path.display(), audio_len, metadata_len, "stale_header_repaired");
                    cues
                }
                None => CueSet::new(),
            }
        } else {
            CueSet::new()
        };

        Ok(Self::from_parts(path, ContainerKind::Wav, header.format, cues))
    }

    pub fn open_pcm(path: impl AsRef<Path>, format: AudioFormat) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }
        Ok(Self::from_parts(path, ContainerKind::Pcm, format, CueSet::new()))
    }

    fn from_parts(path: PathBuf, kind: ContainerKind, format: AudioFormat, cues: CueSet) -> Self {
        Self {
            path,
            kind,
            format,
            cues,
            readers: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn frame_size(&self) -> usize {
        self.format.frame_size()
    }

    pub fn header_len(&self) -> u64 {
        self.kind.header_len()
    }

    pub fn cues(&self) -> &CueSet {
        &self.cues
    }

    pub fn add_cue(&mut self, location: u32, label: impl Into<String>) {
        self.cues.push(CuePoint::new(location, label));
    }

    /// Bytes of audio currently in the file, excluding header and trailing metadata.
    pub fn audio_len(&self) -> Result<u64> {
        let file_len = std::fs::metadata(&self.path)?.len();
        match self.kind {
            ContainerKind::Pcm => Ok(file_len),
            ContainerKind::Wav => {
                let mut file = File::open(&self.path)?;
                let header = read_header(&mut file, file_len)?;
                let trailing = header.declared_metadata_len() as u64;
                Ok(file_len.saturating_sub(HEADER_SIZE as u64 + trailing))
            }
        }
    }

    pub fn total_frames(&self) -> Result<u32> {
        Ok(self.format.frames_for_bytes(self.audio_len()?))
    }

    /// Number of mapped readers currently alive on this container.
    pub fn readers_open(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    pub(crate) fn reader_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.readers)
    }

    /// Rewrites the RIFF and data length fields of a WAV header; nothing else
    /// in the file is touched. Everything after `audio_len` bytes of samples
    /// is accounted as metadata. No-op for raw PCM.
    pub fn finalize_length(&self, audio_len: u32) -> Result<()> {
        if self.kind == ContainerKind::Pcm {
            return Ok(());
        }

        let readers = self.readers_open();
        if readers > 0 {
            return Err(Error::ReadersOpen(readers));
        }

        let mut file = OpenOptions::new().write(true).open(&self.path)?;
        let file_len = file.metadata()?.len();
        let metadata_len = file_len.saturating_sub(HEADER_SIZE as u64 + audio_len as u64);
        let metadata_len = u32::try_from(metadata_len)
            .map_err(|_| Error::invalid("metadata block exceeds 4 GiB"))?;

        patch_lengths(&mut file, audio_len, metadata_len)?;
        tracing::debug!(path = %self.path.display(), audio_len, metadata_len, "header_length_patched");
        Ok(())
    }

    pub fn reader(&self, start: Option<u32>, end: Option<u32>) -> MappedReader {
        MappedReader::new(self, start, end)
    }

    pub fn writer(&self) -> Result<StreamingWriter> {
        StreamingWriter::open(self)
    }
}

pub(crate) fn patch_lengths(file: &mut File, audio_len: u32, metadata_len: u32) -> Result<()> {
    file.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
    file.write_all(&WavHeader::riff_size_for(audio_len, metadata_len).to_le_bytes())?;
    file.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
    file.write_all(&audio_len.to_le_bytes())?;
    file.flush()?;
    Ok(())
}

/// Largest tail searched for a cue block the header does not account for.
const RECOVERY_WINDOW: u64 = 1 << 20;

/// Finds a cue block left at the end of the file by a writer that stopped
/// after emitting metadata but before patching the header. Returns the audio
/// length implied by where the block starts.
fn recover_trailing_cues(
    file: &mut File,
    header: &WavHeader,
    file_len: u64,
) -> Result<Option<(u32, CueSet)>> {
    let audio_start = HEADER_SIZE as u64 + header.data_len as u64;
    let window_start = audio_start.max(file_len.saturating_sub(RECOVERY_WINDOW));
    let mut tail = vec![0u8; (file_len - window_start) as usize];
    file.seek(SeekFrom::Start(window_start))?;
    file.read_exact(&mut tail)?;

    let frame_size = header.format.frame_size().max(1) as u64;
    let candidates = tail
        .windows(CUE.len())
        .enumerate()
        .filter(|(_, tag)| *tag == CUE)
        .map(|(offset, _)| offset);

    for offset in candidates {
        let position = window_start + offset as u64;
        if (position - HEADER_SIZE as u64) % frame_size != 0 {
            continue;
        }

        let block = &tail[offset..];
        if let Ok(cues) = CueSet::decode(block)
            && !cues.is_empty()
            && cues.encoded_len() == block.len()
            && let Ok(audio_len) = u32::try_from(position - HEADER_SIZE as u64)
        {
            return Ok(Some((audio_len, cues)));
        }
    }
    Ok(None)
}

fn read_header(file: &mut File, file_len: u64) -> Result<WavHeader> {
    if file_len < HEADER_SIZE as u64 {
        return Err(Error::invalid(format!(
            "file is {file_len} bytes, shorter than a {HEADER_SIZE} byte header"
        )));
    }

    let mut bytes = [0u8; HEADER_SIZE];
    file.seek(SeekFrom::Start(0))?;
    file.read_exact(&mut bytes)?;
    WavHeader::parse(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_wav_writes_bare_header() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.wav");

        let container =
            AudioContainer::create(&path, ContainerKind::Wav, AudioFormat::default()).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 44);
        assert_eq!(container.total_frames().unwrap(), 0);
    }

    #[test]
    fn create_pcm_writes_empty_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.pcm");

        let container =
            AudioContainer::create(&path, ContainerKind::Pcm, AudioFormat::default()).unwrap();

        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(container.total_frames().unwrap(), 0);
    }

    #[test]
    fn create_fails_for_missing_directory() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("missing").join("take.wav");

        let result = AudioContainer::create(&path, ContainerKind::Wav, AudioFormat::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn pcm_frames_follow_file_size() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.pcm");
        std::fs::write(&path, vec![0u8; 2001]).unwrap();

        let container = AudioContainer::open_pcm(&path, AudioFormat::default()).unwrap();
        assert_eq!(container.total_frames().unwrap(), 1000);

        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(&[0u8; 999])
            .unwrap();
        assert_eq!(container.total_frames().unwrap(), 1500);
    }

    #[test]
    fn open_pcm_requires_existing_file() {
        let temp = tempdir().unwrap();
        let result = AudioContainer::open_pcm(temp.path().join("nope.pcm"), AudioFormat::default());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn open_wav_rejects_truncated_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("short.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        assert!(matches!(
            AudioContainer::open_wav(&path),
            Err(Error::InvalidContainer(_))
        ));
    }

    #[test]
    fn open_wav_rejects_foreign_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("not.wav");
        std::fs::write(&path, vec![b'x'; 128]).unwrap();

        assert!(matches!(
            AudioContainer::open_wav(&path),
            Err(Error::InvalidContainer(_))
        ));
    }

    fn append_raw(path: &Path, bytes: &[u8]) {
        OpenOptions::new()
            .append(true)
            .open(path)
            .unwrap()
            .write_all(bytes)
            .unwrap();
    }

    #[test]
    fn open_wav_rejects_malformed_cue_block() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.wav");
        AudioContainer::create(&path, ContainerKind::Wav, AudioFormat::default()).unwrap();

        let mut metadata = Vec::new();
        metadata.extend_from_slice(b"cue ");
        metadata.extend_from_slice(&8u32.to_le_bytes());
        metadata.extend_from_slice(&5u32.to_le_bytes());
        metadata.extend_from_slice(&[0u8; 4]);
        append_raw(&path, &[0u8; 200]);
        append_raw(&path, &metadata);
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        patch_lengths(&mut file, 200, metadata.len() as u32).unwrap();

        assert!(matches!(
            AudioContainer::open_wav(&path),
            Err(Error::InvalidContainer(_))
        ));
    }

    #[test]
    fn open_wav_repairs_header_left_stale_after_metadata_write() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.wav");
        AudioContainer::create(&path, ContainerKind::Wav, AudioFormat::default()).unwrap();

        let mut cues = CueSet::new();
        cues.push(CuePoint::new(0, "1"));
        cues.push(CuePoint::new(50, "2"));
        let metadata = cues.encode();
        append_raw(&path, &[0u8; 200]);
        append_raw(&path, &metadata);

        let reopened = AudioContainer::open_wav(&path).unwrap();
        assert_eq!(reopened.total_frames().unwrap(), 100);
        assert_eq!(reopened.cues().len(), 2);

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(u32::from_le_bytes(bytes[40..44].try_into().unwrap()), 200);
        assert_eq!(
            u32::from_le_bytes(bytes[4..8].try_into().unwrap()),
            36 + 200 + metadata.len() as u32
        );
    }

    #[test]
    fn open_wav_mid_write_counts_all_bytes_as_audio() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.wav");
        AudioContainer::create(&path, ContainerKind::Wav, AudioFormat::default()).unwrap();
        append_raw(&path, &[0u8; 300]);

        let reopened = AudioContainer::open_wav(&path).unwrap();
        assert_eq!(reopened.total_frames().unwrap(), 150);
        assert!(reopened.cues().is_empty());
    }

    #[test]
    fn kind_from_extension() {
        assert_eq!(ContainerKind::from_path("a/b.WAV"), Some(ContainerKind::Wav));
        assert_eq!(ContainerKind::from_path("chapter.pcm"), Some(ContainerKind::Pcm));
        assert_eq!(ContainerKind::from_path("chapter.mp3"), None);
    }

    #[test]
    fn finalize_length_is_noop_for_pcm() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("take.pcm");
        let container =
            AudioContainer::create(&path, ContainerKind::Pcm, AudioFormat::default()).unwrap();

        container.finalize_length(10).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }
}
