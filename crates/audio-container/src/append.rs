use crate::{AudioContainer, Error, Result, StreamingWriter};

const COPY_CHUNK_BYTES: usize = 64 * 1024;

/// Copies frames `[start, end)` of `source` onto `destination`, returning the
/// number of frames appended. Open bounds mean the start or end of the source.
pub fn append_frames(
    source: &AudioContainer,
    start: Option<u32>,
    end: Option<u32>,
    destination: &mut StreamingWriter,
) -> Result<u32> {
    if source.format() != destination.format() {
        return Err(Error::invalid(format!(
            "cannot append {:?} audio onto {:?}",
            source.format(),
            destination.format()
        )));
    }

    let mut reader = source.reader(start, end);
    reader.open()?;

    let before = destination.bytes_written();
    let mut buf = vec![0u8; COPY_CHUNK_BYTES];
    while reader.has_remaining() {
        let n = reader.read_into(&mut buf)?;
        destination.write(&buf[..n])?;
    }
    reader.release();

    let copied = destination.bytes_written() - before;
    let frames = source.format().frames_for_bytes(copied);
    tracing::debug!(
        source = %source.path().display(),
        frames,
        "frames_appended"
    );
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AudioFormat, ContainerKind};
    use tempfile::tempdir;

    #[test]
    fn copies_a_range_between_containers() {
        let temp = tempdir().unwrap();
        let source =
            AudioContainer::create(temp.path().join("chapter.wav"), ContainerKind::Wav, AudioFormat::default())
                .unwrap();
        let mut writer = source.writer().unwrap();
        let bytes: Vec<u8> = (0u16..200).flat_map(|i| i.to_le_bytes()).collect();
        writer.write(&bytes).unwrap();
        writer.finish().unwrap();

        let destination =
            AudioContainer::create(temp.path().join("narration.pcm"), ContainerKind::Pcm, AudioFormat::default())
                .unwrap();
        let mut writer = destination.writer().unwrap();
        assert_eq!(append_frames(&source, Some(50), Some(150), &mut writer).unwrap(), 100);
        assert_eq!(append_frames(&source, Some(190), None, &mut writer).unwrap(), 10);
        writer.finish().unwrap();

        let written = std::fs::read(destination.path()).unwrap();
        assert_eq!(written.len(), 220);
        assert_eq!(u16::from_le_bytes([written[0], written[1]]), 50);
        assert_eq!(u16::from_le_bytes([written[200], written[201]]), 190);
        assert_eq!(source.readers_open(), 0);
    }

    #[test]
    fn mismatched_formats_are_rejected() {
        let temp = tempdir().unwrap();
        let source = AudioContainer::create(
            temp.path().join("a.pcm"),
            ContainerKind::Pcm,
            AudioFormat::new(48000, 2, 16),
        )
        .unwrap();
        let destination =
            AudioContainer::create(temp.path().join("b.pcm"), ContainerKind::Pcm, AudioFormat::default())
                .unwrap();
        let mut writer = destination.writer().unwrap();

        assert!(matches!(
            append_frames(&source, None, None, &mut writer),
            Err(Error::InvalidContainer(_))
        ));
    }
}
