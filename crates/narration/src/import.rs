use narration_audio::{AudioContainer, AudioFormat, CuePoint, StreamingWriter, append_frames};

use crate::{Result, VerseNode};

/// Recording split into verses by cue markers, such as a previously
/// exported chapter file.
pub trait ImportSource: Send + 'static {
    /// Verse markers, in any order.
    fn cue_points(&self) -> Vec<CuePoint>;
    fn total_frames(&self) -> Result<u32>;
    fn format(&self) -> AudioFormat;
    /// Appends frames `[start, end)` to `writer`, returning how many were copied.
    fn copy_frames(&self, start: u32, end: u32, writer: &mut StreamingWriter) -> Result<u32>;
}

impl ImportSource for AudioContainer {
    fn cue_points(&self) -> Vec<CuePoint> {
        self.cues().verse_markers()
    }

    fn total_frames(&self) -> Result<u32> {
        Ok(AudioContainer::total_frames(self)?)
    }

    fn format(&self) -> AudioFormat {
        AudioContainer::format(self)
    }

    fn copy_frames(&self, start: u32, end: u32, writer: &mut StreamingWriter) -> Result<u32> {
        Ok(append_frames(self, Some(start), Some(end), writer)?)
    }
}

/// Copies each verse segment of `source` onto the end of `destination` and
/// returns the verses describing where the segments landed.
///
/// Segment `i` spans from cue `i` to cue `i + 1`, the last one to the end of
/// the source.
pub fn import_segments(source: &dyn ImportSource, destination: &AudioContainer) -> Result<Vec<VerseNode>> {
    let mut cues = source.cue_points();
    cues.sort_by_key(|cue| cue.location);

    let source_end = source.total_frames()?;
    let mut cursor = destination.total_frames()?;
    let mut writer = destination.writer()?;
    let mut nodes = Vec::with_capacity(cues.len());

    for (i, cue) in cues.iter().enumerate() {
        let end = cues
            .get(i + 1)
            .map_or(source_end, |next| next.location)
            .min(source_end);
        let start = cue.location.min(end);

        let copied = source.copy_frames(start, end, &mut writer)?;
        nodes.push(VerseNode::new(cursor, cursor + copied));
        cursor += copied;
    }
    writer.finish()?;

    tracing::info!(
        verses = nodes.len(),
        frames = cursor,
        "chapter_segments_imported"
    );
    Ok(nodes)
}
