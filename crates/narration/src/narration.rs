use std::path::{Path, PathBuf};

use narration_audio::{AudioContainer, ContainerKind, MappedReader, StreamingWriter, append_frames};
use narration_storage::{chapter, fs};
use tracing::Instrument;

use crate::import::{ImportSource, import_segments};
use crate::{
    Error, NarrationAction, NarrationConfig, NarrationEvent, NarrationHistory, NarrationRuntime,
    Result, VerseIndex, VerseNode,
};

/// Narration session for one chapter: the working recording, the verses laid
/// over it and the edit history.
pub struct Narration<R: NarrationRuntime> {
    runtime: R,
    config: NarrationConfig,
    working: AudioContainer,
    verses_path: PathBuf,
    index: VerseIndex,
    history: NarrationHistory,
    recording_verse: Option<usize>,
    span: tracing::Span,
}

impl<R: NarrationRuntime> Narration<R> {
    pub fn new(runtime: R, config: NarrationConfig) -> Result<Self> {
        let chapter_dir = runtime.chapter_dir()?;
        chapter::ensure_chapter_dir(&chapter_dir)?;

        let audio_path = chapter::compute_working_audio_path(&chapter_dir, &config.working_audio_file);
        let working = AudioContainer::open_or_create(&audio_path, config.container_kind, config.format)?;

        let verses_path = chapter::compute_verses_path(&chapter_dir, &config.verses_file);
        fs::ensure_file(&verses_path, chapter::EMPTY_VERSES)?;

        let span = tracing::info_span!("narration", chapter = %chapter_dir.display());
        span.in_scope(|| tracing::debug!(path = %audio_path.display(), "working_audio_opened"));

        Ok(Self {
            runtime,
            config,
            working,
            verses_path,
            index: VerseIndex::new(),
            history: NarrationHistory::new(),
            recording_verse: None,
            span,
        })
    }

    /// Populates the verses, either by importing `import` or by restoring
    /// the saved snapshot.
    ///
    /// The import runs when a source is given and `force` is set or nothing
    /// has been recorded yet. It becomes a single undoable step.
    pub async fn load(&mut self, import: Option<Box<dyn ImportSource>>, force: bool) -> Result<()> {
        let span = self.span.clone();
        self.load_inner(import, force).instrument(span).await
    }

    async fn load_inner(&mut self, import: Option<Box<dyn ImportSource>>, force: bool) -> Result<()> {
        let working_is_empty = self.working.total_frames()? == 0;

        match import {
            Some(source) if force || working_is_empty => {
                tracing::info!(force, "import_chapter");
                let destination = self.working.clone();
                let nodes = tokio::task::spawn_blocking(move || {
                    import_segments(source.as_ref(), &destination)
                })
                .await
                .map_err(|e| Error::TaskJoin(e.to_string()))??;

                let total = self.working.total_frames()?;
                self.history
                    .execute(NarrationAction::bulk_replace(nodes), &mut self.index, total)?;
                self.recording_verse = None;
                fs::write_json_async(&self.verses_path, self.index.nodes()).await?;
            }
            _ => {
                let nodes: Vec<VerseNode> = fs::read_json_async(&self.verses_path).await?;
                tracing::info!(verses = nodes.len(), "restore_verses");
                self.index.replace_all(nodes);
                self.history.clear();
                self.recording_verse = None;
            }
        }

        self.emit_state();
        Ok(())
    }

    /// Closes a verse at the current end of the recording. Defaults to the
    /// verse being recorded, or the last one.
    pub fn finalize_verse(&mut self, index: Option<usize>) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        let total = self.working.total_frames()?;

        let node = match index.or(self.recording_verse) {
            Some(index) => Some(self.index.finalize(index, total)?),
            None => self.index.finalize_last(total),
        };
        self.recording_verse = None;
        tracing::info!(verse = ?index, end = total, "finalize_verse");

        if node.is_some() {
            self.commit()?;
        }
        Ok(())
    }

    /// Starts a new verse at the end of the recording, closing the one being
    /// recorded first.
    pub fn on_new_verse(&mut self) -> Result<()> {
        if self.recording_verse.is_some() {
            self.finalize_verse(None)?;
        }

        let span = self.span.clone();
        let _enter = span.enter();
        let total = self.working.total_frames()?;
        tracing::info!(verse = self.index.len(), start = total, "new_verse");
        self.execute(NarrationAction::append_verse(), total)?;
        self.recording_verse = Some(self.index.len() - 1);
        self.commit()
    }

    pub fn on_record_again(&mut self, index: usize) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        let total = self.working.total_frames()?;
        tracing::info!(verse = index, start = total, "record_again");
        self.execute(NarrationAction::re_record_verse(index), total)?;
        self.recording_verse = Some(index);
        self.commit()
    }

    pub fn on_verse_marker(&mut self, first: usize, second: usize, position: u32) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        tracing::info!(first, second, position, "verse_marker_moved");
        let total = self.working.total_frames()?;
        self.execute(NarrationAction::move_marker(first, second, position), total)?;
        self.commit()
    }

    pub fn on_edit_verse(&mut self, index: usize, start: u32, end: u32) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        tracing::info!(verse = index, start, end, "edit_verse");
        let total = self.working.total_frames()?;
        self.execute(NarrationAction::edit_verse(index, start, end), total)?;
        self.commit()
    }

    /// Appends an externally edited recording of a verse and points the verse
    /// at it. An empty recording leaves the verse unchanged.
    pub fn on_edit_verse_from(&mut self, index: usize, source: &AudioContainer) -> Result<()> {
        if self.index.get(index).is_none() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.index.len(),
            });
        }

        let start = self.working.total_frames()?;
        let mut writer = self.working.writer()?;
        append_frames(source, None, None, &mut writer)?;
        writer.finish()?;
        let end = self.working.total_frames()?;

        if start < end {
            self.on_edit_verse(index, start, end)?;
        } else {
            self.span
                .in_scope(|| tracing::warn!(verse = index, "edited_verse_empty"));
        }
        Ok(())
    }

    pub fn on_reset_all(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        tracing::info!(verses = self.index.len(), "reset_all");
        let total = self.working.total_frames()?;
        self.execute(NarrationAction::reset_all(), total)?;
        self.commit()
    }

    pub fn on_chapter_edited(&mut self, nodes: Vec<VerseNode>) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();
        tracing::info!(verses = nodes.len(), "chapter_edited");
        let total = self.working.total_frames()?;
        self.execute(NarrationAction::bulk_replace(nodes), total)?;
        self.commit()
    }

    pub fn undo(&mut self) -> Result<bool> {
        let span = self.span.clone();
        let _enter = span.enter();
        let undone = self.history.undo(&mut self.index)?;
        if undone {
            tracing::info!("undo");
            self.recording_verse = None;
            self.commit()?;
        }
        Ok(undone)
    }

    pub fn redo(&mut self) -> Result<bool> {
        let span = self.span.clone();
        let _enter = span.enter();
        let redone = self.history.redo(&mut self.index)?;
        if redone {
            tracing::info!("redo");
            self.recording_verse = None;
            self.commit()?;
        }
        Ok(redone)
    }

    /// Rewrites the working recording so it only holds audio of the active
    /// verses, in verse order, and clears the history.
    pub fn compact(&mut self) -> Result<()> {
        let span = self.span.clone();
        let _enter = span.enter();

        let readers = self.working.readers_open();
        if readers > 0 {
            return Err(narration_audio::Error::ReadersOpen(readers).into());
        }

        let path = self.working.path().to_path_buf();
        let scratch_path = chapter::compute_scratch_path(&path).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "working audio has no file name")
        })?;
        let scratch = AudioContainer::create(&scratch_path, self.working.kind(), self.working.format())?;

        let mut writer = scratch.writer()?;
        let mut nodes = Vec::with_capacity(self.index.len());
        let mut cursor = 0u32;
        for node in self.index.nodes() {
            let copied = append_frames(&self.working, Some(node.start), Some(node.end), &mut writer)?;
            nodes.push(VerseNode::new(cursor, cursor + copied));
            cursor += copied;
        }
        writer.finish()?;
        drop(writer);

        let before = self.working.total_frames()?;
        std::fs::rename(&scratch_path, &path)?;
        self.working = AudioContainer::open(&path, self.config.container_kind, self.config.format)?;
        self.index.replace_all(nodes);
        self.history.clear();
        self.recording_verse = None;

        tracing::info!(before, after = cursor, "working_audio_compacted");
        self.commit()
    }

    /// Writes the active verses, in verse order, to a standalone WAV file with
    /// a cue labelled `1..=n` at the start of each verse. Audio no verse
    /// refers to is left out.
    pub fn export_chapter(&self, path: impl AsRef<Path>) -> Result<AudioContainer> {
        let span = self.span.clone();
        let _enter = span.enter();

        let chapter = AudioContainer::create(path, ContainerKind::Wav, self.working.format())?;
        let mut writer = chapter.writer()?;
        let mut cursor = 0u32;
        for (i, node) in self.index.nodes().iter().enumerate() {
            writer.add_cue(cursor, (i + 1).to_string());
            cursor += append_frames(&self.working, Some(node.start), Some(node.end), &mut writer)?;
        }
        writer.finish()?;
        drop(writer);

        tracing::info!(
            path = %chapter.path().display(),
            verses = self.index.len(),
            frames = cursor,
            "chapter_exported"
        );
        Ok(AudioContainer::open_wav(chapter.path())?)
    }

    pub fn active_verses(&self) -> &[VerseNode] {
        self.index.nodes()
    }

    pub fn verse_index(&self) -> &VerseIndex {
        &self.index
    }

    pub fn has_undo(&self) -> bool {
        self.history.has_undo()
    }

    pub fn has_redo(&self) -> bool {
        self.history.has_redo()
    }

    pub fn completion_progress(&self, expected: usize) -> f64 {
        self.index.completion_progress(expected)
    }

    pub fn recording_verse(&self) -> Option<usize> {
        self.recording_verse
    }

    pub fn working_audio(&self) -> &AudioContainer {
        &self.working
    }

    pub fn config(&self) -> &NarrationConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Writer appending to the working recording.
    pub fn writer(&self) -> Result<StreamingWriter> {
        Ok(self.working.writer()?)
    }

    pub fn reader(&self, start: Option<u32>, end: Option<u32>) -> MappedReader {
        self.working.reader(start, end)
    }

    pub fn verse_reader(&self, index: usize) -> Result<MappedReader> {
        let node = self.index.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.index.len(),
        })?;
        Ok(self.working.reader(Some(node.start), Some(node.end)))
    }

    fn execute(&mut self, action: NarrationAction, total_frames: u32) -> Result<()> {
        self.history.execute(action, &mut self.index, total_frames)
    }

    fn commit(&self) -> Result<()> {
        fs::write_json(&self.verses_path, self.index.nodes())?;
        self.emit_state();
        Ok(())
    }

    fn emit_state(&self) {
        self.runtime.emit(NarrationEvent::StateChanged {
            active_verses: self.index.nodes().to_vec(),
            has_undo: self.history.has_undo(),
            has_redo: self.history.has_redo(),
        });
    }
}
