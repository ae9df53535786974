use std::fs::File;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use memmap2::{Mmap, MmapOptions};

use crate::{AudioContainer, Error, Result};

enum View {
    Empty,
    Mapped(Mmap),
}

impl View {
    fn as_bytes(&self) -> &[u8] {
        match self {
            View::Empty => &[],
            View::Mapped(map) => map,
        }
    }
}

/// Read-only memory-mapped view over a frame range of a container.
///
/// While open, the reader is counted against its container so that header
/// rewrites can be refused until every view is released.
pub struct MappedReader {
    container: AudioContainer,
    start: Option<u32>,
    end: Option<u32>,
    first_frame: u32,
    view: Option<View>,
    position: usize,
    readers: Arc<AtomicUsize>,
}

impl MappedReader {
    pub fn new(container: &AudioContainer, start: Option<u32>, end: Option<u32>) -> Self {
        Self {
            readers: container.reader_counter(),
            container: container.clone(),
            start,
            end,
            first_frame: 0,
            view: None,
            position: 0,
        }
    }

    /// Maps the requested range. Bounds past the end of the audio are clamped.
    pub fn open(&mut self) -> Result<()> {
        if self.view.is_some() {
            return Ok(());
        }

        let format = self.container.format();
        let total = self.container.total_frames()?;
        let end = self.end.unwrap_or(total).min(total);
        let start = self.start.unwrap_or(0).min(end);
        if self.start.is_some_and(|s| s > end) || self.end.is_some_and(|e| e > total) {
            tracing::warn!(
                path = %self.container.path().display(),
                requested_start = ?self.start,
                requested_end = ?self.end,
                start,
                end,
                "reader_range_clamped"
            );
        }

        let offset = self.container.header_len() + format.bytes_for_frames(start);
        let len = format.bytes_for_frames(end - start) as usize;

        let view = if len == 0 {
            View::Empty
        } else {
            let file = File::open(self.container.path())?;
            // SAFETY: the mapping covers audio bytes only. Writers append past
            // this range and header rewrites are refused while readers exist.
            let map = unsafe { MmapOptions::new().offset(offset).len(len).map(&file)? };
            View::Mapped(map)
        };

        self.first_frame = start;
        self.position = 0;
        self.view = Some(view);
        self.readers.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.view.is_some()
    }

    /// Moves the read position to an absolute frame of the container.
    pub fn seek(&mut self, frame: u32) -> Result<()> {
        let Some(view) = self.view.as_ref() else {
            return Err(Error::IndexOutOfRange {
                index: frame as usize,
                len: 0,
            });
        };

        let relative = frame.saturating_sub(self.first_frame);
        let offset = self.container.format().bytes_for_frames(relative) as usize;
        self.position = offset.min(view.as_bytes().len());
        Ok(())
    }

    pub fn has_remaining(&self) -> bool {
        self.view
            .as_ref()
            .is_some_and(|view| self.position < view.as_bytes().len())
    }

    /// Copies as many bytes as fit into `buf` and advances. Returns 0 at the end.
    pub fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let view = self
            .view
            .as_ref()
            .ok_or_else(|| Error::invalid("reader is not open"))?;

        let remaining = &view.as_bytes()[self.position..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.position += n;
        Ok(n)
    }

    /// Absolute frame of the next byte to be read.
    pub fn frame_position(&self) -> u32 {
        self.first_frame + self.container.format().frames_for_bytes(self.position as u64)
    }

    /// Frames covered by the mapped range.
    pub fn frames(&self) -> u32 {
        let len = self.view.as_ref().map_or(0, |view| view.as_bytes().len());
        self.container.format().frames_for_bytes(len as u64)
    }

    /// Unmaps the view and stops counting against the container.
    pub fn release(&mut self) {
        if self.view.take().is_some() {
            self.readers.fetch_sub(1, Ordering::AcqRel);
        }
        self.position = 0;
    }
}

impl std::io::Read for MappedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.read_into(buf).map_err(std::io::Error::other)
    }
}

impl Drop for MappedReader {
    fn drop(&mut self) {
        self.release();
    }
}
