//! `cue ` + `LIST/adtl/labl` chunk pair carrying named frame markers.
//!
//! Layout written after the audio samples of a WAV file:
//!
//! ```text
//! "cue " size count { id location "data" 0 0 location } * count
//! "LIST" size "adtl" { "labl" size id label-bytes-padded-to-4 } * count
//! ```
//!
//! The `id` of a cue is its position once sorted by location. Decoding joins
//! locations and labels by id and silently drops halves without a partner.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};

use crate::header::CHUNK_HEADER_SIZE;
use crate::{Error, Result};

pub(crate) const CUE: &[u8; 4] = b"cue ";
const LIST: &[u8; 4] = b"LIST";
const ADTL: &[u8; 4] = b"adtl";
const LABL: &[u8; 4] = b"labl";
const DATA: &[u8; 4] = b"data";

const TAG_SIZE: usize = 4;
const CUE_COUNT_SIZE: usize = 4;
const CUE_ID_SIZE: usize = 4;
const CUE_RECORD_SIZE: usize = 24;
const WORD_SIZE: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct CuePoint {
    pub location: u32,
    pub label: String,
}

impl CuePoint {
    pub fn new(location: u32, label: impl Into<String>) -> Self {
        Self {
            location,
            label: label.into(),
        }
    }

    /// Verse number when the label is a lone unsigned integer, surrounding whitespace ignored.
    pub fn verse_number(&self) -> Option<u32> {
        self.label.trim().parse().ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSet {
    cues: Vec<CuePoint>,
}

impl From<Vec<CuePoint>> for CueSet {
    fn from(cues: Vec<CuePoint>) -> Self {
        Self { cues }
    }
}

impl CueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cue: CuePoint) {
        self.cues.push(cue);
    }

    pub fn extend(&mut self, cues: impl IntoIterator<Item = CuePoint>) {
        self.cues.extend(cues);
    }

    pub fn clear(&mut self) {
        self.cues.clear();
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CuePoint> {
        self.cues.iter()
    }

    /// Cues ordered by location; ties keep insertion order.
    pub fn sorted(&self) -> Vec<CuePoint> {
        let mut cues = self.cues.clone();
        cues.sort_by_key(|cue| cue.location);
        cues
    }

    /// Cues that mark verse starts, ordered by location.
    pub fn verse_markers(&self) -> Vec<CuePoint> {
        self.sorted()
            .into_iter()
            .filter(|cue| cue.verse_number().is_some())
            .collect()
    }

    /// Exact size of [`CueSet::encode`] output.
    pub fn encoded_len(&self) -> usize {
        if self.cues.is_empty() {
            return 0;
        }

        let cue_chunk = CHUNK_HEADER_SIZE + cue_chunk_body_len(self.cues.len());
        let list_chunk = CHUNK_HEADER_SIZE + TAG_SIZE + self.labels_len();
        cue_chunk + list_chunk
    }

    fn labels_len(&self) -> usize {
        self.cues
            .iter()
            .map(|cue| CHUNK_HEADER_SIZE + CUE_ID_SIZE + word_aligned(cue.label.len()))
            .sum()
    }

    pub fn encode(&self) -> Vec<u8> {
        if self.cues.is_empty() {
            return Vec::new();
        }

        let cues = self.sorted();
        let mut buf = BytesMut::with_capacity(self.encoded_len());

        buf.put_slice(CUE);
        buf.put_u32_le(cue_chunk_body_len(cues.len()) as u32);
        buf.put_u32_le(cues.len() as u32);
        for (id, cue) in cues.iter().enumerate() {
            buf.put_u32_le(id as u32);
            buf.put_u32_le(cue.location);
            buf.put_slice(DATA);
            buf.put_u32_le(0);
            buf.put_u32_le(0);
            buf.put_u32_le(cue.location);
        }

        buf.put_slice(LIST);
        buf.put_u32_le((TAG_SIZE + self.labels_len()) as u32);
        buf.put_slice(ADTL);
        for (id, cue) in cues.iter().enumerate() {
            let label = cue.label.as_bytes();
            let aligned = word_aligned(label.len());

            buf.put_slice(LABL);
            buf.put_u32_le((CUE_ID_SIZE + aligned) as u32);
            buf.put_u32_le(id as u32);
            buf.put_slice(label);
            buf.put_bytes(0, aligned - label.len());
        }

        buf.to_vec()
    }

    /// Scans a chunk stream and collects every complete cue found in it.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut builder = CueListBuilder::default();
        let mut chunk = bytes;

        while chunk.remaining() > CHUNK_HEADER_SIZE {
            let (tag, size) = read_chunk_header(&mut chunk);
            if size > chunk.remaining() {
                return Err(Error::invalid(format!(
                    "chunk {:?} declares {size} bytes but {} remain",
                    String::from_utf8_lossy(&tag),
                    chunk.remaining()
                )));
            }

            let body = &chunk[..size];
            match &tag {
                CUE => parse_cue(body, &mut builder)?,
                LIST => parse_labels(body, &mut builder)?,
                _ => {}
            }
            chunk.advance(size);
        }

        Ok(builder.build())
    }
}

impl<'a> IntoIterator for &'a CueSet {
    type Item = &'a CuePoint;
    type IntoIter = std::slice::Iter<'a, CuePoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

fn cue_chunk_body_len(count: usize) -> usize {
    CUE_COUNT_SIZE + CUE_RECORD_SIZE * count
}

fn word_aligned(len: usize) -> usize {
    len.div_ceil(WORD_SIZE) * WORD_SIZE
}

fn read_chunk_header(chunk: &mut &[u8]) -> ([u8; 4], usize) {
    let mut tag = [0u8; 4];
    chunk.copy_to_slice(&mut tag);
    let size = chunk.get_u32_le() as usize;
    (tag, size)
}

fn parse_cue(mut chunk: &[u8], builder: &mut CueListBuilder) -> Result<()> {
    if chunk.remaining() < CUE_COUNT_SIZE {
        return Ok(());
    }

    let count = chunk.get_u32_le() as usize;
    let expected = count.checked_mul(CUE_RECORD_SIZE);
    if expected != Some(chunk.remaining()) {
        return Err(Error::invalid(format!(
            "cue chunk declares {count} cues but holds {} bytes",
            chunk.remaining()
        )));
    }

    for _ in 0..count {
        let id = chunk.get_u32_le();
        let location = chunk.get_u32_le();
        builder.add_location(id, location);
        chunk.advance(CUE_RECORD_SIZE - 8);
    }

    Ok(())
}

fn parse_labels(mut chunk: &[u8], builder: &mut CueListBuilder) -> Result<()> {
    if chunk.remaining() < TAG_SIZE || &chunk[..TAG_SIZE] != ADTL {
        return Ok(());
    }
    chunk.advance(TAG_SIZE);

    while chunk.remaining() > CHUNK_HEADER_SIZE {
        let (tag, size) = read_chunk_header(&mut chunk);
        // sizes may omit the pad byte of an odd-length body
        let padded = size + size % 2;
        if padded > chunk.remaining() {
            return Err(Error::invalid(format!(
                "label sub-chunk declares {size} bytes but {} remain",
                chunk.remaining()
            )));
        }

        if &tag == LABL && padded >= CUE_ID_SIZE {
            let mut body = &chunk[..padded];
            let id = body.get_u32_le();
            let text = trim_trailing_nul(body);
            builder.add_label(id, String::from_utf8_lossy(text).into_owned());
        }
        chunk.advance(padded);
    }

    Ok(())
}

fn trim_trailing_nul(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&byte| byte != 0)
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}

#[derive(Default)]
struct CueListBuilder {
    entries: BTreeMap<u32, (Option<u32>, Option<String>)>,
}

impl CueListBuilder {
    fn add_location(&mut self, id: u32, location: u32) {
        self.entries.entry(id).or_default().0 = Some(location);
    }

    fn add_label(&mut self, id: u32, label: String) {
        self.entries.entry(id).or_default().1 = Some(label);
    }

    fn build(self) -> CueSet {
        let mut cues = Vec::with_capacity(self.entries.len());
        for (id, entry) in self.entries {
            match entry {
                (Some(location), Some(label)) => cues.push(CuePoint { location, label }),
                _ => tracing::debug!(cue_id = id, "dropping_incomplete_cue"),
            }
        }
        cues.sort_by_key(|cue| cue.location);
        CueSet { cues }
    }
}
