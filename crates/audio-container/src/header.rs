use bytes::{Buf, BufMut, BytesMut};

use crate::{AudioFormat, Error, Result};

pub const HEADER_SIZE: usize = 44;
pub const CHUNK_HEADER_SIZE: usize = 8;

pub(crate) const RIFF_SIZE_OFFSET: u64 = 4;
pub(crate) const DATA_SIZE_OFFSET: u64 = 40;

const RIFF: &[u8; 4] = b"RIFF";
const WAVE: &[u8; 4] = b"WAVE";
const FMT: &[u8; 4] = b"fmt ";
const DATA: &[u8; 4] = b"data";

const FMT_CHUNK_SIZE: u32 = 16;
const PCM_FORMAT: u16 = 1;

/// Bytes covered by the RIFF size field in an audio-only file.
pub const RIFF_OVERHEAD: u32 = (HEADER_SIZE - CHUNK_HEADER_SIZE) as u32;

/// The canonical 44-byte header of a PCM WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormat,
    pub riff_size: u32,
    pub data_len: u32,
}

impl WavHeader {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            riff_size: RIFF_OVERHEAD,
            data_len: 0,
        }
    }

    /// Riff size for `audio_len` bytes of samples followed by `metadata_len` bytes of chunks.
    pub fn riff_size_for(audio_len: u32, metadata_len: u32) -> u32 {
        RIFF_OVERHEAD
            .saturating_add(audio_len)
            .saturating_add(metadata_len)
    }

    /// Length of the chunk block stored after the audio, as declared by the header.
    pub fn declared_metadata_len(&self) -> u32 {
        self.riff_size
            .saturating_sub(RIFF_OVERHEAD)
            .saturating_sub(self.data_len)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(HEADER_SIZE);
        buf.put_slice(RIFF);
        buf.put_u32_le(self.riff_size);
        buf.put_slice(WAVE);
        buf.put_slice(FMT);
        buf.put_u32_le(FMT_CHUNK_SIZE);
        buf.put_u16_le(PCM_FORMAT);
        buf.put_u16_le(self.format.channels);
        buf.put_u32_le(self.format.sample_rate);
        buf.put_u32_le(self.format.byte_rate());
        buf.put_u16_le(self.format.block_align());
        buf.put_u16_le(self.format.bits_per_sample);
        buf.put_slice(DATA);
        buf.put_u32_le(self.data_len);

        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(&buf);
        out
    }

    /// Parses and validates the fixed tags and the PCM format code.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(Error::invalid(format!(
                "header is {} bytes, expected {HEADER_SIZE}",
                bytes.len()
            )));
        }

        let mut buf = &bytes[..HEADER_SIZE];
        let riff = take_tag(&mut buf);
        let riff_size = buf.get_u32_le();
        let wave = take_tag(&mut buf);
        let fmt = take_tag(&mut buf);
        let _fmt_size = buf.get_u32_le();
        let format_code = buf.get_u16_le();
        let channels = buf.get_u16_le();
        let sample_rate = buf.get_u32_le();
        let _byte_rate = buf.get_u32_le();
        let _block_align = buf.get_u16_le();
        let bits_per_sample = buf.get_u16_le();
        let _data = take_tag(&mut buf);
        let data_len = buf.get_u32_le();

        validate_tag(&riff, RIFF)?;
        validate_tag(&wave, WAVE)?;
        validate_tag(&fmt, FMT)?;
        if format_code != PCM_FORMAT {
            return Err(Error::invalid(format!(
                "format code {format_code} is not PCM"
            )));
        }

        Ok(Self {
            format: AudioFormat::new(sample_rate, channels, bits_per_sample),
            riff_size,
            data_len,
        })
    }
}

fn take_tag(buf: &mut &[u8]) -> [u8; 4] {
    let mut tag = [0u8; 4];
    buf.copy_to_slice(&mut tag);
    tag
}

fn validate_tag(found: &[u8; 4], expected: &[u8; 4]) -> Result<()> {
    if found == expected {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "expected tag {:?}, found {:?}",
            String::from_utf8_lossy(expected),
            String::from_utf8_lossy(found)
        )))
    }
}
