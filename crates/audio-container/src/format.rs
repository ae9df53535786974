pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
pub const DEFAULT_CHANNELS: u16 = 1;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;

const BITS_IN_BYTE: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
        }
    }
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// Bytes per frame: one sample for every channel.
    pub fn frame_size(&self) -> usize {
        self.channels as usize * (self.bits_per_sample / BITS_IN_BYTE) as usize
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (self.bits_per_sample / BITS_IN_BYTE)
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }

    pub fn frames_for_bytes(&self, bytes: u64) -> u32 {
        match self.frame_size() {
            0 => 0,
            size => (bytes / size as u64).min(u32::MAX as u64) as u32,
        }
    }

    pub fn bytes_for_frames(&self, frames: u32) -> u64 {
        frames as u64 * self.frame_size() as u64
    }
}
