mod append;
mod container;
mod cue;
mod error;
mod format;
mod header;
mod reader;
mod writer;

pub use append::*;
pub use container::{AudioContainer, ContainerKind};
pub use cue::{CuePoint, CueSet};
pub use error::*;
pub use format::*;
pub use header::{CHUNK_HEADER_SIZE, HEADER_SIZE, RIFF_OVERHEAD, WavHeader};
pub use reader::MappedReader;
pub use writer::StreamingWriter;
