/// Half-open frame range `[start, end)` of the working recording holding one verse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "specta", derive(specta::Type))]
pub struct VerseNode {
    pub start: u32,
    pub end: u32,
}

impl VerseNode {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// A verse that has started recording but has no end yet.
    pub fn open_at(start: u32) -> Self {
        Self::new(start, start)
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, frame: u32) -> bool {
        self.start <= frame && frame < self.end
    }
}
