use crate::{Error, Result, VerseNode};

/// Ordered verse regions over one append-only recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VerseIndex {
    nodes: Vec<VerseNode>,
}

impl From<Vec<VerseNode>> for VerseIndex {
    fn from(nodes: Vec<VerseNode>) -> Self {
        Self { nodes }
    }
}

impl VerseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[VerseNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VerseNode> {
        self.nodes.get(index)
    }

    /// Appends `[prior_end, total_frames)` where `prior_end` is the end of the
    /// last verse, or 0 for an empty index.
    pub fn append(&mut self, total_frames: u32) -> VerseNode {
        let prior_end = self.nodes.last().map_or(0, |node| node.end);
        let node = VerseNode::new(prior_end, total_frames.max(prior_end));
        self.nodes.push(node);
        node
    }

    /// Appends an open verse that starts recording at `start`.
    pub fn begin_at(&mut self, start: u32) -> VerseNode {
        let node = VerseNode::open_at(start);
        self.nodes.push(node);
        node
    }

    /// Swaps in `node` at `index`, returning the verse it replaced.
    pub fn replace(&mut self, index: usize, node: VerseNode) -> Result<VerseNode> {
        let slot = self.slot_mut(index)?;
        Ok(std::mem::replace(slot, node))
    }

    /// Moves the shared edge of two neighbouring verses. The boundary is
    /// clamped into the span both verses cover; the clamped value is returned.
    /// Verses that do not touch (one of them was re-recorded) have no shared
    /// edge and are rejected with [`Error::InvalidAdjacency`].
    pub fn move_boundary(&mut self, first: usize, second: usize, boundary: u32) -> Result<u32> {
        let (moved_first, moved_second) = self.moved_pair(first, second, boundary)?;
        self.nodes[first] = moved_first;
        self.nodes[second] = moved_second;
        Ok(moved_first.end)
    }

    /// Computes the two verses `move_boundary` would produce without applying them.
    pub(crate) fn moved_pair(
        &self,
        first: usize,
        second: usize,
        boundary: u32,
    ) -> Result<(VerseNode, VerseNode)> {
        let left = *self.slot(first)?;
        let right = *self.slot(second)?;
        if first.checked_add(1) != Some(second) || left.end != right.start {
            return Err(Error::InvalidAdjacency { first, second });
        }

        let boundary = boundary.max(left.start).min(right.end);
        Ok((
            VerseNode::new(left.start, boundary),
            VerseNode::new(boundary, right.end),
        ))
    }

    pub fn replace_all(&mut self, nodes: Vec<VerseNode>) -> Vec<VerseNode> {
        std::mem::replace(&mut self.nodes, nodes)
    }

    pub fn clear(&mut self) -> Vec<VerseNode> {
        std::mem::take(&mut self.nodes)
    }

    /// Closes the last verse at `end`. Does nothing on an empty index.
    pub fn finalize_last(&mut self, end: u32) -> Option<VerseNode> {
        let node = self.nodes.last_mut()?;
        node.end = end.max(node.start);
        Some(*node)
    }

    pub fn finalize(&mut self, index: usize, end: u32) -> Result<VerseNode> {
        let node = self.slot_mut(index)?;
        node.end = end.max(node.start);
        Ok(*node)
    }

    /// True when every verse ends exactly where the next one starts.
    pub fn is_contiguous(&self) -> bool {
        self.nodes
            .windows(2)
            .all(|pair| pair[0].end == pair[1].start)
    }

    /// Fraction of `expected` verses that have been recorded, capped at 1.0.
    pub fn completion_progress(&self, expected: usize) -> f64 {
        if expected == 0 {
            return 0.0;
        }
        (self.nodes.len() as f64 / expected as f64).min(1.0)
    }

    pub fn recorded_frames(&self) -> u64 {
        self.nodes.iter().map(|node| node.len() as u64).sum()
    }

    /// Verse containing `frame` of the working recording.
    pub fn find_by_frame(&self, frame: u32) -> Option<usize> {
        self.nodes.iter().position(|node| node.contains(frame))
    }

    /// Replaces `remove_count` verses at `at` with `insert`, returning the
    /// verses taken out.
    pub(crate) fn splice(
        &mut self,
        at: usize,
        remove_count: usize,
        insert: Vec<VerseNode>,
    ) -> Result<Vec<VerseNode>> {
        let len = self.nodes.len();
        let end = at.saturating_add(remove_count);
        if at > len || end > len {
            return Err(Error::IndexOutOfRange { index: end, len });
        }
        Ok(self.nodes.splice(at..end, insert).collect())
    }

    fn slot(&self, index: usize) -> Result<&VerseNode> {
        let len = self.nodes.len();
        self.nodes
            .get(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut VerseNode> {
        let len = self.nodes.len();
        self.nodes
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }
}

impl std::ops::Index<usize> for VerseIndex {
    type Output = VerseNode;

    fn index(&self, index: usize) -> &Self::Output {
        &self.nodes[index]
    }
}
