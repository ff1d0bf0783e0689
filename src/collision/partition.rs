//! Two-phase partitioning of the flattened cell range across workers.
//!
//! Resolving a cell can move any particle in its 3x3 block, i.e. in cells up
//! to `cols + 1` ids away. Contiguous ranges are therefore split into two
//! phases: all even-indexed ranges run concurrently, then all odd-indexed
//! ones. Each range is at least `2 * cols + 2` cells long, so two ranges of the
//! same phase are separated by a full range of the other phase and the cells
//! they can touch never overlap.

use std::ops::Range;

/// Which half of the ranges runs in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Even,
    Odd,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Even, Phase::Odd];

    #[inline]
    fn contains(self, range_index: usize) -> bool {
        match self {
            Phase::Even => range_index % 2 == 0,
            Phase::Odd => range_index % 2 == 1,
        }
    }
}

/// Contiguous cell ranges for a grid, split into two non-adjacent phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    cell_count: usize,
    cols: usize,
    chunk_len: usize,
    ranges: Vec<Range<usize>>,
}

impl PartitionPlan {
    /// Plans `cell_count` cells of a grid `cols` wide for `workers` threads.
    ///
    /// Aims for one range per worker per phase, but never shorter than
    /// [`Self::min_chunk_len`].
    pub fn new(cell_count: usize, cols: usize, workers: usize) -> Self {
        let cols = cols.max(1);
        let target = cell_count.div_ceil(workers.max(1) * 2);
        let chunk_len = target.max(Self::min_chunk_len(cols));

        let ranges = (0..cell_count)
            .step_by(chunk_len)
            .map(|start| start..(start + chunk_len).min(cell_count))
            .collect();

        Self {
            cell_count,
            cols,
            chunk_len,
            ranges,
        }
    }

    /// Shortest range that keeps same-phase ranges out of each other's reach.
    #[inline]
    pub fn min_chunk_len(cols: usize) -> usize {
        2 * cols + 2
    }

    #[inline]
    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        self.cell_count
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }

    /// Ranges that run concurrently in `phase`.
    pub fn phase(&self, phase: Phase) -> impl Iterator<Item = Range<usize>> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .filter(move |(index, _)| phase.contains(*index))
            .map(|(_, range)| range.clone())
    }

    /// Cells whose particles may be read or moved while `range` is resolved.
    pub fn reach(&self, range: &Range<usize>) -> Range<usize> {
        let pad = self.cols + 1;
        range.start.saturating_sub(pad)..(range.end + pad).min(self.cell_count)
    }

    /// Every cell belongs to exactly one range.
    pub fn covers_all_cells(&self) -> bool {
        let mut expected = 0;
        for range in &self.ranges {
            if range.start != expected || range.end <= range.start {
                return false;
            }
            expected = range.end;
        }
        expected == self.cell_count
    }

    /// No two ranges of the same phase can touch the same cell.
    pub fn is_race_free(&self) -> bool {
        Phase::ALL.into_iter().all(|phase| {
            let reaches: Vec<Range<usize>> = self.phase(phase).map(|r| self.reach(&r)).collect();
            reaches
                .iter()
                .enumerate()
                .all(|(i, a)| reaches[i + 1..].iter().all(|b| a.end <= b.start || b.end <= a.start))
        })
    }
}
