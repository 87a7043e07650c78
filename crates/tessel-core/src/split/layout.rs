use crate::split::SplitConfig;
use crate::types::{Axis, Extent};

/// Division counts chosen for one `(whole, total_requested, config)` triple.
///
/// Building the layout is the only non-trivial step of a split; decoding a
/// piece index afterwards is a handful of divisions. Callers that walk many
/// pieces of one decomposition can build it once and use [`Self::pieces`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceLayout {
    whole: Extent,
    /// Split axes in priority order; the first is the least significant digit.
    axes: [Axis; 3],
    axis_count: usize,
    divisions: [u64; 3],
    total: usize,
}

impl PieceLayout {
    pub fn new(whole: &Extent, total_requested: usize, config: &SplitConfig) -> Self {
        let requested = total_requested.max(1) as u64;
        let mut axes = [Axis::X; 3];
        let mut axis_count = 0;
        let mut divisions = [1u64; 3];
        let mut total = 1u64;

        if !whole.is_empty() {
            for axis in config.path.iter() {
                if axis_count == config.mode.max_axes() {
                    break;
                }

                let size = whole.len(axis);
                let min_size = config.min_piece_size(axis);
                if size < 2 * min_size {
                    continue;
                }

                let budget = requested / total;
                if budget < 2 {
                    break;
                }

                let count = ((size / min_size) as u64).min(budget);
                divisions[axis.index()] = count;
                axes[axis_count] = axis;
                axis_count += 1;
                total *= count;
            }
        }

        Self {
            whole: *whole,
            axes,
            axis_count,
            divisions,
            total: total as usize,
        }
    }

    pub fn whole(&self) -> Extent {
        self.whole
    }

    /// Number of pieces actually produced; never exceeds the request.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Division count per axis, indexed by [`Axis::index`].
    pub fn divisions(&self) -> [usize; 3] {
        self.divisions.map(|count| count as usize)
    }

    pub fn split_axes(&self) -> &[Axis] {
        &self.axes[..self.axis_count]
    }

    /// Sub-extent of `piece`; [`Extent::EMPTY`] when out of range.
    pub fn piece(&self, piece: usize) -> Extent {
        if piece >= self.total {
            return Extent::EMPTY;
        }

        let mut remaining = piece as u64;
        let mut extent = self.whole;
        for &axis in self.split_axes() {
            let count = self.divisions[axis.index()];
            let coord = remaining % count;
            remaining /= count;

            let chunk = self.whole.len(axis) / count as i64;
            let lo = self.whole.min(axis) as i64 + coord as i64 * chunk;
            let hi = if coord + 1 == count {
                self.whole.max(axis) as i64
            } else {
                lo + chunk - 1
            };
            extent = extent.with_axis(axis, lo as i32, hi as i32);
        }

        extent
    }

    pub fn pieces(&self) -> impl Iterator<Item = Extent> + '_ {
        (0..self.total).map(move |piece| self.piece(piece))
    }
}

/// Maps `(whole, piece, total_requested, config)` to the piece's sub-extent and
/// the number of pieces the decomposition actually yields.
///
/// Axes are taken in `config.path` order, skipping any axis smaller than twice
/// its minimum piece size, and at most `config.mode.max_axes()` of them are
/// split. Each split axis greedily takes as many divisions as its minimum size
/// and the remaining request allow before the next axis is considered. The
/// returned total is the same for every `piece`. Never fails: degenerate input
/// collapses to a single piece covering `whole`.
pub fn split_extent(
    whole: &Extent,
    piece: usize,
    total_requested: usize,
    config: &SplitConfig,
) -> (Extent, usize) {
    let layout = PieceLayout::new(whole, total_requested, config);
    (layout.piece(piece), layout.total())
}
