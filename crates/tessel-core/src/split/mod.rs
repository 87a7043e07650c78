//! Deterministic decomposition of an extent into disjoint pieces.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TesselError;
use crate::types::{Axis, Extent, Result};

pub mod layout;

pub use layout::{PieceLayout, split_extent};

/// Default minimum piece size per axis; the fastest axis keeps whole rows.
pub const DEFAULT_MIN_PIECE_SIZE: [i32; 3] = [16, 1, 1];

/// How many axes a decomposition may subdivide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SplitMode {
    /// One axis.
    #[default]
    Slab,
    /// Two axes.
    Beam,
    /// All three axes.
    Block,
}

impl SplitMode {
    pub fn max_axes(self) -> usize {
        match self {
            Self::Slab => 1,
            Self::Beam => 2,
            Self::Block => 3,
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slab => write!(f, "slab"),
            Self::Beam => write!(f, "beam"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Ordered list of up to three distinct axes giving subdivision priority.
#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "Vec<Axis>", into = "Vec<Axis>")]
pub struct SplitPath {
    axes: [Axis; 3],
    len: usize,
}

impl SplitPath {
    /// Empty path: nothing is ever split.
    pub const NONE: SplitPath = SplitPath {
        axes: [Axis::Z, Axis::Y, Axis::X],
        len: 0,
    };

    pub fn new(axes: &[Axis]) -> Result<Self> {
        if axes.len() > 3 {
            return Err(TesselError::InvalidSplitPath("more than three axes"));
        }

        let mut stored = [Axis::Z, Axis::Y, Axis::X];
        for (slot, &axis) in axes.iter().enumerate() {
            if axes[..slot].contains(&axis) {
                return Err(TesselError::InvalidSplitPath("axis listed twice"));
            }
            stored[slot] = axis;
        }

        Ok(Self {
            axes: stored,
            len: axes.len(),
        })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Keeps only the first `len` axes.
    pub fn truncated(&self, len: usize) -> Self {
        Self {
            axes: self.axes,
            len: self.len.min(len),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = Axis> + '_ {
        self.axes().iter().copied()
    }
}

impl Default for SplitPath {
    /// Slowest-varying axis first: Z, Y, X.
    fn default() -> Self {
        Self {
            axes: [Axis::Z, Axis::Y, Axis::X],
            len: 3,
        }
    }
}

impl PartialEq for SplitPath {
    fn eq(&self, other: &Self) -> bool {
        self.axes() == other.axes()
    }
}

impl Eq for SplitPath {}

impl std::hash::Hash for SplitPath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.axes().hash(state);
    }
}

impl fmt::Debug for SplitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.axes()).finish()
    }
}

impl fmt::Display for SplitPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|axis| axis.to_string()).collect();
        write!(f, "{}", names.join(","))
    }
}

impl TryFrom<Vec<Axis>> for SplitPath {
    type Error = TesselError;

    fn try_from(axes: Vec<Axis>) -> Result<Self> {
        Self::new(&axes)
    }
}

impl From<SplitPath> for Vec<Axis> {
    fn from(path: SplitPath) -> Self {
        path.axes().to_vec()
    }
}

/// Decomposition policy shared by every piece of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    pub mode: SplitMode,
    pub path: SplitPath,
    /// Per-axis floor below which an axis is never subdivided further.
    pub min_piece_size: [i32; 3],
}

impl SplitConfig {
    pub fn new(mode: SplitMode, path: SplitPath) -> Self {
        Self {
            mode,
            path,
            min_piece_size: DEFAULT_MIN_PIECE_SIZE,
        }
    }

    pub fn with_mode(mut self, mode: SplitMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_path(mut self, path: SplitPath) -> Self {
        self.path = path;
        self
    }

    pub fn with_min_piece_size(mut self, min_piece_size: [i32; 3]) -> Self {
        self.min_piece_size = min_piece_size;
        self
    }

    /// Effective minimum size along `axis`; non-positive values act as 1.
    pub fn min_piece_size(&self, axis: Axis) -> i64 {
        (self.min_piece_size[axis.index()] as i64).max(1)
    }

    /// See [`split_extent`].
    pub fn split(&self, whole: &Extent, piece: usize, total_requested: usize) -> (Extent, usize) {
        split_extent(whole, piece, total_requested, self)
    }

    pub fn layout(&self, whole: &Extent, total_requested: usize) -> PieceLayout {
        PieceLayout::new(whole, total_requested, self)
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self::new(SplitMode::default(), SplitPath::default())
    }
}
