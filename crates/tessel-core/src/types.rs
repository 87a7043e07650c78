use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TesselError;

pub type Result<T> = std::result::Result<T, TesselError>;

/// Axis of the 3D index space, ordered from fastest to slowest varying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
            Self::Z => write!(f, "z"),
        }
    }
}

/// Inclusive axis-aligned integer box in 3D index space.
///
/// Stored as `[min_x, max_x, min_y, max_y, min_z, max_z]`. An axis whose max is
/// below its min is empty, and so is the whole extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    bounds: [i32; 6],
}

impl Extent {
    /// Canonical empty extent.
    pub const EMPTY: Extent = Extent {
        bounds: [0, -1, 0, -1, 0, -1],
    };

    pub const fn new(x0: i32, x1: i32, y0: i32, y1: i32, z0: i32, z1: i32) -> Self {
        Self {
            bounds: [x0, x1, y0, y1, z0, z1],
        }
    }

    pub const fn from_array(bounds: [i32; 6]) -> Self {
        Self { bounds }
    }

    /// Extent starting at the origin with the given sample counts per axis.
    pub fn from_dimensions(dims: [usize; 3]) -> Self {
        let mut bounds = [0i32; 6];
        for (axis, &dim) in dims.iter().enumerate() {
            bounds[2 * axis + 1] = (dim as i64 - 1).clamp(-1, i32::MAX as i64) as i32;
        }
        Self { bounds }
    }

    pub const fn as_array(&self) -> [i32; 6] {
        self.bounds
    }

    pub fn min(&self, axis: Axis) -> i32 {
        self.bounds[2 * axis.index()]
    }

    pub fn max(&self, axis: Axis) -> i32 {
        self.bounds[2 * axis.index() + 1]
    }

    /// Number of samples along `axis`, zero when the axis is empty.
    pub fn len(&self, axis: Axis) -> i64 {
        (self.max(axis) as i64 - self.min(axis) as i64 + 1).max(0)
    }

    pub fn dimensions(&self) -> [i64; 3] {
        [self.len(Axis::X), self.len(Axis::Y), self.len(Axis::Z)]
    }

    pub fn is_empty(&self) -> bool {
        Axis::ALL.iter().any(|&axis| self.max(axis) < self.min(axis))
    }

    /// Total number of samples covered, saturating at `u64::MAX`.
    pub fn num_samples(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.dimensions()
            .iter()
            .fold(1u64, |acc, &len| acc.saturating_mul(len as u64))
    }

    /// Returns a copy with `axis` replaced by `[min, max]`.
    pub fn with_axis(&self, axis: Axis, min: i32, max: i32) -> Self {
        let mut bounds = self.bounds;
        bounds[2 * axis.index()] = min;
        bounds[2 * axis.index() + 1] = max;
        Self { bounds }
    }

    pub fn contains_point(&self, point: [i32; 3]) -> bool {
        Axis::ALL.iter().all(|&axis| {
            let value = point[axis.index()];
            value >= self.min(axis) && value <= self.max(axis)
        })
    }

    /// True when `other` lies entirely inside this extent. Empty extents are
    /// contained by everything.
    pub fn contains(&self, other: &Extent) -> bool {
        if other.is_empty() {
            return true;
        }
        Axis::ALL
            .iter()
            .all(|&axis| other.min(axis) >= self.min(axis) && other.max(axis) <= self.max(axis))
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        !self.intersection(other).is_empty()
    }

    pub fn intersection(&self, other: &Extent) -> Extent {
        let mut bounds = [0i32; 6];
        for axis in Axis::ALL {
            let i = axis.index();
            bounds[2 * i] = self.min(axis).max(other.min(axis));
            bounds[2 * i + 1] = self.max(axis).min(other.max(axis));
        }
        let clipped = Extent { bounds };
        if clipped.is_empty() {
            Extent::EMPTY
        } else {
            clipped
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<[i32; 6]> for Extent {
    fn from(bounds: [i32; 6]) -> Self {
        Self::from_array(bounds)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x0, x1, y0, y1, z0, z1] = self.bounds;
        write!(f, "[{x0}..{x1}, {y0}..{y1}, {z0}..{z1}]")
    }
}

/// One unit of dispatched work; lives only for the duration of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub piece: usize,
    pub extent: Extent,
    pub thread_id: usize,
    /// Set on the single worker allowed to publish progress.
    pub leader: bool,
}

impl WorkItem {
    pub fn new(piece: usize, extent: Extent, thread_id: usize, leader: bool) -> Self {
        Self {
            piece,
            extent,
            thread_id,
            leader,
        }
    }
}

#[inline]
pub fn duration_to_us(duration: Duration) -> u64 {
    duration.as_micros().min(u64::MAX as u128) as u64
}
