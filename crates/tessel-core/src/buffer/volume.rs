use std::marker::PhantomData;

use crate::error::TesselError;
use crate::types::{Axis, Extent, Result};

/// Dense sample buffer laid out x-fastest over an extent.
///
/// Each sample holds `components` consecutive values.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    extent: Extent,
    components: usize,
    data: Vec<T>,
}

impl<T: Clone> Volume<T> {
    pub fn new(extent: Extent, components: usize, fill: T) -> Self {
        let components = components.max(1);
        let len = extent.num_samples() as usize * components;
        Self {
            extent,
            components,
            data: vec![fill; len],
        }
    }
}

impl<T> Volume<T> {
    pub fn from_vec(extent: Extent, components: usize, data: Vec<T>) -> Result<Self> {
        let components = components.max(1);
        let expected = extent.num_samples() as usize * components;
        if data.len() != expected {
            return Err(TesselError::InvalidView(format!(
                "buffer holds {} values, extent {extent} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            extent,
            components,
            data,
        })
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Index of the first component of `point`, if inside the extent.
    pub fn offset(&self, point: [i32; 3]) -> Option<usize> {
        sample_offset(&self.extent, self.components, point)
    }

    pub fn get(&self, point: [i32; 3]) -> Option<&[T]> {
        let start = self.offset(point)?;
        self.data.get(start..start + self.components)
    }

    pub fn get_mut(&mut self, point: [i32; 3]) -> Option<&mut [T]> {
        let start = self.offset(point)?;
        self.data.get_mut(start..start + self.components)
    }

    /// Row `(y, z)` restricted to `[x0, x1]`.
    pub fn row(&self, x0: i32, x1: i32, y: i32, z: i32) -> Option<&[T]> {
        let start = self.offset([x0, y, z])?;
        let end = self.offset([x1, y, z])? + self.components;
        self.data.get(start..end)
    }

    /// Splits the buffer into a view that hands out disjoint per-piece writers.
    pub fn shared_output(&mut self) -> SharedOutput<'_, T> {
        SharedOutput {
            base: self.data.as_mut_ptr(),
            len: self.data.len(),
            extent: self.extent,
            components: self.components,
            _marker: PhantomData,
        }
    }
}

fn sample_offset(extent: &Extent, components: usize, point: [i32; 3]) -> Option<usize> {
    if !extent.contains_point(point) {
        return None;
    }
    let [nx, ny, _] = extent.dimensions();
    let dx = point[0] as i64 - extent.min(Axis::X) as i64;
    let dy = point[1] as i64 - extent.min(Axis::Y) as i64;
    let dz = point[2] as i64 - extent.min(Axis::Z) as i64;
    Some(((dz * ny + dy) * nx + dx) as usize * components)
}

/// Output buffer shared by every worker of one run.
///
/// Writers can only address their own sub-extent; because the splitter never
/// hands two pieces overlapping extents, concurrent writers never alias.
pub struct SharedOutput<'a, T> {
    base: *mut T,
    len: usize,
    extent: Extent,
    components: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: the pointer comes from an exclusive borrow held for 'a; access is
// only through `PieceWriter`s over disjoint extents.
unsafe impl<T: Send> Send for SharedOutput<'_, T> {}
unsafe impl<T: Send> Sync for SharedOutput<'_, T> {}

impl<'a, T> SharedOutput<'a, T> {
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Creates a writer over `piece`.
    ///
    /// # Safety
    ///
    /// `piece` must lie inside [`Self::extent`] and must not overlap the
    /// extent of any other writer alive at the same time.
    pub(crate) unsafe fn piece_writer(&self, piece: Extent) -> PieceWriter<'_, T> {
        debug_assert!(self.extent.contains(&piece));
        PieceWriter {
            base: self.base,
            len: self.len,
            volume: self.extent,
            components: self.components,
            extent: piece,
            _marker: PhantomData,
        }
    }
}

/// Mutable view over one piece of a [`SharedOutput`].
pub struct PieceWriter<'a, T> {
    base: *mut T,
    len: usize,
    volume: Extent,
    components: usize,
    extent: Extent,
    _marker: PhantomData<&'a mut [T]>,
}

unsafe impl<T: Send> Send for PieceWriter<'_, T> {}

impl<T> PieceWriter<'_, T> {
    /// Sub-extent this writer may touch.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn get_mut(&mut self, point: [i32; 3]) -> Option<&mut [T]> {
        if !self.extent.contains_point(point) {
            return None;
        }
        let start = sample_offset(&self.volume, self.components, point)?;
        // SAFETY: `point` is inside this writer's extent, which no other writer
        // overlaps, and the range is within the buffer.
        Some(unsafe { self.slice_mut(start, self.components) })
    }

    /// Row `(y, z)` spanning this piece's x range.
    pub fn row_mut(&mut self, y: i32, z: i32) -> Option<&mut [T]> {
        let x0 = self.extent.min(Axis::X);
        let x1 = self.extent.max(Axis::X);
        if !self.extent.contains_point([x0, y, z]) {
            return None;
        }
        let start = sample_offset(&self.volume, self.components, [x0, y, z])?;
        let end = sample_offset(&self.volume, self.components, [x1, y, z])? + self.components;
        // SAFETY: the row lies inside this writer's extent.
        Some(unsafe { self.slice_mut(start, end - start) })
    }

    /// Calls `f(y, z, row)` for every row of the piece, z-major.
    pub fn for_each_row<F>(&mut self, mut f: F)
    where
        F: FnMut(i32, i32, &mut [T]),
    {
        if self.extent.is_empty() {
            return;
        }
        for z in self.extent.min(Axis::Z)..=self.extent.max(Axis::Z) {
            for y in self.extent.min(Axis::Y)..=self.extent.max(Axis::Y) {
                if let Some(row) = self.row_mut(y, z) {
                    f(y, z, row);
                }
            }
        }
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.for_each_row(|_, _, row| row.fill(value.clone()));
    }

    unsafe fn slice_mut(&mut self, start: usize, len: usize) -> &mut [T] {
        assert!(start + len <= self.len, "piece row outside output buffer");
        // SAFETY: caller guarantees exclusivity of the range; bounds checked above.
        unsafe { std::slice::from_raw_parts_mut(self.base.add(start), len) }
    }
}
