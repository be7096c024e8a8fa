//! Non-owning tensor views over caller-allocated memory.
//!
//! This module provides the memory side of tiling:
//!
//! - [`Region`]: a handle over a caller-owned buffer, shared by every view
//!   carved from it
//! - [`Tensor`]: base position + shape + layout inside a region
//! - [`SubTensor`]: a tensor that remembers which tile of a larger tensor
//!   it stands for, so imports can clip the halo
//! - [`HaloClip`]: the clipping arithmetic itself
//!
//! # Aliasing Model
//!
//! A pipeline needs several views of the same buffer alive at once: the
//! scheduler keeps one to export from while the caller holds another to
//! compute into. Views are therefore `Copy` and write through a shared
//! handle, the way a [`Cell`](std::cell::Cell) does. A region borrows its
//! buffer mutably for its whole lifetime, so nothing outside the view
//! system can observe the writes, and regions are neither `Send` nor
//! `Sync`, so all access stays on one thread.
//!
//! Every access is bounds-checked against the backing region. Creating a
//! view never touches memory, which is why a view may start before its
//! region (a tile reaching into the left halo); only the clipped part of
//! such a view is ever read or written.
//!
//! # Example
//!
//! ```rust
//! use tilestream::{Offset, Region, Shape, Tensor};
//!
//! let mut image = vec![0u16; 8 * 4];
//! let region = Region::new(&mut image);
//! let tensor = Tensor::dense(region, Shape::new_2d(8, 4));
//!
//! let window = tensor.view(Offset::new_2d(2, 1), Shape::new_2d(3, 2));
//! window.write(7, 0, 0, 0);
//! assert_eq!(tensor.read(2, 1, 0), 7);
//! ```

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

use bytemuck::Pod;

use crate::error::{TileError, TileResult};
use crate::geometry::{Layout, Offset, Shape};

/// Element types that can be tiled and transferred.
///
/// Any plain-old-data type qualifies. The halo value is the all-zero bit
/// pattern.
pub trait Element: Pod {}

impl<T: Pod> Element for T {}

/// Handle over a caller-allocated buffer.
///
/// The buffer stays borrowed for `'a`; the region and all views derived
/// from it can be copied freely within that lifetime.
pub struct Region<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<&'a [Cell<T>]>,
}

impl<'a, T> Clone for Region<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Region<'a, T> {}

impl<'a, T: Element> Region<'a, T> {
    /// Wraps a caller-owned buffer.
    pub fn new(buffer: &'a mut [T]) -> Self {
        let len = buffer.len();
        Self {
            ptr: NonNull::from(buffer).cast::<T>(),
            len,
            _marker: PhantomData,
        }
    }

    /// Number of elements in the region.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Is the region empty?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns true if both handles refer to the same buffer.
    #[inline]
    pub fn same_buffer(&self, other: &Region<'_, T>) -> bool {
        self.ptr == other.ptr && self.len == other.len
    }

    /// Reads element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn get(&self, index: usize) -> T {
        assert!(index < self.len, "Region index {} out of bounds ({})", index, self.len);
        // SAFETY: index checked above; the buffer is borrowed for 'a and only
        // reached through raw pointers, never through references.
        unsafe { self.ptr.as_ptr().add(index).read() }
    }

    /// Writes element `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set(&self, index: usize, value: T) {
        assert!(index < self.len, "Region index {} out of bounds ({})", index, self.len);
        // SAFETY: as in `get`; T is Pod so overwriting needs no drop.
        unsafe { self.ptr.as_ptr().add(index).write(value) }
    }

    /// Copies `count` elements from `src[src_index..]` to `self[dst_index..]`.
    ///
    /// Ranges may overlap when both handles refer to the same buffer.
    fn copy_span(&self, dst_index: usize, src: &Region<'_, T>, src_index: usize, count: usize) {
        assert!(dst_index + count <= self.len);
        assert!(src_index + count <= src.len);
        // SAFETY: both spans are within their regions (asserted above) and
        // `ptr::copy` tolerates overlap.
        unsafe {
            std::ptr::copy(
                src.ptr.as_ptr().add(src_index),
                self.ptr.as_ptr().add(dst_index),
                count,
            );
        }
    }

    /// Zeroes `count` elements starting at `index`.
    fn zero_span(&self, index: usize, count: usize) {
        assert!(index + count <= self.len);
        // SAFETY: span is in bounds; the all-zero pattern is a valid T (Pod).
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr().add(index), 0, count);
        }
    }
}

impl<'a, T> fmt::Debug for Region<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// A flat strided view: base position, shape and layout inside a region.
///
/// The element size is `size_of::<T>()`.
pub struct Tensor<'a, T> {
    region: Region<'a, T>,
    start: isize,
    shape: Shape,
    layout: Layout,
}

impl<'a, T> Clone for Tensor<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for Tensor<'a, T> {}

impl<'a, T: Element> Tensor<'a, T> {
    /// Creates a view with an explicit layout, starting at the region's
    /// first element.
    pub fn new(region: Region<'a, T>, shape: Shape, layout: Layout) -> Self {
        Self {
            region,
            start: 0,
            shape,
            layout,
        }
    }

    /// Creates a tightly packed view of `shape`.
    pub fn dense(region: Region<'a, T>, shape: Shape) -> Self {
        Self::new(region, shape, Layout::dense(shape))
    }

    /// Creates an empty view over `region`.
    pub fn empty(region: Region<'a, T>) -> Self {
        Self::dense(region, Shape::EMPTY)
    }

    /// The region backing this view.
    #[inline]
    pub fn region(&self) -> Region<'a, T> {
        self.region
    }

    /// Element index of the view's origin within its region. May be
    /// negative for views reaching into a halo.
    #[inline]
    pub fn start(&self) -> isize {
        self.start
    }

    /// Shape of the view.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Layout of the enclosing buffer.
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Size of one element in bytes.
    #[inline]
    pub fn elem_size(&self) -> usize {
        std::mem::size_of::<T>()
    }

    /// A view is empty if its shape is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    /// Number of elements covered by the view.
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.shape.num_elements()
    }

    /// Sub-view of `shape` at `offset` from this view's origin, keeping the
    /// enclosing layout. `offset` may be negative.
    pub fn view(&self, offset: Offset, shape: Shape) -> Tensor<'a, T> {
        Tensor {
            region: self.region,
            start: self.start + self.layout.linearize(offset),
            shape,
            layout: self.layout,
        }
    }

    /// Same origin and shape, different enclosing layout.
    pub fn with_layout(&self, layout: Layout) -> Tensor<'a, T> {
        Tensor { layout, ..*self }
    }

    /// Half-open range of element indices the view touches, or `None` for a
    /// view without elements.
    pub fn footprint(&self) -> Option<(isize, isize)> {
        if self.num_elements() == 0 {
            return None;
        }
        let last = self.layout.linearize(Offset::new(
            self.shape.width as isize - 1,
            self.shape.height as isize - 1,
            self.shape.depth as isize - 1,
        ));
        Some((self.start, self.start + last + 1))
    }

    /// Checks that every element of the view lies inside its region.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::OutOfBounds`] otherwise.
    pub fn check_bounds(&self) -> TileResult<()> {
        match self.footprint() {
            Some((start, end)) if start < 0 || end > self.region.len() as isize => {
                Err(TileError::out_of_bounds(start, end, self.region.len()))
            }
            _ => Ok(()),
        }
    }

    #[inline]
    fn index_of(&self, x: usize, y: usize, z: usize) -> usize {
        assert!(
            x < self.shape.width && y < self.shape.height && z < self.shape.depth,
            "Index ({}, {}, {}) out of bounds for shape {}",
            x,
            y,
            z,
            self.shape
        );
        let index = self.start + self.layout.linearize(Offset::new(x as isize, y as isize, z as isize));
        assert!(index >= 0, "Element ({}, {}, {}) lies before its region", x, y, z);
        index as usize
    }

    /// Reads the element at `(x, y, z)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the view's shape or the
    /// element is outside the backing region.
    #[inline]
    pub fn read(&self, x: usize, y: usize, z: usize) -> T {
        self.region.get(self.index_of(x, y, z))
    }

    /// Writes `value` at `(x, y, z)` and returns it.
    ///
    /// # Panics
    ///
    /// Same conditions as [`read`](Self::read).
    #[inline]
    pub fn write(&self, value: T, x: usize, y: usize, z: usize) -> T {
        self.region.set(self.index_of(x, y, z), value);
        value
    }

    /// Index of the first element of row `y` in plane `z`. Only valid after
    /// `check_bounds` succeeded.
    #[inline]
    fn row_start(&self, y: usize, z: usize) -> usize {
        (self.start + self.layout.linearize(Offset::new(0, y as isize, z as isize))) as usize
    }

    /// Strided 3D copy of `src` into this view.
    ///
    /// # Errors
    ///
    /// - [`TileError::ShapeMismatch`] if the shapes differ
    /// - [`TileError::OutOfBounds`] if either footprint leaves its region
    pub fn copy_from(&self, src: &Tensor<'_, T>) -> TileResult<()> {
        if self.shape != src.shape {
            return Err(TileError::shape_mismatch(src.shape, self.shape));
        }
        if self.num_elements() == 0 {
            return Ok(());
        }
        self.check_bounds()?;
        src.check_bounds()?;

        let width = self.shape.width;
        for z in 0..self.shape.depth {
            for y in 0..self.shape.height {
                self.region
                    .copy_span(self.row_start(y, z), &src.region, src.row_start(y, z), width);
            }
        }
        Ok(())
    }

    /// Sets every element of the view to zero.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::OutOfBounds`] if the footprint leaves the region.
    pub fn fill_zero(&self) -> TileResult<()> {
        if self.num_elements() == 0 {
            return Ok(());
        }
        self.check_bounds()?;

        let width = self.shape.width;
        for z in 0..self.shape.depth {
            for y in 0..self.shape.height {
                self.region.zero_span(self.row_start(y, z), width);
            }
        }
        Ok(())
    }

    /// Dense row-major snapshot of the view's elements.
    ///
    /// # Errors
    ///
    /// Returns [`TileError::OutOfBounds`] if the footprint leaves the region.
    pub fn to_vec(&self) -> TileResult<Vec<T>> {
        self.check_bounds()?;
        let mut out = Vec::with_capacity(self.num_elements());
        for z in 0..self.shape.depth {
            for y in 0..self.shape.height {
                for x in 0..self.shape.width {
                    out.push(self.read(x, y, z));
                }
            }
        }
        Ok(out)
    }
}

impl<'a, T> fmt::Debug for Tensor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("start", &self.start)
            .field("shape", &self.shape)
            .field("layout", &self.layout)
            .field("elem_size", &std::mem::size_of::<T>())
            .finish()
    }
}

/// Provenance of a sub-tensor: the shape of the tensor it was carved from
/// and its offset within that tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Origin {
    /// Shape of the originating tensor.
    pub shape: Shape,
    /// Offset of the sub-tensor within the originating tensor.
    pub offset: Offset,
}

impl Origin {
    /// Creates an origin.
    #[inline]
    pub const fn new(shape: Shape, offset: Offset) -> Self {
        Self { shape, offset }
    }
}

/// A tensor plus the [`Origin`] it stands for.
///
/// Schedulers hand these out: `tensor` is the internal working view and
/// `origin` tells the caller which part of the external tensor it holds.
pub struct SubTensor<'a, T> {
    /// The internal view.
    pub tensor: Tensor<'a, T>,
    /// Where the view sits within its originating tensor.
    pub origin: Origin,
}

impl<'a, T> Clone for SubTensor<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Copy for SubTensor<'a, T> {}

impl<'a, T: Element> SubTensor<'a, T> {
    /// Creates a sub-tensor.
    pub fn new(tensor: Tensor<'a, T>, origin: Origin) -> Self {
        Self { tensor, origin }
    }

    /// A sub-tensor covering all of `tensor`.
    pub fn whole(tensor: Tensor<'a, T>) -> Self {
        Self::new(tensor, Origin::new(tensor.shape(), Offset::ORIGIN))
    }

    /// An empty sub-tensor over `region`.
    pub fn empty(region: Region<'a, T>) -> Self {
        Self::new(Tensor::empty(region), Origin::default())
    }

    /// A sub-tensor is empty if its view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tensor.is_empty()
    }

    /// Shape of the view.
    #[inline]
    pub fn shape(&self) -> Shape {
        self.tensor.shape()
    }

    /// Reads the element at `(x, y, z)` of the view.
    #[inline]
    pub fn read(&self, x: usize, y: usize, z: usize) -> T {
        self.tensor.read(x, y, z)
    }

    /// Writes `value` at `(x, y, z)` of the view.
    #[inline]
    pub fn write(&self, value: T, x: usize, y: usize, z: usize) -> T {
        self.tensor.write(value, x, y, z)
    }

    /// How much of this sub-tensor lies outside its origin.
    #[inline]
    pub fn halo_clip(&self) -> HaloClip {
        HaloClip::compute(self.origin.offset, self.tensor.shape(), self.origin.shape)
    }
}

impl<'a, T> fmt::Debug for SubTensor<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubTensor")
            .field("tensor", &self.tensor)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Portion of a requested tile that falls outside the origin tensor.
///
/// Only x and y are clipped. Depth is never clipped: 3D halo augmentation
/// is not supported, and a request reaching past the front or back plane
/// is copied as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HaloClip {
    /// Columns before the origin's first column.
    pub x_offset: usize,
    /// Rows before the origin's first row.
    pub y_offset: usize,
    /// Columns past the origin's last column.
    pub x_cut: usize,
    /// Rows past the origin's last row.
    pub y_cut: usize,
}

impl HaloClip {
    /// Computes the clip of a request of `shape` at `offset` against an
    /// origin of `origin_shape`.
    pub fn compute(offset: Offset, shape: Shape, origin_shape: Shape) -> Self {
        let before = |o: isize| (-o).max(0) as usize;
        let after = |o: isize, extent: usize, origin: usize| {
            (o + extent as isize - origin as isize).max(0) as usize
        };
        Self {
            x_offset: before(offset.x),
            y_offset: before(offset.y),
            x_cut: after(offset.x, shape.width, origin_shape.width),
            y_cut: after(offset.y, shape.height, origin_shape.height),
        }
    }

    /// True if the whole request lies inside the origin.
    #[inline]
    pub fn is_noop(&self) -> bool {
        *self == HaloClip::default()
    }

    /// Offset of the valid part within the request.
    #[inline]
    pub fn inner_offset(&self) -> Offset {
        Offset::new_2d(self.x_offset as isize, self.y_offset as isize)
    }

    /// Shape of the valid part of a request of `shape`.
    #[inline]
    pub fn clipped_shape(&self, shape: Shape) -> Shape {
        Shape::new(
            shape.width.saturating_sub(self.x_offset + self.x_cut),
            shape.height.saturating_sub(self.y_offset + self.y_cut),
            shape.depth,
        )
    }

    /// The zero-filled border of a request of `shape`, as up to four
    /// disjoint `(offset, shape)` bands: top rows, bottom rows, then the
    /// left and right columns of the rows in between.
    pub fn border_bands(&self, shape: Shape) -> Vec<(Offset, Shape)> {
        let inner = self.clipped_shape(shape);
        if inner.num_elements() == 0 {
            return vec![(Offset::ORIGIN, shape)];
        }

        let mut bands = Vec::with_capacity(4);
        if self.y_offset > 0 {
            bands.push((Offset::ORIGIN, Shape::new(shape.width, self.y_offset, shape.depth)));
        }
        if self.y_cut > 0 {
            bands.push((
                Offset::new_2d(0, (shape.height - self.y_cut) as isize),
                Shape::new(shape.width, self.y_cut, shape.depth),
            ));
        }
        if self.x_offset > 0 {
            bands.push((
                Offset::new_2d(0, self.y_offset as isize),
                Shape::new(self.x_offset, inner.height, shape.depth),
            ));
        }
        if self.x_cut > 0 {
            bands.push((
                Offset::new_2d((shape.width - self.x_cut) as isize, self.y_offset as isize),
                Shape::new(self.x_cut, inner.height, shape.depth),
            ));
        }
        bands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_strided() {
        let mut buf = vec![0i32; 40];
        let region = Region::new(&mut buf);
        let image = Tensor::new(region, Shape::new_2d(8, 4), Layout::with_row_spacing(10));

        image.write(5, 7, 3, 0);
        assert_eq!(region.get(37), 5);
        assert_eq!(image.read(7, 3, 0), 5);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_read_outside_shape_panics() {
        let mut buf = vec![0u8; 16];
        let tensor = Tensor::dense(Region::new(&mut buf), Shape::new_2d(4, 4));
        tensor.read(4, 0, 0);
    }

    #[test]
    fn test_view_negative_offset_footprint() {
        let mut buf = vec![0u8; 100];
        let image = Tensor::dense(Region::new(&mut buf), Shape::new_2d(10, 10));
        let view = image.view(Offset::new_2d(-1, -1), Shape::new_2d(3, 3));
        assert_eq!(view.start(), -11);
        assert!(matches!(view.check_bounds(), Err(TileError::OutOfBounds { .. })));

        let inner = view.view(Offset::new_2d(1, 1), Shape::new_2d(2, 2));
        assert_eq!(inner.start(), 0);
        assert!(inner.check_bounds().is_ok());
    }

    #[test]
    fn test_copy_between_layouts() {
        let mut ext: Vec<u32> = (0..30).collect();
        let mut int = vec![0u32; 6];
        let ext = Tensor::new(Region::new(&mut ext), Shape::new_2d(10, 3), Layout::with_row_spacing(10));
        let int = Tensor::dense(Region::new(&mut int), Shape::new_2d(3, 2));

        int.copy_from(&ext.view(Offset::new_2d(4, 1), Shape::new_2d(3, 2))).unwrap();
        assert_eq!(int.to_vec().unwrap(), vec![14, 15, 16, 24, 25, 26]);
    }

    #[test]
    fn test_copy_shape_mismatch() {
        let mut a = vec![0u8; 4];
        let mut b = vec![0u8; 4];
        let a = Tensor::dense(Region::new(&mut a), Shape::new_2d(2, 2));
        let b = Tensor::dense(Region::new(&mut b), Shape::new_1d(4));
        assert!(matches!(a.copy_from(&b), Err(TileError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_fill_zero_respects_layout() {
        let mut buf = vec![9u8; 12];
        let region = Region::new(&mut buf);
        let tensor = Tensor::new(region, Shape::new_2d(2, 3), Layout::with_row_spacing(4));
        tensor.fill_zero().unwrap();
        let all: Vec<u8> = (0..12).map(|i| region.get(i)).collect();
        assert_eq!(all, vec![0, 0, 9, 9, 0, 0, 9, 9, 0, 0, 9, 9]);
    }

    #[test]
    fn test_halo_clip_left() {
        // Origin width 10, request at x = -2 of width 5.
        let clip = HaloClip::compute(Offset::new_2d(-2, 0), Shape::new_2d(5, 1), Shape::new_2d(10, 1));
        assert_eq!(clip.x_offset, 2);
        assert_eq!(clip.x_cut, 0);
        assert_eq!(clip.clipped_shape(Shape::new_2d(5, 1)), Shape::new_2d(3, 1));
    }

    #[test]
    fn test_halo_clip_right_bottom() {
        let clip = HaloClip::compute(Offset::new_2d(7, 8), Shape::new_2d(5, 4), Shape::new_2d(10, 10));
        assert_eq!(clip.x_cut, 2);
        assert_eq!(clip.y_cut, 2);
        assert_eq!(clip.inner_offset(), Offset::ORIGIN);
    }

    #[test]
    fn test_border_bands_cover_frame() {
        let shape = Shape::new_2d(6, 6);
        let clip = HaloClip { x_offset: 1, y_offset: 1, x_cut: 1, y_cut: 1 };
        let bands = clip.border_bands(shape);
        let border: usize = bands.iter().map(|(_, s)| s.num_elements()).sum();
        let inner = clip.clipped_shape(shape).num_elements();
        assert_eq!(border + inner, shape.num_elements());
    }

    #[test]
    fn test_no_clip_inside_origin() {
        let clip = HaloClip::compute(Offset::new_2d(2, 2), Shape::new_2d(4, 4), Shape::new_2d(10, 10));
        assert!(clip.is_noop());
        assert!(clip.border_bands(Shape::new_2d(4, 4)).is_empty());
    }
}
