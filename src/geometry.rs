//! Geometry value types: shapes, offsets, layouts, overlaps and halos.
//!
//! All units are elements, never bytes. The types are small `Copy` values
//! with public fields; they carry no memory and can be built in `const`
//! context.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`Shape`] | Extent of a region (width × height × depth) |
//! | [`Offset`] | Signed position relative to a reference point |
//! | [`Layout`] | Row and plane spacing of the enclosing buffer |
//! | [`Overlap`] | Elements shared by adjacent tiles on each axis |
//! | [`Augmentation`] | Zero-filled halo added beyond the space boundary |

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 3D extent of a region in elements.
///
/// A shape is empty when its width is zero, whatever its height and depth.
/// The default shape is `0 × 1 × 1`, i.e. empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Shape {
    /// Number of elements along x.
    pub width: usize,
    /// Number of rows along y.
    pub height: usize,
    /// Number of planes along z.
    pub depth: usize,
}

impl Shape {
    /// The empty shape.
    pub const EMPTY: Shape = Shape::new(0, 1, 1);

    /// Creates a 3D shape.
    #[inline]
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self { width, height, depth }
    }

    /// Creates a single-plane shape.
    #[inline]
    pub const fn new_2d(width: usize, height: usize) -> Self {
        Self::new(width, height, 1)
    }

    /// Creates a single-row shape.
    #[inline]
    pub const fn new_1d(width: usize) -> Self {
        Self::new(width, 1, 1)
    }

    /// A shape is empty if its width is 0.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0
    }

    /// Total number of elements covered by the shape.
    #[inline]
    pub const fn num_elements(&self) -> usize {
        self.width * self.height * self.depth
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Signed 3D position of a region relative to a reference point.
///
/// Negative components place the region before the reference, which is how
/// a tile reaches into the left/top/front halo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Offset {
    /// Offset along x.
    pub x: isize,
    /// Offset along y.
    pub y: isize,
    /// Offset along z.
    pub z: isize,
}

impl Offset {
    /// The zero offset.
    pub const ORIGIN: Offset = Offset::new(0, 0, 0);

    /// Creates an offset.
    #[inline]
    pub const fn new(x: isize, y: isize, z: isize) -> Self {
        Self { x, y, z }
    }

    /// Creates an offset in the first plane.
    #[inline]
    pub const fn new_2d(x: isize, y: isize) -> Self {
        Self::new(x, y, 0)
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Memory layout of the buffer enclosing a view.
///
/// `row_spacing` and `plane_spacing` are the distances, in elements,
/// between the starts of consecutive rows and planes of the *enclosing*
/// buffer. A tile view into a larger image keeps the image's layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layout {
    /// Elements between the starts of consecutive rows.
    pub row_spacing: usize,
    /// Elements between the starts of consecutive planes.
    pub plane_spacing: usize,
}

impl Layout {
    /// Creates a layout with explicit spacings.
    #[inline]
    pub const fn new(row_spacing: usize, plane_spacing: usize) -> Self {
        Self { row_spacing, plane_spacing }
    }

    /// Creates a single-plane layout with the given row spacing.
    ///
    /// The plane spacing is zero, so this is for 2D views only: with a depth
    /// above one every plane would alias the first. Use [`Layout::new`] for
    /// strided 3D views.
    #[inline]
    pub const fn with_row_spacing(row_spacing: usize) -> Self {
        Self::new(row_spacing, 0)
    }

    /// Tightly packed layout for `shape`: rows of `width`, planes of
    /// `width * height`.
    #[inline]
    pub const fn dense(shape: Shape) -> Self {
        Self::new(shape.width, shape.width * shape.height)
    }

    /// Linear element distance of `offset` from the layout's origin.
    #[inline]
    pub const fn linearize(&self, offset: Offset) -> isize {
        offset.z * self.plane_spacing as isize + offset.y * self.row_spacing as isize + offset.x
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {} / plane {}", self.row_spacing, self.plane_spacing)
    }
}

/// Number of elements shared between adjacent tiles on each axis.
///
/// `width = 1` means horizontally adjacent tiles share one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Overlap {
    /// Overlap along x.
    pub width: usize,
    /// Overlap along y.
    pub height: usize,
    /// Overlap along z.
    pub depth: usize,
}

impl Overlap {
    /// No overlap on any axis.
    pub const NONE: Overlap = Overlap::new(0, 0, 0);

    /// Creates an overlap.
    #[inline]
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self { width, height, depth }
    }

    /// Creates an overlap in x and y only.
    #[inline]
    pub const fn new_2d(width: usize, height: usize) -> Self {
        Self::new(width, height, 0)
    }
}

impl fmt::Display for Overlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// Halo added beyond the true boundary of a space.
///
/// Every tile may reach into the halo; elements there do not exist in the
/// external tensor and are imported as zero. For example `left = 1` adds
/// one column before the first real column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Augmentation {
    /// Columns added before x = 0.
    pub left: usize,
    /// Columns added after the last column.
    pub right: usize,
    /// Rows added before y = 0.
    pub top: usize,
    /// Rows added after the last row.
    pub bottom: usize,
    /// Planes added before z = 0.
    pub front: usize,
    /// Planes added after the last plane.
    pub back: usize,
}

impl Augmentation {
    /// No augmentation.
    pub const NONE: Augmentation = Augmentation::new(0, 0, 0, 0, 0, 0);

    /// Creates an augmentation with every side given explicitly.
    #[inline]
    pub const fn new(
        left: usize,
        right: usize,
        top: usize,
        bottom: usize,
        front: usize,
        back: usize,
    ) -> Self {
        Self { left, right, top, bottom, front, back }
    }

    /// Creates an augmentation of x and y only.
    #[inline]
    pub const fn new_2d(left: usize, right: usize, top: usize, bottom: usize) -> Self {
        Self::new(left, right, top, bottom, 0, 0)
    }

    /// The same halo on all four sides of the plane.
    #[inline]
    pub const fn uniform_2d(radius: usize) -> Self {
        Self::new_2d(radius, radius, radius, radius)
    }
}

impl fmt::Display for Augmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}),({},{}),({},{})",
            self.left, self.right, self.top, self.bottom, self.front, self.back
        )
    }
}
