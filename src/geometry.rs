//! Geometry primitives for the annotation engine.
//!
//! Points are tagged with their coordinate space at the type level so that
//! canvas-space input can never be fed into image-space geometry without an
//! explicit camera conversion.

use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

// ============================================================================
// Coordinate Spaces
// ============================================================================

/// Image pixel coordinates (annotation data lives here).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageSpace;

/// Canvas (screen) coordinates (pointer input arrives here).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSpace;

// ============================================================================
// Point
// ============================================================================

/// A 2D point tagged with its coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point<S> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

/// A point in image coordinates.
pub type ImagePoint = Point<ImageSpace>;

/// A point in canvas coordinates.
pub type CanvasPoint = Point<CanvasSpace>;

impl<S> Point<S> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// Component-wise sum, returning a new point.
    pub fn add(&self, other: Point<S>) -> Point<S> {
        Point::new(self.x + other.x, self.y + other.y)
    }

    /// Component-wise difference, returning a new point.
    pub fn sub(&self, other: Point<S>) -> Point<S> {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Scale both components by a factor.
    pub fn mul(&self, factor: f64) -> Point<S> {
        Point::new(self.x * factor, self.y * factor)
    }

    /// Mutate this point in place by an offset.
    ///
    /// Used for live vertex dragging so the containing shape is never
    /// reallocated mid-gesture.
    pub fn add_assign(&mut self, offset: Point<S>) {
        self.x += offset.x;
        self.y += offset.y;
    }

    /// Euclidean distance to another point in the same space.
    pub fn distance_to(&self, other: &Point<S>) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Linear interpolation towards `other` at `factor` in `[0, 1]`.
    ///
    /// Componentwise; this impl carries no `S: Copy` bound.
    pub fn lerp(&self, other: &Point<S>, factor: f64) -> Point<S> {
        Point::new(
            self.x + (other.x - self.x) * factor,
            self.y + (other.y - self.y) * factor,
        )
    }
}

// ============================================================================
// Rect
// ============================================================================

/// An axis-aligned rectangle in image coordinates, top-left anchored.
///
/// `w` and `h` are always non-negative; construction from two corners
/// normalizes via `min`/`abs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Create a normalized rectangle from two arbitrary corner points.
    pub fn from_corners(p1: ImagePoint, p2: ImagePoint) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            w: (p1.x - p2.x).abs(),
            h: (p1.y - p2.y).abs(),
        }
    }

    /// A degenerate rectangle has no area and is rejected as drawn input.
    pub fn is_valid(&self) -> bool {
        self.w > 0.0 && self.h > 0.0
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn top_left(&self) -> ImagePoint {
        ImagePoint::new(self.x, self.y)
    }

    pub fn top_right(&self) -> ImagePoint {
        ImagePoint::new(self.x + self.w, self.y)
    }

    pub fn bottom_right(&self) -> ImagePoint {
        ImagePoint::new(self.x + self.w, self.y + self.h)
    }

    pub fn bottom_left(&self) -> ImagePoint {
        ImagePoint::new(self.x, self.y + self.h)
    }

    pub fn contains(&self, point: &ImagePoint) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.w
            && point.y >= self.y
            && point.y <= self.y + self.h
    }

    /// Smallest rectangle enclosing a set of points, `None` when empty.
    pub fn bounding(points: &[ImagePoint]) -> Option<Rect> {
        let first = points.first()?;
        let mut min_x = first.x;
        let mut min_y = first.y;
        let mut max_x = first.x;
        let mut max_y = first.y;
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }
}

// ============================================================================
// CompoundPath
// ============================================================================

/// The primary outline of an annotation plus auxiliary outlines
/// (e.g. the holes of a polygon, or the extra parts of a merged one).
///
/// `path` is non-empty for any committed annotation; an empty `path` is
/// only valid on an in-progress draft.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompoundPath {
    pub path: Vec<ImagePoint>,
    pub additional_paths: Vec<Vec<ImagePoint>>,
}

impl CompoundPath {
    pub fn new(path: Vec<ImagePoint>) -> Self {
        Self {
            path,
            additional_paths: Vec::new(),
        }
    }

    /// Flattened list of every editable vertex, primary path first.
    pub fn all_vertices(&self) -> Vec<ImagePoint> {
        let mut vertices = self.path.clone();
        for path in &self.additional_paths {
            vertices.extend_from_slice(path);
        }
        vertices
    }

    /// Ray-cast test against the primary outline.
    pub fn contains(&self, point: &ImagePoint) -> bool {
        point_in_ring(&self.path, point)
    }

    pub fn bounding_rect(&self) -> Option<Rect> {
        Rect::bounding(&self.all_vertices())
    }
}

/// Point-in-polygon test (ray casting) against a single closed ring.
pub fn point_in_ring(ring: &[ImagePoint], point: &ImagePoint) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (vi, vj) = (&ring[i], &ring[j]);
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// ============================================================================
// Tests
// ============================================================================
