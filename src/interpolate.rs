//! Linear interpolation support for video keyframe tweening.
//!
//! Renderers that advertise `supports_interpolate` use these helpers to
//! produce intermediate shapes between two keyframes. Only the `linear`
//! algorithm family is implemented; any other name is a hard error so a
//! typo can never silently degrade to a default.

use crate::geometry::ImagePoint;

/// Parameters passed to a renderer's `interpolate`.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationParams {
    /// Named algorithm from the annotation data, e.g. `linear-1.1`.
    /// `None` means the default linear algorithm.
    pub algorithm: Option<String>,
    /// Position between the keyframes, in `[0, 1]`.
    pub factor: f64,
}

impl InterpolationParams {
    /// Whether the requested algorithm belongs to the linear family.
    pub fn is_linear(&self) -> bool {
        match &self.algorithm {
            None => true,
            Some(name) => name.starts_with("linear"),
        }
    }

    /// The algorithm name for error reporting.
    pub fn algorithm_name(&self) -> &str {
        self.algorithm.as_deref().unwrap_or("linear-1.0")
    }
}

/// Interpolate two vertex paths that may differ in length.
///
/// The shorter path is resampled up to the longer one's vertex count by
/// splitting its longest edges, then the start vertices are aligned by
/// nearest distance before pairwise lerping. At factor 0 the result equals
/// `prev`, at 1 it equals `next` (up to the resampling of the shorter
/// path, which is geometrically the same outline).
pub fn interpolate_path_fixed_align(
    prev: &[ImagePoint],
    next: &[ImagePoint],
    factor: f64,
    closed: bool,
) -> Vec<ImagePoint> {
    if prev.is_empty() || next.is_empty() {
        return if factor < 0.5 {
            prev.to_vec()
        } else {
            next.to_vec()
        };
    }

    let target = prev.len().max(next.len());
    let prev = resample_path(prev, target, closed);
    let mut next = resample_path(next, target, closed);

    if closed {
        let offset = align_offset(&prev, &next);
        next.rotate_left(offset);
    }

    prev.iter()
        .zip(next.iter())
        .map(|(p, n)| p.lerp(n, factor))
        .collect()
}

/// Grow a path to `target` vertices by repeatedly splitting its longest
/// edge at the midpoint. Already-long-enough paths are returned unchanged.
pub fn resample_path(path: &[ImagePoint], target: usize, closed: bool) -> Vec<ImagePoint> {
    if path.is_empty() {
        return Vec::new();
    }
    let mut path = path.to_vec();
    while path.len() < target {
        let mut longest = 0usize;
        let mut longest_len = -1.0f64;
        let edges = if closed { path.len() } else { path.len() - 1 };
        if edges == 0 {
            // Single-point path: duplicate the point.
            let p = path[0];
            path.push(p);
            continue;
        }
        for i in 0..edges {
            let a = path[i];
            let b = path[(i + 1) % path.len()];
            let len = a.distance_to(&b);
            if len > longest_len {
                longest_len = len;
                longest = i;
            }
        }
        let a = path[longest];
        let b = path[(longest + 1) % path.len()];
        path.insert(longest + 1, a.lerp(&b, 0.5));
    }
    path
}

/// Rotation of `next` (in vertices) that brings its start closest to the
/// start of `prev`, so closed outlines do not twist while tweening.
fn align_offset(prev: &[ImagePoint], next: &[ImagePoint]) -> usize {
    let anchor = &prev[0];
    let mut best = 0usize;
    let mut best_distance = f64::INFINITY;
    for (i, candidate) in next.iter().enumerate() {
        let distance = anchor.distance_to(candidate);
        if distance < best_distance {
            best_distance = distance;
            best = i;
        }
    }
    best
}

// ============================================================================
// Tests
// ============================================================================
