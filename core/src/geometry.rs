use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::game::fmt_f32;

pub const CONTAINMENT_EPSILON: f32 = 1e-3;
pub const FLATTEN_STEP_MIN: f32 = 2.0;
pub const FLATTEN_STEPS_MIN: usize = 6;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: max_x.max(min_x),
            max_y: max_y.max(min_y),
        }
    }

    pub fn from_origin_size(origin: (f32, f32), width: f32, height: f32) -> Self {
        Self::new(origin.0, origin.1, origin.0 + width, origin.1 + height)
    }

    pub fn from_points(points: &[(f32, f32)]) -> Option<Self> {
        let first = points.first()?;
        let mut bounds = Bounds {
            min_x: first.0,
            min_y: first.1,
            max_x: first.0,
            max_y: first.1,
        };
        for &(x, y) in &points[1..] {
            bounds.min_x = bounds.min_x.min(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_x = bounds.max_x.max(x);
            bounds.max_y = bounds.max_y.max(y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn contains_point(&self, point: (f32, f32)) -> bool {
        point.0 >= self.min_x - CONTAINMENT_EPSILON
            && point.0 <= self.max_x + CONTAINMENT_EPSILON
            && point.1 >= self.min_y - CONTAINMENT_EPSILON
            && point.1 <= self.max_y + CONTAINMENT_EPSILON
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_x >= self.min_x - CONTAINMENT_EPSILON
            && other.max_x <= self.max_x + CONTAINMENT_EPSILON
            && other.min_y >= self.min_y - CONTAINMENT_EPSILON
            && other.max_y <= self.max_y + CONTAINMENT_EPSILON
    }

    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

pub fn cubic_point(
    p0: (f32, f32),
    p1: (f32, f32),
    p2: (f32, f32),
    p3: (f32, f32),
    t: f32,
) -> (f32, f32) {
    let u = 1.0 - t;
    let tt = t * t;
    let uu = u * u;
    let uuu = uu * u;
    let ttt = tt * t;
    (
        uuu * p0.0 + 3.0 * uu * t * p1.0 + 3.0 * u * tt * p2.0 + ttt * p3.0,
        uuu * p0.1 + 3.0 * uu * t * p1.1 + 3.0 * u * tt * p2.1 + ttt * p3.1,
    )
}

pub fn flatten_cubic(
    out: &mut Vec<(f32, f32)>,
    p0: (f32, f32),
    p1: (f32, f32),
    p2: (f32, f32),
    p3: (f32, f32),
    steps: usize,
) {
    let steps = steps.max(1);
    for step in 1..=steps {
        let t = step as f32 / steps as f32;
        out.push(cubic_point(p0, p1, p2, p3, t));
    }
}

pub fn cubic_steps(p0: (f32, f32), p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)) -> usize {
    let hull = segment_len(p0, p1) + segment_len(p1, p2) + segment_len(p2, p3);
    ((hull / FLATTEN_STEP_MIN).ceil() as usize).clamp(FLATTEN_STEPS_MIN, 64)
}

pub fn segment_len(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

fn orientation(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

/// Proper crossing test: segments that merely touch at an endpoint or run
/// collinear do not count.
pub fn segments_cross(a0: (f32, f32), a1: (f32, f32), b0: (f32, f32), b1: (f32, f32)) -> bool {
    let d1 = orientation(b0, b1, a0);
    let d2 = orientation(b0, b1, a1);
    let d3 = orientation(a0, a1, b0);
    let d4 = orientation(a0, a1, b1);
    ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
}

fn segment_bounds(a: (f32, f32), b: (f32, f32)) -> Bounds {
    Bounds::new(a.0, a.1, b.0, b.1)
}

fn boxes_touch(a: &Bounds, b: &Bounds) -> bool {
    a.min_x <= b.max_x && b.min_x <= a.max_x && a.min_y <= b.max_y && b.min_y <= a.max_y
}

pub fn polylines_cross(a: &[(f32, f32)], b: &[(f32, f32)]) -> bool {
    if a.len() < 2 || b.len() < 2 {
        return false;
    }
    let (Some(box_a), Some(box_b)) = (Bounds::from_points(a), Bounds::from_points(b)) else {
        return false;
    };
    if !boxes_touch(&box_a, &box_b) {
        return false;
    }
    for sa in a.windows(2) {
        let bounds_a = segment_bounds(sa[0], sa[1]);
        if !boxes_touch(&bounds_a, &box_b) {
            continue;
        }
        for sb in b.windows(2) {
            if !boxes_touch(&bounds_a, &segment_bounds(sb[0], sb[1])) {
                continue;
            }
            if segments_cross(sa[0], sa[1], sb[0], sb[1]) {
                return true;
            }
        }
    }
    false
}

pub fn polyline_self_crosses(points: &[(f32, f32)]) -> bool {
    let count = points.len();
    if count < 4 {
        return false;
    }
    for i in 0..count - 1 {
        let bounds_i = segment_bounds(points[i], points[i + 1]);
        for j in (i + 2)..count - 1 {
            if !boxes_touch(&bounds_i, &segment_bounds(points[j], points[j + 1])) {
                continue;
            }
            if segments_cross(points[i], points[i + 1], points[j], points[j + 1]) {
                return true;
            }
        }
    }
    false
}

pub fn ring_self_crosses(points: &[(f32, f32)]) -> bool {
    let count = points.len();
    if count < 4 {
        return false;
    }
    let segment = |i: usize| (points[i], points[(i + 1) % count]);
    for i in 0..count {
        let (a0, a1) = segment(i);
        let bounds_i = segment_bounds(a0, a1);
        for j in (i + 2)..count {
            if i == 0 && j == count - 1 {
                continue;
            }
            let (b0, b1) = segment(j);
            if !boxes_touch(&bounds_i, &segment_bounds(b0, b1)) {
                continue;
            }
            if segments_cross(a0, a1, b0, b1) {
                return true;
            }
        }
    }
    false
}

/// Shoelace area; positive for clockwise rings in y-down screen space.
pub fn ring_signed_area(points: &[(f32, f32)]) -> f32 {
    let count = points.len();
    if count < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..count {
        let a = points[i];
        let b = points[(i + 1) % count];
        sum += a.0 * b.1 - b.0 * a.1;
    }
    sum * 0.5
}

pub fn svg_path_data(points: &[(f32, f32)], closed: bool) -> String {
    let mut path = String::new();
    let Some(first) = points.first() else {
        return path;
    };
    let _ = write!(path, "M {} {}", fmt_f32(first.0), fmt_f32(first.1));
    for &(x, y) in &points[1..] {
        let _ = write!(path, " L {} {}", fmt_f32(x), fmt_f32(y));
    }
    if closed {
        path.push_str(" Z");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_segments_detected() {
        assert!(segments_cross((0.0, 0.0), (10.0, 10.0), (0.0, 10.0), (10.0, 0.0)));
    }

    #[test]
    fn touching_segments_do_not_cross() {
        assert!(!segments_cross((0.0, 0.0), (10.0, 0.0), (10.0, 0.0), (10.0, 10.0)));
        assert!(!segments_cross((0.0, 0.0), (10.0, 0.0), (5.0, 0.0), (5.0, 10.0)));
    }

    #[test]
    fn figure_eight_self_crosses() {
        let ring = [(0.0, 0.0), (10.0, 10.0), (10.0, 0.0), (0.0, 10.0)];
        assert!(ring_self_crosses(&ring));
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert!(!ring_self_crosses(&square));
    }

    #[test]
    fn square_area_is_clockwise_positive() {
        let square = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        assert_eq!(ring_signed_area(&square), 100.0);
    }

    #[test]
    fn bounds_containment_allows_epsilon() {
        let outer = Bounds::new(0.0, 0.0, 10.0, 10.0);
        assert!(outer.contains(&Bounds::new(0.0, 0.0, 10.0005, 10.0)));
        assert!(!outer.contains(&Bounds::new(-1.0, 0.0, 5.0, 5.0)));
    }

    #[test]
    fn svg_path_closes_rings() {
        let data = svg_path_data(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], true);
        assert_eq!(data, "M 0.000 0.000 L 1.000 0.000 L 1.000 1.000 Z");
    }
}
