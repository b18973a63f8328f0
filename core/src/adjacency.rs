use serde::{Deserialize, Serialize};

use crate::game::{angle_matches, distance, rotate_vec, PieceId, SNAP_DISTANCE_DEFAULT};
use crate::grid::GridSpec;
use crate::merge::MergeTracker;
use crate::piece::PieceTransform;

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub enum AngleRule {
    #[default]
    Exact,
    WithinStep(f32),
}

impl AngleRule {
    pub fn matches(&self, a: f32, b: f32) -> bool {
        match *self {
            AngleRule::Exact => a == b,
            AngleRule::WithinStep(tolerance) => angle_matches(a, b, tolerance),
        }
    }
}

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
pub struct ToleranceConfig {
    pub distance: f32,
    pub angle: AngleRule,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            distance: SNAP_DISTANCE_DEFAULT,
            angle: AngleRule::Exact,
        }
    }
}

pub fn expected_position(
    grid: &GridSpec,
    a: PieceId,
    b: PieceId,
    transform_a: &PieceTransform,
) -> (f32, f32) {
    let (dx, dy) = grid.ideal_offset(a, b);
    let (rx, ry) = rotate_vec(dx, dy, transform_a.rotation);
    (transform_a.position.0 + rx, transform_a.position.1 + ry)
}

/// Whether `a` and `b` lie close enough, at matching rotation, to snap.
/// Missing neighbours and pieces already sharing a group never count.
pub fn is_adjacent(
    grid: &GridSpec,
    tracker: &MergeTracker,
    a: PieceId,
    b: Option<PieceId>,
    transforms: &[PieceTransform],
    tolerance: &ToleranceConfig,
) -> bool {
    let Some(b) = b else {
        return false;
    };
    if a == b || tracker.same_group(a, b) {
        return false;
    }
    let (Some(ta), Some(tb)) = (transforms.get(a), transforms.get(b)) else {
        return false;
    };
    if !tolerance.angle.matches(ta.rotation, tb.rotation) {
        return false;
    }
    distance(expected_position(grid, a, b, ta), tb.position) <= tolerance.distance
}
