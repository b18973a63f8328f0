use crate::game::{angle_delta, normalize_angle, rotate_point, rotate_vec, snap_angle, PieceId};
use crate::grid::GridSpec;
use crate::merge::MergeTracker;
use crate::piece::PieceTransform;

pub fn drag(
    tracker: &MergeTracker,
    transforms: &mut [PieceTransform],
    piece: PieceId,
    delta: (f32, f32),
) -> Vec<PieceId> {
    let body = tracker.rigid_body(piece);
    for &member in &body {
        if let Some(transform) = transforms.get_mut(member) {
            transform.position.0 += delta.0;
            transform.position.1 += delta.1;
        }
    }
    body
}

pub fn rotate(
    grid: &GridSpec,
    tracker: &MergeTracker,
    transforms: &mut [PieceTransform],
    piece: PieceId,
    delta_deg: f32,
    pivot: (f32, f32),
) -> Vec<PieceId> {
    let Some(current) = transforms.get(piece).map(|transform| transform.rotation) else {
        return Vec::new();
    };
    rotate_to(
        grid,
        tracker,
        transforms,
        piece,
        normalize_angle(current + delta_deg),
        pivot,
    )
}

pub fn snap_rotation(
    grid: &GridSpec,
    tracker: &MergeTracker,
    transforms: &mut [PieceTransform],
    piece: PieceId,
    step_deg: f32,
    pivot: (f32, f32),
) -> Vec<PieceId> {
    let Some(current) = transforms.get(piece).map(|transform| transform.rotation) else {
        return Vec::new();
    };
    rotate_to(
        grid,
        tracker,
        transforms,
        piece,
        snap_angle(current, step_deg),
        pivot,
    )
}

fn rotate_to(
    grid: &GridSpec,
    tracker: &MergeTracker,
    transforms: &mut [PieceTransform],
    piece: PieceId,
    rotation: f32,
    pivot: (f32, f32),
) -> Vec<PieceId> {
    let Some(lead) = transforms.get(piece).copied() else {
        return Vec::new();
    };
    let delta = angle_delta(rotation, lead.rotation);
    let lead = PieceTransform {
        position: rotate_point(lead.position, pivot, delta),
        rotation,
    };
    let body = tracker.rigid_body(piece);
    for &member in &body {
        let (dx, dy) = grid.ideal_offset(piece, member);
        let (rx, ry) = rotate_vec(dx, dy, rotation);
        if let Some(transform) = transforms.get_mut(member) {
            transform.position = (lead.position.0 + rx, lead.position.1 + ry);
            transform.rotation = rotation;
        }
    }
    body
}

pub fn body_center(transforms: &[PieceTransform], body: &[PieceId]) -> Option<(f32, f32)> {
    let mut sum = (0.0, 0.0);
    let mut count = 0usize;
    for transform in body.iter().filter_map(|id| transforms.get(*id)) {
        sum.0 += transform.position.0;
        sum.1 += transform.position.1;
        count += 1;
    }
    (count > 0).then(|| (sum.0 / count as f32, sum.1 / count as f32))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackOrder {
    order: Vec<PieceId>,
}

impl StackOrder {
    pub fn new(total: usize) -> Self {
        Self {
            order: (0..total).collect(),
        }
    }

    pub fn from_order(total: usize, order: Vec<PieceId>) -> Option<Self> {
        if order.len() != total {
            return None;
        }
        let mut seen = vec![false; total];
        for &piece in &order {
            if piece >= total || seen[piece] {
                return None;
            }
            seen[piece] = true;
        }
        Some(Self { order })
    }

    pub fn order(&self) -> &[PieceId] {
        &self.order
    }

    pub fn position(&self, piece: PieceId) -> Option<usize> {
        self.order.iter().position(|id| *id == piece)
    }

    pub fn top(&self) -> Option<PieceId> {
        self.order.last().copied()
    }

    pub fn raise(&mut self, body: &[PieceId]) {
        let (mut lifted, rest) = self.split(body);
        self.order = rest;
        self.order.append(&mut lifted);
    }

    pub fn lower(&mut self, body: &[PieceId]) {
        let (mut sunk, rest) = self.split(body);
        sunk.extend(rest);
        self.order = sunk;
    }

    fn split(&self, body: &[PieceId]) -> (Vec<PieceId>, Vec<PieceId>) {
        self.order
            .iter()
            .copied()
            .partition(|piece| body.contains(piece))
    }
}
