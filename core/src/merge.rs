use crate::adjacency::{is_adjacent, ToleranceConfig};
use crate::game::{rotate_vec, PieceId, DIRS};
use crate::grid::{GridError, GridSpec};
use crate::piece::PieceTransform;

pub type GroupId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Created(GroupId),
    Extended(GroupId),
    Absorbed { into: GroupId, from: GroupId },
    AlreadyJoined,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snap {
    pub piece: PieceId,
    pub onto: PieceId,
    pub outcome: JoinOutcome,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SettleReport {
    pub snaps: Vec<Snap>,
    pub moved: Vec<PieceId>,
    pub won: bool,
}

impl SettleReport {
    pub fn snapped(&self) -> bool {
        !self.snaps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
    #[error("piece {piece} is out of range for {total} pieces")]
    PieceOutOfRange { piece: PieceId, total: usize },
    #[error("piece {0} appears in more than one group")]
    DuplicatePiece(PieceId),
    #[error("group {0} has fewer than two pieces")]
    UndersizedGroup(usize),
}

#[derive(Clone, Debug)]
pub struct MergeTracker {
    group_of: Vec<Option<GroupId>>,
    groups: Vec<Option<Vec<PieceId>>>,
    solved: bool,
    win_reported: bool,
}

impl MergeTracker {
    pub fn new(total: usize) -> Result<Self, GridError> {
        if total < 2 {
            return Err(GridError::TooFewPieces(total));
        }
        Ok(Self {
            group_of: vec![None; total],
            groups: Vec::new(),
            solved: false,
            win_reported: false,
        })
    }

    pub fn for_grid(grid: &GridSpec) -> Self {
        Self {
            group_of: vec![None; grid.total()],
            groups: Vec::new(),
            solved: false,
            win_reported: false,
        }
    }

    /// Rebuilds a tracker from saved groups. A restored solved puzzle counts
    /// as already reported.
    pub fn from_partition(total: usize, partition: &[Vec<PieceId>]) -> Result<Self, PartitionError> {
        let mut tracker = Self {
            group_of: vec![None; total],
            groups: Vec::with_capacity(partition.len()),
            solved: false,
            win_reported: false,
        };
        for (index, members) in partition.iter().enumerate() {
            if members.len() < 2 {
                return Err(PartitionError::UndersizedGroup(index));
            }
            let group = tracker.groups.len();
            for &piece in members {
                let slot = tracker
                    .group_of
                    .get_mut(piece)
                    .ok_or(PartitionError::PieceOutOfRange { piece, total })?;
                if slot.is_some() {
                    return Err(PartitionError::DuplicatePiece(piece));
                }
                *slot = Some(group);
            }
            tracker.groups.push(Some(members.clone()));
        }
        tracker.solved = tracker.has_full_group();
        tracker.win_reported = tracker.solved;
        Ok(tracker)
    }

    pub fn total(&self) -> usize {
        self.group_of.len()
    }

    pub fn group_of(&self, piece: PieceId) -> Option<GroupId> {
        self.group_of.get(piece).copied().flatten()
    }

    pub fn members(&self, group: GroupId) -> &[PieceId] {
        self.groups
            .get(group)
            .and_then(|members| members.as_deref())
            .unwrap_or(&[])
    }

    pub fn rigid_body(&self, piece: PieceId) -> Vec<PieceId> {
        match self.group_of(piece) {
            Some(group) => self.members(group).to_vec(),
            None => vec![piece],
        }
    }

    pub fn same_group(&self, a: PieceId, b: PieceId) -> bool {
        matches!((self.group_of(a), self.group_of(b)), (Some(ga), Some(gb)) if ga == gb)
    }

    pub fn is_merged(&self, piece: PieceId) -> bool {
        self.group_of(piece).is_some()
    }

    pub fn groups(&self) -> impl Iterator<Item = (GroupId, &[PieceId])> + '_ {
        self.groups
            .iter()
            .enumerate()
            .filter_map(|(id, members)| members.as_deref().map(|members| (id, members)))
    }

    pub fn group_count(&self) -> usize {
        self.groups.iter().flatten().count()
    }

    pub fn merged_count(&self) -> usize {
        self.group_of.iter().flatten().count()
    }

    pub fn is_solved(&self) -> bool {
        self.solved
    }

    pub fn to_partition(&self) -> Vec<Vec<PieceId>> {
        let mut partition: Vec<Vec<PieceId>> = self
            .groups()
            .map(|(_, members)| {
                let mut members = members.to_vec();
                members.sort_unstable();
                members
            })
            .collect();
        partition.sort_by_key(|members| members.first().copied());
        partition
    }

    pub fn join(&mut self, a: PieceId, b: PieceId) -> JoinOutcome {
        if a == b || a >= self.total() || b >= self.total() {
            return JoinOutcome::AlreadyJoined;
        }
        let outcome = match (self.group_of[a], self.group_of[b]) {
            (None, None) => {
                let group = self.groups.len();
                self.groups.push(Some(vec![a, b]));
                self.group_of[a] = Some(group);
                self.group_of[b] = Some(group);
                JoinOutcome::Created(group)
            }
            (Some(group), None) | (None, Some(group)) => {
                let free = if self.group_of[a].is_none() { a } else { b };
                if let Some(members) = self.groups[group].as_mut() {
                    members.push(free);
                }
                self.group_of[free] = Some(group);
                JoinOutcome::Extended(group)
            }
            (Some(ga), Some(gb)) if ga == gb => JoinOutcome::AlreadyJoined,
            (Some(ga), Some(gb)) => {
                let (into, from) = if self.members(gb).len() > self.members(ga).len() {
                    (gb, ga)
                } else {
                    (ga, gb)
                };
                let moved = self.groups[from].take().unwrap_or_default();
                for &piece in &moved {
                    self.group_of[piece] = Some(into);
                }
                if let Some(members) = self.groups[into].as_mut() {
                    members.extend(moved);
                }
                JoinOutcome::Absorbed { into, from }
            }
        };
        if !self.solved && self.has_full_group() {
            self.solved = true;
        }
        outcome
    }

    /// Snaps `piece` against its grid neighbours, then every member of the
    /// group it ends up in, until no member finds a new partner.
    pub fn settle(
        &mut self,
        grid: &GridSpec,
        transforms: &mut [PieceTransform],
        piece: PieceId,
        tolerance: &ToleranceConfig,
    ) -> SettleReport {
        let mut report = SettleReport::default();
        if piece >= self.total() || transforms.len() < self.total() {
            return report;
        }
        let mut checked = vec![false; self.total()];
        let mut queue = vec![piece];
        while let Some(current) = queue.pop() {
            if checked[current] {
                continue;
            }
            checked[current] = true;
            let mut grew = false;
            for dir in DIRS {
                let neighbor = grid.neighbor(current, dir);
                if !is_adjacent(grid, self, current, neighbor, transforms, tolerance) {
                    continue;
                }
                let Some(onto) = neighbor else {
                    continue;
                };
                let body = self.rigid_body(current);
                snap_body(grid, transforms, &body, onto);
                report.moved.extend(body);
                let outcome = self.join(current, onto);
                log::debug!("piece {} snapped onto {}: {:?}", current, onto, outcome);
                report.snaps.push(Snap {
                    piece: current,
                    onto,
                    outcome,
                });
                grew = true;
            }
            let Some(group) = self.group_of(current) else {
                continue;
            };
            // A snap moved the whole body, so every member is due another look.
            if grew {
                for &member in self.members(group) {
                    checked[member] = false;
                }
            }
            queue.extend(
                self.members(group)
                    .iter()
                    .copied()
                    .filter(|member| !checked[*member]),
            );
        }
        report.won = self.take_win();
        if report.won {
            log::info!("puzzle solved: all {} pieces joined", self.total());
        }
        report
    }

    /// True once, the first time it is called on a solved tracker.
    pub fn take_win(&mut self) -> bool {
        if self.solved && !self.win_reported {
            self.win_reported = true;
            return true;
        }
        false
    }

    fn has_full_group(&self) -> bool {
        let total = self.total();
        self.groups().any(|(_, members)| members.len() == total)
    }
}

pub fn snap_body(grid: &GridSpec, transforms: &mut [PieceTransform], body: &[PieceId], onto: PieceId) {
    let Some(target) = transforms.get(onto).copied() else {
        return;
    };
    for &member in body {
        let (dx, dy) = grid.ideal_offset(onto, member);
        let (rx, ry) = rotate_vec(dx, dy, target.rotation);
        if let Some(transform) = transforms.get_mut(member) {
            transform.position = (target.position.0 + rx, target.position.1 + ry);
            transform.rotation = target.rotation;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_single_piece() {
        assert_eq!(MergeTracker::new(1).err(), Some(GridError::TooFewPieces(1)));
    }

    #[test]
    fn join_creates_extends_and_absorbs() {
        let mut tracker = MergeTracker::new(6).unwrap();
        assert_eq!(tracker.join(0, 1), JoinOutcome::Created(0));
        assert_eq!(tracker.join(2, 1), JoinOutcome::Extended(0));
        assert_eq!(tracker.join(3, 4), JoinOutcome::Created(1));
        assert_eq!(tracker.join(4, 2), JoinOutcome::Absorbed { into: 0, from: 1 });
        assert_eq!(tracker.join(0, 3), JoinOutcome::AlreadyJoined);
        assert_eq!(tracker.group_count(), 1);
        assert_eq!(tracker.to_partition(), vec![vec![0, 1, 2, 3, 4]]);
        assert!(!tracker.is_solved());
        assert_eq!(tracker.join(5, 0), JoinOutcome::Extended(0));
        assert!(tracker.is_solved());
        assert!(tracker.take_win());
        assert!(!tracker.take_win());
    }

    #[test]
    fn partition_round_trips() {
        let mut tracker = MergeTracker::new(5).unwrap();
        tracker.join(3, 4);
        tracker.join(0, 1);
        let partition = tracker.to_partition();
        assert_eq!(partition, vec![vec![0, 1], vec![3, 4]]);
        let restored = MergeTracker::from_partition(5, &partition).unwrap();
        assert!(restored.same_group(0, 1));
        assert!(!restored.is_merged(2));
        assert_eq!(restored.to_partition(), partition);
    }

    #[test]
    fn from_partition_rejects_bad_groups() {
        assert_eq!(
            MergeTracker::from_partition(3, &[vec![0, 7]]).err(),
            Some(PartitionError::PieceOutOfRange { piece: 7, total: 3 })
        );
        assert_eq!(
            MergeTracker::from_partition(3, &[vec![0, 1], vec![1, 2]]).err(),
            Some(PartitionError::DuplicatePiece(1))
        );
        assert_eq!(
            MergeTracker::from_partition(3, &[vec![2]]).err(),
            Some(PartitionError::UndersizedGroup(0))
        );
    }

    #[test]
    fn restored_solved_puzzle_does_not_win_again() {
        let mut tracker = MergeTracker::from_partition(2, &[vec![0, 1]]).unwrap();
        assert!(tracker.is_solved());
        assert!(!tracker.take_win());
    }
}
