use serde::{Deserialize, Serialize};

use crate::adjacency::ToleranceConfig;
use crate::game::{
    PieceId, MAX_ATTEMPTS_PER_PATH, ROTATION_STEP_DEG_DEFAULT, ROTATION_STEP_DEG_MAX,
    ROTATION_STEP_DEG_MIN,
};
use crate::grid::{GridError, GridSpec};
use crate::merge::{MergeTracker, PartitionError};
use crate::path::ShapeFamily;

pub const GAME_SNAPSHOT_VERSION: u32 = 1;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct GameRules {
    pub tolerance: ToleranceConfig,
    pub rotation_enabled: bool,
    pub rotation_step_deg: f32,
    pub max_attempts_per_path: u32,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            tolerance: ToleranceConfig::default(),
            rotation_enabled: true,
            rotation_step_deg: ROTATION_STEP_DEG_DEFAULT,
            max_attempts_per_path: MAX_ATTEMPTS_PER_PATH as u32,
        }
    }
}

impl GameRules {
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let tolerance = self.tolerance.distance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(SnapshotError::InvalidRules("snap distance must be non-negative"));
        }
        if !(ROTATION_STEP_DEG_MIN..=ROTATION_STEP_DEG_MAX).contains(&self.rotation_step_deg) {
            return Err(SnapshotError::InvalidRules("rotation step out of range"));
        }
        if self.max_attempts_per_path == 0 {
            return Err(SnapshotError::InvalidRules("path attempts must be positive"));
        }
        Ok(())
    }
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct PuzzleInfo {
    pub label: String,
    pub image_path: Option<String>,
    pub rows: u32,
    pub cols: u32,
    pub piece_width: f32,
    pub piece_height: f32,
    pub origin: (f32, f32),
    pub shape_family: ShapeFamily,
    pub shape_seed: u64,
}

impl PuzzleInfo {
    pub fn grid(&self) -> Result<GridSpec, GridError> {
        GridSpec::new(
            self.rows as usize,
            self.cols as usize,
            self.piece_width,
            self.piece_height,
            self.origin,
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct PieceSnapshot {
    pub id: u32,
    pub position: (f32, f32),
    pub rotation: f32,
    /// Index into `GameSnapshot::groups`.
    pub group: Option<u32>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct GameStats {
    pub moves: u32,
    pub elapsed_secs: u32,
    pub started: bool,
    pub solved: bool,
}

#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct GameSnapshot {
    pub version: u32,
    pub saved_at: u64,
    pub rules: GameRules,
    pub puzzle: PuzzleInfo,
    pub pieces: Vec<PieceSnapshot>,
    pub groups: Vec<Vec<u32>>,
    /// Draw order, bottom first. Empty means id order.
    pub stack: Vec<u32>,
    pub stats: GameStats,
}

impl GameSnapshot {
    pub fn partition(&self) -> Vec<Vec<PieceId>> {
        self.groups
            .iter()
            .map(|members| members.iter().map(|id| *id as PieceId).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot version {found}, expected {expected}")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("invalid rules: {0}")]
    InvalidRules(&'static str),
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error("expected {expected} pieces, found {found}")]
    WrongCount { expected: usize, found: usize },
    #[error("piece id {id} is out of range for {total} pieces")]
    PieceOutOfRange { id: u32, total: usize },
    #[error("piece {0} is listed twice")]
    DuplicatePiece(u32),
    #[error("piece {0} has a non-finite transform")]
    NonFinite(u32),
    #[error(transparent)]
    Partition(#[from] PartitionError),
    #[error("piece {piece} claims group {claimed:?} but is listed in {actual:?}")]
    InconsistentGroup {
        piece: u32,
        claimed: Option<u32>,
        actual: Option<u32>,
    },
    #[error("stack order is not a permutation of the pieces")]
    InvalidStack,
}

pub fn validate_snapshot(snapshot: &GameSnapshot) -> Result<(), SnapshotError> {
    if snapshot.version != GAME_SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion {
            found: snapshot.version,
            expected: GAME_SNAPSHOT_VERSION,
        });
    }
    snapshot.rules.validate()?;
    let grid = snapshot.puzzle.grid()?;
    let total = grid.total();
    if snapshot.pieces.len() != total {
        return Err(SnapshotError::WrongCount {
            expected: total,
            found: snapshot.pieces.len(),
        });
    }

    let mut listed = vec![false; total];
    for piece in &snapshot.pieces {
        let slot = listed
            .get_mut(piece.id as usize)
            .ok_or(SnapshotError::PieceOutOfRange { id: piece.id, total })?;
        if *slot {
            return Err(SnapshotError::DuplicatePiece(piece.id));
        }
        *slot = true;
        let finite = piece.position.0.is_finite()
            && piece.position.1.is_finite()
            && piece.rotation.is_finite();
        if !finite {
            return Err(SnapshotError::NonFinite(piece.id));
        }
    }

    let tracker = MergeTracker::from_partition(total, &snapshot.partition())?;
    for piece in &snapshot.pieces {
        let actual = tracker.group_of(piece.id as PieceId).map(|group| group as u32);
        if actual != piece.group {
            return Err(SnapshotError::InconsistentGroup {
                piece: piece.id,
                claimed: piece.group,
                actual,
            });
        }
    }

    if !snapshot.stack.is_empty() {
        let mut seen = vec![false; total];
        if snapshot.stack.len() != total {
            return Err(SnapshotError::InvalidStack);
        }
        for &id in &snapshot.stack {
            match seen.get_mut(id as usize) {
                Some(flag) if !*flag => *flag = true,
                _ => return Err(SnapshotError::InvalidStack),
            }
        }
    }
    Ok(())
}
