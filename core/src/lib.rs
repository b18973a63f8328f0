pub mod adjacency;
pub mod codec;
pub mod game;
pub mod geometry;
pub mod grid;
pub mod merge;
pub mod path;
pub mod piece;
pub mod planner;
pub mod propagate;
pub mod scramble;
pub mod snapshot;

pub use adjacency::{expected_position, is_adjacent, AngleRule, ToleranceConfig};
pub use codec::{decode, decode_snapshot, encode, encode_snapshot, CodecError};
pub use geometry::Bounds;
pub use grid::{best_grid_for_count, GridChoice, GridError, GridSpec};
pub use merge::{GroupId, JoinOutcome, MergeTracker, PartitionError, SettleReport, Snap};
pub use path::{
    BoundaryPathGenerator, CustomPath, GeneratedSeam, NoRandom, ParamSource, SeamCurve, Seeded,
    ShapeFamily,
};
pub use piece::{Piece, PieceTransform};
pub use planner::{EdgeRef, GridPathPlanner, PieceOutline, PuzzlePaths, Seam, SeamAxis, SeamId};
pub use propagate::StackOrder;
pub use scramble::{scramble, ScrambleLayout};
pub use snapshot::{
    validate_snapshot, GameRules, GameSnapshot, GameStats, PieceSnapshot, PuzzleInfo,
    SnapshotError, GAME_SNAPSHOT_VERSION,
};
