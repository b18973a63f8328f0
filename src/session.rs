use rand::rngs::StdRng;
use rand::SeedableRng;

use kirinuki_core::game::{format_elapsed, PieceId};
use kirinuki_core::piece::build_pieces;
use kirinuki_core::propagate::{self, body_center};
use kirinuki_core::{
    scramble, validate_snapshot, GameRules, GameSnapshot, GameStats, GridError, GridPathPlanner,
    GridSpec, MergeTracker, Piece, PieceSnapshot, PieceTransform, PuzzleInfo, PuzzlePaths,
    Seeded, ShapeFamily, SnapshotError, StackOrder, GAME_SNAPSHOT_VERSION,
};

const SCRAMBLE_SALT: u64 = 0x5CA7_7E2E_D15C_0B0B;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Grid(#[from] GridError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Everything needed to lay out a fresh puzzle.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub label: String,
    pub image_path: Option<String>,
    pub rows: usize,
    pub cols: usize,
    pub piece_width: f32,
    pub piece_height: f32,
    pub origin: (f32, f32),
    pub family: ShapeFamily,
    pub seed: u64,
    pub rules: GameRules,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            label: "puzzle".to_string(),
            image_path: None,
            rows: 4,
            cols: 6,
            piece_width: 80.0,
            piece_height: 80.0,
            origin: (0.0, 0.0),
            family: ShapeFamily::default(),
            seed: 0,
            rules: GameRules::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InteractionEvent {
    DragStart { piece: PieceId },
    Drag { piece: PieceId, delta: (f32, f32) },
    DragStop { piece: PieceId },
    /// `pivot` defaults to the center of the piece's body.
    RotateStart { piece: PieceId, pivot: Option<(f32, f32)> },
    Rotate { piece: PieceId, delta_deg: f32 },
    RotateStop { piece: PieceId },
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Move {
        piece: PieceId,
        position: (f32, f32),
    },
    Rotate {
        piece: PieceId,
        position: (f32, f32),
        rotation: f32,
    },
    Raise {
        pieces: Vec<PieceId>,
    },
    Lower {
        pieces: Vec<PieceId>,
    },
    Solved {
        moves: u32,
        elapsed_secs: u32,
    },
}

/// One game in progress: the merge engine, piece transforms, draw order and
/// the move/clock counters.
#[derive(Clone, Debug)]
pub struct GameSession {
    rules: GameRules,
    puzzle: PuzzleInfo,
    grid: GridSpec,
    paths: PuzzlePaths,
    transforms: Vec<PieceTransform>,
    tracker: MergeTracker,
    stack: StackOrder,
    stats: GameStats,
    /// Piece being rotated and the pivot fixed at rotate-start.
    rotating: Option<(PieceId, (f32, f32))>,
}

impl GameSession {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        config.rules.validate()?;
        let grid = GridSpec::new(
            config.rows,
            config.cols,
            config.piece_width,
            config.piece_height,
            config.origin,
        )?;
        let puzzle = PuzzleInfo {
            label: config.label,
            image_path: config.image_path,
            rows: grid.rows() as u32,
            cols: grid.cols() as u32,
            piece_width: grid.piece_width(),
            piece_height: grid.piece_height(),
            origin: grid.origin(),
            shape_family: config.family,
            shape_seed: config.seed,
        };
        let paths = plan_paths(&grid, &puzzle, &config.rules);
        let mut rng = StdRng::seed_from_u64(config.seed ^ SCRAMBLE_SALT);
        let layout = scramble(
            &grid,
            &mut rng,
            config.rules.rotation_enabled,
            config.rules.rotation_step_deg,
        );
        let stack = StackOrder::from_order(grid.total(), layout.order)
            .unwrap_or_else(|| StackOrder::new(grid.total()));
        log::debug!(
            "new session {}x{} ({} pieces), seed {}",
            grid.rows(),
            grid.cols(),
            grid.total(),
            config.seed
        );
        Ok(Self {
            rules: config.rules,
            puzzle,
            tracker: MergeTracker::for_grid(&grid),
            grid,
            paths,
            transforms: layout.transforms,
            stack,
            stats: GameStats::default(),
            rotating: None,
        })
    }

    /// Resumes a saved game exactly as it was. Solved is re-derived from the
    /// restored partition rather than trusted from the stats.
    pub fn restore(snapshot: &GameSnapshot) -> Result<Self, SessionError> {
        validate_snapshot(snapshot)?;
        let grid = snapshot.puzzle.grid()?;
        let paths = plan_paths(&grid, &snapshot.puzzle, &snapshot.rules);
        let tracker = MergeTracker::from_partition(grid.total(), &snapshot.partition())
            .map_err(SnapshotError::from)?;
        let mut transforms = vec![PieceTransform::at((0.0, 0.0)); grid.total()];
        for piece in &snapshot.pieces {
            transforms[piece.id as usize] = PieceTransform::new(piece.position, piece.rotation);
        }
        let stack = if snapshot.stack.is_empty() {
            StackOrder::new(grid.total())
        } else {
            let order = snapshot.stack.iter().map(|id| *id as usize).collect();
            StackOrder::from_order(grid.total(), order).ok_or(SnapshotError::InvalidStack)?
        };
        let mut stats = snapshot.stats;
        stats.solved = tracker.is_solved();
        log::debug!(
            "restored session: {} pieces in {} groups, {} moves",
            grid.total(),
            tracker.group_count(),
            stats.moves
        );
        Ok(Self {
            rules: snapshot.rules,
            puzzle: snapshot.puzzle.clone(),
            grid,
            paths,
            transforms,
            tracker,
            stack,
            stats,
            rotating: None,
        })
    }

    pub fn snapshot(&self, saved_at: u64) -> GameSnapshot {
        let partition = self.tracker.to_partition();
        let mut group_index = vec![None; self.grid.total()];
        for (index, members) in partition.iter().enumerate() {
            for &member in members {
                group_index[member] = Some(index as u32);
            }
        }
        let pieces = self
            .transforms
            .iter()
            .enumerate()
            .map(|(id, transform)| PieceSnapshot {
                id: id as u32,
                position: transform.position,
                rotation: transform.rotation,
                group: group_index[id],
            })
            .collect();
        let groups = partition
            .into_iter()
            .map(|members| members.into_iter().map(|id| id as u32).collect())
            .collect();
        GameSnapshot {
            version: GAME_SNAPSHOT_VERSION,
            saved_at,
            rules: self.rules,
            puzzle: self.puzzle.clone(),
            pieces,
            groups,
            stack: self.stack.order().iter().map(|id| *id as u32).collect(),
            stats: self.stats,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    pub fn puzzle(&self) -> &PuzzleInfo {
        &self.puzzle
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn paths(&self) -> &PuzzlePaths {
        &self.paths
    }

    pub fn transforms(&self) -> &[PieceTransform] {
        &self.transforms
    }

    pub fn tracker(&self) -> &MergeTracker {
        &self.tracker
    }

    pub fn stack(&self) -> &StackOrder {
        &self.stack
    }

    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    pub fn is_solved(&self) -> bool {
        self.stats.solved
    }

    pub fn pieces(&self) -> Vec<Piece> {
        let mut pieces = build_pieces(&self.grid, &self.paths);
        for (piece, transform) in pieces.iter_mut().zip(&self.transforms) {
            piece.transform = *transform;
        }
        pieces
    }

    pub fn status_line(&self) -> String {
        format!(
            "moves {} | time {} | groups {} | joined {}/{}",
            self.stats.moves,
            format_elapsed(self.stats.elapsed_secs),
            self.tracker.group_count(),
            self.tracker.merged_count(),
            self.grid.total()
        )
    }

    /// Once-per-second clock. Runs only between the first interaction and
    /// the win.
    pub fn tick(&mut self) {
        if self.stats.started && !self.stats.solved {
            self.stats.elapsed_secs = self.stats.elapsed_secs.saturating_add(1);
        }
    }

    pub fn handle(&mut self, event: InteractionEvent) -> Vec<Command> {
        if self.stats.solved {
            return Vec::new();
        }
        match event {
            InteractionEvent::DragStart { piece } => {
                if piece >= self.grid.total() {
                    return Vec::new();
                }
                self.stats.started = true;
                self.raise(piece)
            }
            InteractionEvent::Drag { piece, delta } => {
                if piece >= self.grid.total() || !delta.0.is_finite() || !delta.1.is_finite() {
                    return Vec::new();
                }
                let moved = propagate::drag(&self.tracker, &mut self.transforms, piece, delta);
                moved
                    .into_iter()
                    .map(|id| Command::Move {
                        piece: id,
                        position: self.transforms[id].position,
                    })
                    .collect()
            }
            InteractionEvent::DragStop { piece } => {
                if piece >= self.grid.total() {
                    return Vec::new();
                }
                self.drop_piece(piece)
            }
            InteractionEvent::RotateStart { piece, pivot } => {
                if !self.rules.rotation_enabled || piece >= self.grid.total() {
                    return Vec::new();
                }
                self.stats.started = true;
                let pivot = pivot.unwrap_or_else(|| self.default_pivot(piece));
                self.rotating = Some((piece, pivot));
                self.raise(piece)
            }
            InteractionEvent::Rotate { piece, delta_deg } => {
                if !self.rules.rotation_enabled
                    || piece >= self.grid.total()
                    || !delta_deg.is_finite()
                {
                    return Vec::new();
                }
                let pivot = self.pivot_for(piece);
                let moved = propagate::rotate(
                    &self.grid,
                    &self.tracker,
                    &mut self.transforms,
                    piece,
                    delta_deg,
                    pivot,
                );
                self.rotate_commands(moved)
            }
            InteractionEvent::RotateStop { piece } => {
                if !self.rules.rotation_enabled || piece >= self.grid.total() {
                    return Vec::new();
                }
                let pivot = self.pivot_for(piece);
                self.rotating = None;
                let moved = propagate::snap_rotation(
                    &self.grid,
                    &self.tracker,
                    &mut self.transforms,
                    piece,
                    self.rules.rotation_step_deg,
                    pivot,
                );
                let mut commands = self.rotate_commands(moved);
                commands.extend(self.drop_piece(piece));
                commands
            }
        }
    }

    fn raise(&mut self, piece: PieceId) -> Vec<Command> {
        let body = self.tracker.rigid_body(piece);
        self.stack.raise(&body);
        vec![Command::Raise { pieces: body }]
    }

    /// Counts the move and settles the dropped body. Merged bodies sink
    /// below loose pieces so the loose ones stay pickable.
    fn drop_piece(&mut self, piece: PieceId) -> Vec<Command> {
        if self.stats.started {
            self.stats.moves = self.stats.moves.saturating_add(1);
        }
        let report = self.tracker.settle(
            &self.grid,
            &mut self.transforms,
            piece,
            &self.rules.tolerance,
        );
        let mut moved = report.moved.clone();
        moved.sort_unstable();
        moved.dedup();
        let mut commands = self.rotate_commands(moved);
        if report.snapped() {
            let body = self.tracker.rigid_body(piece);
            self.stack.lower(&body);
            commands.push(Command::Lower { pieces: body });
        }
        if report.won {
            self.stats.solved = true;
            commands.push(Command::Solved {
                moves: self.stats.moves,
                elapsed_secs: self.stats.elapsed_secs,
            });
        }
        commands
    }

    fn rotate_commands(&self, moved: Vec<PieceId>) -> Vec<Command> {
        moved
            .into_iter()
            .map(|id| Command::Rotate {
                piece: id,
                position: self.transforms[id].position,
                rotation: self.transforms[id].rotation,
            })
            .collect()
    }

    fn default_pivot(&self, piece: PieceId) -> (f32, f32) {
        let body = self.tracker.rigid_body(piece);
        body_center(&self.transforms, &body).unwrap_or(self.transforms[piece].position)
    }

    fn pivot_for(&self, piece: PieceId) -> (f32, f32) {
        match self.rotating {
            Some((active, pivot)) if active == piece || self.tracker.same_group(active, piece) => {
                pivot
            }
            _ => self.default_pivot(piece),
        }
    }
}

fn plan_paths(grid: &GridSpec, puzzle: &PuzzleInfo, rules: &GameRules) -> PuzzlePaths {
    let mut source = Seeded::new(StdRng::seed_from_u64(puzzle.shape_seed));
    GridPathPlanner::with_max_attempts(rules.max_attempts_per_path as usize).plan(
        grid,
        &puzzle.shape_family,
        &mut source,
    )
}
