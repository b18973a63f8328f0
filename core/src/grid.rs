use serde::{Deserialize, Serialize};

use crate::game::{neighbor_id, PieceId, DIRS};
use crate::geometry::Bounds;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridChoice {
    pub target_count: u32,
    pub cols: u32,
    pub rows: u32,
    pub actual_count: u32,
}

pub const TARGET_PIECE_COUNTS: [u32; 9] = [4, 12, 24, 48, 70, 100, 150, 200, 300];
pub const MAX_PIECE_COUNT: u32 = 300;
pub const GRID_REL_COUNT_TOL: f32 = 0.25;
pub const GRID_PIECE_RATIO_MAX: f32 = 1.42;
pub const GRID_ROW_MIN: u32 = 1;
pub const GRID_ROW_WIDEN: f32 = 1.5;
pub const GRID_NEIGHBOR_COLS: i32 = 3;
pub const GRID_SCORE_COUNT: f32 = 1.0;
pub const GRID_SCORE_GRID: f32 = 1.0;
pub const GRID_SCORE_PIECE: f32 = 0.5;

pub fn grid_choice_label(choice: &GridChoice) -> String {
    if choice.actual_count == choice.target_count {
        format!(
            "{} pieces ({}x{})",
            choice.target_count, choice.cols, choice.rows
        )
    } else {
        format!(
            "{} pieces ({}x{}, actual {})",
            choice.target_count, choice.cols, choice.rows, choice.actual_count
        )
    }
}

pub fn best_grid_for_count(width: u32, height: u32, target: u32) -> Option<GridChoice> {
    if target < 2 || width == 0 || height == 0 {
        return None;
    }
    let aspect = width as f32 / height as f32;
    let piece_ratio_max = GRID_PIECE_RATIO_MAX.max(1.0);
    let piece_ratio_min = 1.0 / piece_ratio_max;
    let base = (target as f32).sqrt().ceil() as u32;
    let r_hi = ((base as f32) * GRID_ROW_WIDEN).ceil() as u32;
    let r_hi = r_hi.max(GRID_ROW_MIN);
    let mut best: Option<(GridChoice, f32)> = None;
    for r in GRID_ROW_MIN..=r_hi {
        let c_star = target as f32 / r as f32;
        let c0 = c_star.round() as i32;
        for dc in -GRID_NEIGHBOR_COLS..=GRID_NEIGHBOR_COLS {
            let c = c0 + dc;
            if c < 1 {
                continue;
            }
            let actual = r as i32 * c;
            if actual < 2 {
                continue;
            }
            let actual_u = actual as u32;
            let rel_err = ((actual_u as f32) - (target as f32)).abs() / target as f32;
            if rel_err > GRID_REL_COUNT_TOL {
                continue;
            }
            let grid_ratio = c as f32 / r as f32;
            let piece_ratio = aspect / grid_ratio;
            if piece_ratio < piece_ratio_min || piece_ratio > piece_ratio_max {
                continue;
            }
            let eps = 1e-12;
            let count_term = rel_err.powi(2);
            let grid_term = ((grid_ratio + eps) / (aspect + eps)).ln().powi(2);
            let piece_term = (piece_ratio + eps).ln().powi(2);
            let score = GRID_SCORE_COUNT * count_term
                + GRID_SCORE_GRID * grid_term
                + GRID_SCORE_PIECE * piece_term;
            let choice = GridChoice {
                target_count: target,
                cols: c as u32,
                rows: r,
                actual_count: actual_u,
            };
            match &best {
                Some((_best_choice, best_score)) if score >= *best_score => {}
                _ => {
                    best = Some((choice, score));
                }
            }
        }
    }
    best.map(|(choice, _)| choice)
}

pub fn build_grid_choices(width: u32, height: u32) -> Vec<GridChoice> {
    TARGET_PIECE_COUNTS
        .iter()
        .filter_map(|target| best_grid_for_count(width, height, *target))
        .collect()
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("puzzle needs at least two pieces, got {0}")]
    TooFewPieces(usize),
    #[error("grid has more than {max} pieces")]
    TooManyPieces { max: u32 },
    #[error("piece size must be positive, got {width}x{height}")]
    PieceSize { width: f32, height: f32 },
}

/// Solved layout of the puzzle: cell `(row, col)` spans
/// `origin + (col * piece_width, row * piece_height)` to the next cell corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    rows: usize,
    cols: usize,
    piece_width: f32,
    piece_height: f32,
    origin: (f32, f32),
}

impl GridSpec {
    pub fn new(
        rows: usize,
        cols: usize,
        piece_width: f32,
        piece_height: f32,
        origin: (f32, f32),
    ) -> Result<Self, GridError> {
        if rows * cols < 2 {
            return Err(GridError::TooFewPieces(rows * cols));
        }
        if rows * cols > MAX_PIECE_COUNT as usize {
            return Err(GridError::TooManyPieces {
                max: MAX_PIECE_COUNT,
            });
        }
        if !(piece_width > 0.0 && piece_height > 0.0)
            || !piece_width.is_finite()
            || !piece_height.is_finite()
        {
            return Err(GridError::PieceSize {
                width: piece_width,
                height: piece_height,
            });
        }
        Ok(Self {
            rows,
            cols,
            piece_width,
            piece_height,
            origin,
        })
    }

    pub fn for_image(
        image_width: u32,
        image_height: u32,
        choice: &GridChoice,
        origin: (f32, f32),
    ) -> Result<Self, GridError> {
        let cols = choice.cols.max(1);
        let rows = choice.rows.max(1);
        let piece_width = (image_width / cols) as f32;
        let piece_height = (image_height / rows) as f32;
        Self::new(
            rows as usize,
            cols as usize,
            piece_width,
            piece_height,
            origin,
        )
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn total(&self) -> usize {
        self.rows * self.cols
    }

    pub fn piece_width(&self) -> f32 {
        self.piece_width
    }

    pub fn piece_height(&self) -> f32 {
        self.piece_height
    }

    pub fn origin(&self) -> (f32, f32) {
        self.origin
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_origin_size(
            self.origin,
            self.cols as f32 * self.piece_width,
            self.rows as f32 * self.piece_height,
        )
    }

    pub fn row_col(&self, id: PieceId) -> (usize, usize) {
        (id / self.cols, id % self.cols)
    }

    pub fn corner(&self, row: usize, col: usize) -> (f32, f32) {
        (
            self.origin.0 + col as f32 * self.piece_width,
            self.origin.1 + row as f32 * self.piece_height,
        )
    }

    pub fn cell_bounds(&self, id: PieceId) -> Bounds {
        let (row, col) = self.row_col(id);
        Bounds::from_origin_size(self.corner(row, col), self.piece_width, self.piece_height)
    }

    pub fn anchor(&self, id: PieceId) -> (f32, f32) {
        let (row, col) = self.row_col(id);
        (
            self.origin.0 + (col as f32 + 0.5) * self.piece_width,
            self.origin.1 + (row as f32 + 0.5) * self.piece_height,
        )
    }

    pub fn ideal_offset(&self, from: PieceId, to: PieceId) -> (f32, f32) {
        let a = self.anchor(from);
        let b = self.anchor(to);
        (b.0 - a.0, b.1 - a.1)
    }

    pub fn neighbor(&self, id: PieceId, dir: usize) -> Option<PieceId> {
        neighbor_id(id, self.cols, self.rows, dir)
    }

    pub fn neighbors(&self, id: PieceId) -> [Option<PieceId>; 4] {
        DIRS.map(|dir| self.neighbor(id, dir))
    }
}
