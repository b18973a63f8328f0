use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::game::{fmt_f32, normalize_angle, rotate_vec, PieceId};
use crate::geometry::{svg_path_data, Bounds};
use crate::grid::GridSpec;
use crate::planner::PuzzlePaths;

/// Current on-screen placement of a piece: `position` is the piece center,
/// `rotation` is in degrees within [0, 360).
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
pub struct PieceTransform {
    pub position: (f32, f32),
    pub rotation: f32,
}

impl PieceTransform {
    pub fn new(position: (f32, f32), rotation: f32) -> Self {
        Self {
            position,
            rotation: normalize_angle(rotation),
        }
    }

    pub fn at(position: (f32, f32)) -> Self {
        Self {
            position,
            rotation: 0.0,
        }
    }

    pub fn apply(&self, local: (f32, f32)) -> (f32, f32) {
        let (x, y) = rotate_vec(local.0, local.1, self.rotation);
        (self.position.0 + x, self.position.1 + y)
    }
}

#[derive(Clone, Debug)]
pub struct Piece {
    pub id: PieceId,
    pub row: usize,
    pub col: usize,
    pub anchor: (f32, f32),
    pub outline: Vec<(f32, f32)>,
    pub transform: PieceTransform,
}

impl Piece {
    pub fn world_outline(&self) -> Vec<(f32, f32)> {
        self.outline
            .iter()
            .map(|point| self.transform.apply(*point))
            .collect()
    }
}

pub fn build_pieces(grid: &GridSpec, paths: &PuzzlePaths) -> Vec<Piece> {
    (0..grid.total())
        .map(|id| {
            let (row, col) = grid.row_col(id);
            let anchor = grid.anchor(id);
            let outline = paths
                .outline(id)
                .map(|outline| outline.local_points.clone())
                .unwrap_or_default();
            Piece {
                id,
                row,
                col,
                anchor,
                outline,
                transform: PieceTransform::at(anchor),
            }
        })
        .collect()
}

pub fn layout_svg(pieces: &[Piece]) -> String {
    let outlines: Vec<Vec<(f32, f32)>> = pieces.iter().map(Piece::world_outline).collect();
    let points: Vec<(f32, f32)> = outlines.iter().flatten().copied().collect();
    let bounds = Bounds::from_points(&points).unwrap_or(Bounds::new(0.0, 0.0, 0.0, 0.0));
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
        fmt_f32(bounds.min_x),
        fmt_f32(bounds.min_y),
        fmt_f32(bounds.width()),
        fmt_f32(bounds.height()),
    );
    for (piece, outline) in pieces.iter().zip(&outlines) {
        let _ = writeln!(
            svg,
            r#"  <path data-piece="{}" d="{}" fill="none" stroke="black" stroke-width="1"/>"#,
            piece.id,
            svg_path_data(outline, true)
        );
    }
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_rotates_about_center() {
        let transform = PieceTransform::new((100.0, 50.0), 90.0);
        let (x, y) = transform.apply((10.0, 0.0));
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 60.0).abs() < 1e-4);
    }

    #[test]
    fn solved_pieces_sit_home() {
        use crate::path::{NoRandom, ShapeFamily};
        use crate::planner::GridPathPlanner;

        let grid = GridSpec::new(2, 2, 40.0, 30.0, (5.0, 5.0)).unwrap();
        let paths = GridPathPlanner::default().plan(&grid, &ShapeFamily::Trapezoid, &mut NoRandom);
        let mut pieces = build_pieces(&grid, &paths);
        assert!(pieces
            .iter()
            .all(|piece| piece.transform == PieceTransform::at(piece.anchor)));
        assert_eq!(pieces[3].world_outline(), paths.world_outline(3));
        assert_eq!((pieces[3].row, pieces[3].col), (1, 1));
        assert!(layout_svg(&pieces).starts_with(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="5.000 5.000 80.000 60.000">"#
        ));

        let solved = layout_svg(&pieces);
        pieces[1].transform = PieceTransform::new((200.0, 100.0), 90.0);
        let moved = layout_svg(&pieces);
        assert_eq!(moved.matches("<path").count(), 4);
        assert_ne!(moved, solved);
    }

    #[test]
    fn new_transform_normalizes_rotation() {
        assert_eq!(PieceTransform::new((0.0, 0.0), -90.0).rotation, 270.0);
    }
}
