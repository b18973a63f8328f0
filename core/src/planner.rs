use std::fmt::Write;

use crate::game::{fmt_f32, PieceId, DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP};
use crate::geometry::{svg_path_data, Bounds};
use crate::grid::GridSpec;
use crate::path::{BoundaryPathGenerator, ParamSource, SeamCurve, ShapeFamily};

pub type SeamId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeamAxis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Debug)]
pub struct Seam {
    pub id: SeamId,
    pub axis: SeamAxis,
    pub curve: SeamCurve,
    pub limits: Bounds,
    pub pieces: [Option<PieceId>; 2],
    pub attempts: usize,
}

impl Seam {
    pub fn is_border(&self) -> bool {
        self.pieces.iter().any(Option::is_none)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeRef {
    pub seam: SeamId,
    pub reversed: bool,
}

#[derive(Clone, Debug)]
pub struct PieceOutline {
    pub id: PieceId,
    pub edges: [EdgeRef; 4],
    /// Closed clockwise ring relative to the piece anchor.
    pub local_points: Vec<(f32, f32)>,
}

#[derive(Clone, Debug)]
pub struct PuzzlePaths {
    grid: GridSpec,
    family: ShapeFamily,
    seams: Vec<Seam>,
    outlines: Vec<PieceOutline>,
    fallback_count: usize,
}

impl PuzzlePaths {
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn family(&self) -> &ShapeFamily {
        &self.family
    }

    pub fn seams(&self) -> &[Seam] {
        &self.seams
    }

    pub fn seam(&self, id: SeamId) -> Option<&Seam> {
        self.seams.get(id)
    }

    pub fn outlines(&self) -> &[PieceOutline] {
        &self.outlines
    }

    pub fn outline(&self, id: PieceId) -> Option<&PieceOutline> {
        self.outlines.get(id)
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_count
    }

    pub fn internal_seam_count(&self) -> usize {
        self.seams.iter().filter(|seam| !seam.is_border()).count()
    }

    pub fn total_attempts(&self) -> usize {
        self.seams.iter().map(|seam| seam.attempts).sum()
    }

    pub fn edge_points(&self, edge: EdgeRef) -> Vec<(f32, f32)> {
        let Some(seam) = self.seams.get(edge.seam) else {
            return Vec::new();
        };
        if edge.reversed {
            seam.curve.reversed_points().collect()
        } else {
            seam.curve.points.clone()
        }
    }

    pub fn world_outline(&self, id: PieceId) -> Vec<(f32, f32)> {
        let Some(outline) = self.outlines.get(id) else {
            return Vec::new();
        };
        let anchor = self.grid.anchor(id);
        outline
            .local_points
            .iter()
            .map(|(x, y)| (anchor.0 + x, anchor.1 + y))
            .collect()
    }

    pub fn piece_svg_path(&self, id: PieceId) -> String {
        self.outlines
            .get(id)
            .map(|outline| svg_path_data(&outline.local_points, true))
            .unwrap_or_default()
    }

    pub fn seam_svg_path(&self, id: SeamId) -> String {
        self.seams
            .get(id)
            .map(|seam| svg_path_data(&seam.curve.points, false))
            .unwrap_or_default()
    }

    pub fn to_svg(&self) -> String {
        let bounds = self.grid.bounds();
        let margin = self.grid.piece_width().max(self.grid.piece_height()) * 0.5;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            fmt_f32(bounds.min_x - margin),
            fmt_f32(bounds.min_y - margin),
            fmt_f32(bounds.width() + margin * 2.0),
            fmt_f32(bounds.height() + margin * 2.0),
        );
        for id in 0..self.outlines.len() {
            let data = svg_path_data(&self.world_outline(id), true);
            let _ = writeln!(
                svg,
                r#"  <path data-piece="{}" d="{}" fill="none" stroke="black" stroke-width="1"/>"#,
                id, data
            );
        }
        for seam in self.seams.iter().filter(|seam| seam.curve.fallback) {
            let _ = writeln!(
                svg,
                r#"  <path data-seam="{}" d="{}" fill="none" stroke="red" stroke-width="2"/>"#,
                seam.id,
                self.seam_svg_path(seam.id)
            );
        }
        svg.push_str("</svg>\n");
        svg
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GridPathPlanner {
    generator: BoundaryPathGenerator,
}

impl GridPathPlanner {
    pub fn new(generator: BoundaryPathGenerator) -> Self {
        Self { generator }
    }

    pub fn with_max_attempts(max_attempts: usize) -> Self {
        Self::new(BoundaryPathGenerator::new(max_attempts))
    }

    pub fn plan(
        &self,
        grid: &GridSpec,
        family: &ShapeFamily,
        source: &mut dyn ParamSource,
    ) -> PuzzlePaths {
        let rows = grid.rows();
        let cols = grid.cols();
        let mut seams = Vec::with_capacity((rows + 1) * cols + rows * (cols + 1));
        let mut accepted: Vec<SeamCurve> = Vec::new();
        let mut fallback_count = 0;

        for line in 0..=rows {
            for col in 0..cols {
                let start = grid.corner(line, col);
                let end = grid.corner(line, col + 1);
                let above = (line > 0).then(|| (line - 1) * cols + col);
                let below = (line < rows).then(|| line * cols + col);
                let bounds = match (above, below) {
                    (Some(a), Some(b)) => {
                        let cell = grid.cell_bounds(a);
                        Bounds::new(cell.min_x, grid.anchor(a).1, cell.max_x, grid.anchor(b).1)
                    }
                    _ => Bounds::new(start.0, start.1, end.0, end.1),
                };
                let id = seams.len();
                seams.push(self.seam(
                    id,
                    SeamAxis::Horizontal,
                    [above, below],
                    (start, end, bounds),
                    family,
                    source,
                    &mut accepted,
                    &mut fallback_count,
                ));
            }
        }
        let vertical_base = seams.len();
        for row in 0..rows {
            for line in 0..=cols {
                let start = grid.corner(row, line);
                let end = grid.corner(row + 1, line);
                let left = (line > 0).then(|| row * cols + line - 1);
                let right = (line < cols).then(|| row * cols + line);
                let bounds = match (left, right) {
                    (Some(l), Some(r)) => {
                        let cell = grid.cell_bounds(l);
                        Bounds::new(grid.anchor(l).0, cell.min_y, grid.anchor(r).0, cell.max_y)
                    }
                    _ => Bounds::new(start.0, start.1, end.0, end.1),
                };
                let id = seams.len();
                seams.push(self.seam(
                    id,
                    SeamAxis::Vertical,
                    [left, right],
                    (start, end, bounds),
                    family,
                    source,
                    &mut accepted,
                    &mut fallback_count,
                ));
            }
        }

        let horizontal = |line: usize, col: usize| line * cols + col;
        let vertical = |row: usize, line: usize| vertical_base + row * (cols + 1) + line;
        let mut outlines = Vec::with_capacity(grid.total());
        for id in 0..grid.total() {
            let (row, col) = grid.row_col(id);
            let mut edges = [EdgeRef {
                seam: 0,
                reversed: false,
            }; 4];
            edges[DIR_UP] = EdgeRef {
                seam: horizontal(row, col),
                reversed: false,
            };
            edges[DIR_RIGHT] = EdgeRef {
                seam: vertical(row, col + 1),
                reversed: false,
            };
            edges[DIR_DOWN] = EdgeRef {
                seam: horizontal(row + 1, col),
                reversed: true,
            };
            edges[DIR_LEFT] = EdgeRef {
                seam: vertical(row, col),
                reversed: true,
            };
            let anchor = grid.anchor(id);
            let mut local_points = Vec::new();
            for edge in edges {
                let seam = &seams[edge.seam].curve;
                let points: Vec<(f32, f32)> = if edge.reversed {
                    seam.reversed_points().collect()
                } else {
                    seam.points.clone()
                };
                // the last point of each edge is the first of the next one
                let count = points.len().saturating_sub(1);
                local_points.extend(
                    points
                        .into_iter()
                        .take(count)
                        .map(|(x, y)| (x - anchor.0, y - anchor.1)),
                );
            }
            outlines.push(PieceOutline {
                id,
                edges,
                local_points,
            });
        }

        log::debug!(
            "planned {} seams for a {}x{} {} grid, {} fallbacks",
            seams.len(),
            rows,
            cols,
            family.name(),
            fallback_count
        );
        PuzzlePaths {
            grid: *grid,
            family: family.clone(),
            seams,
            outlines,
            fallback_count,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn seam(
        &self,
        id: SeamId,
        axis: SeamAxis,
        pieces: [Option<PieceId>; 2],
        (start, end, bounds): ((f32, f32), (f32, f32), Bounds),
        family: &ShapeFamily,
        source: &mut dyn ParamSource,
        accepted: &mut Vec<SeamCurve>,
        fallback_count: &mut usize,
    ) -> Seam {
        if pieces.iter().any(Option::is_none) {
            return Seam {
                id,
                axis,
                curve: SeamCurve::straight(start, end, family.clone()),
                limits: bounds,
                pieces,
                attempts: 0,
            };
        }
        let generated = self
            .generator
            .generate(start, end, &bounds, family, source, accepted);
        if !generated.success {
            *fallback_count += 1;
        }
        accepted.push(generated.curve.clone());
        Seam {
            id,
            axis,
            curve: generated.curve,
            limits: bounds,
            pieces,
            attempts: generated.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ring_self_crosses, ring_signed_area};
    use crate::path::{NoRandom, Seeded};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid(rows: usize, cols: usize) -> GridSpec {
        GridSpec::new(rows, cols, 100.0, 100.0, (0.0, 0.0)).unwrap()
    }

    #[test]
    fn seam_counts_match_grid() {
        let paths = GridPathPlanner::default().plan(&grid(3, 4), &ShapeFamily::Standard, &mut NoRandom);
        assert_eq!(paths.seams().len(), 4 * 4 + 3 * 5);
        assert_eq!(paths.internal_seam_count(), 2 * 4 + 3 * 3);
        assert_eq!(paths.outlines().len(), 12);
    }

    #[test]
    fn border_seams_are_straight() {
        let paths = GridPathPlanner::default().plan(&grid(2, 2), &ShapeFamily::SimpleArc, &mut NoRandom);
        for seam in paths.seams().iter().filter(|seam| seam.is_border()) {
            assert!(seam.curve.is_straight());
            assert!(!seam.curve.fallback);
        }
    }

    #[test]
    fn outlines_are_clockwise_simple_rings() {
        let mut source = Seeded::new(StdRng::seed_from_u64(11));
        for family in ShapeFamily::BUILT_IN.iter() {
            let paths = GridPathPlanner::default().plan(&grid(3, 3), family, &mut source);
            for outline in paths.outlines() {
                assert!(!ring_self_crosses(&outline.local_points), "{}", family.name());
                assert!(ring_signed_area(&outline.local_points) > 0.0);
            }
        }
    }

    #[test]
    fn piece_svg_is_closed() {
        let paths = GridPathPlanner::default().plan(&grid(2, 2), &ShapeFamily::Trapezoid, &mut NoRandom);
        let data = paths.piece_svg_path(0);
        assert!(data.starts_with("M -50.000 -50.000"));
        assert!(data.ends_with('Z'));
        assert!(paths.to_svg().contains("data-piece=\"3\""));
        assert_eq!(paths.seam_svg_path(0), "M 0.000 0.000 L 100.000 0.000");
    }
}
