use std::f32::consts::PI;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::MAX_ATTEMPTS_PER_PATH;
use crate::geometry::{
    cubic_steps, flatten_cubic, polyline_self_crosses, polylines_cross, segment_len, Bounds,
};

const TRAPEZOID_NECK: f32 = 0.4;
const TRAPEZOID_HEAD: f32 = 0.32;
const TRAPEZOID_DEPTH: f32 = 0.2;
const ARC_HEIGHT_MIN: f32 = 0.2;
const ARC_HEIGHT_MAX: f32 = 0.45;
const TRIANGLE_HALF_WIDTH_MIN: f32 = 0.06;
const TRIANGLE_HALF_WIDTH_MAX: f32 = 0.1;
const TRIANGLE_HEIGHT_MIN: f32 = 0.12;
const TRIANGLE_HEIGHT_MAX: f32 = 0.22;
const KNOB_RADIUS_MIN: f32 = 0.06;
const KNOB_RADIUS_MAX: f32 = 0.1;
const KNOB_NECK_RATIO: f32 = 0.6;
const KNOB_ARC_STEPS: usize = 16;
const CONNECTOR_FIRST: (f32, f32) = (0.22, 0.36);
const CONNECTOR_SECOND: (f32, f32) = (0.64, 0.78);
const STANDARD_TAB_MIN: f32 = 0.1;
const STANDARD_TAB_MAX: f32 = 0.14;
const STANDARD_DEPTH_RATIO_MIN: f32 = 0.7;
const STANDARD_DEPTH_RATIO_MAX: f32 = 1.0;
const STANDARD_JITTER_DEPTH: f32 = 0.03;
const STANDARD_JITTER_LEN: f32 = 0.02;
const FUNNY_TAB_MIN: f32 = 0.13;
const FUNNY_TAB_MAX: f32 = 0.17;
const FUNNY_DEPTH_RATIO_MIN: f32 = 0.75;
const FUNNY_DEPTH_RATIO_MAX: f32 = 1.0;
const FUNNY_JITTER_DEPTH: f32 = 0.07;
const FUNNY_JITTER_LEN: f32 = 0.04;

/// User-authored edge: control points in seam-normalized space, `x` along the
/// seam from 0 to 1 and `y` across it in units of the seam length. The seam
/// endpoints are implied.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct CustomPath {
    pub points: Vec<(f32, f32)>,
}

impl CustomPath {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }
}

impl Default for CustomPath {
    fn default() -> Self {
        Self::new(vec![
            (0.4, 0.0),
            (0.4, 0.15),
            (0.6, 0.15),
            (0.6, 0.0),
        ])
    }
}

#[derive(
    Clone,
    Debug,
    PartialEq,
    Default,
    Serialize,
    Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub enum ShapeFamily {
    Trapezoid,
    SimpleArc,
    TriangleConnections,
    SimpleCircleConnections,
    #[default]
    Standard,
    StandardFunny,
    Custom(CustomPath),
}

impl ShapeFamily {
    pub const BUILT_IN: [ShapeFamily; 6] = [
        ShapeFamily::Trapezoid,
        ShapeFamily::SimpleArc,
        ShapeFamily::TriangleConnections,
        ShapeFamily::SimpleCircleConnections,
        ShapeFamily::Standard,
        ShapeFamily::StandardFunny,
    ];
    pub const COUNT: u32 = 7;

    pub fn index(&self) -> u32 {
        match self {
            ShapeFamily::Trapezoid => 0,
            ShapeFamily::SimpleArc => 1,
            ShapeFamily::TriangleConnections => 2,
            ShapeFamily::SimpleCircleConnections => 3,
            ShapeFamily::Standard => 4,
            ShapeFamily::StandardFunny => 5,
            ShapeFamily::Custom(_) => 6,
        }
    }

    pub fn from_index(index: u32) -> Option<ShapeFamily> {
        match index {
            0..=5 => Self::BUILT_IN.get(index as usize).cloned(),
            6 => Some(ShapeFamily::Custom(CustomPath::default())),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShapeFamily::Trapezoid => "trapezoid",
            ShapeFamily::SimpleArc => "simple-arc",
            ShapeFamily::TriangleConnections => "triangles",
            ShapeFamily::SimpleCircleConnections => "circles",
            ShapeFamily::Standard => "standard",
            ShapeFamily::StandardFunny => "standard-funny",
            ShapeFamily::Custom(_) => "custom",
        }
    }

    pub fn from_name(name: &str) -> Option<ShapeFamily> {
        (0..Self::COUNT)
            .filter_map(Self::from_index)
            .find(|family| family.name() == name)
    }

    pub fn tooltip(&self) -> &'static str {
        match self {
            ShapeFamily::Trapezoid => "Trapezoid: a single dovetail tab on every edge.",
            ShapeFamily::SimpleArc => "Simple arc: every edge bulges once.",
            ShapeFamily::TriangleConnections => "Triangles: two pointed connectors per edge.",
            ShapeFamily::SimpleCircleConnections => "Circles: two round knobs per edge.",
            ShapeFamily::Standard => "Standard: the classic jigsaw tab.",
            ShapeFamily::StandardFunny => "Funny: an exaggerated, wobbly classic tab.",
            ShapeFamily::Custom(_) => "Custom: a user-drawn edge shape.",
        }
    }
}

/// Source of shape parameters. `range` draws from `[min, max]`, `coin` picks
/// the side of the seam a feature bulges to (`true` is the positive normal).
pub trait ParamSource {
    fn range(&mut self, min: f32, max: f32) -> f32;
    fn coin(&mut self) -> bool;
}

pub struct Seeded<R: Rng> {
    rng: R,
}

impl<R: Rng> Seeded<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> ParamSource for Seeded<R> {
    fn range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }

    fn coin(&mut self) -> bool {
        self.rng.random_bool(0.5)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoRandom;

impl ParamSource for NoRandom {
    fn range(&mut self, min: f32, max: f32) -> f32 {
        (min + max) * 0.5
    }

    fn coin(&mut self) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeamCurve {
    pub points: Vec<(f32, f32)>,
    pub family: ShapeFamily,
    pub bounds: Bounds,
    pub fallback: bool,
}

impl SeamCurve {
    pub fn straight(start: (f32, f32), end: (f32, f32), family: ShapeFamily) -> Self {
        Self {
            points: vec![start, end],
            family,
            bounds: Bounds::new(start.0, start.1, end.0, end.1),
            fallback: false,
        }
    }

    pub fn fallback(start: (f32, f32), end: (f32, f32), family: ShapeFamily) -> Self {
        Self {
            fallback: true,
            ..Self::straight(start, end, family)
        }
    }

    pub fn start(&self) -> (f32, f32) {
        self.points.first().copied().unwrap_or_default()
    }

    pub fn end(&self) -> (f32, f32) {
        self.points.last().copied().unwrap_or_default()
    }

    pub fn is_straight(&self) -> bool {
        self.points.len() == 2
    }

    pub fn reversed_points(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.points.iter().rev().copied()
    }

    pub fn length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|pair| segment_len(pair[0], pair[1]))
            .sum()
    }
}

#[derive(Clone, Debug)]
pub struct GeneratedSeam {
    pub curve: SeamCurve,
    pub success: bool,
    pub attempts: usize,
}

#[derive(Clone, Copy, Debug)]
struct SeamFrame {
    start: (f32, f32),
    along: (f32, f32),
    normal: (f32, f32),
}

impl SeamFrame {
    fn new(start: (f32, f32), end: (f32, f32)) -> Self {
        let along = (end.0 - start.0, end.1 - start.1);
        let normal = (-along.1, along.0);
        Self {
            start,
            along,
            normal,
        }
    }

    fn map(&self, local: (f32, f32)) -> (f32, f32) {
        (
            self.start.0 + self.along.0 * local.0 + self.normal.0 * local.1,
            self.start.1 + self.along.1 * local.0 + self.normal.1 * local.1,
        )
    }

    fn len(&self) -> f32 {
        segment_len((0.0, 0.0), self.along)
    }
}

fn side(source: &mut dyn ParamSource) -> f32 {
    if source.coin() {
        1.0
    } else {
        -1.0
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BoundaryPathGenerator {
    max_attempts: usize,
}

impl Default for BoundaryPathGenerator {
    fn default() -> Self {
        Self::new(MAX_ATTEMPTS_PER_PATH)
    }
}

impl BoundaryPathGenerator {
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn generate(
        &self,
        start: (f32, f32),
        end: (f32, f32),
        bounds: &Bounds,
        family: &ShapeFamily,
        source: &mut dyn ParamSource,
        obstacles: &[SeamCurve],
    ) -> GeneratedSeam {
        let frame = SeamFrame::new(start, end);
        if frame.len() <= f32::EPSILON {
            return GeneratedSeam {
                curve: SeamCurve::fallback(start, end, family.clone()),
                success: false,
                attempts: 0,
            };
        }
        for attempt in 1..=self.max_attempts {
            let points = candidate_points(start, end, family, source);
            let Some(candidate_bounds) = Bounds::from_points(&points) else {
                continue;
            };
            if is_valid_candidate(&points, &candidate_bounds, bounds, obstacles) {
                return GeneratedSeam {
                    curve: SeamCurve {
                        points,
                        family: family.clone(),
                        bounds: candidate_bounds,
                        fallback: false,
                    },
                    success: true,
                    attempts: attempt,
                };
            }
        }
        log::warn!(
            "{} seam from ({:.1}, {:.1}) to ({:.1}, {:.1}) fell back to a straight line after {} attempts",
            family.name(),
            start.0,
            start.1,
            end.0,
            end.1,
            self.max_attempts
        );
        GeneratedSeam {
            curve: SeamCurve::fallback(start, end, family.clone()),
            success: false,
            attempts: self.max_attempts,
        }
    }
}

fn is_valid_candidate(
    points: &[(f32, f32)],
    candidate_bounds: &Bounds,
    bounds: &Bounds,
    obstacles: &[SeamCurve],
) -> bool {
    if points.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return false;
    }
    if !bounds.contains(candidate_bounds) {
        return false;
    }
    let collides = obstacles
        .iter()
        .filter(|other| other.bounds.overlaps(candidate_bounds))
        .any(|other| polylines_cross(points, &other.points));
    if collides {
        return false;
    }
    !polyline_self_crosses(points)
}

pub fn candidate_points(
    start: (f32, f32),
    end: (f32, f32),
    family: &ShapeFamily,
    source: &mut dyn ParamSource,
) -> Vec<(f32, f32)> {
    let frame = SeamFrame::new(start, end);
    let mut local = Vec::new();
    match family {
        ShapeFamily::Trapezoid => trapezoid(&mut local, source),
        ShapeFamily::SimpleArc => simple_arc(&mut local, source),
        ShapeFamily::TriangleConnections => triangles(&mut local, source),
        ShapeFamily::SimpleCircleConnections => circles(&mut local, source),
        ShapeFamily::Standard => standard_tab(
            &mut local,
            source,
            (STANDARD_TAB_MIN, STANDARD_TAB_MAX),
            (STANDARD_DEPTH_RATIO_MIN, STANDARD_DEPTH_RATIO_MAX),
            (STANDARD_JITTER_DEPTH, STANDARD_JITTER_LEN),
            frame.len(),
        ),
        ShapeFamily::StandardFunny => standard_tab(
            &mut local,
            source,
            (FUNNY_TAB_MIN, FUNNY_TAB_MAX),
            (FUNNY_DEPTH_RATIO_MIN, FUNNY_DEPTH_RATIO_MAX),
            (FUNNY_JITTER_DEPTH, FUNNY_JITTER_LEN),
            frame.len(),
        ),
        ShapeFamily::Custom(path) => custom(&mut local, path, source),
    }
    let mut points: Vec<(f32, f32)> = local.iter().map(|point| frame.map(*point)).collect();
    // pin the ends so neighbouring seams meet exactly at the grid corners
    if let Some(first) = points.first_mut() {
        *first = start;
    }
    if let Some(last) = points.last_mut() {
        *last = end;
    }
    points
}

fn trapezoid(out: &mut Vec<(f32, f32)>, source: &mut dyn ParamSource) {
    let sign = side(source);
    let depth = TRAPEZOID_DEPTH * sign;
    out.extend([
        (0.0, 0.0),
        (TRAPEZOID_NECK, 0.0),
        (TRAPEZOID_HEAD, depth),
        (1.0 - TRAPEZOID_HEAD, depth),
        (1.0 - TRAPEZOID_NECK, 0.0),
        (1.0, 0.0),
    ]);
}

fn simple_arc(out: &mut Vec<(f32, f32)>, source: &mut dyn ParamSource) {
    let sign = side(source);
    let height = source.range(ARC_HEIGHT_MIN, ARC_HEIGHT_MAX) * sign;
    let skew = source.range(-0.1, 0.1);
    let p0 = (0.0, 0.0);
    let p1 = (0.25 + skew, height);
    let p2 = (0.75 + skew, height);
    let p3 = (1.0, 0.0);
    out.push(p0);
    flatten_cubic(out, p0, p1, p2, p3, 24);
}

fn triangles(out: &mut Vec<(f32, f32)>, source: &mut dyn ParamSource) {
    out.push((0.0, 0.0));
    for span in [CONNECTOR_FIRST, CONNECTOR_SECOND] {
        let sign = side(source);
        let center = source.range(span.0, span.1);
        let half_width = source.range(TRIANGLE_HALF_WIDTH_MIN, TRIANGLE_HALF_WIDTH_MAX);
        let height = source.range(TRIANGLE_HEIGHT_MIN, TRIANGLE_HEIGHT_MAX) * sign;
        out.push((center - half_width, 0.0));
        out.push((center, height));
        out.push((center + half_width, 0.0));
    }
    out.push((1.0, 0.0));
}

fn circles(out: &mut Vec<(f32, f32)>, source: &mut dyn ParamSource) {
    out.push((0.0, 0.0));
    for span in [CONNECTOR_FIRST, CONNECTOR_SECOND] {
        let sign = side(source);
        let center = source.range(span.0, span.1);
        let radius = source.range(KNOB_RADIUS_MIN, KNOB_RADIUS_MAX);
        let neck = radius * KNOB_NECK_RATIO;
        let lift = (radius * radius - neck * neck).max(0.0).sqrt();
        // circle center sits on the bulging side; the arc runs round the far side
        let knob = (center, lift * sign);
        let a0 = (-lift * sign).atan2(-neck);
        let a1 = (-lift * sign).atan2(neck);
        let sweep = -sign * (2.0 * PI - (a1 - a0).abs());
        out.push((center - neck, 0.0));
        for step in 1..KNOB_ARC_STEPS {
            let angle = a0 + sweep * step as f32 / KNOB_ARC_STEPS as f32;
            out.push((knob.0 + radius * angle.cos(), knob.1 + radius * angle.sin()));
        }
        out.push((center + neck, 0.0));
    }
    out.push((1.0, 0.0));
}

fn standard_tab(
    out: &mut Vec<(f32, f32)>,
    source: &mut dyn ParamSource,
    tab_range: (f32, f32),
    depth_ratio: (f32, f32),
    (jitter_depth, jitter_len): (f32, f32),
    seam_len: f32,
) {
    let sign = side(source);
    let t_len = source.range(tab_range.0, tab_range.1);
    let t_depth = t_len * source.range(depth_ratio.0, depth_ratio.1);
    let a = source.range(-jitter_depth, jitter_depth);
    let b = source.range(-jitter_len, jitter_len);
    let c = source.range(-jitter_depth, jitter_depth);
    let d = source.range(-jitter_len, jitter_len);
    let e = source.range(-jitter_depth, jitter_depth);

    let w = |v: f32| v * sign;
    let p0 = (0.0, 0.0);
    let p1 = (0.2, w(a));
    let p2 = (0.5 + b + d, w(-t_depth + c));
    let p3 = (0.5 - t_len + b, w(t_depth + c));
    let p4 = (0.5 - 2.0 * t_len + b - d, w(3.0 * t_depth + c));
    let p5 = (0.5 + 2.0 * t_len + b - d, w(3.0 * t_depth + c));
    let p6 = (0.5 + t_len + b, w(t_depth + c));
    let p7 = (0.5 + b + d, w(-t_depth + c));
    let p8 = (0.8, w(e));
    let p9 = (1.0, 0.0);

    // step counts come from the on-screen hull length
    let scale = |p: (f32, f32)| (p.0 * seam_len, p.1 * seam_len);
    let steps = |q0, q1, q2, q3| cubic_steps(scale(q0), scale(q1), scale(q2), scale(q3));
    out.push(p0);
    flatten_cubic(out, p0, p1, p2, p3, steps(p0, p1, p2, p3));
    flatten_cubic(out, p3, p4, p5, p6, steps(p3, p4, p5, p6));
    flatten_cubic(out, p6, p7, p8, p9, steps(p6, p7, p8, p9));
}

fn custom(out: &mut Vec<(f32, f32)>, path: &CustomPath, source: &mut dyn ParamSource) {
    let sign = side(source);
    out.push((0.0, 0.0));
    out.extend(path.points.iter().map(|(x, y)| (*x, *y * sign)));
    out.push((1.0, 0.0));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polyline_self_crosses;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn unit_bounds() -> Bounds {
        Bounds::new(0.0, -50.0, 100.0, 50.0)
    }

    #[test]
    fn index_round_trips() {
        for index in 0..ShapeFamily::COUNT {
            let family = ShapeFamily::from_index(index).expect("family");
            assert_eq!(family.index(), index);
            assert!(!family.tooltip().is_empty());
            assert_eq!(ShapeFamily::from_name(family.name()), Some(family));
        }
        assert_eq!(ShapeFamily::from_index(ShapeFamily::COUNT), None);
    }

    #[test]
    fn no_random_is_canonical() {
        let generator = BoundaryPathGenerator::default();
        for index in 0..ShapeFamily::COUNT {
            let family = ShapeFamily::from_index(index).expect("family");
            let first = generator.generate(
                (0.0, 0.0),
                (100.0, 0.0),
                &unit_bounds(),
                &family,
                &mut NoRandom,
                &[],
            );
            let second = generator.generate(
                (0.0, 0.0),
                (100.0, 0.0),
                &unit_bounds(),
                &family,
                &mut NoRandom,
                &[],
            );
            assert!(first.success, "{} failed", family.name());
            assert_eq!(first.attempts, 1);
            assert_eq!(first.curve, second.curve);
        }
    }

    #[test]
    fn seeded_curves_stay_inside_and_simple() {
        let generator = BoundaryPathGenerator::default();
        let mut source = Seeded::new(StdRng::seed_from_u64(7));
        for family in ShapeFamily::BUILT_IN.iter() {
            for _ in 0..20 {
                let seam = generator.generate(
                    (0.0, 0.0),
                    (100.0, 0.0),
                    &unit_bounds(),
                    family,
                    &mut source,
                    &[],
                );
                assert!(unit_bounds().contains(&seam.curve.bounds));
                assert!(!polyline_self_crosses(&seam.curve.points));
                assert_eq!(seam.curve.start(), (0.0, 0.0));
                let end = seam.curve.end();
                assert!((end.0 - 100.0).abs() < 1e-3 && end.1.abs() < 1e-3);
            }
        }
    }

    #[test]
    fn custom_path_flips_with_coin() {
        struct Negative;
        impl ParamSource for Negative {
            fn range(&mut self, min: f32, _max: f32) -> f32 {
                min
            }
            fn coin(&mut self) -> bool {
                false
            }
        }
        let family = ShapeFamily::Custom(CustomPath::new(vec![(0.5, 0.2)]));
        let up = candidate_points((0.0, 0.0), (10.0, 0.0), &family, &mut NoRandom);
        let down = candidate_points((0.0, 0.0), (10.0, 0.0), &family, &mut Negative);
        assert_eq!(up[1], (5.0, 2.0));
        assert_eq!(down[1], (5.0, -2.0));
    }

    #[test]
    fn crossing_an_obstacle_is_rejected() {
        let generator = BoundaryPathGenerator::new(3);
        let wall = SeamCurve {
            points: vec![(41.3, -50.0), (41.3, 50.0)],
            family: ShapeFamily::Standard,
            bounds: Bounds::new(41.3, -50.0, 41.3, 50.0),
            fallback: false,
        };
        let seam = generator.generate(
            (0.0, 0.0),
            (100.0, 0.0),
            &unit_bounds(),
            &ShapeFamily::Standard,
            &mut NoRandom,
            std::slice::from_ref(&wall),
        );
        assert!(!seam.success);
        assert_eq!(seam.attempts, 3);
        assert!(seam.curve.fallback);
        assert_eq!(seam.curve.points, vec![(0.0, 0.0), (100.0, 0.0)]);
    }
}
