pub const SNAP_DISTANCE_DEFAULT: f32 = 5.0;
pub const MAX_ATTEMPTS_PER_PATH: usize = 30;

pub const ROTATION_STEP_DEG_DEFAULT: f32 = 10.0;
pub const ROTATION_STEP_DEG_MIN: f32 = 1.0;
pub const ROTATION_STEP_DEG_MAX: f32 = 180.0;

pub const SCRAMBLE_MARGIN_RATIO: f32 = 0.5;

pub const DIR_UP: usize = 0;
pub const DIR_RIGHT: usize = 1;
pub const DIR_DOWN: usize = 2;
pub const DIR_LEFT: usize = 3;
pub const DIRS: [usize; 4] = [DIR_UP, DIR_RIGHT, DIR_DOWN, DIR_LEFT];

pub type PieceId = usize;

pub fn normalize_angle(mut angle: f32) -> f32 {
    angle %= 360.0;
    if angle < 0.0 {
        angle += 360.0;
    }
    // -0.0 and tiny negatives can land exactly on 360 after the shift
    if angle >= 360.0 {
        angle -= 360.0;
    }
    angle
}

pub fn angle_delta(target: f32, current: f32) -> f32 {
    let mut diff = normalize_angle(target - current);
    if diff > 180.0 {
        diff -= 360.0;
    }
    diff
}

pub fn angle_matches(a: f32, b: f32, tolerance: f32) -> bool {
    angle_delta(a, b).abs() <= tolerance
}

pub fn snap_angle(angle: f32, step: f32) -> f32 {
    if step <= 0.0 {
        return normalize_angle(angle);
    }
    let steps = (normalize_angle(angle) / step).round();
    normalize_angle(steps * step)
}

pub fn rotate_vec(x: f32, y: f32, angle_deg: f32) -> (f32, f32) {
    if angle_deg == 0.0 {
        return (x, y);
    }
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

pub fn rotate_point(point: (f32, f32), origin: (f32, f32), angle_deg: f32) -> (f32, f32) {
    let (rx, ry) = rotate_vec(point.0 - origin.0, point.1 - origin.1, angle_deg);
    (origin.0 + rx, origin.1 + ry)
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

pub fn neighbor_id(id: PieceId, cols: usize, rows: usize, dir: usize) -> Option<PieceId> {
    if cols == 0 || id >= cols * rows {
        return None;
    }
    let col = id % cols;
    let row = id / cols;
    match dir {
        DIR_UP if row > 0 => Some(id - cols),
        DIR_RIGHT if col + 1 < cols => Some(id + 1),
        DIR_DOWN if row + 1 < rows => Some(id + cols),
        DIR_LEFT if col > 0 => Some(id - 1),
        _ => None,
    }
}

pub fn is_border_piece(id: PieceId, cols: usize, rows: usize) -> bool {
    let row = id / cols.max(1);
    let col = id % cols.max(1);
    row == 0 || row + 1 == rows || col == 0 || col + 1 == cols
}

pub fn fmt_f32(value: f32) -> String {
    format!("{:.3}", value)
}

pub fn format_elapsed(seconds: u32) -> String {
    let minutes = seconds / 60;
    let seconds = seconds % 60;
    format!("{:02}:{:02}", minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_negative_and_large_angles() {
        assert_eq!(normalize_angle(-90.0), 270.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(370.0), 10.0);
    }

    #[test]
    fn snap_angle_rounds_to_step() {
        assert_eq!(snap_angle(14.0, 10.0), 10.0);
        assert_eq!(snap_angle(356.0, 10.0), 0.0);
        assert_eq!(snap_angle(-46.0, 90.0), 270.0);
    }

    #[test]
    fn angle_delta_takes_short_way() {
        assert_eq!(angle_delta(10.0, 350.0), 20.0);
        assert_eq!(angle_delta(350.0, 10.0), -20.0);
        assert!(angle_matches(359.0, 1.0, 2.0));
    }

    #[test]
    fn neighbor_ids_stop_at_borders() {
        assert_eq!(neighbor_id(0, 3, 2, DIR_UP), None);
        assert_eq!(neighbor_id(0, 3, 2, DIR_LEFT), None);
        assert_eq!(neighbor_id(0, 3, 2, DIR_RIGHT), Some(1));
        assert_eq!(neighbor_id(0, 3, 2, DIR_DOWN), Some(3));
        assert_eq!(neighbor_id(5, 3, 2, DIR_RIGHT), None);
        assert_eq!(neighbor_id(5, 3, 2, DIR_DOWN), None);
        assert_eq!(neighbor_id(6, 3, 2, DIR_UP), None);
    }

    #[test]
    fn rotate_vec_quarter_turn() {
        let (x, y) = rotate_vec(10.0, 0.0, 90.0);
        assert!(x.abs() < 1e-4);
        assert!((y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn elapsed_formats_minutes_and_seconds() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(75), "01:15");
    }
}
