use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use kirinuki::{Command, GameSession, InteractionEvent};
use kirinuki_core::game::{angle_delta, distance, is_border_piece, rotate_vec, PieceId, DIRS};

#[derive(Clone, Copy, Debug)]
pub(crate) struct BotConfig {
    pub(crate) seed: u64,
    /// Stop after this many drops even if the puzzle is unsolved.
    pub(crate) max_actions: usize,
    /// Pointer updates per drag.
    pub(crate) drag_steps: usize,
    /// Drop error as a fraction of the snap distance.
    pub(crate) jitter_ratio: f32,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            seed: 1,
            max_actions: 10_000,
            drag_steps: 6,
            jitter_ratio: 0.4,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct BotReport {
    pub(crate) actions: usize,
    pub(crate) events: usize,
    pub(crate) solved: bool,
}

#[derive(Clone, Debug)]
struct SolveCandidate {
    lead: PieceId,
    body_len: usize,
    target_pos: (f32, f32),
    target_rot: f32,
    border_priority: bool,
    score: f32,
}

#[derive(Clone, Copy, Debug)]
struct DragPlan {
    lead: PieceId,
    target_pos: (f32, f32),
    target_rot: f32,
}

/// Plays the session through interaction events, one drop at a time, until
/// it is solved or `max_actions` drops have been made.
pub(crate) fn run(session: &mut GameSession, config: BotConfig) -> BotReport {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut report = BotReport {
        solved: session.is_solved(),
        ..BotReport::default()
    };
    while !report.solved && report.actions < config.max_actions {
        let Some(plan) = choose_solver_action(session, &mut rng) else {
            log::warn!("bot found nothing to move");
            break;
        };
        let commands = play(session, plan, config, &mut rng, &mut report.events);
        report.actions += 1;
        session.tick();
        report.solved = commands
            .iter()
            .any(|command| matches!(command, Command::Solved { .. }))
            || session.is_solved();
        if report.actions % 25 == 0 {
            log::info!("bot: {}", session.status_line());
        }
    }
    report
}

/// Picks one body and the spot where it lines up with a grid neighbour
/// outside it. Border seams go first, then the closest fit.
fn choose_solver_action(session: &GameSession, rng: &mut StdRng) -> Option<DragPlan> {
    let grid = session.grid();
    let tracker = session.tracker();
    let transforms = session.transforms();
    let (cols, rows) = (grid.cols(), grid.rows());

    let mut candidates = Vec::<SolveCandidate>::new();
    for member in 0..grid.total() {
        for dir in DIRS {
            let Some(neighbor) = grid.neighbor(member, dir) else {
                continue;
            };
            if tracker.same_group(member, neighbor) {
                continue;
            }
            let body_len = tracker.rigid_body(member).len();
            let other_len = tracker.rigid_body(neighbor).len();
            // Move the smaller body onto the larger one.
            if body_len > other_len || (body_len == other_len && member > neighbor) {
                continue;
            }
            let onto = transforms[neighbor];
            let (dx, dy) = grid.ideal_offset(neighbor, member);
            let (rx, ry) = rotate_vec(dx, dy, onto.rotation);
            let target_pos = (onto.position.0 + rx, onto.position.1 + ry);
            candidates.push(SolveCandidate {
                lead: member,
                body_len,
                target_pos,
                target_rot: onto.rotation,
                border_priority: is_border_piece(member, cols, rows)
                    && is_border_piece(neighbor, cols, rows),
                score: distance(transforms[member].position, target_pos),
            });
        }
    }
    if candidates.is_empty() {
        return None;
    }

    let any_border = candidates.iter().any(|candidate| candidate.border_priority);
    candidates.retain(|candidate| candidate.border_priority == any_border);
    candidates.sort_by(|a, b| {
        a.body_len
            .cmp(&b.body_len)
            .then_with(|| a.score.total_cmp(&b.score))
    });
    let pick = rng.random_range(0..candidates.len().min(3));
    let chosen = &candidates[pick];
    Some(DragPlan {
        lead: chosen.lead,
        target_pos: chosen.target_pos,
        target_rot: chosen.target_rot,
    })
}

fn play(
    session: &mut GameSession,
    plan: DragPlan,
    config: BotConfig,
    rng: &mut StdRng,
    events: &mut usize,
) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut send = |session: &mut GameSession, event: InteractionEvent| {
        *events += 1;
        session.handle(event)
    };

    let current = session.transforms()[plan.lead];
    let turn = angle_delta(plan.target_rot, current.rotation);
    if session.rules().rotation_enabled && turn != 0.0 {
        let piece = plan.lead;
        send(
            session,
            InteractionEvent::RotateStart {
                piece,
                pivot: Some(current.position),
            },
        );
        send(
            session,
            InteractionEvent::Rotate {
                piece,
                delta_deg: turn,
            },
        );
        commands.extend(send(session, InteractionEvent::RotateStop { piece }));
        if session.is_solved() {
            return commands;
        }
    }

    let jitter = session.rules().tolerance.distance * config.jitter_ratio;
    let target = (
        plan.target_pos.0 + rng.random_range(-jitter..=jitter) * 0.7,
        plan.target_pos.1 + rng.random_range(-jitter..=jitter) * 0.7,
    );
    let start = session.transforms()[plan.lead].position;
    let steps = config.drag_steps.max(1);
    let step = (
        (target.0 - start.0) / steps as f32,
        (target.1 - start.1) / steps as f32,
    );
    send(session, InteractionEvent::DragStart { piece: plan.lead });
    for _ in 0..steps {
        send(
            session,
            InteractionEvent::Drag {
                piece: plan.lead,
                delta: step,
            },
        );
    }
    commands.extend(send(session, InteractionEvent::DragStop { piece: plan.lead }));
    commands
}
