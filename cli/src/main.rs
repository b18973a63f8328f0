mod bot;

use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use kirinuki::save::{unix_now, SAVE_DIR_ENV};
use kirinuki::{GameSession, SaveFormat, SaveStore, SessionConfig};
use kirinuki_core::game::{fmt_f32, format_elapsed};
use kirinuki_core::grid::{best_grid_for_count, build_grid_choices, grid_choice_label};
use kirinuki_core::piece::layout_svg;
use kirinuki_core::{
    AngleRule, GameRules, GridPathPlanner, GridSpec, Seeded, ShapeFamily, ToleranceConfig,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::bot::BotConfig;

#[derive(Parser)]
#[command(name = "kirinuki-cli", version, about = "Generate and play kirinuki jigsaw puzzles")]
struct Cli {
    #[arg(long, env = "KIRINUKI_LOG", default_value = "info", global = true)]
    log_level: log::LevelFilter,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cut a puzzle and report on its seams.
    Generate {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        /// Write every piece outline to this SVG file.
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// List the grid sizes offered for an image.
    Grids {
        #[arg(long, default_value = "1200x800", value_parser = parse_size)]
        image_size: (u32, u32),
    },
    /// Let the bot play a fresh puzzle.
    Solve {
        #[command(flatten)]
        puzzle: PuzzleArgs,
        #[command(flatten)]
        rules: RulesArgs,
        #[command(flatten)]
        bot: BotArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Write the layout the bot leaves behind to this SVG file.
        #[arg(long)]
        svg: Option<PathBuf>,
        /// Save the game when the bot stops, under this name or a default one.
        #[arg(long, num_args = 0..=1, default_missing_value = "")]
        save: Option<String>,
    },
    /// Load a save and let the bot finish it.
    Resume {
        name: String,
        #[command(flatten)]
        bot: BotArgs,
        #[command(flatten)]
        store: StoreArgs,
        /// Write the result back to the same save.
        #[arg(long)]
        save: bool,
    },
    Saves {
        #[command(flatten)]
        store: StoreArgs,
        #[command(subcommand)]
        command: SavesCommand,
    },
}

#[derive(Subcommand)]
enum SavesCommand {
    List,
    Delete { name: String },
    Info { name: String },
}

#[derive(Args)]
struct PuzzleArgs {
    #[arg(long, default_value_t = 4)]
    rows: usize,
    #[arg(long, default_value_t = 6)]
    cols: usize,
    #[arg(long, default_value_t = 80.0)]
    piece_width: f32,
    #[arg(long, default_value_t = 80.0)]
    piece_height: f32,
    /// Pick rows and columns for this many pieces over `--image-size`
    /// instead of `--rows`/`--cols`.
    #[arg(long)]
    pieces: Option<u32>,
    /// Image extent as WIDTHxHEIGHT, used with `--pieces`.
    #[arg(long, default_value = "1200x800", value_parser = parse_size)]
    image_size: (u32, u32),
    #[arg(long, default_value = "standard", value_parser = parse_family)]
    family: ShapeFamily,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long)]
    label: Option<String>,
    #[arg(long)]
    image: Option<String>,
    #[arg(long, default_value_t = 30)]
    max_attempts: u32,
}

#[derive(Args)]
struct RulesArgs {
    /// Snap distance in puzzle units.
    #[arg(long, default_value_t = 5.0)]
    tolerance: f32,
    #[arg(long)]
    no_rotation: bool,
    #[arg(long, default_value_t = 10.0)]
    rotation_step: f32,
    /// Accept neighbours whose rotations differ by up to one step.
    #[arg(long)]
    loose_angles: bool,
}

#[derive(Args)]
struct BotArgs {
    #[arg(long, default_value_t = 1)]
    bot_seed: u64,
    #[arg(long, default_value_t = 10_000)]
    max_actions: usize,
    #[arg(long, default_value_t = 6)]
    drag_steps: usize,
}

#[derive(Args)]
struct StoreArgs {
    #[arg(long, env = SAVE_DIR_ENV, default_value = kirinuki::save::DEFAULT_SAVE_DIR)]
    save_dir: PathBuf,
    /// Write compact binary saves instead of JSON.
    #[arg(long)]
    binary: bool,
}

impl StoreArgs {
    fn store(&self) -> SaveStore {
        let format = if self.binary {
            SaveFormat::Binary
        } else {
            SaveFormat::Json
        };
        SaveStore::new(&self.save_dir).with_format(format)
    }
}

impl BotArgs {
    fn config(&self) -> BotConfig {
        BotConfig {
            seed: self.bot_seed,
            max_actions: self.max_actions,
            drag_steps: self.drag_steps,
            ..BotConfig::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    match cli.command {
        Commands::Generate { puzzle, svg } => {
            let grid = puzzle.grid()?;
            let mut source = Seeded::new(StdRng::seed_from_u64(puzzle.seed));
            let paths = GridPathPlanner::with_max_attempts(puzzle.max_attempts as usize).plan(
                &grid,
                &puzzle.family,
                &mut source,
            );
            println!(
                "grid: {}x{} ({} pieces of {}x{})",
                grid.rows(),
                grid.cols(),
                grid.total(),
                fmt_f32(grid.piece_width()),
                fmt_f32(grid.piece_height())
            );
            println!("family: {} ({})", paths.family().name(), paths.family().tooltip());
            println!(
                "seams: {} internal, {} fallback, {} attempts",
                paths.internal_seam_count(),
                paths.fallback_count(),
                paths.total_attempts()
            );
            let seam_length: f32 = paths.seams().iter().map(|seam| seam.curve.length()).sum();
            println!("total seam length: {}", fmt_f32(seam_length));
            if let Some(path) = svg {
                std::fs::write(&path, paths.to_svg())?;
                println!("svg: {}", path.display());
            }
        }
        Commands::Grids { image_size } => {
            let (width, height) = image_size;
            for choice in build_grid_choices(width, height) {
                let piece_w = width / choice.cols.max(1);
                let piece_h = height / choice.rows.max(1);
                println!("{}  piece {}x{}", grid_choice_label(&choice), piece_w, piece_h);
            }
        }
        Commands::Solve {
            puzzle,
            rules,
            bot,
            store,
            svg,
            save,
        } => {
            let config = puzzle.session_config(rules.rules())?;
            let mut session = GameSession::new(config)?;
            let report = bot::run(&mut session, bot.config());
            print_result(&session, report);
            if let Some(path) = svg {
                std::fs::write(&path, layout_svg(&session.pieces()))?;
                println!("svg: {}", path.display());
            }
            if let Some(name) = save {
                let name = (!name.is_empty()).then_some(name.as_str());
                let saved = store.store().save(&session.snapshot(unix_now()), name)?;
                println!("saved: {saved}");
            }
        }
        Commands::Resume {
            name,
            bot,
            store,
            save,
        } => {
            let store = store.store();
            let snapshot = store.load(&name)?;
            let mut session = GameSession::restore(&snapshot)?;
            println!("resumed {name}: {}", session.status_line());
            let report = bot::run(&mut session, bot.config());
            print_result(&session, report);
            if save {
                store.save(&session.snapshot(unix_now()), Some(&name))?;
                println!("saved: {name}");
            }
        }
        Commands::Saves { store, command } => {
            let store = store.store();
            match command {
                SavesCommand::List => {
                    let saves = store.list()?;
                    if saves.is_empty() {
                        println!("no saves in {}", store.dir().display());
                    }
                    for info in saves {
                        println!(
                            "{}  {}  {}x{}  {}  moves {}  time {}{}",
                            info.name,
                            info.saved_at,
                            info.rows,
                            info.cols,
                            info.shape_family,
                            info.stats.moves,
                            format_elapsed(info.stats.elapsed_secs),
                            if info.stats.solved { "  solved" } else { "" }
                        );
                    }
                }
                SavesCommand::Delete { name } => {
                    store.delete(&name)?;
                    println!("deleted: {name}");
                }
                SavesCommand::Info { name } => {
                    let info = store.info(&name)?;
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
            }
        }
    }

    Ok(())
}

impl PuzzleArgs {
    fn grid(&self) -> Result<GridSpec, Box<dyn std::error::Error>> {
        let Some(target) = self.pieces else {
            return Ok(GridSpec::new(
                self.rows,
                self.cols,
                self.piece_width,
                self.piece_height,
                (0.0, 0.0),
            )?);
        };
        let (width, height) = self.image_size;
        let choice = best_grid_for_count(width, height, target)
            .ok_or_else(|| format!("no grid fits {target} pieces over {width}x{height}"))?;
        log::info!("grid choice: {}", grid_choice_label(&choice));
        Ok(GridSpec::for_image(width, height, &choice, (0.0, 0.0))?)
    }

    fn session_config(
        &self,
        mut rules: GameRules,
    ) -> Result<SessionConfig, Box<dyn std::error::Error>> {
        let grid = self.grid()?;
        rules.max_attempts_per_path = self.max_attempts;
        Ok(SessionConfig {
            label: self
                .label
                .clone()
                .unwrap_or_else(|| format!("{}x{} {}", grid.rows(), grid.cols(), self.family.name())),
            image_path: self.image.clone(),
            rows: grid.rows(),
            cols: grid.cols(),
            piece_width: grid.piece_width(),
            piece_height: grid.piece_height(),
            origin: grid.origin(),
            family: self.family.clone(),
            seed: self.seed,
            rules,
        })
    }
}

impl RulesArgs {
    fn rules(&self) -> GameRules {
        let angle = if self.loose_angles {
            AngleRule::WithinStep(self.rotation_step)
        } else {
            AngleRule::Exact
        };
        GameRules {
            tolerance: ToleranceConfig {
                distance: self.tolerance,
                angle,
            },
            rotation_enabled: !self.no_rotation,
            rotation_step_deg: self.rotation_step,
            ..GameRules::default()
        }
    }
}

fn print_result(session: &GameSession, report: bot::BotReport) {
    println!(
        "bot: {} drops, {} events, {}",
        report.actions,
        report.events,
        if report.solved { "solved" } else { "unsolved" }
    );
    println!("{}", session.status_line());
}

fn parse_family(raw: &str) -> Result<ShapeFamily, String> {
    if let Ok(index) = raw.parse::<u32>() {
        return ShapeFamily::from_index(index).ok_or_else(|| format!("no shape family {index}"));
    }
    ShapeFamily::from_name(raw).ok_or_else(|| {
        let names: Vec<&str> = (0..ShapeFamily::COUNT)
            .filter_map(ShapeFamily::from_index)
            .map(|family| family.name())
            .collect();
        format!("unknown shape family {raw:?}, expected one of {}", names.join(", "))
    })
}

fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (w, h) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {raw:?}"))?;
    let w = w.trim().parse::<u32>().map_err(|err| err.to_string())?;
    let h = h.trim().parse::<u32>().map_err(|err| err.to_string())?;
    Ok((w, h))
}

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            let _ = writeln!(
                std::io::stderr(),
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logger(level: log::LevelFilter) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}
