use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use grid_wm::actor::reactor::Reactor;
use grid_wm::common::config::Config;
use grid_wm::common::log;
use grid_wm::layout_engine::{
    AssignmentStrategy, Direction, Layout, LayoutCommand, LayoutEngine, StackMode, TrackSize,
};
use grid_wm::model::store::default_state_path;
use grid_wm::model::{RuntimeState, StateStore};
use grid_wm::sys::window_server::{Snapshot, SnapshotFile};
use tracing::{info, warn};

/// Tiles windows into named cells of a grid layout.
#[derive(Parser)]
#[command(version)]
struct Cli {
    /// Path to configuration file to use (overrides default).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Where runtime state is kept between invocations.
    #[arg(long, value_name = "PATH", global = true)]
    state: Option<PathBuf>,

    /// Window server snapshot to act on. Requests are printed as JSON lines
    /// instead of being sent anywhere.
    #[arg(long, value_name = "PATH", global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a layout to the current space
    Apply {
        layout: String,
        /// How windows are distributed over cells (defaults to the configured one).
        #[arg(long)]
        strategy: Option<AssignmentStrategy>,
    },
    /// Switch to the next layout of the space
    Cycle {
        #[arg(long)]
        reverse: bool,
    },
    /// Apply the current layout again, keeping cell assignments
    Reapply,
    /// Move focus to the neighbouring cell
    Focus {
        direction: Direction,
        #[arg(long)]
        wrap: bool,
        /// Continue onto the next display at the edge.
        #[arg(long)]
        extend: bool,
    },
    /// Focus the first window of a cell
    FocusCell { cell: String },
    /// Focus the next window stacked in the focused cell
    CycleFocus {
        #[arg(long)]
        reverse: bool,
    },
    /// Move the focused window into the neighbouring cell
    Move {
        direction: Direction,
        #[arg(long)]
        wrap: bool,
        #[arg(long)]
        extend: bool,
    },
    /// Like move, but never wraps and does nothing at the edge
    Send { direction: Direction },
    /// Swap the focused window with its neighbour in the cell
    Swap { direction: Direction },
    /// Grow (or with a negative amount, shrink) the focused window
    Resize {
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Reset the focused cell to an equal split
    ResetSplits {
        /// Reset every cell instead.
        #[arg(long)]
        all: bool,
    },
    /// Override how a cell stacks its windows. Without a mode the override
    /// is cleared.
    StackMode {
        cell: String,
        mode: Option<StackMode>,
    },
    /// Reconcile the saved state with the snapshot
    Sync,
    /// Inspect or clear the saved state
    State {
        #[command(subcommand)]
        action: StateAction,
    },
    /// Inspect the configured layouts
    Layout {
        #[command(subcommand)]
        action: LayoutAction,
    },
    /// Check the configuration and list its layouts
    Validate,
}

#[derive(Subcommand)]
enum LayoutAction {
    /// List every configured layout
    List,
    /// Print a layout's tracks and cells
    Show { layout: String },
    /// Print the layout applied to a space
    Current {
        /// Space to look at. Defaults to the space in the snapshot.
        #[arg(long)]
        space: Option<String>,
    },
}

#[derive(Subcommand)]
enum StateAction {
    Show,
    Reset,
}

fn main() {
    sigpipe::reset();
    let cli = Cli::parse();
    log::init_logging();

    if let Err(e) = run(cli) {
        eprintln!("{e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let cmd = match cli.command {
        Commands::Validate => {
            for layout in &config.layouts {
                println!("{}\t{}", layout.id, layout.name);
            }
            println!("Config validation passed");
            return Ok(());
        }
        Commands::State { action } => {
            let store = open_store(&config, cli.state.as_deref());
            return match action {
                StateAction::Show => {
                    let summary = store.read(|s| s.summary());
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                    Ok(())
                }
                StateAction::Reset => Ok(store.reset()?),
            };
        }
        Commands::Layout { action } => {
            return layout_command(&config, cli.state.as_deref(), cli.snapshot.as_deref(), action);
        }
        Commands::Apply { layout, strategy } => LayoutCommand::ApplyLayout { layout, strategy },
        Commands::Cycle { reverse: false } => LayoutCommand::CycleLayout,
        Commands::Cycle { reverse: true } => LayoutCommand::PreviousLayout,
        Commands::Reapply => LayoutCommand::ReapplyLayout,
        Commands::Focus { direction, wrap, extend } => {
            LayoutCommand::MoveFocus { direction, wrap, extend }
        }
        Commands::FocusCell { cell } => LayoutCommand::FocusCell(cell),
        Commands::CycleFocus { reverse: false } => LayoutCommand::NextWindow,
        Commands::CycleFocus { reverse: true } => LayoutCommand::PrevWindow,
        Commands::Move { direction, wrap, extend } => {
            LayoutCommand::MoveWindow { direction, wrap, extend }
        }
        Commands::Send { direction } => LayoutCommand::SendWindow(direction),
        Commands::Swap { direction } => LayoutCommand::SwapWindow(direction),
        Commands::Resize { delta } => LayoutCommand::ResizeWindowBy { amount: delta },
        Commands::ResetSplits { all: false } => LayoutCommand::ResetSplits,
        Commands::ResetSplits { all: true } => LayoutCommand::ResetAllSplits,
        Commands::StackMode { cell, mode } => LayoutCommand::SetCellStackMode { cell, mode },
        Commands::Sync => LayoutCommand::Sync,
    };

    let snapshot = cli.snapshot.context("this command needs --snapshot")?;
    let store = open_store(&config, cli.state.as_deref());
    let reactor = Reactor::new(config, store, SnapshotFile::new(snapshot, true))?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;
    let response = runtime.block_on(reactor.handle_command(cmd))?;
    info!(
        layout = ?response.layout_id,
        placed = response.placements.len(),
        focus = ?response.focus_window,
        cells = ?response.affected_cells,
        "done"
    );
    if let Some(message) = &response.message {
        eprintln!("{message}");
    }
    Ok(())
}

fn layout_command(
    config: &Config,
    state: Option<&Path>,
    snapshot: Option<&Path>,
    action: LayoutAction,
) -> anyhow::Result<()> {
    let engine = config.engine()?;
    match action {
        LayoutAction::List => {
            for layout in engine.layouts() {
                println!("{}\t{}\t{} cells", layout.id, layout.name, layout.cells.len());
            }
        }
        LayoutAction::Show { layout } => print_layout(&engine, engine.layout(&layout)?),
        LayoutAction::Current { space } => {
            let space = match space {
                Some(space) => space,
                None => read_snapshot(snapshot)?.space_id.to_string(),
            };
            let store = open_store(config, state);
            match store.read(|s| s.current_layout_for_space(&space).map(str::to_owned)) {
                Some(layout) => println!("{layout}"),
                None => eprintln!("no layout applied to space {space}"),
            }
        }
    }
    Ok(())
}

fn print_layout(engine: &LayoutEngine, layout: &Layout) {
    println!("{} ({})", layout.id, layout.name);
    if !layout.description.is_empty() {
        println!("{}", layout.description);
    }
    println!("columns: {}", tracks(&layout.columns));
    println!("rows: {}", tracks(&layout.rows));
    println!("cells:");
    for cell in &layout.cells {
        let mode = engine.effective_stack_mode(layout, &cell.id, None);
        println!(
            "  {}\tcolumn {}/{}\trow {}/{}\t{mode}",
            cell.id, cell.col_start, cell.col_end, cell.row_start, cell.row_end
        );
    }
}

fn tracks(tracks: &[TrackSize]) -> String {
    tracks.iter().map(TrackSize::to_string).collect::<Vec<_>>().join(" ")
}

fn read_snapshot(path: Option<&Path>) -> anyhow::Result<Snapshot> {
    let path = path.context("pass --space or --snapshot")?;
    let buf = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    Ok(serde_json::from_str(&buf)?)
}

fn open_store(config: &Config, state: Option<&Path>) -> StateStore {
    let path = state
        .map(Path::to_path_buf)
        .or_else(|| config.settings.state_file.clone())
        .or_else(default_state_path);
    match path {
        Some(path) => StateStore::load(path),
        None => {
            warn!("no home directory, state will not be saved");
            StateStore::in_memory(RuntimeState::default())
        }
    }
}
