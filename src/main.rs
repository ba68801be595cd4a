use std::{
    fs::File,
    io::{self, stdin},
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use unscramble::{
    app_dirs::AppDirs,
    config::{ConfigStore, FileConfigStore},
    input::{map_key, Command},
    logging,
    persistence::{export_csv, Player, SqliteScoreStore},
    runtime::{
        mailbox, spawn_terminal_reader, ChannelEventSource, FixedTicker, GameEvent, Runner, Step,
        SystemClock,
    },
    words::WordPool,
    GameConfig, SaveStatus, SessionController,
};

const IDLE_REDRAW_MS: u64 = 250;
const SAVE_DRAIN_SECS: u64 = 3;

/// timed word-unscramble game with persisted scores
#[derive(Parser, Debug)]
#[clap(version, about)]
struct Cli {
    /// score database file (defaults to the state directory)
    #[clap(long, global = true)]
    db: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// play one session and save the final score
    Play(PlayArgs),
    /// list saved scores, newest first
    Scores,
    /// export saved scores as csv
    Export {
        /// write to this file instead of stdout
        #[clap(short, long)]
        out: Option<PathBuf>,
    },
    /// print the effective game configuration as json
    Config {
        #[clap(flatten)]
        rules: RuleArgs,

        /// store the effective configuration as the new default
        #[clap(long)]
        save: bool,
    },
}

#[derive(Args, Debug)]
struct PlayArgs {
    /// player name
    #[clap(short = 'n', long)]
    name: String,

    /// player phone number
    #[clap(short = 't', long)]
    phone: String,

    #[clap(flatten)]
    rules: RuleArgs,

    /// json word list to draw from instead of the bundled one
    #[clap(short = 'w', long)]
    words: Option<PathBuf>,

    /// seed for word draws and scrambles
    #[clap(long)]
    seed: Option<u64>,
}

#[derive(Args, Debug)]
struct RuleArgs {
    /// number of rounds per session
    #[clap(short = 'r', long)]
    rounds: Option<usize>,

    /// seconds per round
    #[clap(short = 's', long)]
    seconds: Option<u32>,

    /// points per solved word
    #[clap(short = 'p', long)]
    points: Option<u32>,
}

impl RuleArgs {
    fn apply(&self, mut cfg: GameConfig) -> GameConfig {
        if let Some(rounds) = self.rounds {
            cfg.total_rounds = rounds;
        }
        if let Some(seconds) = self.seconds {
            cfg.time_per_round_secs = seconds;
        }
        if let Some(points) = self.points {
            cfg.points_per_word = points;
        }
        cfg
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let _log_guard = match AppDirs::log_dir() {
        Some(dir) => Some(logging::init_file_logging(&dir)?),
        None => None,
    };

    match &cli.command {
        Commands::Play(args) => play(&cli, args),
        Commands::Scores => list_scores(&cli),
        Commands::Export { out } => export(&cli, out.as_ref()),
        Commands::Config { rules, save } => show_config(rules, *save),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<SqliteScoreStore> {
    let store = match &cli.db {
        Some(path) => SqliteScoreStore::open(path),
        None => SqliteScoreStore::open_default(),
    };
    store.context("failed to open score database")
}

fn play(cli: &Cli, args: &PlayArgs) -> anyhow::Result<()> {
    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let player = match Player::new(args.name.as_str(), args.phone.as_str()).validate() {
        Ok(player) => player,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e).exit();
        }
    };

    let config = args.rules.apply(FileConfigStore::new().load());
    config.validate()?;

    let pool = match &args.words {
        Some(path) => WordPool::from_file(path)
            .with_context(|| format!("failed to load words from {}", path.display()))?,
        None => WordPool::builtin()?,
    };

    let store = Arc::new(open_store(cli)?);
    let (tx, rx) = mailbox();
    spawn_terminal_reader(tx.clone());

    let mut controller =
        SessionController::new(config, pool, player, store, SystemClock, tx);
    if let Some(seed) = args.seed {
        controller = controller.with_seed(seed);
    }
    let runner = Runner::new(
        ChannelEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(IDLE_REDRAW_MS)),
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_tui(&mut terminal, &mut controller, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    controller: &mut SessionController<SqliteScoreStore, SystemClock>,
    runner: &Runner<ChannelEventSource, FixedTicker>,
) -> anyhow::Result<()> {
    loop {
        let snapshot = controller.snapshot();
        terminal.draw(|f| f.render_widget(&snapshot, f.area()))?;

        let step = runner.step(controller.next_deadline(), Instant::now());
        // Expired rounds end before any key that arrived late is applied.
        controller.fire_due_timers();
        let snapshot = controller.snapshot();

        match step {
            Step::Event(GameEvent::Key(key)) => match map_key(key, &snapshot) {
                Some(Command::Quit) => break,
                Some(Command::Start) => controller.start()?,
                Some(Command::Intent(intent)) => controller.dispatch(intent),
                Some(Command::Save) => {
                    if let Err(e) = controller.save() {
                        tracing::debug!(error = %e, "save request ignored");
                    }
                }
                Some(Command::PlayAgain) => {
                    controller.reset();
                    controller.start()?;
                }
                None => {}
            },
            Step::Event(event) => controller.handle_event(event),
            Step::Timeout => {}
        }
    }

    drain_pending_save(controller, runner);
    Ok(())
}

/// Give an outstanding save a moment to land before the process exits.
fn drain_pending_save(
    controller: &mut SessionController<SqliteScoreStore, SystemClock>,
    runner: &Runner<ChannelEventSource, FixedTicker>,
) {
    let give_up = Instant::now() + Duration::from_secs(SAVE_DRAIN_SECS);
    while *controller.save_status() == SaveStatus::Saving && Instant::now() < give_up {
        if let Step::Event(event @ GameEvent::SaveCompleted(_)) =
            runner.step(Some(give_up), Instant::now())
        {
            controller.handle_event(event);
        }
    }
}

fn list_scores(cli: &Cli) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let entries = store.list_entries()?;
    if entries.is_empty() {
        println!("no scores saved yet");
        return Ok(());
    }
    println!("{:<20} {:<24} {:<16} {:>5}", "saved", "name", "phone", "score");
    for entry in entries {
        println!(
            "{:<20} {:<24} {:<16} {:>5}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.name,
            entry.phone,
            entry.score
        );
    }
    Ok(())
}

fn export(cli: &Cli, out: Option<&PathBuf>) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let entries = store.list_entries()?;
    match out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            export_csv(&entries, file)?;
            eprintln!("exported {} scores to {}", entries.len(), path.display());
        }
        None => export_csv(&entries, io::stdout().lock())?,
    }
    Ok(())
}

fn show_config(rules: &RuleArgs, save: bool) -> anyhow::Result<()> {
    let store = FileConfigStore::new();
    let config = rules.apply(store.load());
    config.validate()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    if save {
        store.save(&config)?;
        eprintln!("saved to {}", store.path().display());
    }
    Ok(())
}
