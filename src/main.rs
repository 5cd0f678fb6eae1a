use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use nback::{
    app::{App, Control},
    app_dirs::AppDirs,
    audio::{LetterPlayer, SilentPlayer, SpeechPlayer},
    config::{FileSettingsStore, Settings, SettingsStore},
    runtime::{forward_updates, CrosstermEventSource, FixedTicker, GameEvent, Runner},
    sequence,
    session::{Modality, SessionConfig, DEFAULT_MATCH_PERCENTAGE},
    ui, Orchestrator,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::Path,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const TICK_RATE_MS: u64 = 100;

/// n-back memory trainer with a visual grid and spoken letters
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "An n-back working memory trainer. Press match whenever the current stimulus equals the one shown N steps earlier. Flags override the stored settings for this run; add --save to keep them."
)]
pub struct Cli {
    /// how many steps back a stimulus is compared against
    #[clap(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..=5))]
    n_back: Option<u32>,

    /// number of stimuli per session
    #[clap(short = 'e', long = "events", value_parser = clap::value_parser!(u32).range(5..=30))]
    event_count: Option<u32>,

    /// seconds between stimuli
    #[clap(short = 'i', long, value_parser = clap::value_parser!(u64).range(1..=5))]
    interval_secs: Option<u64>,

    /// side length of the visual grid
    #[clap(short = 'g', long, value_parser = clap::value_parser!(u32).range(3..=5))]
    grid_size: Option<u32>,

    /// start a session in this modality right away
    #[clap(short = 'm', long, value_enum)]
    modality: Option<Modality>,

    /// share of eligible stimuli that are n-back matches
    #[clap(short = 'p', long, default_value_t = DEFAULT_MATCH_PERCENTAGE, value_parser = clap::value_parser!(u8).range(0..=100))]
    match_percentage: u8,

    /// do not speak letters
    #[clap(long)]
    mute: bool,

    /// text-to-speech command, the letter is appended as last argument
    #[clap(long)]
    speech_command: Option<String>,

    /// persist the given settings
    #[clap(long)]
    save: bool,

    /// print one generated sequence per modality as json and exit
    #[clap(long)]
    print_sequence: bool,
}

impl Cli {
    /// Stored settings with command line overrides applied
    fn settings(&self, stored: Settings) -> Settings {
        Settings {
            n_back: self.n_back.unwrap_or(stored.n_back),
            event_count: self.event_count.unwrap_or(stored.event_count),
            event_interval_ms: self
                .interval_secs
                .map(|s| s * 1000)
                .unwrap_or(stored.event_interval_ms),
            grid_size: self.grid_size.unwrap_or(stored.grid_size),
        }
    }

    fn player(&self) -> Arc<dyn LetterPlayer> {
        if self.mute {
            Arc::new(SilentPlayer)
        } else if let Some(cmd) = &self.speech_command {
            Arc::new(SpeechPlayer::new(cmd))
        } else {
            Arc::new(SpeechPlayer::default())
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let store = Arc::new(FileSettingsStore::new());
    let settings = cli.settings(store.load_settings());
    if cli.save {
        store.save_settings(&settings)?;
    }

    if cli.print_sequence {
        return print_sequences(&cli, &settings);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    // the terminal belongs to the TUI, so logs go to a file
    if let Err(e) = init_file_logging(&AppDirs::log_path()) {
        eprintln!("logging disabled: {}", e);
    }
    info!("starting with {:?}", settings);

    let orchestrator = Orchestrator::new(store, cli.player());
    let mut app = App::new(orchestrator, settings, cli.match_percentage);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, cli.modality);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!("tui exited with error: {}", e);
    }
    result
}

fn init_file_logging(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn print_sequences(cli: &Cli, settings: &Settings) -> Result<(), Box<dyn Error>> {
    let modality = cli.modality.unwrap_or_default();
    let mut cfg = SessionConfig::from_settings(settings, modality);
    cfg.target_match_percentage = cli.match_percentage;
    cfg.validate()?;

    let generate_for = |domain| -> Result<Option<Vec<u32>>, nback::NBackError> {
        let seq = sequence::generate(cfg.length, domain, cfg.target_match_percentage, cfg.lag)?;
        Ok(Some(seq.values().to_vec()))
    };
    let visual = if modality.has_visual() {
        generate_for(cfg.stimulus_domain_size)?
    } else {
        None
    };
    let audio = if modality.has_audio() {
        generate_for(cfg.audio_domain_size)?
    } else {
        None
    };

    let out = serde_json::json!({
        "modality": modality,
        "lag": cfg.lag,
        "length": cfg.length,
        "match_percentage": cfg.target_match_percentage,
        "visual": visual,
        "audio": audio,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    autostart: Option<Modality>,
) -> Result<(), Box<dyn Error>> {
    let events = CrosstermEventSource::new();
    forward_updates(
        app.orchestrator.subscribe_state(),
        events.sender(),
        GameEvent::Session,
    );
    forward_updates(
        app.orchestrator.subscribe_score(),
        events.sender(),
        GameEvent::Score,
    );
    forward_updates(
        app.orchestrator.subscribe_highscore(),
        events.sender(),
        GameEvent::Highscore,
    );
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    if let Some(modality) = autostart {
        app.start(modality);
    }

    loop {
        terminal.draw(|f| ui::draw(app, f))?;
        if app.on_event(runner.step()) == Control::Quit {
            break;
        }
    }

    app.orchestrator.shutdown();
    Ok(())
}
