use std::{
    error::Error,
    io::{self, stdin},
    sync::Arc,
    time::{Duration, Instant},
};

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::KeyEventKind,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{info, warn};

use memspan::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    history::HistoryLog,
    logging::{init_tracing, LogConfig},
    runtime::{CrosstermEventSource, FixedTicker, Runner, SpanEvent, SpanEventSource, Ticker},
    scores::{MemoryScoreStore, ScoreStore, SqliteScoreStore},
    session::{clamp_pause, Settings, TestKind},
    speech::{CommandSpeaker, SilentSpeaker, Speaker, Voice},
    ui::screen::current_screen,
};

const TICK_RATE_MS: u64 = 100;

/// digit span and operation span memory tests with spoken digits
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Measure your short-term and working memory. The digit span test speaks a growing sequence of digits for you to repeat; the operation span test interleaves math judgements with letters to recall."
)]
pub struct Cli {
    /// skip the menu and start this test
    #[clap(short = 't', long, value_enum)]
    test: Option<TestKind>,

    /// pause between spoken digits in milliseconds (200-2000)
    #[clap(short = 'p', long)]
    pause_ms: Option<u64>,

    /// repeat digits in reverse order
    #[clap(short = 'r', long)]
    reverse: bool,

    /// voice used to speak digits
    #[clap(long, value_enum)]
    voice: Option<Voice>,

    /// text-to-speech program invoked as `<cmd> [-v voice] <digit>`
    #[clap(long)]
    speech_command: Option<String>,

    /// do not speak, only pace the presentation
    #[clap(short = 'm', long)]
    mute: bool,
}

impl Cli {
    /// Command line flags win over persisted values
    fn merge_into(&self, config: Config) -> Config {
        Config {
            pause_ms: self.pause_ms.map(clamp_pause).unwrap_or(config.pause_ms),
            reverse: self.reverse || config.reverse,
            voice: self.voice.unwrap_or(config.voice),
            speech_command: self
                .speech_command
                .clone()
                .unwrap_or(config.speech_command),
            mute: self.mute || config.mute,
        }
    }
}

fn open_store() -> Box<dyn ScoreStore> {
    let opened = match AppDirs::db_path() {
        Some(path) => SqliteScoreStore::open(&path),
        None => SqliteScoreStore::open_in_memory(),
    };
    match opened {
        Ok(store) => Box::new(store),
        Err(err) => {
            warn!(error = %err, "score database unavailable, scores will not persist");
            Box::new(MemoryScoreStore::default())
        }
    }
}

fn speaker_for(config: &Config) -> Arc<dyn Speaker> {
    if config.mute {
        Arc::new(SilentSpeaker)
    } else {
        Arc::new(CommandSpeaker::new(&config.speech_command))
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(err) = init_tracing(&LogConfig::default()) {
        eprintln!("logging disabled: {err}");
    }

    let config_store = FileConfigStore::new();
    let config = cli.merge_into(config_store.load());
    info!(?config, test = ?cli.test, "starting");

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = App::new(
        cli.test,
        config.settings(),
        open_store(),
        speaker_for(&config),
        runner.sender(),
    );
    if let Some(path) = AppDirs::history_path() {
        app = app.with_history(HistoryLog::new(path));
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    let settings: Settings = app.session.settings.clone();
    if let Err(err) = config_store.save(&config.with_settings(&settings)) {
        warn!(path = %config_store.path().display(), error = %err, "failed to save config");
    }
    info!(games = app.games_played, "exiting");

    result
}

fn start_tui<B: Backend, E: SpanEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    draw(terminal, app)?;

    while !app.should_quit {
        match runner.step() {
            SpanEvent::Tick => app.on_tick(Instant::now()),
            SpanEvent::Resize => {}
            SpanEvent::Key(key) if key.kind == KeyEventKind::Press => app.on_key(key),
            SpanEvent::Key(_) => continue,
            SpanEvent::Session(event) => app.dispatch(event),
        }
        draw(terminal, app)?;
    }

    Ok(())
}

fn draw<B: Backend>(terminal: &mut Terminal<B>, app: &App) -> io::Result<()> {
    let screen = current_screen(&app.state);
    terminal.draw(|f| screen.render(app, f))?;
    Ok(())
}
