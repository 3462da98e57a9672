use directories::ProjectDirs;
use gainers::app::App;
use gainers::config::{self, Config};
use gainers::logging;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use ratatui::crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(50);

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "gainers", "gainers")
}

fn get_config_path() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.config_dir().join("config.toml"),
        None => PathBuf::from("config.toml"),
    }
}

fn get_log_dir() -> PathBuf {
    match project_dirs() {
        Some(dirs) => dirs.data_dir().join("logs"),
        None => PathBuf::from("logs"),
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    if let Err(e) = logging::init(&get_log_dir()) {
        eprintln!("Logging disabled: {e:#}");
    }

    let dotenv = config::load_dotenv();
    let config_path = get_config_path();
    let mut config = Config::load_or_default(&config_path);
    config.apply_env();
    tracing::info!(
        config = %config_path.display(),
        dotenv = ?dotenv,
        provider = %config.oauth.provider,
        "Starting gainers"
    );

    let rt = tokio::runtime::Runtime::new()?;

    terminal::enable_raw_mode()?;
    let mut terminal = ratatui::init();
    ratatui::crossterm::execute!(io::stdout(), EnterAlternateScreen)?;

    let result = run(&mut terminal, &rt, config);

    let _ = ratatui::crossterm::execute!(io::stdout(), LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    ratatui::restore();

    // Abandons a login still waiting on its callback.
    rt.shutdown_timeout(Duration::from_millis(500));
    tracing::info!("Exited");

    result
}

fn run(
    terminal: &mut ratatui::DefaultTerminal,
    rt: &tokio::runtime::Runtime,
    config: Config,
) -> color_eyre::Result<()> {
    let _guard = rt.enter();
    let mut app = App::new(config);

    loop {
        terminal.draw(|frame| app.render(frame))?;

        if event::poll(TICK)? {
            let event = event::read()?;

            if let Event::Key(key) = &event {
                if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    break;
                }
            }

            match app.handle_event(event) {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => tracing::warn!("Event handling failed: {e}"),
            }
        }

        app.process_async_events();

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
