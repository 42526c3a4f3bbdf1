use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use pdfchat_core::{is_pdf, Config, HttpQaClient, QaService, Theme};
use tracing::info;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "pdfchat", version)]
#[command(about = "Chat with a PDF through a question-answering service")]
struct Cli {
    /// Service address (overrides PDFCHAT_BASE_URL and the config file)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Start with the dark theme
    #[arg(long)]
    dark: bool,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// PDF to pre-select in the interactive UI
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a PDF and print its document id
    Upload {
        file: PathBuf,
    },
    /// Ask a question about an uploaded document
    Ask {
        /// Document id returned by `upload`
        #[arg(long)]
        file_id: String,
        /// Your question
        question: String,
    },
    /// Drop every document stored by the service
    Reset,
    /// Upload a PDF, then ask one question about it
    Chat {
        file: PathBuf,
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    let base_url = config.resolve_base_url(cli.base_url.as_deref());
    let client = match config.request_timeout() {
        Some(timeout) => HttpQaClient::with_timeout(&base_url, timeout)?,
        None => HttpQaClient::new(&base_url),
    };

    match cli.command {
        None => {
            let log_dir = cli.log_dir.unwrap_or_else(|| config.log_dir());
            let _guard = logging::init_file_logging(&log_dir)?;
            info!(base_url = %base_url, "starting interactive session");

            let theme = Theme::from_dark(cli.dark || config.dark_theme.unwrap_or(false));
            run_tui(&config, client, theme, cli.file).await
        }
        Some(command) => {
            logging::init_stderr_logging()?;
            run_command(&client, command).await
        }
    }
}

async fn run_tui(
    config: &Config,
    client: HttpQaClient,
    theme: Theme,
    file: Option<PathBuf>,
) -> Result<()> {
    let mut events = EventHandler::new();
    let mut app = App::new(config, client, theme, events.sender());

    if let Some(path) = file {
        if !is_pdf(&path) {
            return Err(anyhow!("{} is not a PDF file", path.display()));
        }
        app.session.select_file(path);
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run_loop(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

async fn run_command(client: &HttpQaClient, command: Commands) -> Result<()> {
    match command {
        Commands::Upload { file } => {
            let file_id = upload(client, &file).await?;
            println!("{}", file_id);
        }
        Commands::Ask { file_id, question } => {
            ask(client, &file_id, &question).await?;
        }
        Commands::Reset => {
            client.reset_all().await?;
            println!("{}", "All documents cleared".green());
        }
        Commands::Chat { file, question } => {
            let file_id = upload(client, &file).await?;
            ask(client, &file_id, &question).await?;
        }
    }

    Ok(())
}

async fn upload(client: &HttpQaClient, file: &Path) -> Result<String> {
    if !is_pdf(file) {
        return Err(anyhow!("{} is not a PDF file", file.display()));
    }

    eprintln!("📄 Uploading {}...", file.display().to_string().cyan());
    let file_id = client.upload_pdf(file).await?;
    eprintln!("{} {}", "Uploaded as".green(), file_id.bold());
    Ok(file_id)
}

async fn ask(client: &HttpQaClient, file_id: &str, question: &str) -> Result<()> {
    let question = question.trim();
    if question.is_empty() {
        return Err(anyhow!("question is empty"));
    }

    match client.ask(file_id, question).await {
        Ok(answer) => {
            println!("{}", "Response:".bold().green());
            println!("{}", answer);
        }
        Err(e) => {
            eprintln!("{}", "Error querying service".red());
            eprintln!("Make sure the service is running at {}", client.base_url().bold());
            return Err(e.into());
        }
    }

    Ok(())
}
