//! TAMARINI CLI
//!
//! `tamarini serve` runs the tutor endpoint; `tamarini chat` is a terminal
//! tutor that talks to it (or to the model directly with `--local`).

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tamarini_tutor::{
    create_router, run_turn, strings, AppState, Config, GeminiModel, HttpTutorClient,
    ImagePayload, Language, Message, Mode, Role, Session, Settings, Theme, Tutor, TutorBackend,
    TutorError,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Endpoint used by `chat` when none is given.
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/api/tamarini";

/// Default location of the persisted user settings.
const DEFAULT_SETTINGS_FILE: &str = ".tamarini/settings.json";

/// TAMARINI - step-by-step math tutor
///
/// Guides a student through a math exercise one small step at a time,
/// in French or Arabic, without giving the final answer away.
#[derive(Parser, Debug)]
#[command(name = "tamarini")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the tutor HTTP endpoint
    Serve {
        /// Path to configuration file (default: tamarini.json in current directory)
        #[arg(short, long, value_name = "FILE")]
        config: Option<String>,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for the HTTP API server
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
    },

    /// Chat with the tutor in the terminal
    Chat {
        /// URL of a running tutor endpoint
        #[arg(short, long, value_name = "URL", conflicts_with = "local")]
        endpoint: Option<String>,

        /// Call the model directly instead of a running endpoint
        #[arg(long)]
        local: bool,

        /// Path to configuration file, used with --local
        #[arg(short, long, value_name = "FILE")]
        config: Option<String>,

        /// Tutoring language (fr or ar); overrides the saved setting
        #[arg(short, long)]
        language: Option<String>,

        /// Where language and theme are persisted
        #[arg(long, value_name = "FILE", default_value = DEFAULT_SETTINGS_FILE)]
        settings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Command::Serve { config, host, port } => run_server(config.as_deref(), &host, port).await,
        Command::Chat {
            endpoint,
            local,
            config,
            language,
            settings,
        } => {
            let options = ChatOptions {
                endpoint,
                local,
                config,
                language,
                settings,
            };
            run_chat(options).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

// ============================================================================
// serve
// ============================================================================

/// Runs the HTTP endpoint until Ctrl+C.
async fn run_server(config_path: Option<&str>, host: &str, port: u16) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    print_config(&config);

    let model = GeminiModel::from_config(&config)?;
    let tutor: Arc<dyn TutorBackend> = Arc::new(Tutor::new(Arc::new(model)));

    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid address '{host}:{port}': {e}"))?;

    let endpoint_path = config.endpoint_path.clone();
    let router = create_router(AppState::new(config, tutor));

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    println!();
    println!("Tutor endpoint running on http://{addr}{endpoint_path}");
    println!("Press Ctrl+C to stop");
    tracing::info!(%addr, path = %endpoint_path, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        return;
    }
    tracing::info!("Received Ctrl+C, shutting down");
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Model: {}", config.model);
    println!("  API base: {}", config.api_base);
    println!("  API key variable: {}", config.api_key_env);
    println!("  Request timeout: {}s", config.request_timeout_secs);
    println!("  Default language: {}", config.default_language);
}

// ============================================================================
// chat
// ============================================================================

struct ChatOptions {
    endpoint: Option<String>,
    local: bool,
    config: Option<String>,
    language: Option<String>,
    settings: PathBuf,
}

/// One line of chat input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    /// Plain text, sent in normal mode.
    Send(String),
    /// `/check <text>`
    Check(String),
    /// `/similar`
    Similar,
    /// `/image <path>`
    Image(PathBuf),
    /// `/new`
    New,
    /// `/lang <fr|ar>`
    Lang(Language),
    /// `/theme <light|dark>`
    Theme(Theme),
    /// `/help`
    Help,
    /// `/quit`
    Quit,
    /// Anything starting with `/` that is not understood.
    Invalid(String),
}

fn parse_command(line: &str) -> ChatCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ChatCommand::Send(line.to_string());
    };

    let (name, arg) = rest
        .split_once(char::is_whitespace)
        .map_or((rest, ""), |(n, a)| (n, a.trim()));

    match name.to_lowercase().as_str() {
        "check" => ChatCommand::Check(arg.to_string()),
        "similar" => ChatCommand::Similar,
        "image" if !arg.is_empty() => ChatCommand::Image(PathBuf::from(arg)),
        "new" => ChatCommand::New,
        "lang" => match arg.to_lowercase().as_str() {
            "fr" => ChatCommand::Lang(Language::Fr),
            "ar" => ChatCommand::Lang(Language::Ar),
            _ => ChatCommand::Invalid(format!("Unknown language '{arg}' (use fr or ar)")),
        },
        "theme" => Theme::from_name(arg).map_or_else(
            || ChatCommand::Invalid(format!("Unknown theme '{arg}' (use light or dark)")),
            ChatCommand::Theme,
        ),
        "help" => ChatCommand::Help,
        "quit" | "exit" => ChatCommand::Quit,
        _ => ChatCommand::Invalid(format!("Unknown command '/{name}' (try /help)")),
    }
}

/// Runs the interactive terminal tutor.
async fn run_chat(options: ChatOptions) -> anyhow::Result<()> {
    let mut settings = Settings::load_from_file(&options.settings)?;
    if let Some(code) = options.language.as_deref() {
        settings.language = Language::from_code(Some(code.trim().to_lowercase().as_str()));
    }

    let backend: Arc<dyn TutorBackend> = if options.local {
        let config = load_config(options.config.as_deref())?;
        let model = GeminiModel::from_config(&config)?;
        Arc::new(Tutor::new(Arc::new(model)))
    } else {
        let endpoint = options
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        tracing::info!(%endpoint, "Using remote tutor endpoint");
        Arc::new(HttpTutorClient::new(endpoint)?)
    };

    let session = Arc::new(Mutex::new(Session::new(settings)));
    print_help();
    print_conversation(&*session.lock().await);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = parse_command(&line);
        tracing::debug!(?command, "Chat input");

        match command {
            ChatCommand::Send(text) => {
                session.lock().await.set_draft(text);
                send(&session, backend.as_ref(), Mode::Normal).await;
            }
            ChatCommand::Check(text) => {
                session.lock().await.set_draft(text);
                send(&session, backend.as_ref(), Mode::CheckStep).await;
            }
            ChatCommand::Similar => {
                send(&session, backend.as_ref(), Mode::SimilarExercise).await;
            }
            ChatCommand::Image(path) => match ImagePayload::load(&path) {
                Ok(image) => {
                    let mut s = session.lock().await;
                    s.attach_image(image);
                    println!("{} {}", strings(s.language()).attached, path.display());
                }
                Err(e) => println!("{e}"),
            },
            ChatCommand::New => {
                let mut s = session.lock().await;
                match s.new_exercise() {
                    Ok(()) => {
                        println!("-- {} --", strings(s.language()).new_exercise);
                        print_conversation(&s);
                    }
                    Err(e) => println!("{e}"),
                }
            }
            ChatCommand::Lang(language) => {
                let mut s = session.lock().await;
                s.set_language(language);
                save_settings(s.settings(), &options.settings);
                print_conversation(&s);
            }
            ChatCommand::Theme(theme) => {
                let mut s = session.lock().await;
                s.set_theme(theme);
                save_settings(s.settings(), &options.settings);
                println!("Theme: {theme}");
            }
            ChatCommand::Help => print_help(),
            ChatCommand::Quit => break,
            ChatCommand::Invalid(message) => println!("{message}"),
        }
    }

    Ok(())
}

/// Submits the current draft and prints the tutor's answer.
async fn send(session: &Arc<Mutex<Session>>, backend: &dyn TutorBackend, mode: Mode) {
    {
        let s = session.lock().await;
        if !s.can_submit(mode) {
            tracing::debug!(%mode, "Nothing to submit");
            return;
        }
        println!("{}", strings(s.language()).thinking);
    }

    match run_turn(session, backend, mode).await {
        Ok(reply) => print_message(&reply),
        Err(TutorError::Validation { message }) => {
            tracing::debug!(%message, "Nothing submitted");
        }
        Err(e) => println!("{e}"),
    }
}

fn save_settings(settings: Settings, path: &Path) {
    if let Err(e) = settings.save_to_file(path) {
        tracing::warn!(error = %e, path = %path.display(), "Failed to save settings");
    }
}

fn print_conversation(session: &Session) {
    println!();
    for message in session.messages() {
        print_message(message);
    }
    println!("({})", strings(session.language()).input_placeholder);
}

fn print_message(message: &Message) {
    let label = match message.role {
        Role::Tutor => "TAMARINI",
        Role::Student => "You",
    };
    println!("{label}: {}", message.text);
    if let Some(image) = &message.attached_image {
        match image.path() {
            Some(path) => println!("  [image: {} ({})]", path.display(), image.mime_type),
            None => println!("  [image: {}]", image.mime_type),
        }
    }
    println!();
}

fn print_help() {
    println!("Commands:");
    println!("  <text>              send a message");
    println!("  /check <text>       ask the tutor to check one step");
    println!("  /similar            ask for a similar exercise");
    println!("  /image <path>       attach a photo of the exercise");
    println!("  /new                start a new exercise");
    println!("  /lang <fr|ar>       switch language");
    println!("  /theme <light|dark> switch theme");
    println!("  /quit               leave");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_sent() {
        assert_eq!(
            parse_command("  3x + 2 = 11 "),
            ChatCommand::Send("3x + 2 = 11".to_string())
        );
    }

    #[test]
    fn test_empty_line_is_empty_send() {
        assert_eq!(parse_command(""), ChatCommand::Send(String::new()));
    }

    #[test]
    fn test_commands() {
        assert_eq!(
            parse_command("/check 2x = 8 so x = 4"),
            ChatCommand::Check("2x = 8 so x = 4".to_string())
        );
        assert_eq!(parse_command("/similar"), ChatCommand::Similar);
        assert_eq!(
            parse_command("/image photo.png"),
            ChatCommand::Image(PathBuf::from("photo.png"))
        );
        assert_eq!(parse_command("/NEW"), ChatCommand::New);
        assert_eq!(parse_command("/lang ar"), ChatCommand::Lang(Language::Ar));
        assert_eq!(parse_command("/theme dark"), ChatCommand::Theme(Theme::Dark));
        assert_eq!(parse_command("/quit"), ChatCommand::Quit);
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(parse_command("/lang en"), ChatCommand::Invalid(_)));
        assert!(matches!(parse_command("/theme blue"), ChatCommand::Invalid(_)));
        assert!(matches!(parse_command("/image"), ChatCommand::Invalid(_)));
        assert!(matches!(parse_command("/dance"), ChatCommand::Invalid(_)));
    }
}
