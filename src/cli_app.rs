//! Top-level CLI definition and dispatch.

use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use parking_lot::Mutex;
use serde_json::{Value, json};
use thiserror::Error;

use termscope::browser::encoding::Encoding;
use termscope::browser::fetcher::HttpTermSource;
use termscope::browser::render;
use termscope::browser::runtime::{BrowserProps, TermBrowser};
use termscope::core::config::Config;
use termscope::core::errors::TermscopeError;
use termscope::logger::activity::ActivityLog;

/// Browse the term dictionary of a search index field.
#[derive(Debug, Parser)]
#[command(
    name = "termscope",
    author,
    version,
    about = "Term dictionary browser",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the backend base URL.
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Write the JSONL activity log to this path.
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Browse the terms of one field in one segment.
    Browse(BrowseArgs),
    /// List the supported term encodings.
    Encodings,
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct BrowseArgs {
    /// Segment identifier.
    #[arg(long, value_name = "ID")]
    segment: u32,
    /// Field name.
    #[arg(long, value_name = "NAME")]
    field: String,
    /// Switch to this encoding after the first page loads.
    #[arg(long, value_name = "TAG", value_parser = parse_encoding)]
    encoding: Option<Encoding>,
    /// Number of additional pages to load.
    #[arg(long, default_value_t = 0, value_name = "N")]
    pages: usize,
    /// Rows per page (overrides browse.page_size).
    #[arg(long, value_name = "N")]
    page_size: Option<usize>,
    /// Read commands from stdin: more, enc <tag>, show, quit.
    #[arg(long)]
    interactive: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Config operation to run.
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Subcommand)]
enum ConfigCommand {
    /// Print resolved config file path.
    Path,
    /// Print effective merged configuration.
    Show,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input or configuration.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

impl From<TermscopeError> for CliError {
    fn from(error: TermscopeError) -> Self {
        match error {
            TermscopeError::InvalidConfig { .. }
            | TermscopeError::MissingConfig { .. }
            | TermscopeError::ConfigParse { .. }
            | TermscopeError::InvalidRequest { .. } => Self::User(error.to_string()),
            other => Self::Runtime(other.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Browse(args) => run_browse(cli, args),
        Command::Encodings => run_encodings(cli),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Config resolution
// ---------------------------------------------------------------------------

/// Load config and fold in flag overrides, validating the result as a whole.
fn effective_config(cli: &Cli, page_size: Option<usize>) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(page_size) = page_size {
        config.browse.page_size = page_size;
    }
    if let Some(base_url) = &cli.base_url {
        config.server.base_url.clone_from(base_url);
    }
    if let Some(log_file) = &cli.log_file {
        config.logging.enabled = true;
        config.logging.jsonl_path.clone_from(log_file);
    }
    config.validate()?;
    Ok(config)
}

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match &args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = effective_config(cli, None)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", config.to_toml()?);
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                        "hash": config.stable_hash()?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Encodings
// ---------------------------------------------------------------------------

fn run_encodings(cli: &Cli) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Human => {
            println!("  {:<8}  {}", "Tag", "Decodes terms as");
            println!("  {}", "-".repeat(40));
            for encoding in Encoding::all() {
                println!("  {:<8}  {}", encoding.tag(), encoding.label());
            }
        }
        OutputMode::Json => {
            let encodings: Vec<Value> = Encoding::all()
                .iter()
                .map(|e| json!({ "tag": e.tag(), "label": e.label() }))
                .collect();
            write_json_line(&json!({
                "command": "encodings",
                "encodings": encodings,
            }))?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Browse
// ---------------------------------------------------------------------------

/// Command read from stdin in interactive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InteractiveCommand {
    More,
    Encoding(Encoding),
    Show,
    Quit,
}

fn parse_interactive(line: &str) -> Result<Option<InteractiveCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };
    let cmd = match (head, words.next()) {
        ("more" | "m", None) => InteractiveCommand::More,
        ("show" | "s", None) => InteractiveCommand::Show,
        ("quit" | "q" | "exit", None) => InteractiveCommand::Quit,
        ("enc" | "encoding", Some(tag)) => InteractiveCommand::Encoding(parse_encoding(tag)?),
        ("enc" | "encoding", None) => return Err("usage: enc <tag>".to_string()),
        _ => return Err(format!("unknown command: {}", line.trim())),
    };
    if words.next().is_some() {
        return Err(format!("unexpected arguments: {}", line.trim()));
    }
    Ok(Some(cmd))
}

fn parse_encoding(raw: &str) -> Result<Encoding, String> {
    raw.parse::<Encoding>().map_err(|e| e.to_string())
}

fn run_browse(cli: &Cli, args: &BrowseArgs) -> Result<(), CliError> {
    let config = effective_config(cli, args.page_size)?;
    let mode = output_mode(cli);
    // One request timeout plus slack for the worker hand-off.
    let wait_budget = config.server.request_timeout() + Duration::from_secs(1);

    let source = HttpTermSource::new(
        config.server.url()?,
        config.server.connect_timeout(),
        config.server.request_timeout(),
    )?;
    let alerts = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&alerts);
    let props = BrowserProps::new(args.segment, args.field.clone())
        .with_page_size(config.browse.page_size);
    let mut browser = TermBrowser::new(props, Arc::new(source), move |msg: &str| {
        eprintln!("{} {msg}", "alert:".red().bold());
        sink.lock().push(msg.to_owned());
    })?
    .with_activity_log(ActivityLog::open(&config.logging));

    browser.mount()?;
    settle(&mut browser, wait_budget)?;

    let initial = args.encoding.or_else(|| {
        (config.browse.default_encoding != Encoding::Utf8).then_some(config.browse.default_encoding)
    });
    if let Some(encoding) = initial {
        browser.change_encoding(encoding)?;
        settle(&mut browser, wait_budget)?;
    }

    for _ in 0..args.pages {
        if !browser.state().has_more {
            break;
        }
        browser.load_more()?;
        settle(&mut browser, wait_budget)?;
    }

    if args.interactive {
        emit_view(mode, &browser, &alerts)?;
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let line = line?;
            match parse_interactive(&line) {
                Ok(None) => {}
                Ok(Some(InteractiveCommand::Quit)) => break,
                Ok(Some(InteractiveCommand::Show)) => emit_view(mode, &browser, &alerts)?,
                Ok(Some(InteractiveCommand::More)) => {
                    if browser.state().has_more {
                        browser.load_more()?;
                        settle(&mut browser, wait_budget)?;
                    } else {
                        eprintln!("{}", "no more terms".yellow());
                    }
                    emit_view(mode, &browser, &alerts)?;
                }
                Ok(Some(InteractiveCommand::Encoding(encoding))) => {
                    browser.change_encoding(encoding)?;
                    settle(&mut browser, wait_budget)?;
                    emit_view(mode, &browser, &alerts)?;
                }
                Err(message) => eprintln!("{}", message.yellow()),
            }
        }
    } else {
        emit_view(mode, &browser, &alerts)?;
    }

    browser.unmount();
    Ok(())
}

/// Wait for the outstanding fetch, failing if the backend never answers.
fn settle(browser: &mut TermBrowser, budget: Duration) -> Result<(), CliError> {
    if browser.wait(budget)? {
        Ok(())
    } else {
        Err(CliError::Runtime(format!(
            "backend did not answer within {}ms",
            budget.as_millis()
        )))
    }
}

fn emit_view(
    mode: OutputMode,
    browser: &TermBrowser,
    alerts: &Mutex<Vec<String>>,
) -> Result<(), CliError> {
    match mode {
        OutputMode::Human => {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", render::render(browser.state(), browser.phase()))?;
            stdout.flush()?;
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "browse",
                "phase": browser.phase().label(),
                "state": serde_json::to_value(browser.state())?,
                "alerts": alerts.lock().clone(),
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Output helpers
// ---------------------------------------------------------------------------

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("TERMSCOPE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
