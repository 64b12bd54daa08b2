use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noveliser::cli::commands;
use noveliser::cli::commands::write::WriteOptions;
use noveliser::storage::RunStatus;

/// Parse run status from string
fn parse_status(s: &str) -> Result<RunStatus, String> {
    s.parse()
}

#[derive(Parser)]
#[command(name = "noveliser")]
#[command(version, about = "Resumable novel generation from a one-line description")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a new novel from a description
    Write {
        #[arg(help = "What the story is about")]
        description: String,
        #[arg(long, help = "Number of chapters")]
        chapters: Option<u32>,
        #[arg(long, help = "Sections per chapter")]
        sections: Option<u32>,
        #[arg(long, short, help = "Engine as provider:model (e.g. ollama:gpt-oss:20b)")]
        model: Option<String>,
        #[arg(long, short, help = "Author name for the manuscript")]
        author: Option<String>,
        #[arg(long, short, help = "Root directory for runs")]
        output: Option<PathBuf>,
        #[arg(long, help = "Replace an existing run with the same title")]
        overwrite: bool,
    },

    /// Resume an unfinished run (latest one by default)
    Resume {
        #[arg(long, short, help = "Run title", conflicts_with = "dir")]
        title: Option<String>,
        #[arg(long, short, help = "Run working directory")]
        dir: Option<PathBuf>,
        #[arg(long, short, help = "Root directory for runs")]
        output: Option<PathBuf>,
    },

    /// List runs
    List {
        #[arg(long, short, value_parser = parse_status, help = "ongoing, finished or failed")]
        status: Option<RunStatus>,
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json"
        )]
        format: String,
        #[arg(long, short, help = "Root directory for runs")]
        output: Option<PathBuf>,
    },

    /// Inspect or clear the fingerprint cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
        #[arg(long, short, global = true, help = "Root directory for runs")]
        output: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry count and size
    Stats,
    /// Delete every entry
    Clear,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mNoveliser encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            if let Some(err) = e.downcast_ref::<noveliser::NovelError>() {
                if let Some(hint) = err.hint() {
                    eprintln!("\x1b[90mHint: {}\x1b[0m", hint);
                }
                if let Some(wait) = err.retry_after() {
                    eprintln!("\x1b[90mRetry after: {}s\x1b[0m", wait.as_secs());
                }
            }
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "noveliser=debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Write {
            description,
            chapters,
            sections,
            model,
            author,
            output,
            overwrite,
        } => {
            commands::write::run(WriteOptions {
                description,
                chapters,
                sections,
                model,
                author,
                output,
                overwrite,
                quiet: cli.quiet,
            })?;
        }
        Commands::Resume { title, dir, output } => {
            commands::resume::run(title, dir, output, cli.quiet)?;
        }
        Commands::List {
            status,
            format,
            output,
        } => {
            commands::list::run(status, &format, output)?;
        }
        Commands::Cache { action, output } => match action {
            CacheAction::Stats => commands::cache::stats(output)?,
            CacheAction::Clear => commands::cache::clear(output)?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(&format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}
