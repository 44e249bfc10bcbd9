use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use reportpack_core::ReportPacks;
use tracing_subscriber::EnvFilter;

mod config;
mod table;

use config::{Overrides, SettingsFile};

#[derive(Debug, Parser)]
#[command(
    name = "manage-reports",
    about = "Watch4net ReportPack CLI management utility",
    after_help = "The single-dash spellings -id, -name and -file are accepted as --id, --name and --file."
)]
struct Cli {
    /// Logging level: debug, info, warning or error (RUST_LOG wins when set)
    #[arg(short = 'd', long = "debug", default_value = "info", global = true)]
    debug: String,

    /// Config file with credentials and the reports directory
    #[arg(short = 'c', long = "conf", default_value = "config.yaml", global = true)]
    conf: PathBuf,

    /// Platform hostname or IP address (overrides the config file)
    #[arg(short = 'H', long = "host", global = true)]
    host: Option<String>,

    /// Platform username (overrides the config file)
    #[arg(short = 'u', long = "user", global = true)]
    user: Option<String>,

    /// Platform password (overrides the config file)
    #[arg(short = 'p', long = "pass", global = true)]
    pass: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show all report packs
    List,
    /// Show the currently pinned report packs
    Pinned,
    /// Download the specified report pack
    Get {
        /// Report pack id
        #[arg(long)]
        id: u64,
        /// Unpack the report pack after download
        #[arg(short = 'x')]
        extract: bool,
    },
    /// Upload a report pack directory or an .arp file
    #[command(group(ArgGroup::new("source").required(true).args(["name", "file"])))]
    Put {
        /// Name of a report pack directory to build and upload
        #[arg(long)]
        name: Option<String>,
        /// Existing .arp file to upload
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Build a report pack directory into an .arp file
    Build {
        /// Name of the report pack to build
        #[arg(long)]
        name: String,
    },
    /// Delete the specified report pack
    Remove {
        /// Report pack id
        #[arg(long)]
        id: u64,
    },
}

/// Single-dash spellings kept working for existing scripts.
const LEGACY_FLAGS: [(&str, &str); 3] = [("-id", "--id"), ("-name", "--name"), ("-file", "--file")];

/// Options whose next argument is a value and must never be rewritten.
const VALUE_OPTIONS: [&str; 13] = [
    "-d", "--debug", "-c", "--conf", "-H", "--host", "-u", "--user", "-p", "--pass", "--id",
    "--name", "--file",
];

fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    let mut normalized = Vec::new();
    let mut value_expected = false;
    for arg in args {
        if value_expected {
            value_expected = false;
            normalized.push(arg);
            continue;
        }
        let rewritten = arg.to_str().and_then(|text| {
            LEGACY_FLAGS.iter().find_map(|(legacy, long)| {
                if text == *legacy {
                    Some(long.to_string())
                } else {
                    text.strip_prefix(legacy)
                        .and_then(|rest| rest.strip_prefix('='))
                        .map(|value| format!("{long}={value}"))
                }
            })
        });
        let arg = rewritten.map(OsString::from).unwrap_or(arg);
        value_expected = arg.to_str().is_some_and(|text| VALUE_OPTIONS.contains(&text));
        normalized.push(arg);
    }
    normalized
}

fn main() {
    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));
    init_logging(&cli.debug);
    if let Err(err) = run(cli) {
        tracing::error!(error = %format!("{err:#}"), "command failed");
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let level = match level.to_ascii_lowercase().as_str() {
        "warning" => "warn".to_string(),
        "critical" => "error".to_string(),
        other => other.to_string(),
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = SettingsFile::load_optional(&cli.conf)?;
    let config = settings.into_client_config(Overrides {
        hostname: cli.host,
        username: cli.user,
        password: cli.pass,
    })?;
    tracing::debug!(
        conf = %cli.conf.display(),
        hostname = %config.hostname,
        username = %config.username,
        reports = %config.reports_path.display(),
        timeout = ?config.timeout,
        "platform configuration loaded"
    );

    let mut packs = ReportPacks::connect(&config).context("failed to set up platform client")?;
    match cli.command {
        Command::List => {
            println!("{}", table::render(&packs.list()?));
        }
        Command::Pinned => {
            println!("{}", table::render(&packs.pinned()?));
        }
        Command::Get { id, extract } => {
            let fetched = packs.get(id, extract)?;
            tracing::info!(
                id = fetched.id,
                name = %fetched.name,
                file = %fetched.archive.display(),
                "report pack downloaded"
            );
            if let Some(dir) = fetched.unpacked {
                tracing::info!(directory = %dir.display(), "report pack unpacked");
            }
        }
        Command::Put { name, file } => {
            let stored = match (name, file) {
                (Some(name), _) => packs
                    .put_named(&name)
                    .with_context(|| format!("report pack '{name}' cannot be created"))?,
                (None, Some(file)) => packs.put_file(&file)?,
                (None, None) => anyhow::bail!("either --name or --file is required"),
            };
            tracing::info!(id = stored.id, name = %stored.name, "report pack successfully uploaded");
        }
        Command::Build { name } => {
            let archive = packs
                .build(&name)
                .with_context(|| format!("report pack '{name}' cannot be created"))?;
            tracing::info!(name = %name, archive = %archive.display(), "report pack successfully built");
        }
        Command::Remove { id } => {
            let removed = packs.remove(id)?;
            tracing::info!(id = removed.id, name = %removed.name, "report pack deleted");
        }
    }
    Ok(())
}
