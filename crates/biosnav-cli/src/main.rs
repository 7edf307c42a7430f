//! biosnav - drive BIOS, boot device and installer menus over a serial console.

use anyhow::{bail, Context, Result};
use biosnav_cli::{config, flow, logging};
use biosnav_core::{ConsoleSession, Dialect, Menu, ReplaySession, Target, TelnetSession};
use clap::{Parser, Subcommand};
use regex::Regex;
use serde_json::json;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use config::Config;
use flow::BootFlow;
use logging::{LogConfig, LogFormat};

/// biosnav - terminal menu navigation for lab installs.
#[derive(Parser, Debug)]
#[command(name = "biosnav")]
#[command(about = "Navigate BIOS, boot device and kickstart menus over telnet")]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Override console server host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Override console server port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Override hardware identifier
    #[arg(long, global = true)]
    hardware: Option<String>,

    /// Enable verbose logging (every key press)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug logging (parse results)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace logging (raw session traffic)
    #[arg(long, global = true)]
    trace: bool,

    /// Quiet mode (WARN and ERROR only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Set log level for specific targets (e.g., "nav=debug" or "session=trace").
    /// Can be specified multiple times. Targets are prefixed with "biosnav::" automatically.
    #[arg(long = "log", value_name = "TARGET=LEVEL", global = true)]
    log_overrides: Vec<String>,

    /// Log output format
    #[arg(long = "log-format", value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a captured console transcript and print the options found
    Inspect {
        /// Dialect to parse with (e.g. "pxe-kickstart", "boot-device")
        #[arg(long, conflicts_with = "hardware_id")]
        dialect: Option<Dialect>,

        /// Resolve the BIOS dialect from a hardware identifier instead
        #[arg(long = "bios", value_name = "HARDWARE")]
        hardware_id: Option<String>,

        /// Transcript file
        transcript: PathBuf,
    },

    /// Select one option in a single menu
    Select {
        /// Dialect of the menu on screen
        #[arg(long)]
        dialect: Dialect,

        /// Option index
        #[arg(long, conflicts_with_all = ["pattern", "request"])]
        index: Option<usize>,

        /// Regex searched in option labels
        #[arg(long, conflicts_with = "request")]
        pattern: Option<String>,

        /// Kickstart request ("cpe", "standard", "lowlat", "security")
        #[arg(long)]
        request: Option<String>,

        /// Replay this transcript instead of connecting
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },

    /// Run the full boot flow: POST hot key, boot device, installer entry
    Boot {
        /// Replay this transcript instead of connecting
        #[arg(long, value_name = "FILE")]
        transcript: Option<PathBuf>,
    },
}

/// Either a live console or a captured one.
enum Console {
    Telnet(TelnetSession<TcpStream>),
    Replay(ReplaySession),
}

impl Console {
    fn open(config: &Config, transcript: Option<&Path>) -> Result<Self> {
        match transcript {
            Some(path) => Ok(Console::Replay(ReplaySession::new(read_transcript(path)?))),
            None => {
                let console = &config.console;
                let session = TelnetSession::connect(&console.host, console.port, console.connect_timeout())
                    .with_context(|| format!("Failed to connect to {}:{}", console.host, console.port))?;
                Ok(Console::Telnet(session))
            }
        }
    }

    fn session(&mut self) -> &mut dyn ConsoleSession {
        match self {
            Console::Telnet(session) => session,
            Console::Replay(session) => session,
        }
    }

    /// Keys sent during a replay, escaped for display.
    fn replayed_keys(&self) -> Option<String> {
        match self {
            Console::Replay(session) => Some(String::from_utf8_lossy(session.written()).escape_debug().to_string()),
            Console::Telnet(_) => None,
        }
    }
}

fn read_transcript(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read transcript {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig::from_cli(
        cli.verbose,
        cli.debug,
        cli.trace,
        cli.quiet,
        cli.log_overrides,
        cli.log_format,
    );
    logging::init(&log_config);

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(host) = cli.host {
        config.console.host = host;
    }
    if let Some(port) = cli.port {
        config.console.port = port;
    }
    if let Some(hardware) = cli.hardware {
        config.hardware = Some(hardware);
    }

    tracing::info!(
        target: "biosnav::startup",
        "Loaded configuration (console: {}:{}, hardware: {:?})",
        config.console.host,
        config.console.port,
        config.hardware
    );

    match cli.command {
        Command::Inspect {
            dialect,
            hardware_id,
            transcript,
        } => inspect(&config, dialect, hardware_id.as_deref(), &transcript),
        Command::Select {
            dialect,
            index,
            pattern,
            request,
            transcript,
        } => {
            let mut console = Console::open(&config, transcript.as_deref())?;
            let mut menu = Menu::new(dialect)
                .with_navigation(config.navigation.navigation_config())
                .with_parse_timeout(config.navigation.parse_timeout())
                .with_profile(config.install.profile());

            let option = match (index, pattern, request) {
                (_, _, Some(request)) => menu.select_request(console.session(), &request)?,
                (Some(index), _, _) => menu.select(console.session(), &Target::Index(index))?,
                (_, Some(pattern), _) => {
                    let re = Regex::new(&pattern).with_context(|| format!("Invalid pattern '{}'", pattern))?;
                    menu.select(console.session(), &Target::Matches(re))?
                }
                (None, None, None) => bail!("Pass one of --index, --pattern or --request"),
            };

            print_json(&json!({
                "menu": menu.name(),
                "selected": option,
                "keys": console.replayed_keys(),
            }))
        }
        Command::Boot { transcript } => {
            let mut console = Console::open(&config, transcript.as_deref())?;
            let report = BootFlow::new(&config).run(console.session())?;
            print_json(&json!({
                "selections": report.selections,
                "keys": console.replayed_keys(),
            }))
        }
    }
}

fn inspect(config: &Config, dialect: Option<Dialect>, hardware_id: Option<&str>, transcript: &Path) -> Result<()> {
    let dialect = match (dialect, hardware_id.or(config.hardware.as_deref())) {
        (Some(dialect), _) => dialect,
        (None, Some(hardware)) => Dialect::for_hardware(hardware)?,
        (None, None) => bail!("Pass --dialect or --bios <HARDWARE>"),
    };

    let buffer = read_transcript(transcript)?;
    let mut menu = Menu::new(dialect).with_profile(config.install.profile());
    menu.load_buffer(&buffer);

    print_json(&json!({
        "dialect": dialect.to_string(),
        "menu": menu.name(),
        "options": menu.options(),
        "highlighted": menu.observed_index(),
        "sub_menus": menu.sub_menus().iter().map(|m| m.name()).collect::<Vec<_>>(),
    }))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
