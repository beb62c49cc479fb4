use std::error::Error;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use vantage_core::host::ScriptedHost;
use vantage_core::OutputMultiplexer;
use vantage_dash::{CommandOutcome, CommandTable, Dashboard, DashboardConfig};
use vantage_utils::{debug, info, init_logging, init_logging_to_file, init_logging_with_level, warn, LogFormat, LogLevel, LoggingGuard};

/// A register and disassembly dashboard that renders on every debugger stop.
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version)]
#[command(about = "A register and disassembly dashboard that renders on every debugger stop", long_about = None)]
struct Cli
{
    #[command(subcommand)]
    command: Commands,

    /// Log level (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    /// Log to stderr instead of ~/.vantage
    #[arg(long, global = true, default_value_t = false)]
    console_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands
{
    /// Replay a recorded session through the dashboard, one render per stop
    Replay
    {
        /// Session file (JSON)
        session: PathBuf,
        /// Dashboard configuration to apply before the first stop
        #[arg(long)]
        config: Option<PathBuf>,
        /// Print the configuration tree after the last stop
        #[arg(long, default_value_t = false)]
        dump_config: bool,
    },
    /// Print the default configuration tree as JSON
    Config,
}

fn main()
{
    let cli = Cli::parse();

    let _guard = match start_logging(cli.console_logs, cli.log_level) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = run_command(cli.command) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn start_logging(console: bool, level: Option<LogLevel>) -> Result<LoggingGuard, Box<dyn Error>>
{
    let guard = match (console, level) {
        (true, Some(level)) => init_logging_with_level(level, LogFormat::Pretty)?,
        (true, None) => init_logging()?,
        (false, level) => {
            let (path, guard) = init_logging_to_file(level)?;
            debug!(path = %path.display(), "logging to file");
            guard
        }
    };
    Ok(guard)
}

fn run_command(command: Commands) -> Result<(), Box<dyn Error>>
{
    match command {
        Commands::Replay {
            session,
            config,
            dump_config,
        } => replay(&session, config.as_deref(), dump_config),
        Commands::Config => {
            let dashboard = Dashboard::new(OutputMultiplexer::new());
            println!("{}", dashboard.config().to_json()?);
            Ok(())
        }
    }
}

fn replay(session: &Path, config: Option<&Path>, dump_config: bool) -> Result<(), Box<dyn Error>>
{
    let mut host = ScriptedHost::load(session)?;
    info!(session = %session.display(), stops = host.stop_count(), "replaying session");

    let mut dashboard = Dashboard::new(OutputMultiplexer::new());
    if let Some(path) = config {
        dashboard.apply_config(&DashboardConfig::load(path)?)?;
        info!(config = %path.display(), "applied dashboard configuration");
    }
    let table = CommandTable::standard();

    if host.stop_count() == 0 {
        warn!("session has no stops");
    } else {
        loop {
            for line in host.commands().to_vec() {
                match table.execute(&mut dashboard, &line) {
                    Ok(CommandOutcome::Print(text)) => println!("{text}"),
                    Ok(CommandOutcome::Redraw | CommandOutcome::Done) => {}
                    Err(e) => eprintln!("{line}: {e}"),
                }
            }

            let report = dashboard.render(&host)?;
            debug!(stop = ?host.current_stop(), rendered = report.rendered.len(), failed = report.failed.len(), "stop rendered");

            if !host.advance() {
                break;
            }
        }
    }

    if dump_config {
        println!("{}", dashboard.config().to_json()?);
    }
    Ok(())
}
