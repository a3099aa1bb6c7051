//! logrelay: pseudonymize a web server's access-log pipe for analytics.
//!
//! Reads `ip|user_agent|timestamp|request|status|bytes|referrer` lines,
//! writes tokenized combined-log lines to the tracked file and loopback
//! traffic verbatim to the untracked file. SIGHUP reopens both outputs.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use logrelay_core::{
    open_input, pseudonym, OutputRouter, RelayConfig, RotationCoordinator, RotationRequests, RotationWatcher,
    StreamPump,
};

#[derive(Parser, Debug)]
#[command(name = "logrelay", version, about = "Privacy-preserving access-log relay")]
struct Cli {
    /// JSON config file (falls back to $LOGRELAY_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Input stream, usually a named pipe; `-` for stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output file for pseudonymized analytics lines
    #[arg(long)]
    tracked: Option<PathBuf>,

    /// Output file for internal (loopback) traffic
    #[arg(long)]
    untracked: Option<PathBuf>,

    /// Low-assurance mode: use a well-known salt when $SALT is unset
    #[arg(long)]
    allow_fallback_salt: bool,

    /// Skip fsync after each line
    #[arg(long)]
    no_sync: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn apply(self, cfg: &mut RelayConfig) {
        if let Some(p) = self.input {
            cfg.input_path = p;
        }
        if let Some(p) = self.tracked {
            cfg.tracked_path = p;
        }
        if let Some(p) = self.untracked {
            cfg.untracked_path = p;
        }
        if self.allow_fallback_salt {
            cfg.fallback_salt_allowed = true;
        }
        if self.no_sync {
            cfg.sync_writes = false;
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let msg = format!("{:#}", e);
            error!(error = %msg, "logrelay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut cfg = RelayConfig::load(cli.config.as_deref())?;
    cli.apply(&mut cfg);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %cfg.input_path.display(),
        fallback_salt_allowed = cfg.fallback_salt_allowed,
        "logrelay starting"
    );

    let salts = pseudonym::from_config(&cfg)?;
    let router = Arc::new(OutputRouter::open(&cfg)?);

    let coordinator = Arc::new(RotationCoordinator::from_config(Arc::clone(&router), &cfg));
    let watcher = RotationWatcher::spawn(
        coordinator,
        RotationRequests::sighup(),
        Duration::from_millis(cfg.rotation_poll_ms.max(1)),
    )?;

    let input = open_input(&cfg)?;
    let stats = StreamPump::new(salts, router).run(input);
    watcher.shutdown();

    info!(accepted = stats.accepted(), written = stats.written(), "logrelay stopped");
    Ok(())
}
