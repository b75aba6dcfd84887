use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use feedvisor::{Config, Daemon, LogWriter, LoggingConfig, Subscribe};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Compiles kafkafeeder fragments into worker configuration and supervises the worker.
#[derive(Debug, Parser)]
#[command(name = "feedvisor", version, about)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "PATH")]
    config: PathBuf,
}

fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if cfg.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let cfg = match Config::from_file(&args.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("feedvisor: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&cfg.logging);
    info!(config = %args.config.display(), "starting");

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    match Daemon::builder(cfg).with_subscribers(subs).build().run().await {
        Ok(()) => {
            info!("stopped");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(label = err.as_label(), "{err}");
            ExitCode::FAILURE
        }
    }
}
