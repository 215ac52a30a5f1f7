use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use directline_broker::config::loader::{self, ConfigOverrides};
use directline_broker::config::proc_validator;
use directline_broker::server;
use directline_broker::utils::logging::{self, LogLevel};
use tracing::{debug, error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// optional YAML file; environment variables override its values
    #[arg(short, long, env = "CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Make preparations
    //
    // read .env, then env/flags
    // -------------------------------

    let dotenv = dotenvy::dotenv().ok();
    let args = Args::parse();

    // -------------------------------
    // 2. Build the immutable config
    // -------------------------------

    let loaded = loader::run(args.config.as_deref(), &args.overrides).await;

    // logging settings may live in the file; fall back to defaults + flags if it is broken
    let logging_config = match &loaded {
        Ok(cfg) => cfg.logging.clone(),
        Err(_) => loader::bootstrap_logging(&args.overrides),
    };
    logging::run(&logging_config, args.log_level);
    if let Some(path) = dotenv {
        debug!("loaded environment from {}", path.display());
    }
    let service_config = loaded.inspect_err(|e| error!("failed to load config: {:#}", e))?;

    // -------------------------------
    // 3. Report missing settings; they fail on first use, not here
    // -------------------------------

    proc_validator::validate_service_config(&service_config).await;

    // -------------------------------
    // 4. Start http server
    // -------------------------------

    info!("Service starting...");
    server::server::start(Arc::new(service_config)).await
}
