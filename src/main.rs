use anyhow::Result;
use clap::Parser;
use padsync::cli::{self, Cli};
use tokio::runtime::Runtime;

fn main() -> Result<()> {
    let args = Cli::parse();

    let config = match cli::load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("padsync: error: {e:#}");
            std::process::exit(1);
        }
    };

    // CLI --log-level flag takes highest precedence, then RUST_LOG, then config.
    let rust_log = std::env::var("RUST_LOG").ok();
    padsync::debug::init_log_bridge(padsync::debug::resolve_level(
        args.log_level,
        rust_log.as_deref(),
        config.log_level,
    ));
    log::info!("Starting padsync {}", padsync::VERSION);

    let runtime = Runtime::new()?;
    let result = cli::build_session(&config)
        .and_then(|session| runtime.block_on(cli::run_command(&session, args.command)));

    // Don't let a hung request keep the process alive
    runtime.shutdown_timeout(std::time::Duration::from_secs(2));

    if let Err(ref e) = result {
        log::error!("Command failed: {e:#}");
        eprintln!("padsync: error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
