//! `balancer` binary: runs the balancing-offset controller against the simulated site.

mod cli;
mod error_fmt;
mod logging;
mod reload;
mod run;
mod site;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    color_eyre::install()?;

    let cfg = balancer_config::load_file(&cli.config)?;
    logging::init_logging(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::info!(config = %cli.config.display(), "config loaded");

    match cli.cmd {
        Commands::Run { ticks, period_ms } => {
            let shutdown = Arc::new(AtomicBool::new(false));
            let flag = shutdown.clone();
            ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
                .map_err(|e| eyre::eyre!("install Ctrl-C handler: {e}"))?;
            run::run_balancer(
                &cfg,
                &cli.config,
                cli.profile.as_deref(),
                ticks,
                period_ms,
                cli.json,
                shutdown,
            )?;
        }
        Commands::SelfCheck => {
            let readings = run::self_check(&cfg, &cli.config, cli.profile.as_deref())?;
            run::print_readings(&readings, cli.json);
        }
    }
    Ok(())
}
