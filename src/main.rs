//! gpgreport command line interface
//!
//! Analyzes OpenPGP engine results and manages the local key snapshot.

use gpgreport::cli;
use gpgreport::config::DEFAULT_LOG_FILTER;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter};

fn main() {
    // Initialize tracing; RUST_LOG wins over the configured filter
    let env_filter = EnvFilter::try_from_default_env().ok();
    let filter_pinned = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let invocation = match cli::args::parse_args() {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!("Error: {}", e);
            cli::args::print_usage();
            std::process::exit(2);
        }
    };

    let config = match cli::load_config(&invocation.options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    if !filter_pinned {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.log_filter)) {
            warn!(error = %e, "Could not apply configured log filter");
        }
    }

    if let Err(e) = cli::run(invocation.command, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
