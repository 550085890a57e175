use std::process;

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use mindboard::cli::commands::execute_command;
use mindboard::cli::output;
use mindboard::cli::Cli;
use mindboard::exitcode;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.debug);

    if let Err(e) = execute_command(&cli) {
        output::error(&e);
        process::exit(e.exit_code());
    }
    process::exit(exitcode::OK);
}

/// Installs the stderr log layer. `-d` raises the default level; `RUST_LOG` wins when set.
fn setup_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        3 => LevelFilter::TRACE,
        _ => {
            eprintln!("verbosity tops out at -ddd");
            LevelFilter::TRACE
        }
    };

    // the config crate traces every key lookup
    let quiet_config = filter_fn(|metadata| !metadata.target().starts_with("config"));
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let span_events = if verbosity >= 3 {
        FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbosity >= 2)
        .with_span_events(span_events)
        .with_filter(quiet_config)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(layer).init();
    tracing::debug!(verbosity, "logging ready");
}
