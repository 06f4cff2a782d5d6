//! `watchdog` binary entry point.

use clap::Parser;

use tcp_watchdog::cli_app::{self, Cli};

fn main() {
    let cli = Cli::parse();
    if let Err(err) = cli_app::run(&cli) {
        eprintln!("watchdog: {err}");
        if err.is_retryable() {
            eprintln!("watchdog: this failure may be transient; retrying may succeed");
        }
        std::process::exit(1);
    }
}
