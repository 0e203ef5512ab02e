use streamjoin_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    let target = logging::init();
    tracing::debug!(?target, "logging initialized");

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("streamjoin error: {:#}", err);
        std::process::exit(1);
    }
}
