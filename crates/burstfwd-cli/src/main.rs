use burstfwd_core::logging;

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Log file under the state dir, stderr if that is not writable.
    logging::init();

    if let Err(err) = CliCommand::run_from_args().await {
        eprintln!("burstfwd error: {:#}", err);
        std::process::exit(1);
    }
}
