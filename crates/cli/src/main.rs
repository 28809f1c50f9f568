use clap::Parser;
use tracing::error;

mod cli;
mod demo;
mod logging;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let result = match cli.command {
		Commands::Demo { store, interface } => demo::run(store, &interface).await,
		Commands::Normalize { address } => {
			println!("{}", skybridge_runtime::normalize_address(&address));
			Ok(())
		}
	};

	if let Err(err) = result {
		error!(target: "skybridge", error = %err, "command failed");
		std::process::exit(1);
	}
}
