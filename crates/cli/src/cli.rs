use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "skybridge")]
#[command(about = "In-page identity broker - demo harness")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Run a scripted login/call/logout cycle against an in-process provider
	Demo {
		/// Persist provider records to this JSON file between runs
		#[arg(long, value_name = "FILE")]
		store: Option<PathBuf>,

		/// Interface name to log the provider in under
		#[arg(long, default_value = "identity")]
		interface: String,
	},

	/// Print the normalized form of a provider address
	Normalize {
		/// Address as the router would post it
		address: String,
	},
}
