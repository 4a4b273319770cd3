use anyhow::Result;
use clap::Parser;
use swiftmock::{Cli, Commands, logging};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `generate` installs logging itself once the config file's level is known
    if !matches!(cli.command, Commands::Generate(_)) {
        logging::init(None);
    }

    cli.command.execute()
}
