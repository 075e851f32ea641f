use std::process::ExitCode;

use clap::Parser;
use keypool::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => cli::serve::run().await,
        Command::Issue(args) => cli::keys::issue(args).await,
        Command::Sweep => cli::keys::sweep().await,
        Command::List(args) => cli::keys::list(args).await,
        Command::Check(args) => cli::keys::check(args).await,
    }
}
