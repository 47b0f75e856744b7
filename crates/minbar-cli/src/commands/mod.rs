mod count;
mod run;
mod sessions;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Run(args) => run::run(args),
        Command::Count(args) => count::run(args),
        Command::Sessions(args) => sessions::run(args),
    }
}
