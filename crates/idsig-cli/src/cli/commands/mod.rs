pub mod inspect;
pub mod verify;

use super::args::{Cli, Command};

/// Run a parsed command line and return the process exit code.
pub fn dispatch(cli: Cli) -> i32 {
    match cli.cmd {
        Command::Verify(args) => verify::cmd_verify(&args),
        Command::Inspect(args) => inspect::cmd_inspect(&args),
    }
}
