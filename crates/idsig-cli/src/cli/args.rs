use clap::{Parser, Subcommand, ValueEnum};

use super::commands::{inspect::InspectArgs, verify::VerifyArgs};

#[derive(Parser, Debug)]
#[command(
    name = "idsig",
    version,
    about = "Verify APK Signature Scheme v4 signature files"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

impl Cli {
    /// Whether the command asked for exit-code-only output.
    pub fn is_quiet(&self) -> bool {
        match &self.cmd {
            Command::Verify(args) => args.quiet,
            Command::Inspect(_) => false,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Verify the v4 signature of a package
    Verify(VerifyArgs),
    /// Decode a v4 signature file without verifying it
    Inspect(InspectArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parse a block id given as decimal or `0x`-prefixed hex.
pub fn parse_block_id(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(&hex.replace('_', ""), 16),
        None => raw.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid block id '{raw}': {e}"))
}
