use clap::{command, Parser, Subcommand};

// ///////////// //
// CLI interface //
// ///////////// //

/// printflow2mqtt - A service that polls a resin printer host for job, door and wifi state and publishes the control panel state to a MQTT server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Commands {
    /// Polls the print host and publishes to MQTT (default).
    Run,
    /// Reads every print host endpoint once and dumps the result to stdout.
    Dump,
}
