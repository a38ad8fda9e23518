use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vigil",
    about = "Vigil: alarm state, settings, and a durable journal",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the TOML config file (default: vigil.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register an alarm in the recovered state
    Register(RegisterArgs),
    /// Throw an alarm
    Throw(AlarmArgs),
    /// Recover an alarm
    Recover(AlarmArgs),
    /// Show the state of one alarm
    Check(AlarmArgs),
    /// List every alarm
    List,
    /// Append a line to the journal
    Log(LogArgs),
    /// Read or write a setting
    Setting(SettingArgs),
}

#[derive(Args)]
pub struct RegisterArgs {
    pub name: String,
    pub id: i32,
}

#[derive(Args)]
pub struct AlarmArgs {
    pub name: String,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(required = true)]
    pub words: Vec<String>,
}

#[derive(Args)]
pub struct SettingArgs {
    #[command(subcommand)]
    pub action: SettingAction,
}

#[derive(Subcommand)]
pub enum SettingAction {
    Get { key: String },
    Set { key: String, value: String },
}
