use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use vigil_alarms::{
    AlarmCoordinator, AlarmError, AlarmState, JsonFileAlarmStore, Registration, TransitionOutcome,
};
use vigil_cli::{JournalNotifier, VigilConfig};
use vigil_journal::{Journal, Submission};
use vigil_settings::{JsonFileSettingsStore, SettingsService};

use crate::cli::*;

pub async fn run_command(command: Command, config: &VigilConfig, journal: &Journal) -> anyhow::Result<()> {
    match command {
        Command::Register(args) => cmd_register(args, config, journal),
        Command::Throw(args) => cmd_transition(args, AlarmState::Thrown, config, journal),
        Command::Recover(args) => cmd_transition(args, AlarmState::Recovered, config, journal),
        Command::Check(args) => cmd_check(args, config, journal),
        Command::List => cmd_list(config, journal),
        Command::Log(args) => cmd_log(args, journal),
        Command::Setting(args) => cmd_setting(args, config).await,
    }
}

fn open_coordinator(config: &VigilConfig, journal: &Journal) -> anyhow::Result<AlarmCoordinator> {
    let store = Arc::new(JsonFileAlarmStore::new(&config.alarms.store_path));
    let notifier = Arc::new(JournalNotifier::new(journal.clone()));
    AlarmCoordinator::open(store, notifier, config.alarms.coordinator.clone())
        .with_context(|| format!("loading alarms from {}", config.alarms.store_path.display()))
}

fn paint(state: AlarmState) -> colored::ColoredString {
    match state {
        AlarmState::Thrown => state.to_string().red().bold(),
        AlarmState::Recovered => state.to_string().green(),
    }
}

fn cmd_register(args: RegisterArgs, config: &VigilConfig, journal: &Journal) -> anyhow::Result<()> {
    let coordinator = open_coordinator(config, journal)?;
    match coordinator.register(&args.name, args.id)? {
        Registration::Created => {
            println!("{} Registered {} (id {})", "✓".green().bold(), args.name.bold(), args.id);
        }
        Registration::Existing { id, state } => {
            println!("{} already registered (id {}, {})", args.name.bold(), id, paint(state));
        }
    }
    Ok(())
}

fn cmd_transition(
    args: AlarmArgs,
    target: AlarmState,
    config: &VigilConfig,
    journal: &Journal,
) -> anyhow::Result<()> {
    let coordinator = open_coordinator(config, journal)?;
    match coordinator.transition(&args.name, target) {
        TransitionOutcome::Applied => {
            println!("{} {} is now {}", "✓".green().bold(), args.name.bold(), paint(target));
            Ok(())
        }
        TransitionOutcome::NotPersisted => {
            println!("{} {} is now {} but was not saved", "!".yellow().bold(), args.name.bold(), paint(target));
            bail!("alarm {} not persisted", args.name)
        }
        outcome => {
            println!("{} {}: {}", "✗".red().bold(), args.name.bold(), outcome);
            bail!("transition of {} failed: {outcome}", args.name)
        }
    }
}

fn cmd_check(args: AlarmArgs, config: &VigilConfig, journal: &Journal) -> anyhow::Result<()> {
    let coordinator = open_coordinator(config, journal)?;
    match coordinator.status(&args.name) {
        Some(state) => {
            println!("{}: {}", args.name.bold(), paint(state));
            Ok(())
        }
        None => Err(AlarmError::NotFound { name: args.name }.into()),
    }
}

fn cmd_list(config: &VigilConfig, journal: &Journal) -> anyhow::Result<()> {
    let coordinator = open_coordinator(config, journal)?;
    let alarms = coordinator.alarms();
    if alarms.is_empty() {
        println!("No alarms registered.");
        return Ok(());
    }
    for alarm in alarms {
        println!("{:>6}  {:<10}  {}", alarm.id.to_string().dimmed(), paint(alarm.state), alarm.name);
    }
    Ok(())
}

fn cmd_log(args: LogArgs, journal: &Journal) -> anyhow::Result<()> {
    match journal.submit(&args.words.join(" "))? {
        Submission::Queued => println!("{} Logged.", "✓".green()),
        Submission::Suppressed => println!("{} Journal is paused; line dropped.", "!".yellow().bold()),
    }
    Ok(())
}

async fn cmd_setting(args: SettingArgs, config: &VigilConfig) -> anyhow::Result<()> {
    let store = Arc::new(JsonFileSettingsStore::new(&config.settings.store_path));
    let service = SettingsService::new(store, config.settings.refresh.clone());

    let result = match args.action {
        SettingAction::Get { key } => service.get(&key).map(|value| {
            if value.is_empty() {
                println!("{} = {}", key.bold(), "(not set)".dimmed());
            } else {
                println!("{} = {}", key.bold(), value);
            }
        }),
        SettingAction::Set { key, value } => service.update(&key, &value).map(|stuck| {
            if stuck {
                println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
            } else {
                println!("{} {} did not read back as {}", "✗".red().bold(), key.bold(), value);
            }
        }),
    };

    service.shutdown().await;
    Ok(result?)
}
