//! Status probe for a record store database.
//!
//! `rizara_cli [status]` opens the configured database, applies pending
//! migrations and prints version, schema version and goat pipeline counts.
//! `rizara_cli ping` only checks crate linkage.

use clap::{Parser, Subcommand};
use rizara_core::db::migrations::current_version;
use rizara_core::{
    core_version, init_logging, open_db, ping, GoatStatus, RecordStore, StoreConfig,
};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "rizara_cli")]
#[command(about = "Status probe for a Rizara record store database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Command {
    /// Open the configured database and print schema version and goat counts
    Status,
    /// Check crate linkage only
    Ping,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command.unwrap_or(Command::Status) {
        Command::Ping => {
            println!("rizara_core ping={}", ping());
            println!("rizara_core version={}", core_version());
            Ok(())
        }
        Command::Status => status(),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("rizara_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn status() -> Result<(), String> {
    let config = StoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(config.log_level, log_dir).map_err(|err| err.to_string())?;
    }

    let conn = open_db(&config.db_path).map_err(|err| format!("open failed: {err}"))?;
    let schema_version = current_version(&conn).map_err(|err| err.to_string())?;
    let store = RecordStore::with_config(&conn, &config).map_err(|err| err.to_string())?;
    let counts = store
        .count_goats_by_status()
        .map_err(|err| err.to_string())?;

    log::info!(
        "event=cli_status module=cli status=ok schema_version={schema_version} goats={}",
        counts.total()
    );
    println!("rizara_core version={}", core_version());
    println!("db_path={}", config.db_path.display());
    println!("schema_version={schema_version}");
    for status in GoatStatus::ALL {
        println!("goats.{status}={}", counts.get(status));
    }
    println!("goats.total={}", counts.total());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::error::ErrorKind;
    use clap::Parser;

    #[test]
    fn status_is_the_default_command() {
        let cli = Cli::try_parse_from(["rizara_cli"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["rizara_cli", "ping"]).unwrap();
        assert_eq!(cli.command, Some(Command::Ping));
    }

    #[test]
    fn unknown_command_is_a_usage_error() {
        let err = Cli::try_parse_from(["rizara_cli", "purge"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument
        ));
    }
}
