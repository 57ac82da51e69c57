// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CampSync: wristband station.
//
// Entry point. Initialises logging, opens the backend services in the data
// directory, and runs one command.

mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use campsync_core::error::Result;
use campsync_core::human_errors::humanize_error;
use campsync_core::types::ReadOutcome;
use clap::{Parser, Subcommand};

use services::app_services::{AppServices, Reader};
use services::data_dir;

#[derive(Debug, Parser)]
#[command(name = "campsync", version, about = "Program, read, and erase camper wristbands")]
struct Cli {
    /// Directory holding settings.db, config.json and the simulated band.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// NFC reader to use.
    #[arg(long, global = true, value_enum, default_value_t = Reader::Simulated)]
    reader: Reader,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Manage the shared wristband lock code.
    #[command(subcommand)]
    LockCode(LockCodeCommand),
    /// Work with the band on the reader.
    #[command(subcommand)]
    Tag(TagCommand),
    /// Check a camper in from a roster file and write their band.
    CheckIn {
        camper_id: String,
        /// JSON array of camper rows.
        #[arg(long, value_name = "FILE")]
        roster: PathBuf,
    },
    /// Write the effective configuration to config.json.
    InitConfig,
}

#[derive(Debug, Subcommand)]
enum LockCodeCommand {
    /// Print the current code, masked unless `--reveal` is given.
    Show {
        #[arg(long)]
        reveal: bool,
    },
    Set { code: String },
    Reset,
}

#[derive(Debug, Subcommand)]
enum TagCommand {
    /// Program the band from a wristband record JSON file.
    Program { record: PathBuf },
    Read,
    Erase,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            let human = humanize_error(&e);
            eprintln!("{}", human.message);
            eprintln!("  {}", human.suggestion);
            if human.retriable {
                eprintln!("  (safe to try again)");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = data_dir::data_dir(cli.data_dir.as_deref())?;
    let svc = AppServices::init(dir, cli.reader)?;

    match cli.command {
        Command::LockCode(LockCodeCommand::Show { reveal }) => {
            let status = svc.lock_code_status().await?;
            println!("lock code: {}", status.display_code(reveal));
            if status.is_default {
                println!("(default code)");
            }
            if let Some(at) = status.updated_at {
                println!("last changed: {at}");
            }
        }
        Command::LockCode(LockCodeCommand::Set { code }) => {
            svc.set_lock_code(&code).await?;
            println!("lock code updated; bands written under the old code will no longer verify");
        }
        Command::LockCode(LockCodeCommand::Reset) => {
            svc.reset_lock_code().await?;
            println!("lock code reset to default");
        }
        Command::Tag(TagCommand::Program { record }) => {
            let band = svc.program_from_file(&record).await?;
            println!("programmed wristband {}", band.wristband_id);
            println!("  payload: {} bytes", band.payload_len);
            if !band.protected {
                println!("  warning: tag password could not be set");
            }
        }
        Command::Tag(TagCommand::Read) => match svc.read_tag().await? {
            ReadOutcome::Empty => println!("wristband is empty"),
            ReadOutcome::Wristband(scan) => {
                println!("{}", serde_json::to_string_pretty(&scan.record)?);
                println!("written at: {} (ms since epoch)", scan.generated_at);
            }
        },
        Command::Tag(TagCommand::Erase) => {
            svc.erase_tag().await?;
            println!("wristband erased");
        }
        Command::CheckIn { camper_id, roster } => {
            let outcome = svc.check_in(&roster, &camper_id).await?;
            println!(
                "{} checked in on wristband {}",
                outcome.record.full_name(),
                outcome.wristband.wristband_id
            );
        }
        Command::InitConfig => {
            let path = svc.save_config()?;
            println!("wrote {}", path.display());
            println!("  payload budget: {} characters", svc.config().payload_budget);
        }
    }
    Ok(())
}
