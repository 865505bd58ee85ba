use anyhow::Result;
use clap::Parser;
use scp_backup::utils::error::{ConfigError, SessionError};
use scp_backup::{cli::Cli, config::Config, run_transfer};

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level.into())
        .parse_default_env()
        .init();

    let config = Config::from_cli(&cli)?;
    println!("scp-backup v{}", env!("CARGO_PKG_VERSION"));

    match run_transfer(config) {
        Ok(report) if report.is_complete_success() => {
            if !report.outcomes.is_empty() {
                println!("\n✅ {} target(s) backed up\n", report.outcomes.len());
            }
        }
        Ok(report) => {
            eprintln!(
                "\n⚠️  {} of {} target(s) failed, see the error log\n",
                report.failed().count(),
                report.outcomes.len()
            );
            std::process::exit(2);
        }
        Err(e) => {
            let kind = if e.downcast_ref::<ConfigError>().is_some() {
                "configuration"
            } else if let Some(session) = e.downcast_ref::<SessionError>() {
                session.kind()
            } else {
                "backup"
            };
            eprintln!("\n❌ Backup failed ({}): {:#}\n", kind, e);
            std::process::exit(1);
        }
    }

    Ok(())
}
