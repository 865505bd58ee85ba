// 命令行参数解析
use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scp-backup")]
#[command(about = "Back up local files and directories to a remote host over SCP")]
#[command(version)]
pub struct Cli {
    /// SSH server hostname or IP address
    #[arg(short = 'H', long)]
    pub host: String,

    /// SSH server port
    #[arg(short, long, default_value = "22")]
    pub port: u16,

    /// SSH username
    #[arg(short, long)]
    pub username: String,

    /// SSH password (if neither password nor key file is given, will prompt)
    #[arg(short = 'P', long, conflicts_with = "key_file")]
    pub password: Option<String>,

    /// SSH private key file path
    #[arg(short, long)]
    pub key_file: Option<PathBuf>,

    /// known_hosts file used to verify the server host key
    #[arg(long)]
    pub known_hosts: Option<PathBuf>,

    /// Connect and I/O timeout in seconds
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Directory for the daily backup log
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Directory for the daily error log
    #[arg(long, default_value = ".")]
    pub error_log_dir: PathBuf,

    /// Console log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Show a progress bar per file
    #[arg(long)]
    pub progress: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send files and directories to the remote host
    Push {
        /// Remote destination directory
        remote_path: String,
        /// Local files or directories (directories are zipped first)
        #[arg(required = true)]
        targets: Vec<PathBuf>,
        /// Treat every subdirectory of each target as its own target
        #[arg(short, long)]
        each_subdir: bool,
    },
    /// List the directories (or files) a push with --each-subdir would pick up
    List {
        /// Local directory to inspect
        dir: PathBuf,
        /// List the files inside each subdirectory instead
        #[arg(short, long)]
        files: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_push_with_key_file() {
        let cli = Cli::try_parse_from([
            "scp-backup", "-H", "backup.example.org", "-u", "backup", "-k", "/keys/id_rsa",
            "--log-dir", "/var/log/backup", "push", "/backup", "/data/db1", "/data/report.txt",
        ])
        .unwrap();

        assert_eq!(cli.port, 22);
        assert_eq!(cli.log_dir, PathBuf::from("/var/log/backup"));
        assert_eq!(cli.error_log_dir, PathBuf::from("."));
        match cli.command {
            Commands::Push { remote_path, targets, each_subdir } => {
                assert_eq!(remote_path, "/backup");
                assert_eq!(targets.len(), 2);
                assert!(!each_subdir);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn password_and_key_file_conflict() {
        let parsed = Cli::try_parse_from([
            "scp-backup", "-H", "h", "-u", "u", "-P", "pw", "-k", "/k", "push", "/backup", "/a",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::Warn);
    }
}
