// 配置管理
use crate::cli::{Cli, Commands};
use crate::utils::error::ConfigError;
use anyhow::{Context, Result};
use dialoguer::{Confirm, Password};
use log::LevelFilter;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Connection parameters and log locations for one [`BackupUploader`](crate::transfer::BackupUploader).
///
/// `key_file` and `password` are kept as given; [`TransferConfig::credential`]
/// decides whether they form a usable credential.
#[derive(Clone)]
pub struct TransferConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub key_file: Option<PathBuf>,
    pub password: Option<String>,
    pub known_hosts: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub log_dir: PathBuf,
    pub error_log_dir: PathBuf,
    pub log_level: LevelFilter,
    pub show_progress: bool,
}

#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    PrivateKey(PathBuf),
    Password(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PrivateKey(path) => f.debug_tuple("PrivateKey").field(path).finish(),
            Credential::Password(_) => f.write_str("Password(****)"),
        }
    }
}

impl fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("key_file", &self.key_file)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("known_hosts", &self.known_hosts)
            .field("timeout", &self.timeout)
            .field("log_dir", &self.log_dir)
            .field("error_log_dir", &self.error_log_dir)
            .field("log_level", &self.log_level)
            .field("show_progress", &self.show_progress)
            .finish()
    }
}

impl TransferConfig {
    pub fn new(host: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            key_file: None,
            password: None,
            known_hosts: None,
            timeout: None,
            log_dir: PathBuf::from("."),
            error_log_dir: PathBuf::from("."),
            log_level: LevelFilter::Info,
            show_progress: false,
        }
    }

    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_log_dirs(mut self, log_dir: impl Into<PathBuf>, error_log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self.error_log_dir = error_log_dir.into();
        self
    }

    /// Checks the connection parameters and resolves the single credential.
    pub fn credential(&self) -> Result<Credential, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::EmptyUsername);
        }

        let key_file = self.key_file.as_ref().filter(|p| !p.as_os_str().is_empty());
        let password = self.password.as_ref().filter(|p| !p.is_empty());
        match (key_file, password) {
            (Some(key), None) => Ok(Credential::PrivateKey(key.clone())),
            (None, Some(password)) => Ok(Credential::Password(password.clone())),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingCredentials),
            (None, None) => Err(ConfigError::MissingCredential),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Operation {
    Push {
        remote_path: String,
        targets: Vec<PathBuf>,
        each_subdir: bool,
    },
    List {
        dir: PathBuf,
        files: bool,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub transfer: TransferConfig,
    pub operation: Operation,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let operation = match &cli.command {
            Commands::Push { remote_path, targets, each_subdir } => Operation::Push {
                remote_path: remote_path.clone(),
                targets: targets.clone(),
                each_subdir: *each_subdir,
            },
            Commands::List { dir, files } => Operation::List {
                dir: dir.clone(),
                files: *files,
            },
        };

        let mut transfer = TransferConfig::new(cli.host.clone(), cli.username.clone());
        transfer.port = cli.port;
        transfer.known_hosts = cli.known_hosts.clone();
        transfer.timeout = cli.timeout.map(Duration::from_secs);
        transfer.log_dir = cli.log_dir.clone();
        transfer.error_log_dir = cli.error_log_dir.clone();
        transfer.log_level = cli.log_level.into();
        transfer.show_progress = cli.progress;

        // 列目录不需要连接远程主机
        if matches!(operation, Operation::Push { .. }) {
            Self::determine_credential(cli, &mut transfer)?;
        }

        Ok(Config { transfer, operation })
    }

    fn determine_credential(cli: &Cli, transfer: &mut TransferConfig) -> Result<()> {
        if cli.password.is_some() || cli.key_file.is_some() {
            transfer.password = cli.password.clone();
            transfer.key_file = cli.key_file.clone();
            return Ok(());
        }

        // 尝试查找默认的SSH密钥
        let home = home::home_dir().context("Cannot determine home directory")?;
        let ssh_dir = home.join(".ssh");

        let key_files = ["id_rsa", "id_ed25519", "id_ecdsa"];
        for key_name in &key_files {
            let key_path = ssh_dir.join(key_name);
            if key_path.exists() {
                println!("Found SSH key: {}", key_path.display());
                let use_key = Confirm::new()
                    .with_prompt(format!("Use SSH key {} for authentication?", key_path.display()))
                    .default(true)
                    .interact()?;

                if use_key {
                    transfer.key_file = Some(key_path);
                    return Ok(());
                }
            }
        }

        println!("No SSH key found or selected.");
        let password = Password::new()
            .with_prompt(format!("Enter password for {}@{}", cli.username, cli.host))
            .interact()?;
        transfer.password = Some(password);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_file_alone_is_a_credential() {
        let config = TransferConfig::new("backup.example.org", "backup").with_key_file("/keys/id_ed25519");
        assert_eq!(
            config.credential().unwrap(),
            Credential::PrivateKey(PathBuf::from("/keys/id_ed25519"))
        );
    }

    #[test]
    fn password_alone_is_a_credential() {
        let config = TransferConfig::new("backup.example.org", "backup").with_password("hunter2");
        assert_eq!(config.credential().unwrap(), Credential::Password("hunter2".into()));
    }

    #[test]
    fn missing_or_conflicting_credentials_are_rejected() {
        let bare = TransferConfig::new("backup.example.org", "backup");
        assert!(matches!(bare.credential(), Err(ConfigError::MissingCredential)));

        let empty = bare.clone().with_password("");
        assert!(matches!(empty.credential(), Err(ConfigError::MissingCredential)));

        let both = bare.with_password("hunter2").with_key_file("/keys/id_rsa");
        assert!(matches!(both.credential(), Err(ConfigError::ConflictingCredentials)));
    }

    #[test]
    fn blank_host_or_user_is_rejected() {
        let config = TransferConfig::new(" ", "backup").with_password("x");
        assert!(matches!(config.credential(), Err(ConfigError::EmptyHost)));

        let config = TransferConfig::new("host", "").with_password("x");
        assert!(matches!(config.credential(), Err(ConfigError::EmptyUsername)));
    }

    #[test]
    fn debug_output_hides_password() {
        let config = TransferConfig::new("host", "backup").with_password("hunter2");
        let rendered = format!("{:?} {:?}", config, config.credential().unwrap());
        assert!(!rendered.contains("hunter2"));
    }
}
