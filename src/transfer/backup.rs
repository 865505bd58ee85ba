// 批量备份上传
use crate::config::{Credential, TransferConfig};
use crate::ssh::{Connector, RemoteSession, SessionGuard, SshConnector};
use crate::transfer::logbook::{BackupLog, ConsoleSink, EventSink};
use crate::transfer::report::{TargetOutcome, TransferReport};
use crate::utils::error::{ConfigError, PutError, SessionError, TargetError};
use crate::utils::file::{Filesystem, LocalFilesystem};
use log::Level;
use std::path::{Path, PathBuf};

/// Sends an ordered batch of files and directories over one SSH session.
///
/// Every target is attempted once. A target that cannot be archived or sent
/// is written to the error log and skipped; only a failure of the session
/// itself ends the batch early. The daily log file names are fixed when the
/// uploader is built.
pub struct BackupUploader<C = SshConnector, F = LocalFilesystem> {
    config: TransferConfig,
    credential: Credential,
    connector: C,
    fs: F,
    log: BackupLog,
    sink: Box<dyn EventSink>,
}

impl BackupUploader {
    /// Uploader over ssh2 and the local disk, narrating to stdout at `config.log_level`.
    pub fn new(config: TransferConfig) -> Result<Self, ConfigError> {
        let sink = ConsoleSink::new(config.log_level);
        Self::with_parts(config, SshConnector, LocalFilesystem, Box::new(sink))
    }
}

impl<C: Connector, F: Filesystem> BackupUploader<C, F> {
    pub fn with_parts(
        config: TransferConfig,
        connector: C,
        fs: F,
        sink: Box<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        let credential = config.credential()?;
        let log = BackupLog::new(&config.log_dir, &config.error_log_dir);
        Ok(Self {
            config,
            credential,
            connector,
            fs,
            log,
            sink,
        })
    }

    pub fn log(&self) -> &BackupLog {
        &self.log
    }

    pub fn transfer<P: AsRef<Path>>(&self, targets: &[P], remote_path: &str) -> Result<TransferReport, SessionError> {
        self.info(&format!(
            "Start transferring process: {} target(s) to {}@{}:{}",
            targets.len(),
            self.config.username,
            self.config.host,
            remote_path
        ));

        let session = match self.connector.connect(&self.config, &self.credential) {
            Ok(session) => session,
            Err(e) => {
                self.error(&session_failure_line(&e));
                return Err(e);
            }
        };
        let mut session = SessionGuard::new(session);

        let mut report = TransferReport::default();
        for target in targets {
            match self.transfer_one(&mut *session, target.as_ref(), remote_path) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    self.error(&session_failure_line(&e));
                    return Err(e);
                }
            }
        }
        drop(session);

        self.info(&format!(
            "Finished transferring process: {} sent, {} failed",
            report.succeeded().count(),
            report.failed().count()
        ));
        Ok(report)
    }

    fn transfer_one(
        &self,
        session: &mut C::Session,
        target: &Path,
        remote_path: &str,
    ) -> Result<TargetOutcome, SessionError> {
        // 目录先压缩成 zip 再发送
        let sent_path = if self.fs.is_directory(target) {
            match self.fs.compress_directory(target) {
                Ok(archive) => {
                    self.info(&format!("Archiving... {}", target.display()));
                    archive
                }
                Err(source) => {
                    let err = TargetError::Compression {
                        path: target.to_path_buf(),
                        source,
                    };
                    return Ok(self.target_failed(target, target.to_path_buf(), err));
                }
            }
        } else {
            target.to_path_buf()
        };

        match session.put(&sent_path, remote_path) {
            Ok(bytes) => {
                self.info(&format!(
                    "the data transferred from local: {} to remote: {}",
                    sent_path.display(),
                    remote_path
                ));
                Ok(TargetOutcome {
                    target: target.to_path_buf(),
                    sent_path,
                    succeeded: true,
                    error_kind: None,
                    bytes,
                })
            }
            Err(PutError::Target(err)) => Ok(self.target_failed(target, sent_path, err)),
            Err(PutError::Session(err)) => Err(err),
        }
    }

    fn target_failed(&self, target: &Path, sent_path: PathBuf, err: TargetError) -> TargetOutcome {
        self.error(&format!(
            "{} was not transferred to remote host ({}): {}",
            sent_path.display(),
            err.kind(),
            err
        ));
        TargetOutcome {
            target: target.to_path_buf(),
            sent_path,
            succeeded: false,
            error_kind: Some(err.kind()),
            bytes: 0,
        }
    }

    fn info(&self, line: &str) {
        self.emit(Level::Info, line);
    }

    fn error(&self, line: &str) {
        self.emit(Level::Error, line);
    }

    fn emit(&self, level: Level, line: &str) {
        self.sink.emit(level, line);
        // 日志文件写不进去时，至少让观察者知道
        if let Err(e) = self.log.record(level, line) {
            log::error!("{}", e);
            self.sink.emit(Level::Error, &e.to_string());
        }
    }
}

fn session_failure_line(err: &SessionError) -> String {
    format!("SSH session failed ({}): {}", err.kind(), err)
}
