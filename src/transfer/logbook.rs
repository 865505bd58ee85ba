// 备份日志与错误日志
use crate::utils::file::ensure_dir;
use chrono::{Local, NaiveDate};
use log::{Level, LevelFilter};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where the human-readable narrative of a batch goes besides the log files.
pub trait EventSink {
    fn emit(&self, level: Level, line: &str);
}

/// Prints events at or above its level to stdout.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    level: LevelFilter,
}

impl ConsoleSink {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }
}

impl EventSink for ConsoleSink {
    fn emit(&self, level: Level, line: &str) {
        if level <= self.level {
            println!("{}", line);
        }
    }
}

/// The pair of daily log files, fixed when the log is created.
#[derive(Debug, Clone)]
pub struct BackupLog {
    log_file: PathBuf,
    error_log_file: PathBuf,
}

impl BackupLog {
    pub fn new(log_dir: &Path, error_log_dir: &Path) -> Self {
        Self::for_date(log_dir, error_log_dir, Local::now().date_naive())
    }

    pub fn for_date(log_dir: &Path, error_log_dir: &Path, date: NaiveDate) -> Self {
        let ymd = date.format("%Y%m%d");
        Self {
            log_file: log_dir.join(format!("{}_backup.log", ymd)),
            error_log_file: error_log_dir.join(format!("{}_error.log", ymd)),
        }
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    pub fn error_log_file(&self) -> &Path {
        &self.error_log_file
    }

    /// Appends `line` to the backup log, or the error log for warnings and errors.
    /// On failure the error names the file that could not be written.
    pub fn record(&self, level: Level, line: &str) -> io::Result<()> {
        let path = if level <= Level::Warn {
            &self.error_log_file
        } else {
            &self.log_file
        };
        write_log(path, level, line)
            .map_err(|e| io::Error::new(e.kind(), format!("cannot write {}: {}", path.display(), e)))
    }
}

fn write_log(path: &Path, level: Level, line: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(
        file,
        "{} [{}] {}",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        level,
        line
    )
}
