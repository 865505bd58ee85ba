// 库文件，导出模块
pub mod cli;
pub mod config;
pub mod ssh;
pub mod transfer;
pub mod utils;

use anyhow::{Context, Result};
use config::{Config, Operation};
use std::path::PathBuf;
use transfer::targets::{transfer_dirs, transfer_files};
use transfer::{BackupUploader, TransferReport};
use utils::file::{Filesystem, LocalFilesystem};

pub fn run_transfer(config: Config) -> Result<TransferReport> {
    match config.operation {
        Operation::Push { remote_path, targets, each_subdir } => {
            let targets = if each_subdir {
                expand_subdirs(&LocalFilesystem, &targets)?
            } else {
                targets
            };
            let uploader = BackupUploader::new(config.transfer)?;
            let report = uploader.transfer(&targets, &remote_path)?;
            Ok(report)
        }
        Operation::List { dir, files } => {
            let dirs = transfer_dirs(&LocalFilesystem, &dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            let listed = if files {
                transfer_files(&LocalFilesystem, &dirs)?
            } else {
                dirs
            };
            for path in &listed {
                println!("{}", path.display());
            }
            Ok(TransferReport::default())
        }
    }
}

/// Replaces each target directory by its immediate subdirectories.
pub fn expand_subdirs<F: Filesystem>(fs: &F, targets: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for target in targets {
        let dirs = transfer_dirs(fs, target)
            .with_context(|| format!("Failed to list subdirectories of {}", target.display()))?;
        expanded.extend(dirs);
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn expand_subdirs_flattens_each_target() {
        let tmp = tempfile::tempdir().unwrap();
        let mysql = tmp.path().join("mysql");
        let pg = tmp.path().join("pg");
        fs::create_dir_all(mysql.join("shop")).unwrap();
        fs::create_dir_all(mysql.join("blog")).unwrap();
        fs::create_dir_all(pg.join("billing")).unwrap();

        let expanded = expand_subdirs(&LocalFilesystem, &[mysql.clone(), pg.clone()]).unwrap();
        assert_eq!(expanded, vec![mysql.join("blog"), mysql.join("shop"), pg.join("billing")]);
    }

    #[test]
    fn expand_subdirs_reports_missing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let err = expand_subdirs(&LocalFilesystem, &[tmp.path().join("gone")]).unwrap_err();
        assert!(err.to_string().contains("gone"));
    }
}
