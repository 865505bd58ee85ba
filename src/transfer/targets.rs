// 收集待传输的目录和文件
use crate::utils::file::Filesystem;
use std::io;
use std::path::{Path, PathBuf};

/// Full paths of the immediate subdirectories of `root`, sorted by name.
pub fn transfer_dirs<F: Filesystem + ?Sized>(fs: &F, root: &Path) -> io::Result<Vec<PathBuf>> {
    Ok(fs
        .list_subdirectories(root)?
        .into_iter()
        .map(|name| root.join(name))
        .collect())
}

/// Full paths of the regular files directly inside each of `dirs`, in order.
pub fn transfer_files<F: Filesystem + ?Sized>(fs: &F, dirs: &[PathBuf]) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in dirs {
        files.extend(fs.list_files(dir)?.into_iter().map(|name| dir.join(name)));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::file::LocalFilesystem;
    use std::fs;

    #[test]
    fn collects_subdirectories_then_their_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir(root.join("db2")).unwrap();
        fs::create_dir(root.join("db1")).unwrap();
        fs::write(root.join("loose.txt"), "ignored").unwrap();
        fs::write(root.join("db1").join("t1.ibd"), "x").unwrap();
        fs::write(root.join("db2").join("t2.ibd"), "y").unwrap();
        fs::create_dir(root.join("db2").join("nested")).unwrap();

        let dirs = transfer_dirs(&LocalFilesystem, root).unwrap();
        assert_eq!(dirs, vec![root.join("db1"), root.join("db2")]);

        let files = transfer_files(&LocalFilesystem, &dirs).unwrap();
        assert_eq!(files, vec![root.join("db1").join("t1.ibd"), root.join("db2").join("t2.ibd")]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(transfer_dirs(&LocalFilesystem, &tmp.path().join("missing")).is_err());
    }
}
