// 本地文件系统操作
use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Extension appended to a directory path to name its archive.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// The local side of a backup: what is a directory, how to pack it, what it contains.
pub trait Filesystem {
    fn is_directory(&self, path: &Path) -> bool;
    /// Packs `dir` into `{dir}.zip` next to it and returns the archive path.
    fn compress_directory(&self, dir: &Path) -> io::Result<PathBuf>;
    /// Names of the regular files directly inside `dir`, sorted.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>>;
    /// Names of the directories directly inside `dir`, sorted.
    fn list_subdirectories(&self, dir: &Path) -> io::Result<Vec<String>>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFilesystem;

impl Filesystem for LocalFilesystem {
    fn is_directory(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn compress_directory(&self, dir: &Path) -> io::Result<PathBuf> {
        if !dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", dir.display()),
            ));
        }
        let archive = archive_path_for(dir).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no directory name to archive under", dir.display()),
            )
        })?;
        if let Err(e) = write_archive(dir, &archive) {
            // 不留下半截的压缩包
            let _ = fs::remove_file(&archive);
            return Err(e);
        }
        log::debug!("archived {} -> {}", dir.display(), archive.display());
        Ok(archive)
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<String>> {
        list_entries(dir, |file_type| file_type.is_file())
    }

    fn list_subdirectories(&self, dir: &Path) -> io::Result<Vec<String>> {
        list_entries(dir, |file_type| file_type.is_dir())
    }
}

fn write_archive(dir: &Path, archive: &Path) -> io::Result<()> {
    // 条目名相对于父目录，解压后保留顶层目录名
    let base = dir.parent().unwrap_or_else(|| Path::new(""));

    let mut zip = ZipWriter::new(File::create(archive)?);
    let dir_options = FileOptions::default().compression_method(CompressionMethod::Stored);

    // 跟随符号链接，打包链接指向的内容；walkdir 会检测循环
    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        let path = entry.path();
        let name = entry_name(path.strip_prefix(base).unwrap_or(path));

        if entry.file_type().is_dir() {
            zip.add_directory(name, dir_options).map_err(zip_error)?;
        } else if entry.file_type().is_file() {
            let metadata = entry.metadata().map_err(io::Error::from)?;
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(file_mode(&metadata))
                .large_file(metadata.len() >= u32::MAX as u64);
            zip.start_file(name, options).map_err(zip_error)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut zip)?;
        }
    }

    zip.finish().map_err(zip_error)?;
    Ok(())
}

/// `/data/db1` (or `/data/db1/`) -> `/data/db1.zip`, next to the directory.
/// The suffix is appended, never substituted. `None` for paths without a
/// final name such as `.`, `..` or `/`.
pub fn archive_path_for(dir: &Path) -> Option<PathBuf> {
    let mut name = OsString::from(dir.file_name()?);
    name.push(".");
    name.push(ARCHIVE_EXTENSION);
    Some(match dir.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    })
}

pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> io::Result<()> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    fs::create_dir_all(dir)
}

fn list_entries(dir: &Path, keep: impl Fn(&fs::FileType) -> bool) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if keep(&entry.file_type()?) {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> u32 {
    0o644
}

fn zip_error(err: zip::result::ZipError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}
