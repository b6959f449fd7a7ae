// files.rs: resolve the --file argument into the list of logs to parse
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::info;

/// Logs to parse, plus the directory an archive was unpacked into. The directory is
/// removed when this is dropped.
pub struct LogSources {
    files: Vec<PathBuf>,
    _unpacked: Option<TempDir>,
}

impl LogSources {
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

pub fn is_archive(path: &Path, unzip: bool) -> bool {
    unzip || path.extension().is_some_and(|ext| ext == "zip")
}

/// Unpack `path` when it is an archive, then list the logs to parse.
pub fn resolve(path: &Path, unzip: bool) -> Result<LogSources> {
    if !is_archive(path, unzip) {
        return Ok(LogSources { files: list_log_files(path)?, _unpacked: None });
    }
    let dir = unzip_to_temp(path)?;
    let files = list_log_files(dir.path())?;
    Ok(LogSources { files, _unpacked: Some(dir) })
}

/// Extract a zip archive into a fresh temporary directory.
pub fn unzip_to_temp(path: &Path) -> Result<TempDir> {
    let file = File::open(path).with_context(|| format!("can't open archive {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file).with_context(|| format!("can't unzip {}", path.display()))?;
    let dir = tempfile::tempdir().context("unable to create temporary directory")?;
    archive
        .extract(dir.path())
        .with_context(|| format!("can't unzip {}", path.display()))?;
    info!(archive = %path.display(), entries = archive.len(), into = %dir.path().display(), "unpacked archive");
    Ok(dir)
}

/// A file is used as-is; a directory is searched recursively for `*.log` files,
/// returned in sorted order.
pub fn list_log_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} is neither a file nor a directory", path.display());
    }

    let pattern = format!("{}/**/*.log", glob::Pattern::escape(&path.to_string_lossy()));
    let mut files = Vec::new();
    for entry in glob::glob(&pattern).with_context(|| format!("invalid search pattern {}", pattern))? {
        let file = entry.context("failed to read directory entry")?;
        if file.is_file() {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

/// Default run name: the last component of the --file argument.
pub fn run_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;

    #[test]
    fn test_directory_is_searched_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("b.log"), "x").unwrap();
        fs::write(dir.path().join("a.log"), "x").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("nested").join("c.log"), "x").unwrap();

        let files = list_log_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|f| f.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.log", "b.log", "nested/c.log"]);
    }

    #[test]
    fn test_single_file_is_used_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.txt");
        fs::write(&file, "x").unwrap();
        assert_eq!(list_log_files(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_missing_path_fails() {
        assert!(list_log_files(Path::new("/definitely/not/here")).is_err());
    }

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, body) in entries {
            zip.start_file(*name, zip::write::SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_zip_archive_is_unpacked_and_searched() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("logs.zip");
        write_zip(
            &archive,
            &[("app.log", "2023-01-10 one\n"), ("nested/worker.log", "two\n"), ("readme.txt", "x")],
        );

        let sources = resolve(&archive, false).unwrap();
        let names: Vec<String> = sources
            .files()
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["app.log", "worker.log"]);
        assert_eq!(fs::read_to_string(&sources.files()[0]).unwrap(), "2023-01-10 one\n");

        let unpacked = sources.files()[0].clone();
        drop(sources);
        assert!(!unpacked.exists());
    }

    #[test]
    fn test_unzip_flag_forces_extraction() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bundle.bin");
        write_zip(&archive, &[("a.log", "x")]);
        assert!(!is_archive(&archive, false));
        assert_eq!(resolve(&archive, true).unwrap().files().len(), 1);
        // without the flag the archive itself is parsed as a log
        assert_eq!(resolve(&archive, false).unwrap().files(), &[archive.clone()]);
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, "not a zip").unwrap();
        assert!(resolve(&archive, false).is_err());
    }

    #[test]
    fn test_run_name_for() {
        assert_eq!(run_name_for(Path::new("/var/log/app.log")), "app.log");
        assert_eq!(run_name_for(Path::new("logs")), "logs");
    }
}
