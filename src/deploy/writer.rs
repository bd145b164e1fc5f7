use std::fs;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::deploy::types::*;
use crate::error::DeployError;

/// Durably puts a [`ManagedFile`] in place.
pub trait FileWriter {
    fn write_file(&self, file: &ManagedFile) -> Result<WriteOutcome, DeployError>;
}

/// Writes to the local filesystem, optionally below a staging root.
#[derive(Debug, Clone)]
pub struct LocalWriter {
    root: PathBuf, // "/" in production, a scratch directory when staging
    apply_ownership: bool,
}

impl LocalWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            apply_ownership: false,
        }
    }

    /// Also `chown` every file to its declared owner and group.
    pub fn with_ownership(mut self, apply: bool) -> Self {
        self.apply_ownership = apply;
        self
    }

    /// Where `path` lands once re-rooted.
    pub fn destination(&self, path: &Path) -> PathBuf {
        let relative = path.strip_prefix("/").unwrap_or(path);
        self.root.join(relative)
    }

    fn load(&self, content: &FileContent) -> Result<Vec<u8>, DeployError> {
        match content {
            FileContent::Inline(text) => Ok(text.as_bytes().to_vec()),
            FileContent::Source(location) => {
                let path = resolve_source(location)?;
                fs::read(&path).map_err(|e| DeployError::io(path, e))
            }
        }
    }
}

impl Default for LocalWriter {
    fn default() -> Self {
        Self::new("/")
    }
}

impl FileWriter for LocalWriter {
    fn write_file(&self, file: &ManagedFile) -> Result<WriteOutcome, DeployError> {
        let dest = self.destination(&file.path);
        let bytes = self.load(&file.content)?;

        let outcome = match fs::read(&dest) {
            Ok(existing) if existing == bytes => {
                debug!("{} is up to date", dest.display());
                WriteOutcome::Unchanged
            }
            _ => {
                self.write_atomically(&dest, &bytes, file)?;
                info!("wrote {} ({} bytes)", dest.display(), bytes.len());
                return Ok(WriteOutcome::Written);
            }
        };

        self.apply_metadata(&dest, file)?;
        Ok(outcome)
    }
}

impl LocalWriter {
    fn apply_metadata(&self, path: &Path, file: &ManagedFile) -> Result<(), DeployError> {
        fs::set_permissions(path, fs::Permissions::from_mode(file.mode))
            .map_err(|e| DeployError::io(path, e))?;
        if self.apply_ownership {
            std::os::unix::fs::chown(path, Some(file.owner), Some(file.group))
                .map_err(|e| DeployError::io(path, e))?;
        }
        Ok(())
    }

    /// The temp file carries the final mode and owner before it is renamed
    /// into place, and is removed again if anything fails.
    fn write_atomically(
        &self,
        dest: &Path,
        bytes: &[u8],
        file: &ManagedFile,
    ) -> Result<(), DeployError> {
        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent).map_err(|e| DeployError::io(parent, e))?;

        let file_name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{file_name}.nsdconf-tmp"));

        // a leftover from an interrupted run keeps whatever mode it had
        match fs::remove_file(&tmp) {
            Ok(()) => debug!("removed stale {}", tmp.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DeployError::io(&tmp, e)),
        }

        let result = self
            .fill_temp(&tmp, bytes, file)
            .and_then(|_| fs::rename(&tmp, dest).map_err(|e| DeployError::io(dest, e)));
        if result.is_err() {
            if let Err(e) = fs::remove_file(&tmp) {
                debug!("could not remove {}: {e}", tmp.display());
            }
        }
        result
    }

    fn fill_temp(&self, tmp: &Path, bytes: &[u8], file: &ManagedFile) -> Result<(), DeployError> {
        let mut out = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(file.mode)
            .open(tmp)
            .map_err(|e| DeployError::io(tmp, e))?;
        // the umask may have narrowed the creation mode
        self.apply_metadata(tmp, file)?;
        out.write_all(bytes)
            .and_then(|_| out.sync_all())
            .map_err(|e| DeployError::io(tmp, e))
    }
}

/// Turn a source location into a readable local path.
pub fn resolve_source(location: &str) -> Result<PathBuf, DeployError> {
    if let Some(path) = location.strip_prefix("file://") {
        if path.is_empty() {
            return Err(DeployError::UnsupportedSource(location.to_string()));
        }
        return Ok(PathBuf::from(path));
    }
    if location.contains("://") || location.is_empty() {
        return Err(DeployError::UnsupportedSource(location.to_string()));
    }
    Ok(PathBuf::from(location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_file_urls_and_paths() {
        assert_eq!(
            resolve_source("file:///root/server.key").unwrap(),
            PathBuf::from("/root/server.key")
        );
        assert_eq!(
            resolve_source("/srv/keys/control.key").unwrap(),
            PathBuf::from("/srv/keys/control.key")
        );
        assert!(matches!(
            resolve_source("puppet:///modules/nsd/server.key"),
            Err(DeployError::UnsupportedSource(_))
        ));
        assert!(resolve_source("file://").is_err());
        assert!(resolve_source("").is_err());
    }

    #[test]
    fn destination_is_rerooted() {
        let writer = LocalWriter::new("/tmp/stage");
        assert_eq!(
            writer.destination(Path::new("/etc/nsd/nsd.conf")),
            PathBuf::from("/tmp/stage/etc/nsd/nsd.conf")
        );
        assert_eq!(
            LocalWriter::default().destination(Path::new("/etc/nsd/nsd.conf")),
            PathBuf::from("/etc/nsd/nsd.conf")
        );
    }

    #[test]
    fn writes_inline_content_with_mode() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalWriter::new(dir.path());
        let file = ManagedFile::inline("/etc/nsd/example.com.zone", "$TTL 1\n", 0o644);

        assert_eq!(writer.write_file(&file).unwrap(), WriteOutcome::Written);
        let dest = dir.path().join("etc/nsd/example.com.zone");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "$TTL 1\n");
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        assert_eq!(writer.write_file(&file).unwrap(), WriteOutcome::Unchanged);
    }

    #[test]
    fn copies_sourced_content() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("server.key");
        fs::write(&src, "# server key for spec testing\n").unwrap();

        let writer = LocalWriter::new(dir.path().join("root"));
        let file = ManagedFile::sourced(
            "/etc/nsd/nsd_server.key",
            format!("file://{}", src.display()),
            0o640,
        );
        writer.write_file(&file).unwrap();

        let dest = dir.path().join("root/etc/nsd/nsd_server.key");
        assert_eq!(
            fs::read_to_string(&dest).unwrap(),
            "# server key for spec testing\n"
        );
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("server.key");
        fs::write(&src, "SECRET\n").unwrap();

        // a non-empty directory in the way makes the rename fail
        let root = dir.path().join("root");
        let blocker = root.join("etc/nsd/nsd_server.key");
        fs::create_dir_all(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let writer = LocalWriter::new(&root);
        let file = ManagedFile::sourced(
            "/etc/nsd/nsd_server.key",
            src.display().to_string(),
            0o640,
        );
        assert!(matches!(
            writer.write_file(&file),
            Err(DeployError::Io { .. })
        ));

        let names: Vec<_> = fs::read_dir(root.join("etc/nsd"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("nsd_server.key")]);
        assert!(blocker.is_dir());
    }

    #[test]
    fn stale_temp_file_is_replaced_with_private_mode() {
        let dir = tempfile::tempdir().unwrap();
        let nsd = dir.path().join("etc/nsd");
        fs::create_dir_all(&nsd).unwrap();
        let stale = nsd.join(".nsd_control.key.nsdconf-tmp");
        fs::write(&stale, "old").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        let writer = LocalWriter::new(dir.path());
        let file = ManagedFile::inline("/etc/nsd/nsd_control.key", "NEW\n", 0o640);
        assert_eq!(writer.write_file(&file).unwrap(), WriteOutcome::Written);

        let dest = nsd.join("nsd_control.key");
        assert_eq!(fs::read_to_string(&dest).unwrap(), "NEW\n");
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert!(!stale.exists());
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LocalWriter::new(dir.path());
        let file = ManagedFile::sourced(
            "/etc/nsd/nsd_control.key",
            dir.path().join("absent.key").display().to_string(),
            0o640,
        );
        assert!(matches!(
            writer.write_file(&file),
            Err(DeployError::Io { .. })
        ));
    }
}
