//! Persists configuration artifacts into the daemon's config root.

use std::fs::{self, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::Builder;

use crate::errors::InitError;

/// Mode for secrets readable only by the daemon's user.
pub const PRIVATE_MODE: u32 = 0o600;
/// Mode for world-readable artifacts.
pub const PUBLIC_MODE: u32 = 0o644;

/// One file to materialise: where it goes, its permission bits, and its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    directory: PathBuf,
    file_name: String,
    mode: u32,
    content: Vec<u8>,
}

impl ConfigArtifact {
    /// Describes `directory/file_name` with the given mode and content.
    pub fn new(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        mode: u32,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            mode,
            content: content.into(),
        }
    }

    /// Final location of the artifact.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Permission bits applied after the write.
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// Bytes written to the file.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Writes artifacts, replacing any previous file at the same path.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigWriter;

impl ConfigWriter {
    /// Creates the artifact's directory, writes the file, then applies its mode.
    ///
    /// # Errors
    ///
    /// Returns [`InitError::Directory`] when the directory cannot be created
    /// and [`InitError::Write`] when the file cannot be written or chmod'ed.
    pub fn write(&self, artifact: &ConfigArtifact) -> Result<PathBuf, InitError> {
        ensure_dir(&artifact.directory)?;
        let path = artifact.path();
        atomic_write(&path, artifact.content())
            .and_then(|()| fs::set_permissions(&path, Permissions::from_mode(artifact.mode)))
            .map_err(|source| InitError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

/// Creates `dir` and its ancestors when missing.
///
/// # Errors
///
/// Returns [`InitError::Directory`] when creation fails.
pub fn ensure_dir(dir: &Path) -> Result<(), InitError> {
    fs::create_dir_all(dir).map_err(|source| InitError::Directory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Writes through a synced temporary file that is renamed over `path`.
fn atomic_write(path: &Path, contents: &[u8]) -> io::Result<()> {
    let directory = path.parent().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "artifact path did not have a parent directory",
        )
    })?;

    let mut builder = Builder::new();
    builder
        .prefix(
            path.file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("ztmoon"),
        )
        .suffix(".tmp")
        .permissions(Permissions::from_mode(PRIVATE_MODE));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).expect("metadata").permissions().mode() & 0o777
    }

    #[rstest]
    #[case(PRIVATE_MODE)]
    #[case(PUBLIC_MODE)]
    fn applies_requested_mode(#[case] mode: u32) {
        let dir = TempDir::new().expect("temp dir");
        let artifact = ConfigArtifact::new(dir.path(), "zerotier-one.port", mode, "9993");

        let path = ConfigWriter.write(&artifact).expect("write artifact");

        assert_eq!(fs::read_to_string(&path).expect("read"), "9993");
        assert_eq!(mode_of(&path), mode);
    }

    #[rstest]
    fn overwrites_existing_file() {
        let dir = TempDir::new().expect("temp dir");
        let target = dir.path().join("authtoken.secret");
        fs::write(&target, "old-secret-that-is-longer").expect("seed");
        fs::set_permissions(&target, Permissions::from_mode(0o666)).expect("chmod");

        let artifact = ConfigArtifact::new(dir.path(), "authtoken.secret", PRIVATE_MODE, "new");
        ConfigWriter.write(&artifact).expect("write artifact");

        assert_eq!(fs::read_to_string(&target).expect("read"), "new");
        assert_eq!(mode_of(&target), PRIVATE_MODE);
    }

    #[rstest]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().expect("temp dir");
        let nested = dir.path().join("networks.d");
        let artifact = ConfigArtifact::new(&nested, "8056c2e21c000001.conf", PUBLIC_MODE, "");

        let path = ConfigWriter.write(&artifact).expect("write artifact");

        assert!(nested.is_dir());
        assert_eq!(fs::read(&path).expect("read"), Vec::<u8>::new());
    }

    #[rstest]
    fn reports_directory_failures() {
        let dir = TempDir::new().expect("temp dir");
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").expect("seed file");
        let artifact = ConfigArtifact::new(blocker.join("sub"), "moon.json", PUBLIC_MODE, "{}");

        let error = ConfigWriter.write(&artifact).expect_err("directory must fail");

        assert!(matches!(error, InitError::Directory { path, .. } if path == blocker.join("sub")));
    }

    #[rstest]
    fn leaves_no_temporary_files_behind() {
        let dir = TempDir::new().expect("temp dir");
        let artifact = ConfigArtifact::new(dir.path(), "moon.json", PUBLIC_MODE, "{}");
        ConfigWriter.write(&artifact).expect("write artifact");

        let names: Vec<_> = fs::read_dir(dir.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec!["moon.json"]);
    }
}
