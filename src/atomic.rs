//! Crash-safe file replacement.
//!
//! The new contents are written to a hidden temporary file next to the target
//! and then renamed over it, so the target either has the old contents or the
//! new ones. The target's permission bits are carried over.

use std::{
    ffi::OsString,
    fs::{self, Permissions},
    io::{ErrorKind, Write as _},
    path::Path,
};

use crate::error::{Error, Result};

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Returns the permissions the written file should have.
fn target_permissions(path: &Path) -> Result<Option<Permissions>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata.permissions())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(default_permissions()),
        Err(e) => Err(Error::io(path)(e)),
    }
}

/// Syncs the directory entry so that the rename itself is durable.
///
/// Some filesystems can't sync directories, that is not an error.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    let result = fs::File::open(dir).and_then(|fp| fp.sync_all());
    match result {
        Err(e) if !matches!(e.kind(), ErrorKind::Unsupported | ErrorKind::InvalidInput) => {
            Err(Error::io(dir)(e))
        }
        _ => Ok(()),
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

/// Atomically replaces the file at `path` with `contents`.
///
/// If anything fails before the final rename then the temporary file is removed
/// and `path` is left untouched. A failure to sync the directory afterwards is
/// still reported even though the new contents are already in place.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::NotAFile(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let permissions = target_permissions(path)?;

    let mut prefix = OsString::from(".");
    prefix.push(file_name);
    prefix.push(".");
    // The temporary file deletes itself on drop until it's persisted
    let mut temp = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(Error::io(dir))?;

    temp.write_all(contents).map_err(Error::io(temp.path()))?;
    if let Some(permissions) = permissions {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(Error::io(temp.path()))?;
    }
    temp.as_file().sync_all().map_err(Error::io(temp.path()))?;
    temp.persist(path).map_err(|e| Error::io(path)(e.error))?;

    log::debug!("replaced {}", path.display());
    sync_dir(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leftover_files(dir: &Path) -> Vec<String> {
        let mut names = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    #[test]
    fn test_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ass");
        fs::write(&path, "old contents that are longer").unwrap();

        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(leftover_files(dir.path()), vec!["a.ass"]);
    }

    #[test]
    fn test_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.ass");

        atomic_write(&path, b"").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"");

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        for mode in [0o600, 0o640, 0o755] {
            let path = dir.path().join(format!("{mode:o}.ass"));
            fs::write(&path, "old").unwrap();
            fs::set_permissions(&path, Permissions::from_mode(mode)).unwrap();

            atomic_write(&path, b"new").unwrap();
            let actual = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(actual & 0o777, mode);
        }
    }

    #[test]
    fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("a.ass");

        let err = atomic_write(&path, b"new").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_directory_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("folder.ass");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("inner"), "keep").unwrap();

        assert!(atomic_write(&target, b"new").is_err());
        assert_eq!(fs::read_to_string(target.join("inner")).unwrap(), "keep");
        assert_eq!(leftover_files(dir.path()), vec!["folder.ass"]);
    }
}
