use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// xxh3 fingerprint of raw file bytes.
pub fn fingerprint(bytes: &[u8]) -> u64 {
    xxh3_64(bytes)
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("{path} changed on disk since it was read (expected {expected:016x}, found {found:016x})")]
    ConcurrentModification {
        path: PathBuf,
        expected: u64,
        found: u64,
    },

    #[error("{0} has no parent directory")]
    NoParent(PathBuf),

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl WriteError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
        move |source| WriteError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Overwrite `path` with `content`, provided the file still fingerprints to
/// `expected_before`.
///
/// Uses tempfile + fsync + rename, so the target is either fully replaced or
/// left as it was. The original permissions are carried over and the mtime
/// is refreshed. A symlinked `path` is followed: the file it points to is
/// replaced and the link stays in place.
pub fn overwrite(path: &Path, content: &[u8], expected_before: u64) -> Result<(), WriteError> {
    let resolved = fs::canonicalize(path).map_err(WriteError::io(path))?;

    let current = fs::read(&resolved).map_err(WriteError::io(path))?;
    let found = fingerprint(&current);
    if found != expected_before {
        return Err(WriteError::ConcurrentModification {
            path: path.to_path_buf(),
            expected: expected_before,
            found,
        });
    }

    let permissions = fs::metadata(&resolved)
        .map_err(WriteError::io(path))?
        .permissions();

    atomic_write(&resolved, content, permissions)?;

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(&resolved, now).map_err(WriteError::io(path))?;

    Ok(())
}

fn atomic_write(
    path: &Path,
    content: &[u8],
    permissions: fs::Permissions,
) -> Result<(), WriteError> {
    // Same directory keeps the rename on one filesystem
    let parent = match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Path::new("."),
        Some(p) => p,
        None => return Err(WriteError::NoParent(path.to_path_buf())),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(WriteError::io(path))?;
    temp.write_all(content).map_err(WriteError::io(path))?;
    temp.as_file().sync_all().map_err(WriteError::io(path))?;
    fs::set_permissions(temp.path(), permissions).map_err(WriteError::io(path))?;
    temp.persist(path).map_err(|e| WriteError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}
