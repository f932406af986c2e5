use super::{CacheError, CacheKey, SharedCache, Stored};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Cache backed by one file per class in a directory
///
/// Several processes can share the same directory. A buffer is first written in full to a
/// temporary file in the directory and then moved to its final name, which fails if some other
/// process already stored a buffer for that class. The temporary file is removed on every path
/// that doesn't end up persisting it.
pub struct DirectoryCache {
    root: PathBuf,
}

impl DirectoryCache {
    /// Open (and create if needed) a cache directory
    pub fn open(root: impl Into<PathBuf>) -> Result<DirectoryCache, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        log::debug!("Using snippet cache directory {}", root.display());
        Ok(DirectoryCache { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File holding the buffer for a key
    ///
    /// Package separators become `.`, and anything that isn't safe in a file name gets
    /// percent-encoded.
    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let mut file_name = String::with_capacity(key.as_bytes().len() + 9);
        for byte in key.as_bytes() {
            match byte {
                b'/' => file_name.push('.'),
                b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-' => {
                    file_name.push(*byte as char)
                }
                _ => file_name.push_str(&format!("%{:02X}", byte)),
            }
        }
        file_name.push_str(".snippets");
        self.root.join(file_name)
    }
}

impl SharedCache for DirectoryCache {
    fn find(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match fs::read(self.entry_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(CacheError::IoError(err)),
        }
    }

    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<Stored, CacheError> {
        let path = self.entry_path(key);
        if path.exists() {
            return Ok(Stored::AlreadyPresent);
        }

        let mut temp = NamedTempFile::new_in(&self.root)?;
        temp.write_all(bytes)?;
        temp.flush()?;

        match temp.persist_noclobber(&path) {
            Ok(_) => Ok(Stored::Written),
            Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                Ok(Stored::AlreadyPresent)
            }
            Err(err) => Err(CacheError::IoError(err.error)),
        }
    }
}
