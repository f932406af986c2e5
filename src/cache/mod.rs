//! Persisting the relationships a class needs across runs
//!
//! Classes that are themselves in a shared cache get their snippets serialized (see [`codec`])
//! and stored next to them, keyed by the class name. The next run that verifies the same class
//! finds the snippets and only has to resolve them, without walking the bytecode again.
//!
//! Caches are first-writer-wins: once a class has snippets stored, they are never replaced.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::io;

mod binary_format;
pub mod codec;
mod dedup;
mod directory;

pub use binary_format::*;
pub use dedup::*;
pub use directory::*;

/// Problem with a shared cache or its contents
#[derive(Debug)]
pub enum CacheError {
    /// Reading or writing the underlying storage failed
    IoError(io::Error),

    /// A stored buffer doesn't follow the snippet format
    MalformedBuffer { offset: usize, reason: &'static str },
}

impl From<io::Error> for CacheError {
    fn from(err: io::Error) -> CacheError {
        CacheError::IoError(err)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::IoError(err) => write!(f, "cache I/O error: {}", err),
            CacheError::MalformedBuffer { offset, reason } => {
                write!(f, "malformed snippet buffer at offset {}: {}", offset, reason)
            }
        }
    }
}

/// Key under which the snippets of a class are stored
///
/// This is just the class name: a class in the shared cache has exactly one definition.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct CacheKey(Box<[u8]>);

impl CacheKey {
    pub fn for_class(class_name: &[u8]) -> CacheKey {
        CacheKey(Box::from(class_name))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// What happened when storing a buffer
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Stored {
    /// The buffer is now in the cache
    Written,

    /// Another writer got there first, and its buffer was kept
    AlreadyPresent,
}

/// Cross-process cache of serialized snippet buffers
///
/// Both operations must be atomic with respect to other users of the cache.
pub trait SharedCache {
    /// Fetch the buffer stored under a key
    fn find(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store a buffer, unless something is already stored under the key
    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<Stored, CacheError>;
}

/// In-memory cache, shared between threads of one process
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, Box<[u8]>>>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of stored buffers
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl SharedCache for MemoryCache {
    fn find(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.entries.lock().get(key).map(|bytes| bytes.to_vec()))
    }

    fn store(&self, key: &CacheKey, bytes: &[u8]) -> Result<Stored, CacheError> {
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(Stored::AlreadyPresent);
        }
        entries.insert(key.clone(), Box::from(bytes));
        Ok(Stored::Written)
    }
}
