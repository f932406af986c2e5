use crate::cache::CacheError;
use crate::name_list::NameIndex;
use std::collections::TryReserveError;

#[derive(Debug)]
pub enum Error {
    /// An allocation needed to record, defer or serialize relationships failed
    ///
    /// This always aborts verification of the current class.
    OutOfMemory(TryReserveError),

    /// The shared cache failed to find, store, or decode snippets
    ///
    /// This is a problem with the cache and never says anything about the class being verified.
    Internal(CacheError),

    /// A name index that isn't in the class name list (indicates a bug in the caller)
    InvalidNameIndex(NameIndex),
}

impl From<TryReserveError> for Error {
    fn from(err: TryReserveError) -> Error {
        Error::OutOfMemory(err)
    }
}

impl From<CacheError> for Error {
    fn from(err: CacheError) -> Error {
        Error::Internal(err)
    }
}
