use crate::Error;
use std::collections::HashMap;

/// Remembers where names were written while serializing snippets
///
/// Every snippet refers to two names, and most classes refer to the same handful of names over
/// and over. Each name gets written once, and later snippets point back at that first record.
/// How the written names are tracked depends on how many snippets there are (see [`choose`]),
/// but the buffer looks the same either way.
pub trait NameDedup<'n> {
    /// Position of the record for this name, if it was already written
    fn lookup(&self, name: &[u8]) -> Option<u32>;

    /// Remember the position of the record just written for this name
    fn remember(&mut self, name: &'n [u8], position: u32) -> Result<(), Error>;
}

/// Pick a strategy for a given number of snippets
///
/// A single snippet needs no real index. Up to `linear_threshold` snippets, scanning a small
/// array beats hashing. Past that, a hash table keyed by the name bytes.
pub fn choose<'n>(
    snippet_count: usize,
    linear_threshold: usize,
) -> Result<Box<dyn NameDedup<'n> + 'n>, Error> {
    if snippet_count <= 1 {
        Ok(Box::new(Direct::default()))
    } else if snippet_count <= linear_threshold {
        Ok(Box::new(LinearScan::with_capacity(2 * linear_threshold)?))
    } else {
        Ok(Box::new(HashTable::with_capacity(2 * snippet_count)?))
    }
}

/// One snippet has at most two distinct names, so the only possible repeat is of the first
#[derive(Default)]
pub struct Direct<'n> {
    first: Option<(&'n [u8], u32)>,
}

impl<'n> NameDedup<'n> for Direct<'n> {
    fn lookup(&self, name: &[u8]) -> Option<u32> {
        match self.first {
            Some((first, position)) if first == name => Some(position),
            _ => None,
        }
    }

    fn remember(&mut self, name: &'n [u8], position: u32) -> Result<(), Error> {
        if self.first.is_none() {
            self.first = Some((name, position));
        }
        Ok(())
    }
}

/// Fixed capacity array of written names, scanned in order
pub struct LinearScan<'n> {
    written: Vec<(&'n [u8], u32)>,
}

impl<'n> LinearScan<'n> {
    pub fn with_capacity(capacity: usize) -> Result<LinearScan<'n>, Error> {
        let mut written = Vec::new();
        written.try_reserve_exact(capacity)?;
        Ok(LinearScan { written })
    }
}

impl<'n> NameDedup<'n> for LinearScan<'n> {
    fn lookup(&self, name: &[u8]) -> Option<u32> {
        self.written
            .iter()
            .find(|(written, _)| *written == name)
            .map(|(_, position)| *position)
    }

    fn remember(&mut self, name: &'n [u8], position: u32) -> Result<(), Error> {
        self.written.try_reserve(1)?;
        self.written.push((name, position));
        Ok(())
    }
}

/// Hash table keyed by the exact name bytes
pub struct HashTable<'n> {
    written: HashMap<&'n [u8], u32>,
}

impl<'n> HashTable<'n> {
    pub fn with_capacity(capacity: usize) -> Result<HashTable<'n>, Error> {
        let mut written = HashMap::new();
        written.try_reserve(capacity)?;
        Ok(HashTable { written })
    }
}

impl<'n> NameDedup<'n> for HashTable<'n> {
    fn lookup(&self, name: &[u8]) -> Option<u32> {
        self.written.get(name).copied()
    }

    fn remember(&mut self, name: &'n [u8], position: u32) -> Result<(), Error> {
        self.written.try_reserve(1)?;
        self.written.entry(name).or_insert(position);
        Ok(())
    }
}
