//! Class names referenced while verifying one class
//!
//! Verification types refer to classes by [`NameIndex`] rather than by name, which keeps them
//! small and cheap to compare. The list is scoped to a single verification pass and is
//! append-only: once a name has an index, that index never changes.

use crate::names::ClassName;
use crate::Error;
use std::collections::HashMap;

/// Index into a [`ClassNameList`]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct NameIndex(pub u32);

impl NameIndex {
    /// `java/lang/Object` is always the first name in the list
    pub const OBJECT: NameIndex = NameIndex(0);
}

pub struct ClassNameList {
    names: Vec<ClassName>,
    indices: HashMap<ClassName, NameIndex>,
}

impl ClassNameList {
    /// Make a fresh list containing only `java/lang/Object`
    pub fn new() -> ClassNameList {
        let mut indices = HashMap::new();
        indices.insert(ClassName::OBJECT, NameIndex::OBJECT);
        ClassNameList {
            names: vec![ClassName::OBJECT],
            indices,
        }
    }

    /// Get or insert a name into the list
    pub fn intern(&mut self, name: &[u8]) -> Result<NameIndex, Error> {
        if let Some(idx) = self.indices.get(name) {
            return Ok(*idx);
        }

        let idx = NameIndex(self.names.len() as u32);
        self.names.try_reserve(1)?;
        self.indices.try_reserve(1)?;
        let mut owned = Vec::new();
        owned.try_reserve_exact(name.len())?;
        owned.extend_from_slice(name);
        let name = ClassName::from_bytes_unchecked(owned);
        self.names.push(name.clone());
        self.indices.insert(name, idx);
        Ok(idx)
    }

    /// Look up the name at an index
    pub fn get(&self, index: NameIndex) -> Option<&[u8]> {
        self.names.get(index.0 as usize).map(|name| name.as_ref())
    }

    /// Look up the name at an index, failing if it is out of bounds
    pub(crate) fn lookup(&self, index: NameIndex) -> Result<&[u8], Error> {
        self.get(index).ok_or(Error::InvalidNameIndex(index))
    }

    /// Number of names in the list
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassNameList {
    fn default() -> Self {
        Self::new()
    }
}
