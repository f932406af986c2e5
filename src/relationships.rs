//! Relationships that are waiting on classes to be loaded
//!
//! Every class loader owns one [`RelationshipStore`]. When verification can't decide whether
//! `child` is assignable to `parent` (because one of them isn't loaded yet), it records `parent`
//! as a pending parent of `child`. Later, when `child` itself finishes loading, its pending
//! parents get checked against the real class ([`RelationshipStore::validate`]) and, if they all
//! hold, the record is dropped.
//!
//! Some records need even more patience: if `child` is loaded but `parent` still isn't, the only
//! way the relationship can hold is if `parent` turns out to be an interface (the verifier is
//! always permissive about interfaces). That requirement gets moved onto the `parent`'s own
//! record as [`RelationshipFlags::MUST_BE_INTERFACE`].
//!
//! Access to the store isn't synchronized: callers must make sure only one thread defines
//! classes in a given class loader at a time.

use crate::names::{copy_name, ClassName, Name};
use crate::oracle::ClassOracle;
use crate::Error;
use bitflags::bitflags;
use std::cmp::Ordering;
use std::collections::HashMap;

bitflags! {
    /// Requirements on a class that aren't expressed as parent names
    #[derive(Default)]
    pub struct RelationshipFlags: u8 {
        /// The class must be a subclass of `java/lang/Throwable`
        ///
        /// This is by far the most common parent (any class that gets thrown or caught) so it
        /// gets a flag instead of a parent entry.
        const PARENT_IS_THROWABLE = 0x01;

        /// The class must turn out to be an interface
        const MUST_BE_INTERFACE = 0x02;
    }
}

/// Pending requirements on a single class
#[derive(Default, Debug)]
pub struct RelationshipEntry {
    flags: RelationshipFlags,

    /// Names of required super types, sorted by increasing length and without duplicates
    parents: Vec<Box<[u8]>>,
}

impl RelationshipEntry {
    pub fn flags(&self) -> RelationshipFlags {
        self.flags
    }

    /// Names of required super types (in increasing order of length)
    pub fn parents(&self) -> impl ExactSizeIterator<Item = &[u8]> + '_ {
        self.parents.iter().map(|parent| &**parent)
    }

    /// Add a required super type
    ///
    /// If allocation fails, the entry is left with the parents it already had.
    fn add_parent(&mut self, parent: &[u8]) -> Result<(), Error> {
        if parent == ClassName::THROWABLE.as_bytes() {
            self.flags |= RelationshipFlags::PARENT_IS_THROWABLE;
            return Ok(());
        }

        // Find the first strictly longer parent, bailing out if this one is already there
        let mut insert_at = self.parents.len();
        for (idx, existing) in self.parents.iter().enumerate() {
            match existing.len().cmp(&parent.len()) {
                Ordering::Less => continue,
                Ordering::Equal if &**existing == parent => return Ok(()),
                Ordering::Equal => continue,
                Ordering::Greater => {
                    insert_at = idx;
                    break;
                }
            }
        }

        self.parents.try_reserve(1)?;
        let parent = copy_name(parent)?;
        log::trace!(
            "Inserting pending parent '{}' at {}",
            String::from_utf8_lossy(&parent),
            insert_at
        );
        self.parents.insert(insert_at, parent);
        Ok(())
    }
}

/// Outcome of checking the pending relationships of a newly loaded class
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Validation<C> {
    /// All pending relationships hold (or there were none)
    Valid,

    /// A pending relationship doesn't hold because of the given class
    Invalid(C),
}

/// Pending relationships, keyed by the name of the class they constrain
#[derive(Default)]
pub struct RelationshipStore {
    entries: HashMap<Box<[u8]>, RelationshipEntry>,
}

impl RelationshipStore {
    pub fn new() -> RelationshipStore {
        RelationshipStore {
            entries: HashMap::new(),
        }
    }

    /// Record that `child` must be assignable to `parent`
    ///
    /// Recording the same relationship twice has the same effect as recording it once.
    pub fn record_obligation(&mut self, child: &[u8], parent: &[u8]) -> Result<(), Error> {
        log::debug!(
            "Deferring '{}' <: '{}'",
            String::from_utf8_lossy(child),
            String::from_utf8_lossy(parent)
        );

        if let Some(entry) = self.entries.get_mut(child) {
            return entry.add_parent(parent);
        }

        // Only allocate once we know the entry isn't there
        let key = copy_name(child)?;
        self.entries.try_reserve(1)?;
        let mut entry = RelationshipEntry::default();
        let added = entry.add_parent(parent);
        self.entries.insert(key, entry);
        added
    }

    /// Record that `name` must turn out to be an interface
    fn require_interface(&mut self, name: &[u8]) -> Result<(), Error> {
        log::debug!(
            "Deferring '{}' is an interface",
            String::from_utf8_lossy(name)
        );

        if let Some(entry) = self.entries.get_mut(name) {
            entry.flags |= RelationshipFlags::MUST_BE_INTERFACE;
            return Ok(());
        }

        let key = copy_name(name)?;
        self.entries.try_reserve(1)?;
        self.entries.insert(
            key,
            RelationshipEntry {
                flags: RelationshipFlags::MUST_BE_INTERFACE,
                parents: vec![],
            },
        );
        Ok(())
    }

    /// Check the pending relationships of a class that just finished loading
    ///
    /// On success, the pending relationships are consumed: validating the same name again will
    /// trivially succeed. On failure, they are left in place.
    pub fn validate<O: ClassOracle>(
        &mut self,
        oracle: &O,
        child_name: &[u8],
        child: O::Class,
    ) -> Validation<O::Class> {
        let (key, entry) = match self.entries.remove_entry(child_name) {
            None => return Validation::Valid,
            Some(found) => found,
        };

        let validation = self.check_entry(oracle, &entry, child_name, child);
        match validation {
            Validation::Valid => {
                log::debug!(
                    "Pending relationships of '{}' hold",
                    String::from_utf8_lossy(child_name)
                );
            }
            Validation::Invalid(offending) => {
                log::debug!(
                    "Pending relationships of '{}' broken by {:?}",
                    String::from_utf8_lossy(child_name),
                    offending
                );
                self.entries.insert(key, entry);
            }
        }
        validation
    }

    fn check_entry<O: ClassOracle>(
        &mut self,
        oracle: &O,
        entry: &RelationshipEntry,
        child_name: &[u8],
        child: O::Class,
    ) -> Validation<O::Class> {
        if entry.flags.contains(RelationshipFlags::MUST_BE_INTERFACE) && !oracle.is_interface(child)
        {
            return Validation::Invalid(child);
        }

        if entry.flags.contains(RelationshipFlags::PARENT_IS_THROWABLE) {
            match oracle.throwable() {
                Some(throwable) if oracle.is_same_or_supertype(throwable, child) => (),
                Some(throwable) => return Validation::Invalid(throwable),
                None => return Validation::Invalid(child),
            }
        }

        for parent_name in entry.parents() {
            if parent_name == child_name {
                continue;
            }

            match oracle.find_loaded(parent_name) {
                // The parent can only be valid if it turns out to be an interface
                None => {
                    if self.require_interface(parent_name).is_err() {
                        return Validation::Invalid(child);
                    }
                }
                Some(parent) if oracle.is_interface(parent) => (),
                Some(parent) if oracle.is_same_or_supertype(parent, child) => (),
                Some(parent) => return Validation::Invalid(parent),
            }
        }

        Validation::Valid
    }

    /// Pending relationships for a class, if there are any
    pub fn entry(&self, name: &[u8]) -> Option<&RelationshipEntry> {
        self.entries.get(name)
    }

    /// Number of classes with pending relationships
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every pending relationship (eg. when the class loader is unloaded)
    pub fn free_all(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Freeing {} pending relationships", self.entries.len());
        }
        self.entries.clear();
    }
}
