//! Relationships discovered while verifying one class
//!
//! When the relationships of a class are going to be cached, the verifier doesn't resolve them
//! as it walks the bytecode. It records each required relationship as a [`Snippet`] (a pair of
//! indices into the class name list) and resolves all of them once the walk is done.

use crate::name_list::NameIndex;
use crate::Error;
use std::collections::HashSet;

/// Requirement that the class at `source` be assignable to the class at `target`
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Snippet {
    pub source: NameIndex,
    pub target: NameIndex,
}

/// Set of snippets recorded during one verification pass
#[derive(Default)]
pub struct SnippetTable {
    snippets: HashSet<Snippet>,
}

impl SnippetTable {
    pub fn new() -> SnippetTable {
        SnippetTable {
            snippets: HashSet::new(),
        }
    }

    /// Record a snippet, unless an identical one is already recorded
    pub fn record(&mut self, source: NameIndex, target: NameIndex) -> Result<(), Error> {
        let snippet = Snippet { source, target };
        if self.snippets.contains(&snippet) {
            return Ok(());
        }

        self.snippets.try_reserve(1)?;
        self.snippets.insert(snippet);
        log::trace!("Recorded snippet {:?} <: {:?}", source, target);
        Ok(())
    }

    /// Number of distinct snippets recorded
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Iterate over the snippets (in no particular order)
    pub fn iter(&self) -> impl Iterator<Item = Snippet> + '_ {
        self.snippets.iter().copied()
    }

    /// Release the table once its snippets have been resolved or serialized
    pub fn dispose(self) {
        log::trace!("Disposing of {} snippets", self.snippets.len());
    }
}

#[cfg(test)]
mod test {
    use super::{Snippet, SnippetTable};
    use crate::name_list::NameIndex;

    #[test]
    fn recording_is_idempotent() {
        let mut table = SnippetTable::new();
        assert!(table.is_empty());

        table.record(NameIndex(1), NameIndex(2)).unwrap();
        table.record(NameIndex(1), NameIndex(2)).unwrap();
        assert_eq!(table.len(), 1);

        // Direction matters
        table.record(NameIndex(2), NameIndex(1)).unwrap();
        assert_eq!(table.len(), 2);

        let mut snippets: Vec<Snippet> = table.iter().collect();
        snippets.sort_by_key(|snippet| (snippet.source, snippet.target));
        assert_eq!(
            snippets,
            vec![
                Snippet {
                    source: NameIndex(1),
                    target: NameIndex(2)
                },
                Snippet {
                    source: NameIndex(2),
                    target: NameIndex(1)
                },
            ]
        );
        table.dispose();
    }
}
