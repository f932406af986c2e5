use crate::oracle::ClassOracle;
use crate::relationships::RelationshipStore;
use crate::Error;

/// Result of checking one relationship
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Resolution<C> {
    /// The relationship holds
    Success,

    /// One of the classes isn't loaded yet, so the relationship got recorded for later
    Deferred,

    /// Both classes are loaded and `source` is not assignable to `target`
    Fail { source: C, target: C },
}

/// The pair of classes that caused a rejection
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Rejection<C> {
    pub source: C,
    pub target: C,
}

/// Result of checking a batch of relationships
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Verdict<C> {
    /// Every relationship either holds or was deferred
    Verified,

    /// The first relationship found not to hold
    Rejected(Rejection<C>),
}

impl<C> Verdict<C> {
    pub fn is_verified(&self) -> bool {
        matches!(self, Verdict::Verified)
    }
}

/// Checks relationships against loaded classes, deferring the ones that can't be decided yet
pub struct RelationshipVerifier<'a, O: ClassOracle> {
    oracle: &'a O,
    store: &'a mut RelationshipStore,
}

impl<'a, O: ClassOracle> RelationshipVerifier<'a, O> {
    pub fn new(oracle: &'a O, store: &'a mut RelationshipStore) -> Self {
        RelationshipVerifier { oracle, store }
    }

    /// Check that `source` is the same as or a subtype of `target`
    ///
    /// The only error is running out of memory while recording a deferred relationship.
    pub fn resolve(&mut self, source: &[u8], target: &[u8]) -> Result<Resolution<O::Class>, Error> {
        let target_class = match self.oracle.find_loaded(target) {
            None => return self.defer(source, target),
            Some(target_class) => target_class,
        };

        // Interfaces are treated like `java/lang/Object` by the verifier
        if self.oracle.is_interface(target_class) {
            return Ok(Resolution::Success);
        }

        let source_class = match self.oracle.find_loaded(source) {
            None => return self.defer(source, target),
            Some(source_class) => source_class,
        };

        if self.oracle.is_same_or_supertype(target_class, source_class) {
            Ok(Resolution::Success)
        } else {
            log::debug!(
                "'{}' is not assignable to '{}'",
                String::from_utf8_lossy(source),
                String::from_utf8_lossy(target)
            );
            Ok(Resolution::Fail {
                source: source_class,
                target: target_class,
            })
        }
    }

    /// `source` is always the class that gets the pending parent
    fn defer(&mut self, source: &[u8], target: &[u8]) -> Result<Resolution<O::Class>, Error> {
        self.store.record_obligation(source, target)?;
        Ok(Resolution::Deferred)
    }

    /// Check relationships in order, stopping at the first one that doesn't hold
    pub fn resolve_all<'n, I>(&mut self, pairs: I) -> Result<Verdict<O::Class>, Error>
    where
        I: IntoIterator<Item = (&'n [u8], &'n [u8])>,
    {
        for (source, target) in pairs {
            if let Resolution::Fail { source, target } = self.resolve(source, target)? {
                return Ok(Verdict::Rejected(Rejection { source, target }));
            }
        }
        Ok(Verdict::Verified)
    }
}

#[cfg(test)]
mod test {
    use super::{Rejection, RelationshipVerifier, Resolution, Verdict};
    use crate::class_graph::{ClassData, ClassGraph, ClassGraphArenas};
    use crate::names::{ClassName, Name};
    use crate::relationships::{RelationshipFlags, RelationshipStore};

    #[test]
    fn resolve_truth_table() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let mut store = RelationshipStore::new();
        let mut verifier = RelationshipVerifier::new(&class_graph, &mut store);

        assert_eq!(
            verifier.resolve(b"java/lang/Integer", b"java/lang/Number").unwrap(),
            Resolution::Success,
            "java.lang.Integer <: java.lang.Number"
        );
        assert_eq!(
            verifier.resolve(b"me/Unloaded", b"java/lang/Runnable").unwrap(),
            Resolution::Success,
            "anything <: interface"
        );
        assert_eq!(
            verifier.resolve(b"java/lang/Number", b"java/lang/Integer").unwrap(),
            Resolution::Fail {
                source: java.number,
                target: java.integer
            },
            "java.lang.Number </: java.lang.Integer"
        );
        assert_eq!(
            verifier.resolve(b"me/Unloaded", b"java/lang/Number").unwrap(),
            Resolution::Deferred,
            "unloaded source"
        );
        assert_eq!(
            verifier.resolve(b"java/lang/String", b"me/UnloadedParent").unwrap(),
            Resolution::Deferred,
            "unloaded target"
        );

        assert_eq!(store.len(), 2);
        assert_eq!(
            store.entry(b"java/lang/String").unwrap().parents().collect::<Vec<_>>(),
            vec![&b"me/UnloadedParent"[..]]
        );
    }

    // Deferring a Throwable relationship shouldn't allocate any parent
    #[test]
    fn deferred_throwable() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();
        let mut store = RelationshipStore::new();
        let mut verifier = RelationshipVerifier::new(&class_graph, &mut store);

        assert_eq!(
            verifier.resolve(b"me/MyException", b"java/lang/Throwable").unwrap(),
            Resolution::Deferred
        );
        let entry = store.entry(b"me/MyException").unwrap();
        assert!(entry.flags().contains(RelationshipFlags::PARENT_IS_THROWABLE));
        assert_eq!(entry.parents().len(), 0);
    }

    #[test]
    fn resolve_all_stops_at_first_failure() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let mut store = RelationshipStore::new();
        let mut verifier = RelationshipVerifier::new(&class_graph, &mut store);

        let verdict = verifier
            .resolve_all(vec![
                (&b"me/First"[..], &b"me/Base"[..]),
                (&b"java/lang/Object"[..], &b"java/lang/String"[..]),
                (&b"me/Second"[..], &b"me/Base"[..]),
            ])
            .unwrap();
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection {
                source: java.object,
                target: java.string
            })
        );

        // Only the relationship before the failure got deferred
        assert!(store.entry(b"me/First").is_some());
        assert!(store.entry(b"me/Second").is_none());
    }

    #[test]
    fn resolve_all_with_deferrals() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        class_graph.add_class(ClassData::new(
            ClassName::from_string(String::from("me/Base")).unwrap(),
            java.object,
            false,
        ));
        let mut store = RelationshipStore::new();
        let mut verifier = RelationshipVerifier::new(&class_graph, &mut store);

        let verdict = verifier
            .resolve_all(vec![
                (&b"me/First"[..], &b"me/Base"[..]),
                (&b"java/lang/String"[..], &b"java/lang/CharSequence"[..]),
                (&b"me/Second"[..], &b"me/Base"[..]),
            ])
            .unwrap();
        assert!(verdict.is_verified());
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.entry(b"me/Second").unwrap().parents().collect::<Vec<_>>(),
            vec![&b"me/Base"[..]]
        );
    }
}
