use super::compatible::{check_compatible, Compatibility, VerificationType};
use super::engine::{Rejection, RelationshipVerifier, Resolution, Verdict};
use crate::cache::codec::{self, SnippetBuffer};
use crate::cache::{CacheError, CacheKey, SharedCache, Stored};
use crate::name_list::{ClassNameList, NameIndex};
use crate::oracle::ClassOracle;
use crate::settings::Settings;
use crate::snippets::SnippetTable;
use crate::Error;

/// Class files older than this have no stack maps, and never get their snippets cached
pub const MAJOR_VERSION_REQUIRING_STACKMAPS: u16 = 51;

/// Class being verified
#[derive(Copy, Clone, Debug)]
pub struct ClassUnit<'u> {
    /// Name of the class, written as `my/pkg/Klass`
    pub name: &'u [u8],

    /// Class file major version
    pub major_version: u16,

    /// Is the class itself stored in the shared cache?
    pub in_shared_cache: bool,
}

/// What the shared cache contributed to verifying a class
#[derive(Debug)]
pub enum CacheOutcome {
    /// Snippets weren't cached for this class
    Disabled,

    /// Snippets were found in the cache, so the bytecode wasn't walked
    Hit,

    /// Snippets were discovered and stored in the cache
    Stored,

    /// Snippets were discovered, but someone else stored them first
    AlreadyStored,

    /// No relationships were discovered, so there was nothing to cache
    NothingToStore,

    /// The cache failed, and the bytecode was walked without it
    Failed(CacheError),
}

/// Outcome of verifying the relationships of one class
#[derive(Debug)]
pub struct UnitReport<C> {
    pub verdict: Verdict<C>,
    pub cache: CacheOutcome,
}

/// Verifies the relationships of whole classes
///
/// The caller supplies the bytecode walk as a closure: it gets an [`ObligationRecorder`] and
/// reports every relationship the bytecode needs. Depending on the settings and on the class,
/// those relationships are either resolved immediately or recorded as snippets, cached, and then
/// resolved. When the snippets of a class are already cached, the walk is skipped entirely.
pub struct UnitVerifier<'a, O: ClassOracle> {
    settings: &'a Settings,
    verifier: RelationshipVerifier<'a, O>,
    cache: Option<&'a dyn SharedCache>,
}

impl<'a, O: ClassOracle> UnitVerifier<'a, O> {
    pub fn new(settings: &'a Settings, verifier: RelationshipVerifier<'a, O>) -> Self {
        UnitVerifier {
            settings,
            verifier,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: &'a dyn SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn caches_snippets(&self, unit: &ClassUnit) -> bool {
        self.settings.caches_snippets()
            && unit.in_shared_cache
            && unit.major_version >= MAJOR_VERSION_REQUIRING_STACKMAPS
    }

    /// Verify the relationships of one class
    ///
    /// `names` is the name list of this verification pass, and `walk` reports relationships
    /// through the recorder it is given. Errors are either allocation failures or errors from the
    /// walk itself. Cache failures never make verification fail: they get reported in
    /// [`UnitReport::cache`] and the class is verified without the cache.
    pub fn verify<F>(
        &mut self,
        unit: &ClassUnit,
        names: &mut ClassNameList,
        walk: F,
    ) -> Result<UnitReport<O::Class>, Error>
    where
        F: FnOnce(&mut ObligationRecorder<'_, 'a, O>) -> Result<(), Error>,
    {
        let cache = match self.cache {
            Some(cache) if self.caches_snippets(unit) => cache,
            _ => return self.verify_directly(names, walk, CacheOutcome::Disabled),
        };

        let key = CacheKey::for_class(unit.name);
        let failure = match cache.find(&key) {
            Ok(Some(bytes)) => match SnippetBuffer::decode(&bytes) {
                Ok(buffer) => {
                    log::debug!(
                        "Found {} cached snippets for '{}'",
                        buffer.len(),
                        String::from_utf8_lossy(unit.name)
                    );
                    let verdict = self.verifier.resolve_all(buffer.iter())?;
                    return Ok(UnitReport {
                        verdict,
                        cache: CacheOutcome::Hit,
                    });
                }
                Err(err) => err,
            },
            Ok(None) => return self.verify_with_snippets(unit, names, walk, cache, key),
            Err(err) => err,
        };

        log::warn!(
            "Ignoring cached snippets for '{}': {}",
            String::from_utf8_lossy(unit.name),
            failure
        );
        self.verify_directly(names, walk, CacheOutcome::Failed(failure))
    }

    /// Walk the bytecode, resolving relationships as they are discovered
    fn verify_directly<F>(
        &mut self,
        names: &mut ClassNameList,
        walk: F,
        cache: CacheOutcome,
    ) -> Result<UnitReport<O::Class>, Error>
    where
        F: FnOnce(&mut ObligationRecorder<'_, 'a, O>) -> Result<(), Error>,
    {
        let mut recorder = ObligationRecorder {
            names,
            mode: RecordMode::Direct {
                verifier: &mut self.verifier,
                rejection: None,
            },
        };
        walk(&mut recorder)?;
        let verdict = match recorder.mode {
            RecordMode::Direct {
                rejection: Some(rejection),
                ..
            } => Verdict::Rejected(rejection),
            _ => Verdict::Verified,
        };
        Ok(UnitReport { verdict, cache })
    }

    /// Walk the bytecode recording snippets, store them, then resolve them
    fn verify_with_snippets<F>(
        &mut self,
        unit: &ClassUnit,
        names: &mut ClassNameList,
        walk: F,
        cache: &dyn SharedCache,
        key: CacheKey,
    ) -> Result<UnitReport<O::Class>, Error>
    where
        F: FnOnce(&mut ObligationRecorder<'_, 'a, O>) -> Result<(), Error>,
    {
        let mut table = SnippetTable::new();
        walk(&mut ObligationRecorder {
            names: &mut *names,
            mode: RecordMode::Snippets(&mut table),
        })?;
        let encoded = codec::serialize(&table, names, self.settings.dedup_linear_threshold);
        let bytes = match encoded {
            Ok(None) => {
                table.dispose();
                return Ok(UnitReport {
                    verdict: Verdict::Verified,
                    cache: CacheOutcome::NothingToStore,
                });
            }
            Ok(Some(bytes)) => {
                table.dispose();
                bytes
            }
            Err(Error::Internal(err)) => {
                log::warn!(
                    "Failed to encode snippets for '{}': {}",
                    String::from_utf8_lossy(unit.name),
                    err
                );
                let verdict = self.resolve_table(&table, names);
                table.dispose();
                return Ok(UnitReport {
                    verdict: verdict?,
                    cache: CacheOutcome::Failed(err),
                });
            }
            Err(err) => return Err(err),
        };

        let outcome = match cache.store(&key, &bytes) {
            Ok(Stored::Written) => {
                log::debug!(
                    "Stored {} bytes of snippets for '{}'",
                    bytes.len(),
                    String::from_utf8_lossy(unit.name)
                );
                CacheOutcome::Stored
            }
            Ok(Stored::AlreadyPresent) => CacheOutcome::AlreadyStored,
            Err(err) => {
                log::warn!(
                    "Failed to store snippets for '{}': {}",
                    String::from_utf8_lossy(unit.name),
                    err
                );
                CacheOutcome::Failed(err)
            }
        };

        let buffer = SnippetBuffer::decode(&bytes)?;
        let verdict = self.verifier.resolve_all(buffer.iter())?;
        Ok(UnitReport {
            verdict,
            cache: outcome,
        })
    }

    /// Resolve recorded snippets straight from the table, without going through a buffer
    fn resolve_table(
        &mut self,
        table: &SnippetTable,
        names: &ClassNameList,
    ) -> Result<Verdict<O::Class>, Error> {
        let mut pairs: Vec<(&[u8], &[u8])> = Vec::new();
        pairs.try_reserve_exact(table.len())?;
        for snippet in table.iter() {
            pairs.push((names.lookup(snippet.source)?, names.lookup(snippet.target)?));
        }
        self.verifier.resolve_all(pairs)
    }
}

enum RecordMode<'r, 'a, O: ClassOracle> {
    /// Relationships are recorded for later
    Snippets(&'r mut SnippetTable),

    /// Relationships are resolved right away, remembering the first one that doesn't hold
    Direct {
        verifier: &'r mut RelationshipVerifier<'a, O>,
        rejection: Option<Rejection<O::Class>>,
    },
}

/// Receives the relationships discovered while walking the bytecode of a class
pub struct ObligationRecorder<'r, 'a, O: ClassOracle> {
    names: &'r mut ClassNameList,
    mode: RecordMode<'r, 'a, O>,
}

impl<'r, 'a, O: ClassOracle> ObligationRecorder<'r, 'a, O> {
    /// Get the index of a class name (adding it to the name list if needed)
    pub fn intern(&mut self, name: &[u8]) -> Result<NameIndex, Error> {
        self.names.intern(name)
    }

    /// Require that `source` be assignable to `target`
    ///
    /// Returns `false` if the relationship is already known not to hold. Once one relationship
    /// fails, later ones are neither checked nor deferred and also return `false`. When snippets are
    /// being recorded, nothing is known until the walk is over, so this always returns `true`.
    pub fn require(&mut self, source: NameIndex, target: NameIndex) -> Result<bool, Error> {
        match &mut self.mode {
            RecordMode::Snippets(table) => {
                table.record(source, target)?;
                Ok(true)
            }
            RecordMode::Direct {
                verifier,
                rejection,
            } => {
                // The class is already rejected, so nothing else needs to be deferred for it
                if rejection.is_some() {
                    return Ok(false);
                }
                let source_name = self.names.lookup(source)?;
                let target_name = self.names.lookup(target)?;
                match verifier.resolve(source_name, target_name)? {
                    Resolution::Success | Resolution::Deferred => Ok(true),
                    Resolution::Fail { source, target } => {
                        *rejection = Some(Rejection { source, target });
                        Ok(false)
                    }
                }
            }
        }
    }

    /// Check if a value of type `source` can be used where `target` is expected
    ///
    /// Relationships between classes go through [`ObligationRecorder::require`].
    pub fn is_class_compatible(
        &mut self,
        source: &VerificationType,
        target: &VerificationType,
    ) -> Result<bool, Error> {
        match check_compatible(source, target, self.names)? {
            Compatibility::Compatible => Ok(true),
            Compatibility::Incompatible => Ok(false),
            Compatibility::Requires { source, target } => self.require(source, target),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{CacheOutcome, ClassUnit, UnitVerifier};
    use crate::cache::{CacheError, MemoryCache};
    use crate::class_graph::{ClassGraph, ClassGraphArenas};
    use crate::name_list::ClassNameList;
    use crate::relationships::RelationshipStore;
    use crate::settings::Settings;
    use crate::verifier::{RefType, RelationshipVerifier, Verdict, VerificationType};

    const APP: ClassUnit = ClassUnit {
        name: b"me/App",
        major_version: 52,
        in_shared_cache: true,
    };

    #[test]
    fn direct_mode_without_cache() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let mut store = RelationshipStore::new();
        let settings = Settings::enabled();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store));

        let mut names = ClassNameList::new();
        let report = unit_verifier
            .verify(&APP, &mut names, |recorder| {
                let number = recorder.intern(b"java/lang/Number")?;
                let integer = recorder.intern(b"java/lang/Integer")?;
                let number = VerificationType::Object(RefType::Object(number));
                let integer = VerificationType::Object(RefType::Object(integer));
                assert!(recorder.is_class_compatible(&integer, &number)?);
                assert!(!recorder.is_class_compatible(&number, &integer)?);
                assert!(!recorder.is_class_compatible(&VerificationType::Long, &number)?);
                Ok(())
            })
            .unwrap();

        assert!(matches!(report.cache, CacheOutcome::Disabled));
        match report.verdict {
            Verdict::Rejected(rejection) => {
                assert_eq!(rejection.source, java.number);
                assert_eq!(rejection.target, java.integer);
            }
            Verdict::Verified => panic!("java.lang.Number </: java.lang.Integer"),
        }
    }

    #[test]
    fn snippets_are_cached() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();
        let settings = Settings::enabled();
        let cache = MemoryCache::new();

        let mut store = RelationshipStore::new();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store))
                .with_cache(&cache);
        let report = unit_verifier
            .verify(&APP, &mut ClassNameList::new(), |recorder| {
                let sub = recorder.intern(b"me/Sub")?;
                let base = recorder.intern(b"me/Base")?;
                assert!(recorder.require(sub, base)?);
                Ok(())
            })
            .unwrap();
        assert!(report.verdict.is_verified());
        assert!(matches!(report.cache, CacheOutcome::Stored));
        assert_eq!(cache.len(), 1);
        assert!(store.entry(b"me/Sub").is_some(), "deferred after resolving snippets");

        // Second run never walks the bytecode
        let mut store = RelationshipStore::new();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store))
                .with_cache(&cache);
        let report = unit_verifier
            .verify(&APP, &mut ClassNameList::new(), |_| {
                panic!("cached snippets should have been used")
            })
            .unwrap();
        assert!(report.verdict.is_verified());
        assert!(matches!(report.cache, CacheOutcome::Hit));
        assert!(store.entry(b"me/Sub").is_some());
    }

    #[test]
    fn old_classes_are_not_cached() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();
        let settings = Settings::enabled();
        let cache = MemoryCache::new();
        let mut store = RelationshipStore::new();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store))
                .with_cache(&cache);

        let old = ClassUnit {
            major_version: 50,
            ..APP
        };
        let report = unit_verifier
            .verify(&old, &mut ClassNameList::new(), |recorder| {
                let sub = recorder.intern(b"me/Sub")?;
                let base = recorder.intern(b"me/Base")?;
                recorder.require(sub, base)?;
                Ok(())
            })
            .unwrap();
        assert!(matches!(report.cache, CacheOutcome::Disabled));
        assert!(cache.is_empty());
    }

    #[test]
    fn nothing_is_deferred_after_a_rejection() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        let java = class_graph.insert_java_library_types();
        let mut store = RelationshipStore::new();
        let settings = Settings::new();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store));

        let report = unit_verifier
            .verify(&APP, &mut ClassNameList::new(), |recorder| {
                let object = recorder.intern(b"java/lang/Object")?;
                let string = recorder.intern(b"java/lang/String")?;
                let sub = recorder.intern(b"me/Sub")?;
                let base = recorder.intern(b"me/Base")?;
                assert!(!recorder.require(object, string)?);
                assert!(
                    !recorder.require(sub, base)?,
                    "the class is already rejected"
                );
                Ok(())
            })
            .unwrap();

        match report.verdict {
            Verdict::Rejected(rejection) => {
                assert_eq!(rejection.source, java.object);
                assert_eq!(rejection.target, java.string);
            }
            Verdict::Verified => panic!("java.lang.Object </: java.lang.String"),
        }
        assert!(store.entry(b"me/Sub").is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn unencodable_snippets_are_resolved_anyway() {
        let arenas = ClassGraphArenas::new();
        let class_graph = ClassGraph::new(&arenas);
        class_graph.insert_java_library_types();
        let settings = Settings::enabled();
        let cache = MemoryCache::new();
        let mut store = RelationshipStore::new();
        let mut unit_verifier =
            UnitVerifier::new(&settings, RelationshipVerifier::new(&class_graph, &mut store))
                .with_cache(&cache);

        let long_name = vec![b'a'; 70000];
        let report = unit_verifier
            .verify(&APP, &mut ClassNameList::new(), |recorder| {
                let source = recorder.intern(&long_name)?;
                let base = recorder.intern(b"me/Base")?;
                recorder.require(source, base)?;
                Ok(())
            })
            .unwrap();

        assert!(report.verdict.is_verified());
        assert!(matches!(
            report.cache,
            CacheOutcome::Failed(CacheError::MalformedBuffer { .. })
        ));
        assert!(cache.is_empty());
        let entry = store.entry(&long_name).expect("relationship deferred");
        assert_eq!(entry.parents().collect::<Vec<_>>(), vec![&b"me/Base"[..]]);
    }
}
