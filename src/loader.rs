use crate::cache::SharedCache;
use crate::class_graph::{ClassData, ClassGraph, ClassGraphArenas, ClassId, JavaClasses};
use crate::name_list::ClassNameList;
use crate::names::{ClassName, Name};
use crate::relationships::{RelationshipStore, Validation};
use crate::settings::Settings;
use crate::verifier::{
    ClassUnit, ObligationRecorder, RelationshipVerifier, UnitReport, UnitVerifier,
};
use crate::Error;
use std::fmt;

/// Class loader, as far as relationship verification is concerned
///
/// It owns the classes it has defined and the relationships that are still waiting on classes it
/// hasn't defined yet. Defining a class replays the relationships waiting on it.
pub struct ClassLoader<'g> {
    classes: ClassGraph<'g>,
    relationships: RelationshipStore,
}

impl<'g> ClassLoader<'g> {
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> ClassLoader<'g> {
        ClassLoader {
            classes: ClassGraph::new(arenas),
            relationships: RelationshipStore::new(),
        }
    }

    /// Define the standard classes without checking them
    pub fn insert_java_library_types(&self) -> JavaClasses<'g> {
        self.classes.insert_java_library_types()
    }

    pub fn classes(&self) -> &ClassGraph<'g> {
        &self.classes
    }

    pub fn relationships(&self) -> &RelationshipStore {
        &self.relationships
    }

    /// Verifier that checks relationships against this loader's classes
    pub fn relationship_verifier(&mut self) -> RelationshipVerifier<'_, ClassGraph<'g>> {
        RelationshipVerifier::new(&self.classes, &mut self.relationships)
    }

    /// Define a new class
    ///
    /// The class only becomes visible once all of the relationships that were deferred on it
    /// hold. If one doesn't, the class is not defined and the relationships stay pending.
    ///
    /// Validation needs a handle to the class, so the class data is allocated first. A rejected
    /// definition is never published, but its allocation lives as long as the arenas do.
    pub fn define_class(&mut self, data: ClassData<'g>) -> Result<ClassId<'g>, DefineError<'g>> {
        if self.classes.lookup_class(data.name.as_bytes()).is_some() {
            return Err(DefineError::AlreadyDefined(data.name));
        }

        let class = self.classes.allocate_class(data);
        let validation = self
            .relationships
            .validate(&self.classes, class.name.as_bytes(), class);
        if let Validation::Invalid(offending) = validation {
            log::debug!("Rejecting {:?} because of {:?}", class, offending);
            return Err(DefineError::Violation { class, offending });
        }

        self.classes.publish_class(class);
        Ok(class)
    }

    /// Verify the relationships needed by the bytecode of a class
    ///
    /// See [`UnitVerifier::verify`].
    pub fn verify_class<'s, F>(
        &'s mut self,
        settings: &'s Settings,
        cache: Option<&'s dyn SharedCache>,
        unit: &ClassUnit,
        names: &mut ClassNameList,
        walk: F,
    ) -> Result<UnitReport<ClassId<'g>>, Error>
    where
        F: FnOnce(&mut ObligationRecorder<'_, 's, ClassGraph<'g>>) -> Result<(), Error>,
    {
        let mut unit_verifier = UnitVerifier::new(settings, self.relationship_verifier());
        if let Some(cache) = cache {
            unit_verifier = unit_verifier.with_cache(cache);
        }
        unit_verifier.verify(unit, names, walk)
    }

    /// Drop every relationship still waiting on a class
    pub fn unload(&mut self) {
        self.relationships.free_all();
    }
}

/// Why a class couldn't be defined
pub enum DefineError<'g> {
    /// A class of the same name is already defined
    AlreadyDefined(ClassName),

    /// The class breaks a relationship that was deferred on it
    Violation {
        class: ClassId<'g>,
        offending: ClassId<'g>,
    },
}

impl<'g> fmt::Debug for DefineError<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineError::AlreadyDefined(name) => write!(f, "{} is already defined", name),
            DefineError::Violation { class, offending } => write!(
                f,
                "{:?} breaks a deferred relationship with {:?}",
                class, offending
            ),
        }
    }
}
