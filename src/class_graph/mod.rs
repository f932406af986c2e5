use crate::names::{ClassName, Name};
use crate::oracle::ClassOracle;
use crate::util::RefId;
use elsa::map::FrozenMap;
use elsa::FrozenVec;
use std::fmt;
use std::fmt::Debug;
use typed_arena::Arena;

mod assignable;
mod java_classes;

pub use assignable::*;
pub use java_classes::*;

/// Handle to a class in the class graph
///
/// Equality and hashing are by identity, so two classes with the same name in different graphs
/// (ie. different class loaders) are different classes.
pub type ClassId<'g> = RefId<'g, ClassData<'g>>;

pub struct ClassGraphArenas<'g> {
    class_arena: Arena<ClassData<'g>>,
}

impl<'g> ClassGraphArenas<'g> {
    pub fn new() -> Self {
        ClassGraphArenas {
            class_arena: Arena::new(),
        }
    }
}

impl<'g> Default for ClassGraphArenas<'g> {
    fn default() -> Self {
        Self::new()
    }
}

/// Classes loaded by one class loader, along with their super types
///
/// The graph is append-only: classes get allocated into an arena and then published under their
/// name. Publishing only needs a shared reference, so handles to earlier classes stay valid while
/// new classes keep getting loaded.
pub struct ClassGraph<'g> {
    arenas: &'g ClassGraphArenas<'g>,
    classes: FrozenMap<ClassName, ClassId<'g>>,
}

impl<'g> ClassGraph<'g> {
    /// New empty graph
    pub fn new(arenas: &'g ClassGraphArenas<'g>) -> Self {
        ClassGraph {
            arenas,
            classes: FrozenMap::new(),
        }
    }

    /// Look up a published class
    pub fn lookup_class(&self, name: &[u8]) -> Option<ClassId<'g>> {
        self.classes.map_get(name, |class| *class)
    }

    /// Allocate a class without publishing it
    ///
    /// The class won't be visible to [`ClassGraph::lookup_class`] until it gets published. This
    /// is how a class loader can check a class before making it available.
    pub fn allocate_class(&self, data: ClassData<'g>) -> ClassId<'g> {
        RefId(&*self.arenas.class_arena.alloc(data))
    }

    /// Publish a class allocated with [`ClassGraph::allocate_class`]
    ///
    /// Returns `false` (and leaves the graph unchanged) if a class of the same name is already
    /// published.
    pub fn publish_class(&self, class: ClassId<'g>) -> bool {
        if self.lookup_class(class.name.as_bytes()).is_some() {
            return false;
        }
        self.classes.insert(class.name.clone(), class);
        true
    }

    /// Add a new class to the class graph
    pub fn add_class(&self, data: ClassData<'g>) -> ClassId<'g> {
        let class = self.allocate_class(data);
        self.publish_class(class);
        class
    }

    /// Add the standard classes that verification relies on
    pub fn insert_java_library_types(&self) -> JavaClasses<'g> {
        JavaClasses::add_to_graph(self)
    }
}

impl<'g> ClassOracle for ClassGraph<'g> {
    type Class = ClassId<'g>;

    fn find_loaded(&self, name: &[u8]) -> Option<ClassId<'g>> {
        self.lookup_class(name)
    }

    fn is_interface(&self, class: ClassId<'g>) -> bool {
        class.is_interface
    }

    fn is_same_or_supertype(&self, super_type: ClassId<'g>, sub_type: ClassId<'g>) -> bool {
        sub_type.is_assignable(&super_type)
    }
}

pub struct ClassData<'g> {
    /// Name of the class
    pub name: ClassName,

    /// Superclass is only ever missing for `java/lang/Object` itself
    pub superclass: Option<ClassId<'g>>,

    /// Interfaces implemented (or super-interfaces)
    pub interfaces: FrozenVec<&'g ClassData<'g>>,

    /// Is this an interface?
    pub is_interface: bool,
}

impl<'g> ClassData<'g> {
    pub fn new(name: ClassName, superclass: ClassId<'g>, is_interface: bool) -> ClassData<'g> {
        ClassData {
            name,
            superclass: Some(superclass),
            interfaces: FrozenVec::new(),
            is_interface,
        }
    }

    /// Add a super-interface
    pub fn add_interface(&self, interface: ClassId<'g>) {
        self.interfaces.push(interface.0);
    }
}

impl<'g> PartialEq for ClassData<'g> {
    fn eq(&self, other: &ClassData<'g>) -> bool {
        self.name == other.name
    }
}

impl<'g> Eq for ClassData<'g> {}

impl<'g> Debug for ClassData<'g> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.name.as_bytes()))
    }
}
