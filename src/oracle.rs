use crate::names::{ClassName, Name};
use std::fmt::Debug;

/// View onto the classes that a class loader has already loaded
///
/// Relationship verification never loads classes itself: it only asks whether a class is
/// already there, and if so, what it looks like. Anything that isn't loaded yet gets deferred.
pub trait ClassOracle {
    /// Handle to a loaded class
    type Class: Copy + Debug;

    /// Find a class by name, but only if it has already been loaded
    fn find_loaded(&self, name: &[u8]) -> Option<Self::Class>;

    /// Is the class an interface?
    fn is_interface(&self, class: Self::Class) -> bool;

    /// Is `super_type` the same class as `sub_type` or one of its super types?
    fn is_same_or_supertype(&self, super_type: Self::Class, sub_type: Self::Class) -> bool;

    /// `java/lang/Throwable`, which is loaded before any class that could need it
    fn throwable(&self) -> Option<Self::Class> {
        self.find_loaded(ClassName::THROWABLE.as_bytes())
    }
}
