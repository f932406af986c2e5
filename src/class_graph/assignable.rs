use crate::class_graph::ClassId;
use crate::util::RefId;
use std::collections::HashSet;

/// Subtyping relationship between loaded classes
pub trait Assignable {
    /// Is the first type the same as, or a subtype of, the second?
    fn is_assignable(&self, super_type: &Self) -> bool;
}

impl<'g> Assignable for ClassId<'g> {
    fn is_assignable(&self, super_type: &ClassId<'g>) -> bool {
        // A class can only inherit from an interface through `interfaces`
        let follow_interfaces = super_type.is_interface;
        SuperTypes::new(*self, follow_interfaces).any(|class| class == *super_type)
    }
}

/// Walk over a class and its (transitive) super types, each visited once
///
/// Interfaces are only followed when asked for, so looking for a superclass stays on the
/// superclass chain.
pub struct SuperTypes<'g> {
    pending: Vec<ClassId<'g>>,
    seen: HashSet<ClassId<'g>>,
    follow_interfaces: bool,
}

impl<'g> SuperTypes<'g> {
    pub fn new(class: ClassId<'g>, follow_interfaces: bool) -> SuperTypes<'g> {
        let mut seen = HashSet::new();
        seen.insert(class);
        SuperTypes {
            pending: vec![class],
            seen,
            follow_interfaces,
        }
    }

    fn enqueue(&mut self, class: ClassId<'g>) {
        if self.seen.insert(class) {
            self.pending.push(class);
        }
    }
}

impl<'g> Iterator for SuperTypes<'g> {
    type Item = ClassId<'g>;

    fn next(&mut self) -> Option<ClassId<'g>> {
        let class = self.pending.pop()?;
        let data = class.0;
        if let Some(superclass) = data.superclass {
            self.enqueue(superclass);
        }
        if self.follow_interfaces {
            for interface in &data.interfaces {
                self.enqueue(RefId(interface));
            }
        }
        Some(class)
    }
}
