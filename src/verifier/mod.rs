//! Deciding (or deferring) whether one class is assignable to another
//!
//! [`RelationshipVerifier`] answers single questions of the form "must `source` be assignable to
//! `target`?" against the classes loaded so far, pushing anything it can't answer yet into the
//! class loader's [`crate::relationships::RelationshipStore`]. [`UnitVerifier`] drives a whole
//! class through that process, optionally going through a shared cache of snippets.

mod compatible;
mod engine;
mod unit;

pub use compatible::*;
pub use engine::*;
pub use unit::*;
