//! Deferred class relationship verification
//!
//! When verifying the bytecode of a class, the verifier frequently needs to know whether one
//! class is assignable to another (eg. when a method returns a `Lfoo/Bar;` but the value on the
//! stack is a `Lfoo/Baz;`). Answering that question eagerly means loading both classes, which is
//! expensive and sometimes impossible. Instead, this crate lets the verifier:
//!
//!   - decide immediately when both classes are already loaded,
//!   - otherwise _defer_ the check by recording the required relationship in the
//!     [`relationships::RelationshipStore`] of the class loader, and re-checking it when the
//!     missing class finishes loading ([`relationships::RelationshipStore::validate`]),
//!   - persist the set of relationships a class needs (its _snippets_) into a shared cache, so
//!     that the next run can skip rediscovering them ([`cache`]).
//!
//! ### Simple example
//!
//! ```
//! use crverify::class_graph::{ClassData, ClassGraphArenas};
//! use crverify::loader::ClassLoader;
//! use crverify::verifier::Resolution;
//! use crverify::{ClassName, Name};
//!
//! let arenas = ClassGraphArenas::new();
//! let mut loader = ClassLoader::new(&arenas);
//! let java = loader.insert_java_library_types();
//!
//! // `me/alec/Helper` isn't loaded yet, so the check gets deferred
//! let resolution = loader
//!     .relationship_verifier()
//!     .resolve(b"me/alec/App", b"me/alec/Helper")
//!     .unwrap();
//! assert!(matches!(resolution, Resolution::Deferred));
//!
//! // Loading `me/alec/App` replays the deferred check against the now-loaded `Helper`
//! let helper = loader
//!     .define_class(ClassData::new(
//!         ClassName::from_string(String::from("me/alec/Helper")).unwrap(),
//!         java.object,
//!         false,
//!     ))
//!     .unwrap();
//! let app = loader.define_class(ClassData::new(
//!     ClassName::from_string(String::from("me/alec/App")).unwrap(),
//!     helper,
//!     false,
//! ));
//! assert!(app.is_ok());
//! ```

pub mod cache;
pub mod class_graph;
mod errors;
pub mod loader;
pub mod name_list;
mod names;
pub mod oracle;
pub mod relationships;
pub mod settings;
pub mod snippets;
pub mod util;
pub mod verifier;

pub use errors::*;
pub use names::*;
