//! Keyed object-graph archiving.
//!
//! Objects implement [`Coding`] and are shared as [`ObjectRef`]. A
//! [`KeyedArchiver`] walks an object graph into a keyed document (CBOR or
//! JSON); a [`KeyedUnarchiver`] rebuilds it with the help of a
//! [`ClassRegistry`].
//!
//! Absent keys and class mismatches decode as `None`. Structurally invalid
//! archives abort the decode by unwinding with an [`IntegrityFault`] payload;
//! use [`catch_fault`] at a top-level boundary to turn that into a `Result`.
//!
//! # Example
//!
//! ```
//! use keyed_archive::{
//!     downcast_ref, object, ArchiveOptions, ClassRegistry, KeyedArchiver, KeyedUnarchiver, Text,
//! };
//!
//! let root = object(Text("hello".to_string()));
//! let data = KeyedArchiver::archived_data(Some(&root), ArchiveOptions::default());
//!
//! let registry = ClassRegistry::new();
//! let decoded = KeyedUnarchiver::unarchive(&data, &registry).unwrap();
//! assert_eq!(downcast_ref::<Text>(&decoded), Some(&Text("hello".to_string())));
//! ```

mod archiver;
mod classes;
mod coder;
mod document;
mod error;
mod object;
mod registry;
mod unarchiver;

pub use archiver::{ArchiveOptions, KeyedArchiver};
pub use classes::{Data, Number, Text};
pub use coder::{CoderPhase, Decoder, Encoder};
pub use document::{ArchiveFormat, ARCHIVER_TAG, ARCHIVE_VERSION};
pub use error::{catch_fault, raise, IntegrityFault, RegistryError};
pub use object::{downcast_ref, object, ArchiveObject, Coding, ObjectRef};
pub use registry::ClassRegistry;
pub use unarchiver::{KeyedUnarchiver, UnarchiveOptions};

/// Key under which archive-level entry points store the root object.
pub const ROOT_KEY: &str = "root";
