//! Typed values over a keyed object archiver.
//!
//! The archiver only understands reference-typed [`Coding`] objects. This
//! crate lets plain values travel through it: each [`Bridgeable`] type names
//! a proxy class, and the [`DecodeValue`] / [`EncodeValue`] extensions convert
//! on the way in and out of any coder context.
//!
//! Decoding never distinguishes a missing value from a value of another
//! class; both are `None`. Corrupt archives are only reported by the
//! top-level entry points, as [`DecodeError`].
//!
//! # Example
//!
//! ```
//! use value_codable::{archived_data, unarchived_top_level_value, ClassRegistry};
//!
//! let data = archived_data(Some(&42i64));
//! let registry = ClassRegistry::new();
//!
//! assert_eq!(unarchived_top_level_value::<i64>(&data, &registry), Ok(Some(42)));
//! assert_eq!(unarchived_top_level_value::<String>(&data, &registry), Ok(None));
//! assert!(unarchived_top_level_value::<i64>(&data[..3], &registry).is_err());
//! ```

mod bridge;
mod decode;
mod encode;
mod error;

pub use bridge::{proxy_class, register, resolve, to_object, Bridgeable};
pub use decode::{unarchived_top_level_value, unarchived_value, DecodeValue};
pub use encode::{archived_data, archived_data_with, EncodeValue};
pub use error::DecodeError;

pub use keyed_archive::{
    ArchiveFormat, ArchiveOptions, ClassRegistry, Coding, Decoder, Encoder, IntegrityFault,
    KeyedArchiver, KeyedUnarchiver, ROOT_KEY,
};
