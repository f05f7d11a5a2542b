//! Coder context traits.
//!
//! [`Encoder`] and [`Decoder`] are the operation set a coding type sees from
//! inside [`Coding::encode_with`](crate::Coding::encode_with) and
//! [`Coding::init_with`](crate::Coding::init_with). Both are object safe.
//!
//! Every call operates on the *current container*: the top-level container
//! of the archive, or the record of the object being encoded/decoded.
//! Unkeyed calls walk the container's sequence in order.

use crate::object::ObjectRef;

/// Observable state of a coder context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderPhase {
    Encoding,
    Decoding,
    Finalizing,
    Closed,
    /// A fault was raised; the context no longer accepts calls.
    Faulted,
}

/// Archiving side of a coder context.
pub trait Encoder {
    /// Appends `object` to the unkeyed sequence of the current container.
    /// `None` encodes the explicit null marker.
    fn encode_object(&mut self, object: Option<&ObjectRef>);

    fn encode_object_for_key(&mut self, object: Option<&ObjectRef>, key: &str);

    fn encode_bool(&mut self, value: bool, key: &str);

    fn encode_i64(&mut self, value: i64, key: &str);

    fn encode_u64(&mut self, value: u64, key: &str);

    fn encode_f64(&mut self, value: f64, key: &str);

    fn encode_str(&mut self, value: &str, key: &str);

    fn encode_bytes(&mut self, value: &[u8], key: &str);
}

/// Unarchiving side of a coder context.
///
/// Object lookups return `None` for absent keys, null markers and class
/// mismatches. Structural problems raise an
/// [`IntegrityFault`](crate::IntegrityFault) instead of returning.
pub trait Decoder {
    fn contains_value(&self, key: &str) -> bool;

    /// Next object of the unkeyed sequence, of any class.
    fn decode_object(&mut self) -> Option<ObjectRef>;

    /// Object stored under `key`, of any class.
    fn decode_object_for_key(&mut self, key: &str) -> Option<ObjectRef>;

    /// Object stored under `key` when its archived class is `class`.
    fn decode_object_of_class(&mut self, class: &str, key: &str) -> Option<ObjectRef>;

    /// Like [`decode_object`](Decoder::decode_object), but only valid as the
    /// first call against the context's top-level container.
    fn decode_top_level_object(&mut self) -> Option<ObjectRef>;

    /// Like [`decode_object_of_class`](Decoder::decode_object_of_class), but
    /// only valid as the first call against the context's top-level container.
    fn decode_top_level_object_of_class(&mut self, class: &str, key: &str) -> Option<ObjectRef>;

    /// Absent keys decode as `false`.
    fn decode_bool(&mut self, key: &str) -> bool;

    /// Absent keys decode as `0`. Other numeric fields are cast.
    fn decode_i64(&mut self, key: &str) -> i64;

    fn decode_u64(&mut self, key: &str) -> u64;

    fn decode_f64(&mut self, key: &str) -> f64;

    fn decode_string(&mut self, key: &str) -> Option<String>;

    fn decode_bytes(&mut self, key: &str) -> Option<Vec<u8>>;
}
