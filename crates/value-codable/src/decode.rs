//! Typed decode paths.
//!
//! Nested calls ([`decode_value`](DecodeValue::decode_value),
//! [`decode_value_for_key`](DecodeValue::decode_value_for_key)) never report
//! failure: missing keys and values of another class both come back as
//! `None`, and engine faults keep unwinding towards the enclosing top-level
//! call. The `top_level` variants are the only place where a fault is caught
//! and returned as a [`DecodeError`].

use keyed_archive::{catch_fault, ClassRegistry, Decoder, KeyedUnarchiver};
use tracing::warn;

use crate::bridge::{proxy_class, resolve, Bridgeable};
use crate::error::DecodeError;

/// Typed decoding on any coder context.
pub trait DecodeValue {
    /// Next value of the unkeyed sequence, previously written with
    /// [`encode_value`](crate::EncodeValue::encode_value).
    fn decode_value<V: Bridgeable>(&mut self) -> Option<V>;

    /// Value stored under `key`, previously written with
    /// [`encode_value_for_key`](crate::EncodeValue::encode_value_for_key).
    fn decode_value_for_key<V: Bridgeable>(&mut self, key: &str) -> Option<V>;

    /// [`decode_value`](DecodeValue::decode_value) as the root call of a
    /// fresh context, with integrity faults returned as errors.
    fn decode_top_level_value<V: Bridgeable>(&mut self) -> Result<Option<V>, DecodeError>;

    /// [`decode_value_for_key`](DecodeValue::decode_value_for_key) as the
    /// root call of a fresh context, with integrity faults returned as errors.
    fn decode_top_level_value_for_key<V: Bridgeable>(&mut self, key: &str) -> Result<Option<V>, DecodeError>;
}

impl<D: Decoder + ?Sized> DecodeValue for D {
    fn decode_value<V: Bridgeable>(&mut self) -> Option<V> {
        // The unkeyed path cannot constrain the class; the cast does.
        let object = self.decode_object()?;
        resolve(&object)
    }

    fn decode_value_for_key<V: Bridgeable>(&mut self, key: &str) -> Option<V> {
        let object = self.decode_object_of_class(proxy_class::<V>(), key)?;
        resolve(&object)
    }

    fn decode_top_level_value<V: Bridgeable>(&mut self) -> Result<Option<V>, DecodeError> {
        let object = top_level(|| self.decode_top_level_object())?;
        Ok(object.and_then(|object| resolve(&object)))
    }

    fn decode_top_level_value_for_key<V: Bridgeable>(&mut self, key: &str) -> Result<Option<V>, DecodeError> {
        let object = top_level(|| self.decode_top_level_object_of_class(proxy_class::<V>(), key))?;
        Ok(object.and_then(|object| resolve(&object)))
    }
}

/// Decodes the root value of `data`.
///
/// # Panics
///
/// Unwinds with an [`IntegrityFault`](keyed_archive::IntegrityFault) payload
/// when `data` is not a valid archive. Use
/// [`unarchived_top_level_value`] to get an error instead.
pub fn unarchived_value<V: Bridgeable>(data: &[u8], registry: &ClassRegistry) -> Option<V> {
    let object = KeyedUnarchiver::unarchive(data, registry)?;
    resolve(&object)
}

/// Decodes the root value of `data`, reporting corrupt archives as errors.
///
/// # Errors
///
/// [`DecodeError::Integrity`] when `data` is truncated, malformed or
/// references a class missing from `registry`.
pub fn unarchived_top_level_value<V: Bridgeable>(
    data: &[u8],
    registry: &ClassRegistry,
) -> Result<Option<V>, DecodeError> {
    let object = top_level(|| KeyedUnarchiver::unarchive_top_level(data, registry))?;
    Ok(object.and_then(|object| resolve(&object)))
}

fn top_level<T>(op: impl FnOnce() -> T) -> Result<T, DecodeError> {
    catch_fault(op).map_err(|fault| {
        warn!(%fault, "top-level decode failed");
        DecodeError::from(fault)
    })
}
