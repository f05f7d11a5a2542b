//! Typed encode path.

use keyed_archive::{ArchiveOptions, Encoder, KeyedArchiver, ROOT_KEY};

use crate::bridge::{to_object, Bridgeable};

/// Typed encoding on any coder context. `None` writes the null marker.
pub trait EncodeValue {
    fn encode_value<V: Bridgeable>(&mut self, value: Option<&V>);

    fn encode_value_for_key<V: Bridgeable>(&mut self, value: Option<&V>, key: &str);
}

impl<E: Encoder + ?Sized> EncodeValue for E {
    fn encode_value<V: Bridgeable>(&mut self, value: Option<&V>) {
        let object = value.map(to_object);
        self.encode_object(object.as_ref());
    }

    fn encode_value_for_key<V: Bridgeable>(&mut self, value: Option<&V>, key: &str) {
        let object = value.map(to_object);
        self.encode_object_for_key(object.as_ref(), key);
    }
}

/// Archives `root` in the default binary format.
pub fn archived_data<V: Bridgeable>(root: Option<&V>) -> Vec<u8> {
    archived_data_with(root, ArchiveOptions::default())
}

/// Archives `root` under the root key and returns the finished buffer.
///
/// # Panics
///
/// Engine faults raised while encoding are not caught; the buffer is still
/// finalized when the archiver drops.
pub fn archived_data_with<V: Bridgeable>(root: Option<&V>, options: ArchiveOptions) -> Vec<u8> {
    let mut data = Vec::new();
    {
        let mut archiver = KeyedArchiver::with_options(&mut data, options);
        archiver.encode_value_for_key(root, ROOT_KEY);
        archiver.finish_encoding();
    }
    data
}
