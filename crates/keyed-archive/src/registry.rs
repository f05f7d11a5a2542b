//! Class table used by the unarchiver to instantiate archived records.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::classes::{Data, Number, Text};
use crate::coder::Decoder;
use crate::error::RegistryError;
use crate::object::{Coding, ObjectRef};

/// Decodes one record into an object, read through the record's container.
pub(crate) type DecodeFn = fn(&mut dyn Decoder) -> Option<ObjectRef>;

#[derive(Clone, Copy)]
struct ClassEntry {
    type_id: TypeId,
    decode: DecodeFn,
}

/// Maps archived class names to the Rust types that decode them.
///
/// A class name belongs to exactly one type. The registry is read-only while
/// decoding and can be shared across threads.
#[derive(Clone)]
pub struct ClassRegistry {
    classes: HashMap<&'static str, ClassEntry>,
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.classes.keys().copied().collect();
        names.sort_unstable();
        f.debug_struct("ClassRegistry").field("classes", &names).finish()
    }
}

impl Default for ClassRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassRegistry {
    /// Registry holding the built-in classes ([`Number`], [`Text`], [`Data`]).
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.insert::<Number>();
        registry.insert::<Text>();
        registry.insert::<Data>();
        registry
    }

    /// Registry without any classes.
    pub fn empty() -> Self {
        Self {
            classes: HashMap::new(),
        }
    }

    /// Registers `T` under its class name.
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`RegistryError::ClassNameTaken`] when another type already owns the name.
    pub fn register<T: Coding>(&mut self) -> Result<(), RegistryError> {
        match self.classes.get(T::CLASS_NAME) {
            Some(entry) if entry.type_id == TypeId::of::<T>() => Ok(()),
            Some(_) => Err(RegistryError::ClassNameTaken {
                class: T::CLASS_NAME,
            }),
            None => {
                self.insert::<T>();
                Ok(())
            }
        }
    }

    /// Builder form of [`register`](ClassRegistry::register).
    pub fn with<T: Coding>(mut self) -> Result<Self, RegistryError> {
        self.register::<T>()?;
        Ok(self)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.classes.contains_key(class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub(crate) fn decoder(&self, class: &str) -> Option<DecodeFn> {
        self.classes.get(class).map(|entry| entry.decode)
    }

    fn insert<T: Coding>(&mut self) {
        self.classes.insert(
            T::CLASS_NAME,
            ClassEntry {
                type_id: TypeId::of::<T>(),
                decode: decode_erased::<T>,
            },
        );
    }
}

fn decode_erased<T: Coding>(coder: &mut dyn Decoder) -> Option<ObjectRef> {
    T::init_with(coder).map(|value| Arc::new(value) as ObjectRef)
}
