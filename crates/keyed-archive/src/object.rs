//! Object protocol understood by the archiver.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

use crate::coder::{Decoder, Encoder};

/// A reference type that knows how to write itself into a keyed archive and
/// how to rebuild itself from one.
///
/// Implementors are registered in a [`ClassRegistry`](crate::ClassRegistry)
/// under [`CLASS_NAME`](Coding::CLASS_NAME) so the unarchiver can find them.
pub trait Coding: Debug + Send + Sync + Sized + 'static {
    /// Name written to the archive for every instance of this type.
    const CLASS_NAME: &'static str;

    fn encode_with(&self, coder: &mut dyn Encoder);

    /// Rebuilds an instance from the fields of its archived record.
    ///
    /// Returning `None` makes the decoded object absent.
    fn init_with(coder: &mut dyn Decoder) -> Option<Self>;
}

/// Object-safe view of a [`Coding`] type.
pub trait ArchiveObject: Debug + Send + Sync {
    fn class_name(&self) -> &'static str;

    fn encode_with(&self, coder: &mut dyn Encoder);

    fn as_any(&self) -> &dyn Any;
}

impl<T: Coding> ArchiveObject for T {
    fn class_name(&self) -> &'static str {
        T::CLASS_NAME
    }

    fn encode_with(&self, coder: &mut dyn Encoder) {
        Coding::encode_with(self, coder)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Shared handle to an archived object. Identity is the `Arc` allocation.
pub type ObjectRef = Arc<dyn ArchiveObject>;

/// Wraps a coding value as a shared object handle.
pub fn object<T: Coding>(value: T) -> ObjectRef {
    Arc::new(value)
}

/// Returns the object as `T` when its dynamic type is exactly `T`.
pub fn downcast_ref<T: Coding>(object: &ObjectRef) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

/// Address used as the identity key of an object while encoding.
pub(crate) fn identity(object: &ObjectRef) -> usize {
    Arc::as_ptr(object) as *const () as usize
}
