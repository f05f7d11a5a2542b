//! Value ↔ proxy resolution.
//!
//! A [`Bridgeable`] type names exactly one proxy class through its associated
//! type and converts to and from it without failing. Whether an archived
//! object actually *is* that proxy is decided by the caller, before
//! [`Bridgeable::from_proxy`] runs (see [`resolve`]).

use keyed_archive::{downcast_ref, object, ClassRegistry, Coding, Data, Number, ObjectRef, RegistryError, Text};

/// A value type with a reference-type representative understood by the
/// archiver.
pub trait Bridgeable: Sized {
    type Proxy: Coding;

    fn to_proxy(&self) -> Self::Proxy;

    /// Unconditional conversion back from a proxy whose class was already
    /// checked.
    fn from_proxy(proxy: &Self::Proxy) -> Self;
}

/// Class name the archive uses for `V`.
pub fn proxy_class<V: Bridgeable>() -> &'static str {
    V::Proxy::CLASS_NAME
}

/// Boxes `value` as a shared proxy object.
pub fn to_object<V: Bridgeable>(value: &V) -> ObjectRef {
    object(value.to_proxy())
}

/// Bridges `object` back to `V` when its dynamic type is `V::Proxy`.
pub fn resolve<V: Bridgeable>(object: &ObjectRef) -> Option<V> {
    downcast_ref::<V::Proxy>(object).map(V::from_proxy)
}

/// Registers the proxy class of `V` so archives holding it can be decoded.
///
/// # Errors
///
/// Fails when a different type already owns the proxy's class name.
pub fn register<V: Bridgeable>(registry: &mut ClassRegistry) -> Result<(), RegistryError> {
    registry.register::<V::Proxy>()
}

macro_rules! bridge_signed {
    ($($ty:ty),*) => {$(
        impl Bridgeable for $ty {
            type Proxy = Number;

            fn to_proxy(&self) -> Number {
                Number::Int(*self as i64)
            }

            fn from_proxy(proxy: &Number) -> Self {
                proxy.as_i64() as $ty
            }
        }
    )*};
}

macro_rules! bridge_unsigned {
    ($($ty:ty),*) => {$(
        impl Bridgeable for $ty {
            type Proxy = Number;

            fn to_proxy(&self) -> Number {
                Number::UInt(*self as u64)
            }

            fn from_proxy(proxy: &Number) -> Self {
                proxy.as_u64() as $ty
            }
        }
    )*};
}

bridge_signed!(i8, i16, i32, i64, isize);
bridge_unsigned!(u8, u16, u32, u64, usize);

impl Bridgeable for bool {
    type Proxy = Number;

    fn to_proxy(&self) -> Number {
        Number::Bool(*self)
    }

    fn from_proxy(proxy: &Number) -> Self {
        proxy.as_bool()
    }
}

impl Bridgeable for f64 {
    type Proxy = Number;

    fn to_proxy(&self) -> Number {
        Number::Float(*self)
    }

    fn from_proxy(proxy: &Number) -> Self {
        proxy.as_f64()
    }
}

impl Bridgeable for f32 {
    type Proxy = Number;

    fn to_proxy(&self) -> Number {
        Number::Float(*self as f64)
    }

    fn from_proxy(proxy: &Number) -> Self {
        proxy.as_f64() as f32
    }
}

impl Bridgeable for String {
    type Proxy = Text;

    fn to_proxy(&self) -> Text {
        Text(self.clone())
    }

    fn from_proxy(proxy: &Text) -> Self {
        proxy.0.clone()
    }
}

impl Bridgeable for Vec<u8> {
    type Proxy = Data;

    fn to_proxy(&self) -> Data {
        Data(self.clone())
    }

    fn from_proxy(proxy: &Data) -> Self {
        proxy.0.clone()
    }
}
