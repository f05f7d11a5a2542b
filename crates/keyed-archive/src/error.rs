//! Engine error types.
//!
//! The engine reports structural problems with an archive as an
//! [`IntegrityFault`]. Faults are not returned from the coding primitives;
//! they abort the whole operation by unwinding with the fault as payload
//! (see [`raise`]). Only a top-level entry point is expected to intercept
//! them.

use std::panic;

use thiserror::Error;

/// Whole-operation failure raised on structurally invalid input or misuse
/// of a coder context.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IntegrityFault {
    #[error("malformed archive: {0}")]
    Malformed(String),
    #[error("unknown archiver tag: {0:?}")]
    UnknownArchiver(String),
    #[error("unsupported archive version: {0}")]
    UnsupportedVersion(u32),
    #[error("archive references unregistered class {0:?}")]
    UnknownClass(String),
    #[error("object reference {0} is out of range")]
    DanglingReference(usize),
    #[error("object {0} references itself while being decoded")]
    ReferenceCycle(usize),
    #[error("object nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),
    #[error("field {key:?} does not hold a {expected} value")]
    FieldTypeMismatch { key: String, expected: &'static str },
    #[error("top-level decode must be the first call on a fresh context")]
    NotTopLevel,
    #[error("coder context is no longer decoding")]
    ContextClosed,
    #[error("archive encoding failed: {0}")]
    Encoding(String),
}

/// Error type for class registration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("class name {class:?} is already registered for another type")]
    ClassNameTaken { class: &'static str },
}

/// Aborts the current operation with `fault` as the unwind payload.
///
/// The panic hook is not invoked, so nothing is printed when the fault is
/// caught at a top-level boundary.
pub fn raise(fault: IntegrityFault) -> ! {
    panic::resume_unwind(Box::new(fault))
}

/// Runs `op` and returns the fault it raised, if any.
///
/// Panics that do not carry an [`IntegrityFault`] are resumed unchanged.
pub fn catch_fault<T>(op: impl FnOnce() -> T) -> Result<T, IntegrityFault> {
    match panic::catch_unwind(panic::AssertUnwindSafe(op)) {
        Ok(value) => Ok(value),
        Err(payload) => match payload.downcast::<IntegrityFault>() {
            Ok(fault) => Err(*fault),
            Err(other) => panic::resume_unwind(other),
        },
    }
}
