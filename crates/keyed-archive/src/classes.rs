//! Built-in object classes.

use crate::coder::{Decoder, Encoder};
use crate::object::Coding;

/// Boxed scalar number.
///
/// The accessors convert between representations with `as` cast semantics,
/// so reading a float as an integer truncates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
}

impl Number {
    pub fn as_bool(&self) -> bool {
        match *self {
            Number::Bool(b) => b,
            Number::Int(i) => i != 0,
            Number::UInt(u) => u != 0,
            Number::Float(f) => f != 0.0,
        }
    }

    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::Bool(b) => b as i64,
            Number::Int(i) => i,
            Number::UInt(u) => u as i64,
            Number::Float(f) => f as i64,
        }
    }

    pub fn as_u64(&self) -> u64 {
        match *self {
            Number::Bool(b) => b as u64,
            Number::Int(i) => i as u64,
            Number::UInt(u) => u,
            Number::Float(f) => f as u64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::Bool(b) => b as u8 as f64,
            Number::Int(i) => i as f64,
            Number::UInt(u) => u as f64,
            Number::Float(f) => f,
        }
    }
}

// One field per representation; the key names the variant.
const BOOL_KEY: &str = "bool";
const INT_KEY: &str = "int";
const UINT_KEY: &str = "uint";
const FLOAT_KEY: &str = "float";

impl Coding for Number {
    const CLASS_NAME: &'static str = "Number";

    fn encode_with(&self, coder: &mut dyn Encoder) {
        match *self {
            Number::Bool(b) => coder.encode_bool(b, BOOL_KEY),
            Number::Int(i) => coder.encode_i64(i, INT_KEY),
            Number::UInt(u) => coder.encode_u64(u, UINT_KEY),
            Number::Float(f) => coder.encode_f64(f, FLOAT_KEY),
        }
    }

    fn init_with(coder: &mut dyn Decoder) -> Option<Self> {
        if coder.contains_value(INT_KEY) {
            Some(Number::Int(coder.decode_i64(INT_KEY)))
        } else if coder.contains_value(UINT_KEY) {
            Some(Number::UInt(coder.decode_u64(UINT_KEY)))
        } else if coder.contains_value(FLOAT_KEY) {
            Some(Number::Float(coder.decode_f64(FLOAT_KEY)))
        } else if coder.contains_value(BOOL_KEY) {
            Some(Number::Bool(coder.decode_bool(BOOL_KEY)))
        } else {
            None
        }
    }
}

/// Boxed UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Text(pub String);

impl Coding for Text {
    const CLASS_NAME: &'static str = "Text";

    fn encode_with(&self, coder: &mut dyn Encoder) {
        coder.encode_str(&self.0, "string");
    }

    fn init_with(coder: &mut dyn Decoder) -> Option<Self> {
        coder.decode_string("string").map(Text)
    }
}

/// Boxed byte blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Data(pub Vec<u8>);

impl Coding for Data {
    const CLASS_NAME: &'static str = "Data";

    fn encode_with(&self, coder: &mut dyn Encoder) {
        coder.encode_bytes(&self.0, "bytes");
    }

    fn init_with(coder: &mut dyn Decoder) -> Option<Self> {
        coder.decode_bytes("bytes").map(Data)
    }
}
