//! Serialized form of a keyed archive.
//!
//! ```text
//! { "$archiver": "KeyedArchive",
//!   "$version":  100000,
//!   "$top":      { "root": { "Ref": 0 } },
//!   "$objects":  [ { "class": "Number", "fields": { "int": { "Int": 42 } } } ] }
//! ```
//!
//! The binary format is the CBOR encoding of this structure, the text format
//! its JSON encoding. Readers detect the format from the first byte.

use std::collections::BTreeMap;
use std::io::Cursor;

use serde::{Deserialize, Serialize};

use crate::error::IntegrityFault;

pub const ARCHIVER_TAG: &str = "KeyedArchive";
pub const ARCHIVE_VERSION: u32 = 100_000;

/// Output format of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveFormat {
    /// CBOR.
    #[default]
    Binary,
    /// JSON. Non-finite floats are written as `null` and do not read back.
    Json,
}

impl ArchiveFormat {
    /// Guesses the format of `data`. JSON documents always start with `{`;
    /// a CBOR map never does.
    pub fn detect(data: &[u8]) -> Self {
        match data.iter().copied().find(|b| !b.is_ascii_whitespace()) {
            Some(b'{') => ArchiveFormat::Json,
            _ => ArchiveFormat::Binary,
        }
    }
}

/// A value stored in a container slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) enum Field {
    Null,
    Ref(usize),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
}

impl Field {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Field::Null => "null",
            Field::Ref(_) => "object",
            Field::Bool(_) => "bool",
            Field::Int(_) | Field::UInt(_) | Field::Float(_) => "number",
            Field::Text(_) => "text",
            Field::Bytes(_) => "bytes",
        }
    }
}

pub(crate) type Fields = BTreeMap<String, Field>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ObjectRecord {
    pub class: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ArchiveDocument {
    #[serde(rename = "$archiver")]
    pub archiver: String,
    #[serde(rename = "$version")]
    pub version: u32,
    #[serde(rename = "$top")]
    pub top: Fields,
    #[serde(rename = "$objects")]
    pub objects: Vec<ObjectRecord>,
}

impl ArchiveDocument {
    pub(crate) fn new(top: Fields, objects: Vec<ObjectRecord>) -> Self {
        Self {
            archiver: ARCHIVER_TAG.to_string(),
            version: ARCHIVE_VERSION,
            top,
            objects,
        }
    }

    pub(crate) fn write(&self, format: ArchiveFormat, out: &mut Vec<u8>) -> Result<(), IntegrityFault> {
        match format {
            ArchiveFormat::Binary => ciborium::ser::into_writer(self, out)
                .map_err(|e| IntegrityFault::Encoding(e.to_string())),
            ArchiveFormat::Json => serde_json::to_writer(out, self)
                .map_err(|e| IntegrityFault::Encoding(e.to_string())),
        }
    }

    /// Parses and validates the envelope. Object references are checked
    /// lazily, when they are followed.
    pub(crate) fn read(data: &[u8]) -> Result<Self, IntegrityFault> {
        let document: ArchiveDocument = match ArchiveFormat::detect(data) {
            ArchiveFormat::Json => {
                serde_json::from_slice(data).map_err(|e| IntegrityFault::Malformed(e.to_string()))?
            }
            ArchiveFormat::Binary => {
                let mut cursor = Cursor::new(data);
                let document: ArchiveDocument = ciborium::de::from_reader(&mut cursor)
                    .map_err(|e| IntegrityFault::Malformed(e.to_string()))?;
                if (cursor.position() as usize) != data.len() {
                    return Err(IntegrityFault::Malformed("trailing bytes after archive".into()));
                }
                document
            }
        };
        if document.archiver != ARCHIVER_TAG {
            return Err(IntegrityFault::UnknownArchiver(document.archiver));
        }
        if document.version != ARCHIVE_VERSION {
            return Err(IntegrityFault::UnsupportedVersion(document.version));
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArchiveDocument {
        let mut fields = Fields::new();
        fields.insert("int".into(), Field::Int(42));
        let mut top = Fields::new();
        top.insert("root".into(), Field::Ref(0));
        ArchiveDocument::new(
            top,
            vec![ObjectRecord {
                class: "Number".into(),
                fields,
            }],
        )
    }

    #[test]
    fn detect_format() {
        assert_eq!(ArchiveFormat::detect(b"{}"), ArchiveFormat::Json);
        assert_eq!(ArchiveFormat::detect(b"  \n{"), ArchiveFormat::Json);
        assert_eq!(ArchiveFormat::detect(&[0xa4, 0x01]), ArchiveFormat::Binary);
        assert_eq!(ArchiveFormat::detect(&[]), ArchiveFormat::Binary);
    }

    #[test]
    fn json_layout_uses_dollar_keys() {
        let mut out = Vec::new();
        sample().write(ArchiveFormat::Json, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["$archiver"], "KeyedArchive");
        assert_eq!(json["$version"], 100_000);
        assert_eq!(json["$top"]["root"]["Ref"], 0);
        assert_eq!(json["$objects"][0]["class"], "Number");
        assert_eq!(json["$objects"][0]["fields"]["int"]["Int"], 42);
    }

    #[test]
    fn both_formats_read_back() {
        for format in [ArchiveFormat::Binary, ArchiveFormat::Json] {
            let mut out = Vec::new();
            sample().write(format, &mut out).unwrap();
            assert_eq!(ArchiveDocument::read(&out).unwrap(), sample());
        }
    }

    #[test]
    fn rejects_wrong_envelope() {
        let mut doc = sample();
        doc.archiver = "Other".into();
        let mut out = Vec::new();
        doc.write(ArchiveFormat::Json, &mut out).unwrap();
        assert_eq!(
            ArchiveDocument::read(&out),
            Err(IntegrityFault::UnknownArchiver("Other".into()))
        );

        let mut doc = sample();
        doc.version = 7;
        let mut out = Vec::new();
        doc.write(ArchiveFormat::Binary, &mut out).unwrap();
        assert_eq!(ArchiveDocument::read(&out), Err(IntegrityFault::UnsupportedVersion(7)));
    }

    #[test]
    fn binary_payloads_are_byte_strings() {
        let payload: Vec<u8> = (0..=255u8).collect();
        let mut top = Fields::new();
        top.insert("blob".into(), Field::Bytes(payload.clone()));
        let doc = ArchiveDocument::new(top, Vec::new());
        let mut out = Vec::new();
        doc.write(ArchiveFormat::Binary, &mut out).unwrap();
        assert!(out.windows(payload.len()).any(|w| w == payload.as_slice()));
        assert!(out.len() < payload.len() + 128);
        assert_eq!(ArchiveDocument::read(&out).unwrap(), doc);

        let mut json = Vec::new();
        doc.write(ArchiveFormat::Json, &mut json).unwrap();
        assert_eq!(ArchiveDocument::read(&json).unwrap(), doc);
    }

    #[test]
    fn rejects_truncated_and_trailing_bytes() {
        let mut out = Vec::new();
        sample().write(ArchiveFormat::Binary, &mut out).unwrap();
        assert!(matches!(
            ArchiveDocument::read(&out[..out.len() / 2]),
            Err(IntegrityFault::Malformed(_))
        ));
        out.push(0x00);
        assert!(matches!(ArchiveDocument::read(&out), Err(IntegrityFault::Malformed(_))));
    }
}
