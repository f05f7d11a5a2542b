//! Archiving side of the engine.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, trace};

use crate::coder::{CoderPhase, Encoder};
use crate::document::{ArchiveDocument, ArchiveFormat, Field, Fields, ObjectRecord};
use crate::error::{raise, IntegrityFault};
use crate::object::{identity, ObjectRef};
use crate::ROOT_KEY;

/// Options for [`KeyedArchiver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveOptions {
    pub format: ArchiveFormat,
}

/// Container currently receiving fields.
#[derive(Debug, Clone, Copy)]
enum Target {
    Top,
    Record(usize),
}

#[derive(Debug)]
struct Frame {
    target: Target,
    next_unkeyed: usize,
}

/// Coder context writing a keyed archive into a caller-owned buffer.
///
/// Creating the archiver begins encoding. The document is written to the
/// buffer by [`finish_encoding`](KeyedArchiver::finish_encoding), which also
/// runs on drop, so the buffer is finalized on every exit path.
pub struct KeyedArchiver<'b> {
    out: &'b mut Vec<u8>,
    options: ArchiveOptions,
    phase: CoderPhase,
    top: Fields,
    objects: Vec<ObjectRecord>,
    identities: HashMap<usize, usize>,
    // Keeps encoded objects alive so their addresses stay unique.
    retained: Vec<ObjectRef>,
    frames: Vec<Frame>,
}

impl<'b> KeyedArchiver<'b> {
    pub fn new(out: &'b mut Vec<u8>) -> Self {
        Self::with_options(out, ArchiveOptions::default())
    }

    pub fn with_options(out: &'b mut Vec<u8>, options: ArchiveOptions) -> Self {
        trace!(format = ?options.format, "begin encoding");
        Self {
            out,
            options,
            phase: CoderPhase::Encoding,
            top: Fields::new(),
            objects: Vec::new(),
            identities: HashMap::new(),
            retained: Vec::new(),
            frames: vec![Frame {
                target: Target::Top,
                next_unkeyed: 0,
            }],
        }
    }

    /// Convenience wrapper: archives `root` under [`ROOT_KEY`] and returns
    /// the finished buffer.
    pub fn archived_data(root: Option<&ObjectRef>, options: ArchiveOptions) -> Vec<u8> {
        let mut data = Vec::new();
        {
            let mut archiver = KeyedArchiver::with_options(&mut data, options);
            archiver.encode_object_for_key(root, ROOT_KEY);
            archiver.finish_encoding();
        }
        data
    }

    pub fn phase(&self) -> CoderPhase {
        self.phase
    }

    /// Writes the archive into the output buffer. Later calls do nothing.
    ///
    /// # Panics
    ///
    /// Unwinds with an [`IntegrityFault::Encoding`](crate::IntegrityFault::Encoding)
    /// payload when the document cannot be serialized.
    pub fn finish_encoding(&mut self) {
        if let Err(fault) = self.finalize() {
            raise(fault);
        }
    }

    fn finalize(&mut self) -> Result<(), IntegrityFault> {
        if self.phase != CoderPhase::Encoding {
            return Ok(());
        }
        self.phase = CoderPhase::Finalizing;
        let document = ArchiveDocument::new(
            std::mem::take(&mut self.top),
            std::mem::take(&mut self.objects),
        );
        let result = document.write(self.options.format, self.out);
        self.phase = if result.is_ok() {
            CoderPhase::Closed
        } else {
            CoderPhase::Faulted
        };
        self.retained.clear();
        trace!(bytes = self.out.len(), objects = document.objects.len(), "finish encoding");
        result
    }

    fn fields(&mut self) -> &mut Fields {
        let target = self.frame().target;
        match target {
            Target::Top => &mut self.top,
            Target::Record(index) => &mut self.objects[index].fields,
        }
    }

    fn frame(&mut self) -> &mut Frame {
        // The top-level frame is never popped.
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn put(&mut self, key: &str, field: Field) {
        if self.phase != CoderPhase::Encoding {
            raise(IntegrityFault::ContextClosed);
        }
        self.fields().insert(key.to_string(), field);
    }

    fn object_field(&mut self, object: Option<&ObjectRef>) -> Field {
        let Some(object) = object else {
            return Field::Null;
        };
        if let Some(&index) = self.identities.get(&identity(object)) {
            return Field::Ref(index);
        }
        let index = self.objects.len();
        self.objects.push(ObjectRecord {
            class: object.class_name().to_string(),
            fields: Fields::new(),
        });
        self.identities.insert(identity(object), index);
        self.retained.push(object.clone());
        trace!(index, class = object.class_name(), "encode object");

        self.frames.push(Frame {
            target: Target::Record(index),
            next_unkeyed: 0,
        });
        let encoded = panic::catch_unwind(AssertUnwindSafe(|| object.encode_with(self)));
        self.frames.pop();
        if let Err(payload) = encoded {
            // The archive stays open so drop can still finalize it.
            panic::resume_unwind(payload);
        }
        Field::Ref(index)
    }
}

impl Encoder for KeyedArchiver<'_> {
    fn encode_object(&mut self, object: Option<&ObjectRef>) {
        let frame = self.frame();
        let key = format!("${}", frame.next_unkeyed);
        frame.next_unkeyed += 1;
        self.encode_object_for_key(object, &key);
    }

    fn encode_object_for_key(&mut self, object: Option<&ObjectRef>, key: &str) {
        if self.phase != CoderPhase::Encoding {
            raise(IntegrityFault::ContextClosed);
        }
        let field = self.object_field(object);
        self.put(key, field);
    }

    fn encode_bool(&mut self, value: bool, key: &str) {
        self.put(key, Field::Bool(value));
    }

    fn encode_i64(&mut self, value: i64, key: &str) {
        self.put(key, Field::Int(value));
    }

    fn encode_u64(&mut self, value: u64, key: &str) {
        self.put(key, Field::UInt(value));
    }

    fn encode_f64(&mut self, value: f64, key: &str) {
        self.put(key, Field::Float(value));
    }

    fn encode_str(&mut self, value: &str, key: &str) {
        self.put(key, Field::Text(value.to_string()));
    }

    fn encode_bytes(&mut self, value: &[u8], key: &str) {
        self.put(key, Field::Bytes(value.to_vec()));
    }
}

impl Drop for KeyedArchiver<'_> {
    fn drop(&mut self) {
        if let Err(fault) = self.finalize() {
            error!(%fault, "failed to finalize archive on drop");
        }
    }
}
