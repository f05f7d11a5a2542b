//! Unarchiving side of the engine.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::coder::{CoderPhase, Decoder};
use crate::document::{ArchiveDocument, Field, Fields};
use crate::error::{raise, IntegrityFault};
use crate::object::ObjectRef;
use crate::registry::ClassRegistry;
use crate::ROOT_KEY;

/// Options for [`KeyedUnarchiver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnarchiveOptions {
    /// Maximum number of nested object records being decoded at once.
    pub max_depth: usize,
}

impl Default for UnarchiveOptions {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

#[derive(Debug, Clone, Copy)]
enum Source {
    Top,
    Record(usize),
}

#[derive(Debug)]
struct Frame {
    source: Source,
    next_unkeyed: usize,
}

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    InProgress,
    Done(Option<ObjectRef>),
}

/// Coder context reading a keyed archive.
///
/// Opening the context parses the buffer and begins decoding. Objects are
/// materialized on first access and cached, so every reference to the same
/// record yields the same `Arc`. Faults mark the context as
/// [`CoderPhase::Faulted`] before unwinding.
pub struct KeyedUnarchiver<'r> {
    document: ArchiveDocument,
    registry: &'r ClassRegistry,
    options: UnarchiveOptions,
    phase: CoderPhase,
    slots: Vec<Slot>,
    frames: Vec<Frame>,
    top_level_calls: usize,
}

impl<'r> KeyedUnarchiver<'r> {
    /// Opens a decoding context over `data`.
    ///
    /// # Errors
    ///
    /// Returns the fault describing why `data` is not a readable archive.
    pub fn new(data: &[u8], registry: &'r ClassRegistry) -> Result<Self, IntegrityFault> {
        Self::with_options(data, registry, UnarchiveOptions::default())
    }

    pub fn with_options(
        data: &[u8],
        registry: &'r ClassRegistry,
        options: UnarchiveOptions,
    ) -> Result<Self, IntegrityFault> {
        let document = ArchiveDocument::read(data)?;
        trace!(bytes = data.len(), objects = document.objects.len(), "begin decoding");
        Ok(Self {
            slots: vec![Slot::Pending; document.objects.len()],
            document,
            registry,
            options,
            phase: CoderPhase::Decoding,
            frames: vec![Frame {
                source: Source::Top,
                next_unkeyed: 0,
            }],
            top_level_calls: 0,
        })
    }

    /// Opens `data`, decodes the root object of any class and closes the
    /// context.
    ///
    /// # Panics
    ///
    /// Unwinds with an [`IntegrityFault`] payload when `data` is invalid.
    pub fn unarchive(data: &[u8], registry: &ClassRegistry) -> Option<ObjectRef> {
        let mut unarchiver = match KeyedUnarchiver::new(data, registry) {
            Ok(unarchiver) => unarchiver,
            Err(fault) => raise(fault),
        };
        let root = unarchiver.decode_object_for_key(ROOT_KEY);
        unarchiver.finish_decoding();
        root
    }

    /// Top-level form of [`unarchive`](KeyedUnarchiver::unarchive): the root
    /// lookup is the first call on a fresh context.
    ///
    /// # Panics
    ///
    /// Unwinds with an [`IntegrityFault`] payload when `data` is invalid;
    /// intended to run inside a fault boundary.
    pub fn unarchive_top_level(data: &[u8], registry: &ClassRegistry) -> Option<ObjectRef> {
        let mut unarchiver = match KeyedUnarchiver::new(data, registry) {
            Ok(unarchiver) => unarchiver,
            Err(fault) => raise(fault),
        };
        unarchiver.enter_top_level();
        let root = unarchiver.object_for_key(ROOT_KEY, None);
        unarchiver.finish_decoding();
        root
    }

    pub fn phase(&self) -> CoderPhase {
        self.phase
    }

    pub fn options(&self) -> UnarchiveOptions {
        self.options
    }

    /// Ends decoding. Later calls do nothing; decode calls after this fault
    /// with [`IntegrityFault::ContextClosed`].
    pub fn finish_decoding(&mut self) {
        if self.phase != CoderPhase::Decoding {
            return;
        }
        self.phase = CoderPhase::Finalizing;
        let materialized = self
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Done(_)))
            .count();
        trace!(materialized, "finish decoding");
        self.phase = CoderPhase::Closed;
    }

    fn fault(&mut self, fault: IntegrityFault) -> ! {
        debug!(%fault, "decode fault");
        self.phase = CoderPhase::Faulted;
        raise(fault)
    }

    fn ensure_decoding(&mut self) {
        if self.phase != CoderPhase::Decoding {
            self.fault(IntegrityFault::ContextClosed);
        }
    }

    fn at_top(&self) -> bool {
        self.frames.len() == 1
    }

    // Every call against the top-level container counts, so a top-level call
    // is only accepted as the very first one.
    fn note_call(&mut self) {
        if self.at_top() {
            self.top_level_calls += 1;
        }
    }

    fn enter_top_level(&mut self) {
        self.ensure_decoding();
        if !self.at_top() || self.top_level_calls != 0 {
            self.fault(IntegrityFault::NotTopLevel);
        }
    }

    fn fields(&self) -> &Fields {
        match self.frames[self.frames.len() - 1].source {
            Source::Top => &self.document.top,
            Source::Record(index) => &self.document.objects[index].fields,
        }
    }

    fn field(&mut self, key: &str) -> Option<Field> {
        self.ensure_decoding();
        self.note_call();
        self.fields().get(key).cloned()
    }

    fn next_unkeyed_key(&mut self) -> String {
        let last = self.frames.len() - 1;
        let frame = &mut self.frames[last];
        let key = format!("${}", frame.next_unkeyed);
        frame.next_unkeyed += 1;
        key
    }

    fn object_for_key(&mut self, key: &str, class: Option<&str>) -> Option<ObjectRef> {
        match self.field(key) {
            None => {
                debug!(key, "no value for key");
                None
            }
            Some(Field::Null) => None,
            Some(Field::Ref(index)) => {
                if index >= self.document.objects.len() {
                    self.fault(IntegrityFault::DanglingReference(index));
                }
                let record = &self.document.objects[index];
                if let Some(expected) = class {
                    if record.class != expected {
                        debug!(key, expected, found = %record.class, "class mismatch");
                        return None;
                    }
                }
                self.materialize(index)
            }
            Some(other) => {
                debug!(key, found = other.kind(), "value is not an object");
                None
            }
        }
    }

    fn materialize(&mut self, index: usize) -> Option<ObjectRef> {
        if let Slot::Done(object) = &self.slots[index] {
            return object.clone();
        }
        if matches!(self.slots[index], Slot::InProgress) {
            self.fault(IntegrityFault::ReferenceCycle(index));
        }
        // Records under construction are on the frame stack; the top-level
        // frame does not count.
        if self.frames.len() > self.options.max_depth {
            self.fault(IntegrityFault::DepthExceeded(self.options.max_depth));
        }
        let class = self.document.objects[index].class.clone();
        let Some(decode) = self.registry.decoder(&class) else {
            self.fault(IntegrityFault::UnknownClass(class));
        };
        trace!(index, class = %class, "materialize object");

        self.slots[index] = Slot::InProgress;
        self.frames.push(Frame {
            source: Source::Record(index),
            next_unkeyed: 0,
        });
        let decoded = panic::catch_unwind(AssertUnwindSafe(|| decode(self)));
        self.frames.pop();
        match decoded {
            Ok(object) => {
                self.slots[index] = Slot::Done(object.clone());
                object
            }
            Err(payload) => {
                // Faults raised by class code bypass `fault`.
                self.slots[index] = Slot::Pending;
                self.phase = CoderPhase::Faulted;
                panic::resume_unwind(payload)
            }
        }
    }

    fn numeric(&mut self, key: &str) -> Option<Field> {
        match self.field(key) {
            None => None,
            Some(field @ (Field::Bool(_) | Field::Int(_) | Field::UInt(_) | Field::Float(_))) => {
                Some(field)
            }
            Some(_) => self.fault(IntegrityFault::FieldTypeMismatch {
                key: key.to_string(),
                expected: "number",
            }),
        }
    }
}

impl Decoder for KeyedUnarchiver<'_> {
    fn contains_value(&self, key: &str) -> bool {
        self.fields().contains_key(key)
    }

    fn decode_object(&mut self) -> Option<ObjectRef> {
        let key = self.next_unkeyed_key();
        self.object_for_key(&key, None)
    }

    fn decode_object_for_key(&mut self, key: &str) -> Option<ObjectRef> {
        self.object_for_key(key, None)
    }

    fn decode_object_of_class(&mut self, class: &str, key: &str) -> Option<ObjectRef> {
        self.object_for_key(key, Some(class))
    }

    fn decode_top_level_object(&mut self) -> Option<ObjectRef> {
        self.enter_top_level();
        self.decode_object()
    }

    fn decode_top_level_object_of_class(&mut self, class: &str, key: &str) -> Option<ObjectRef> {
        self.enter_top_level();
        self.object_for_key(key, Some(class))
    }

    fn decode_bool(&mut self, key: &str) -> bool {
        match self.numeric(key) {
            Some(Field::Bool(b)) => b,
            Some(Field::Int(i)) => i != 0,
            Some(Field::UInt(u)) => u != 0,
            Some(Field::Float(f)) => f != 0.0,
            _ => false,
        }
    }

    fn decode_i64(&mut self, key: &str) -> i64 {
        match self.numeric(key) {
            Some(Field::Bool(b)) => b as i64,
            Some(Field::Int(i)) => i,
            Some(Field::UInt(u)) => u as i64,
            Some(Field::Float(f)) => f as i64,
            _ => 0,
        }
    }

    fn decode_u64(&mut self, key: &str) -> u64 {
        match self.numeric(key) {
            Some(Field::Bool(b)) => b as u64,
            Some(Field::Int(i)) => i as u64,
            Some(Field::UInt(u)) => u,
            Some(Field::Float(f)) => f as u64,
            _ => 0,
        }
    }

    fn decode_f64(&mut self, key: &str) -> f64 {
        match self.numeric(key) {
            Some(Field::Bool(b)) => b as u8 as f64,
            Some(Field::Int(i)) => i as f64,
            Some(Field::UInt(u)) => u as f64,
            Some(Field::Float(f)) => f,
            _ => 0.0,
        }
    }

    fn decode_string(&mut self, key: &str) -> Option<String> {
        match self.field(key) {
            None | Some(Field::Null) => None,
            Some(Field::Text(text)) => Some(text),
            Some(_) => self.fault(IntegrityFault::FieldTypeMismatch {
                key: key.to_string(),
                expected: "text",
            }),
        }
    }

    fn decode_bytes(&mut self, key: &str) -> Option<Vec<u8>> {
        match self.field(key) {
            None | Some(Field::Null) => None,
            Some(Field::Bytes(bytes)) => Some(bytes),
            Some(_) => self.fault(IntegrityFault::FieldTypeMismatch {
                key: key.to_string(),
                expected: "bytes",
            }),
        }
    }
}

impl Drop for KeyedUnarchiver<'_> {
    fn drop(&mut self) {
        self.finish_decoding();
    }
}
