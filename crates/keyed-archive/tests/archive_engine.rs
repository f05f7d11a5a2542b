use std::sync::Arc;

use keyed_archive::{
    catch_fault, downcast_ref, object, ArchiveFormat, ArchiveOptions, ClassRegistry, Coding,
    Decoder, Encoder, IntegrityFault, KeyedArchiver, KeyedUnarchiver, Number, ObjectRef, Text,
    ROOT_KEY,
};
use serde_json::json;

#[derive(Debug)]
struct Node {
    name: String,
    next: Option<ObjectRef>,
}

impl Coding for Node {
    const CLASS_NAME: &'static str = "Node";

    fn encode_with(&self, coder: &mut dyn Encoder) {
        coder.encode_str(&self.name, "name");
        coder.encode_object_for_key(self.next.as_ref(), "next");
    }

    fn init_with(coder: &mut dyn Decoder) -> Option<Self> {
        Some(Node {
            name: coder.decode_string("name")?,
            next: coder.decode_object_of_class(Node::CLASS_NAME, "next"),
        })
    }
}

fn registry() -> ClassRegistry {
    ClassRegistry::new().with::<Node>().unwrap()
}

fn json_archive(value: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&value).unwrap()
}

#[test]
fn nested_graph_roundtrip_in_both_formats() {
    let tail = object(Node {
        name: "tail".into(),
        next: None,
    });
    let head = object(Node {
        name: "head".into(),
        next: Some(tail),
    });
    for format in [ArchiveFormat::Binary, ArchiveFormat::Json] {
        let data = KeyedArchiver::archived_data(Some(&head), ArchiveOptions { format });
        let root = KeyedUnarchiver::unarchive(&data, &registry()).unwrap();
        let head = downcast_ref::<Node>(&root).unwrap();
        assert_eq!(head.name, "head");
        let tail = downcast_ref::<Node>(head.next.as_ref().unwrap()).unwrap();
        assert_eq!(tail.name, "tail");
        assert!(tail.next.is_none());
    }
}

#[test]
fn shared_children_decode_to_one_object() {
    let shared = object(Node {
        name: "shared".into(),
        next: None,
    });
    let mut data = Vec::new();
    {
        let mut archiver = KeyedArchiver::new(&mut data);
        archiver.encode_object_for_key(
            Some(&object(Node {
                name: "a".into(),
                next: Some(shared.clone()),
            })),
            "a",
        );
        archiver.encode_object_for_key(
            Some(&object(Node {
                name: "b".into(),
                next: Some(shared),
            })),
            "b",
        );
    }
    let registry = registry();
    let mut unarchiver = KeyedUnarchiver::new(&data, &registry).unwrap();
    let a = unarchiver.decode_object_for_key("a").unwrap();
    let b = unarchiver.decode_object_for_key("b").unwrap();
    let a_next = downcast_ref::<Node>(&a).unwrap().next.clone().unwrap();
    let b_next = downcast_ref::<Node>(&b).unwrap().next.clone().unwrap();
    assert!(Arc::ptr_eq(&a_next, &b_next));
}

#[test]
fn dangling_reference_faults() {
    let data = json_archive(json!({
        "$archiver": "KeyedArchive",
        "$version": 100000,
        "$top": { "root": { "Ref": 5 } },
        "$objects": []
    }));
    let fault = catch_fault(|| KeyedUnarchiver::unarchive(&data, &registry())).unwrap_err();
    assert_eq!(fault, IntegrityFault::DanglingReference(5));
}

#[test]
fn self_reference_faults_as_cycle() {
    let data = json_archive(json!({
        "$archiver": "KeyedArchive",
        "$version": 100000,
        "$top": { "root": { "Ref": 0 } },
        "$objects": [
            { "class": "Node", "fields": { "name": { "Text": "loop" }, "next": { "Ref": 0 } } }
        ]
    }));
    let fault = catch_fault(|| KeyedUnarchiver::unarchive(&data, &registry())).unwrap_err();
    assert_eq!(fault, IntegrityFault::ReferenceCycle(0));
}

#[test]
fn nested_fault_unwinds_through_every_level() {
    let data = json_archive(json!({
        "$archiver": "KeyedArchive",
        "$version": 100000,
        "$top": { "root": { "Ref": 0 } },
        "$objects": [
            { "class": "Node", "fields": { "name": { "Text": "outer" }, "next": { "Ref": 1 } } },
            { "class": "Node", "fields": { "name": { "Int": 3 } } }
        ]
    }));
    let fault = catch_fault(|| KeyedUnarchiver::unarchive_top_level(&data, &registry())).unwrap_err();
    assert_eq!(
        fault,
        IntegrityFault::FieldTypeMismatch {
            key: "name".into(),
            expected: "text"
        }
    );
}

#[test]
fn corrupt_bytes_fault_on_open() {
    let data = KeyedArchiver::archived_data(Some(&object(Number::Int(1))), ArchiveOptions::default());
    let registry = ClassRegistry::new();
    assert!(matches!(
        KeyedUnarchiver::new(&data[..data.len() - 1], &registry),
        Err(IntegrityFault::Malformed(_))
    ));
    let fault = catch_fault(|| KeyedUnarchiver::unarchive(b"garbage", &registry)).unwrap_err();
    assert!(matches!(fault, IntegrityFault::Malformed(_)));
}

#[test]
fn top_level_unarchive_reads_root() {
    let data = KeyedArchiver::archived_data(Some(&object(Text("top".into()))), ArchiveOptions::default());
    let root = catch_fault(|| KeyedUnarchiver::unarchive_top_level(&data, &ClassRegistry::new()))
        .unwrap()
        .unwrap();
    assert_eq!(downcast_ref::<Text>(&root).map(|t| t.0.as_str()), Some("top"));
    assert!(downcast_ref::<Number>(&root).is_none());
}

#[test]
fn missing_root_is_none() {
    let mut data = Vec::new();
    {
        let mut archiver = KeyedArchiver::new(&mut data);
        archiver.encode_i64(1, "other");
    }
    assert!(KeyedUnarchiver::unarchive(&data, &ClassRegistry::new()).is_none());
    assert!(KeyedUnarchiver::new(&data, &ClassRegistry::new())
        .unwrap()
        .decode_object_for_key(ROOT_KEY)
        .is_none());
}
