use std::collections::HashMap;

use once_cell::sync::Lazy;
use prost_types::{
    descriptor_proto::ExtensionRange,
    field_descriptor_proto::{Label, Type},
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MessageOptions, OneofDescriptorProto,
};

use super::*;
use crate::DescriptorPool;

static POOL: Lazy<DescriptorPool> = Lazy::new(|| {
    let field = |name: &str, number: i32, label: Label, ty: Type| FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    };
    let message_field = |name: &str, number: i32, label: Label, type_name: &str| {
        FieldDescriptorProto {
            type_name: Some(type_name.to_owned()),
            ..field(name, number, label, Type::Message)
        }
    };

    let node = DescriptorProto {
        name: Some("Node".to_owned()),
        field: vec![
            field("id", 1, Label::Optional, Type::Int32),
            field("name", 2, Label::Optional, Type::String),
            message_field("child", 3, Label::Optional, ".test.Node"),
            message_field("children", 4, Label::Repeated, ".test.Node"),
            FieldDescriptorProto {
                oneof_index: Some(0),
                ..field("num", 5, Label::Optional, Type::Int32)
            },
            FieldDescriptorProto {
                oneof_index: Some(0),
                ..field("text", 6, Label::Optional, Type::String)
            },
            message_field("counts", 7, Label::Repeated, ".test.Node.CountsEntry"),
            field("ids", 8, Label::Repeated, Type::Int32),
        ],
        nested_type: vec![DescriptorProto {
            name: Some("CountsEntry".to_owned()),
            field: vec![
                field("key", 1, Label::Optional, Type::String),
                field("value", 2, Label::Optional, Type::Int32),
            ],
            options: Some(MessageOptions {
                map_entry: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        }],
        oneof_decl: vec![OneofDescriptorProto {
            name: Some("choice".to_owned()),
            ..Default::default()
        }],
        ..Default::default()
    };

    let extendable = DescriptorProto {
        name: Some("Extendable".to_owned()),
        field: vec![FieldDescriptorProto {
            default_value: Some("42".to_owned()),
            ..field("answer", 1, Label::Optional, Type::Int32)
        }],
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }],
        ..Default::default()
    };

    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![
            FileDescriptorProto {
                name: Some("node.proto".to_owned()),
                package: Some("test".to_owned()),
                syntax: Some("proto3".to_owned()),
                message_type: vec![node],
                ..Default::default()
            },
            FileDescriptorProto {
                name: Some("ext.proto".to_owned()),
                package: Some("test2".to_owned()),
                syntax: Some("proto2".to_owned()),
                message_type: vec![extendable],
                extension: vec![
                    FieldDescriptorProto {
                        extendee: Some(".test2.Extendable".to_owned()),
                        ..field("tag", 100, Label::Optional, Type::Int32)
                    },
                    FieldDescriptorProto {
                        extendee: Some(".test2.Extendable".to_owned()),
                        ..field("labels", 101, Label::Repeated, Type::String)
                    },
                ],
                ..Default::default()
            },
        ],
    })
    .unwrap()
});

fn node(arena: &Arena) -> DynamicMessage {
    DynamicMessage::new(POOL.get_message_by_name("test.Node").unwrap(), arena)
}

fn node_with_id(arena: &Arena, id: i32) -> DynamicMessage {
    let mut message = node(arena);
    message.set_field_by_name("id", Value::I32(id)).unwrap();
    message
}

#[test]
fn type_sizes() {
    assert_eq!(std::mem::size_of::<DynamicMessage>(), 24);
    assert_eq!(std::mem::size_of::<Value>(), 56);
}

#[test]
fn set_get_clear() {
    let arena = Arena::new();
    let mut message = node(&arena);
    assert!(!message.has_field_by_name("name"));
    assert_eq!(
        message.get_field_by_name("name"),
        Some(Value::String(String::new()))
    );

    message
        .set_field_by_name("name", Value::String("leaf".to_owned()))
        .unwrap();
    assert!(message.has_field_by_name("name"));
    assert_eq!(
        message.get_field_by_number(2),
        Some(Value::String("leaf".to_owned()))
    );

    message.clear_field_by_name("name");
    assert!(!message.has_field_by_name("name"));
    assert_eq!(message.get_field_by_name("missing"), None);
}

#[test]
fn implicit_presence() {
    let arena = Arena::new();
    let mut message = node(&arena);

    message.set_field_by_name("id", Value::I32(0)).unwrap();
    assert!(!message.has_field_by_name("id"));
    assert_eq!(message.fields().count(), 0);

    message.set_field_by_name("id", Value::I32(-3)).unwrap();
    assert!(message.has_field_by_name("id"));
    assert_eq!(message.get_field_by_name("id"), Some(Value::I32(-3)));
}

#[test]
fn explicit_default_value() {
    let desc = POOL.get_message_by_name("test2.Extendable").unwrap();
    let mut message = DynamicMessage::new(desc, &Arena::new());

    assert!(!message.has_field_by_name("answer"));
    assert_eq!(message.get_field_by_name("answer"), Some(Value::I32(42)));

    message.set_field_by_name("answer", Value::I32(0)).unwrap();
    assert!(message.has_field_by_name("answer"));
    assert_eq!(message.get_field_by_name("answer"), Some(Value::I32(0)));
}

#[test]
fn oneof_members_are_exclusive() {
    let arena = Arena::new();
    let mut message = node(&arena);
    let oneof = message.descriptor().oneofs().next().unwrap();
    assert_eq!(message.which_oneof(&oneof), None);

    message.set_field_by_name("num", Value::I32(0)).unwrap();
    assert_eq!(message.which_oneof(&oneof).unwrap().name(), "num");
    assert!(message.has_field_by_name("num"));

    message
        .set_field_by_name("text", Value::String("hi".to_owned()))
        .unwrap();
    assert_eq!(message.which_oneof(&oneof).unwrap().name(), "text");
    assert!(!message.has_field_by_name("num"));
    assert_eq!(message.get_field_by_name("num"), Some(Value::I32(0)));

    message.clear_field_by_name("num");
    assert!(message.has_field_by_name("text"));
    message.clear_field_by_name("text");
    assert_eq!(message.which_oneof(&oneof), None);
}

#[test]
fn set_field_errors() {
    let arena = Arena::new();
    let mut message = node(&arena);

    assert_eq!(
        message.set_field_by_number(99, Value::I32(1)),
        Err(SetFieldError::NotFound)
    );

    let err = message
        .set_field_by_name("id", Value::String("1".to_owned()))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "field 'test.Node.id' expects a value of type 'int32'"
    );

    let err = message
        .set_field_by_name("ids", Value::I32(1))
        .unwrap_err();
    assert_eq!(
        err,
        SetFieldError::TypeMismatch {
            field: "test.Node.ids".to_owned(),
            expected: "repeated int32".to_owned(),
        }
    );

    let err = message
        .set_field_by_name("counts", Value::List(vec![]))
        .unwrap_err();
    assert_eq!(
        err,
        SetFieldError::TypeMismatch {
            field: "test.Node.counts".to_owned(),
            expected: "map<string, int32>".to_owned(),
        }
    );

    let foreign = POOL
        .get_message_by_name("test2.Extendable")
        .unwrap()
        .get_field_by_name("answer")
        .unwrap();
    assert_eq!(
        message.set_field(&foreign, Value::I32(1)),
        Err(SetFieldError::TypeMismatch {
            field: "test2.Extendable.answer".to_owned(),
            expected: "a field of 'test.Node'".to_owned(),
        })
    );
    assert!(!message.has_field(&foreign));
}

#[test]
fn lists_and_maps() {
    let arena = Arena::new();
    let mut message = node(&arena);

    message
        .set_field_by_name("ids", Value::List(vec![Value::I32(1), Value::I32(2)]))
        .unwrap();
    let counts = HashMap::from([
        (MapKey::String("a".to_owned()), Value::I32(1)),
        (MapKey::String("b".to_owned()), Value::I32(0)),
    ]);
    message
        .set_field_by_name("counts", Value::Map(counts.clone()))
        .unwrap();

    assert_eq!(
        message.get_field_by_name("ids").unwrap().as_list(),
        Some([Value::I32(1), Value::I32(2)].as_slice())
    );
    assert_eq!(
        message.get_field_by_name("counts").unwrap().as_map(),
        Some(&counts)
    );

    message.set_field_by_name("ids", Value::List(vec![])).unwrap();
    assert!(!message.has_field_by_name("ids"));
}

#[test]
fn sub_messages_share_storage() {
    let arena = Arena::new();
    let mut parent = node(&arena);
    let mut child = node_with_id(&arena, 1);
    parent
        .set_field_by_name("child", Value::Message(child.clone()))
        .unwrap();

    child.set_field_by_name("id", Value::I32(2)).unwrap();
    let read = parent.get_field_by_name("child").unwrap();
    let read = read.as_message().unwrap();
    assert_eq!(read.get_field_by_name("id"), Some(Value::I32(2)));
    assert!(read.ptr_eq(&child));

    let again = parent.get_field_by_name("child").unwrap();
    assert!(again.as_message().unwrap().ptr_eq(read));
}

#[test]
fn clone_is_a_handle() {
    let arena = Arena::new();
    let mut message = node(&arena);
    let clone = message.clone();

    message.set_field_by_name("id", Value::I32(9)).unwrap();
    assert!(clone.ptr_eq(&message));
    assert_eq!(clone.get_field_by_name("id"), Some(Value::I32(9)));
}

#[test]
fn sub_message_from_other_arena_is_copied() {
    let arena = Arena::new();
    let other = Arena::new();
    let mut parent = node(&arena);
    let mut child = node_with_id(&other, 1);

    parent
        .set_field_by_name("child", Value::Message(child.clone()))
        .unwrap();
    child.set_field_by_name("id", Value::I32(2)).unwrap();

    let read = parent.get_field_by_name("child").unwrap();
    let read = read.as_message().unwrap();
    assert_eq!(read.get_field_by_name("id"), Some(Value::I32(1)));
    assert!(!read.ptr_eq(&child));
    assert!(read.arena().is_fused(&arena));
    assert!(!arena.is_fused(&other));
}

#[test]
fn sub_message_from_fused_arena_is_shared() {
    let arena = Arena::new();
    let other = Arena::new();
    arena.fuse(&other);

    let mut parent = node(&arena);
    let mut child = node_with_id(&other, 1);
    parent
        .set_field_by_name("children", Value::List(vec![Value::Message(child.clone())]))
        .unwrap();
    child.set_field_by_name("id", Value::I32(2)).unwrap();

    let children = parent.get_field_by_name("children").unwrap();
    let first = children.as_list().unwrap()[0].as_message().unwrap().clone();
    assert!(first.ptr_eq(&child));
    assert_eq!(first.get_field_by_name("id"), Some(Value::I32(2)));
}

#[test]
fn self_reference_is_copied() {
    let arena = Arena::new();
    let mut message = node_with_id(&arena, 1);
    message
        .set_field_by_name("child", Value::Message(message.clone()))
        .unwrap();

    let child = message.get_field_by_name("child").unwrap();
    let child = child.as_message().unwrap();
    assert!(!child.ptr_eq(&message));
    assert_eq!(child.get_field_by_name("id"), Some(Value::I32(1)));
    assert!(!child.has_field_by_name("child"));

    // The copy has no cycle, so encoding terminates.
    assert_eq!(message.encode_to_vec(), [0x08, 0x01, 0x1a, 0x02, 0x08, 0x01]);
}

#[test]
fn get_or_create_message() {
    let arena = Arena::new();
    let mut parent = node(&arena);
    let child_desc = parent.descriptor().get_field_by_name("child").unwrap();

    let mut child = parent.get_or_create_message(&child_desc).unwrap();
    assert!(parent.has_field(&child_desc));
    child.set_field_by_name("id", Value::I32(7)).unwrap();

    let same = parent.get_or_create_message(&child_desc).unwrap();
    assert!(same.ptr_eq(&child));
    assert_eq!(same.get_field_by_name("id"), Some(Value::I32(7)));

    let list_desc = parent.descriptor().get_field_by_name("children").unwrap();
    assert!(matches!(
        parent.get_or_create_message(&list_desc),
        Err(SetFieldError::TypeMismatch { .. })
    ));
}

#[test]
fn unset_message_field_is_empty() {
    let arena = Arena::new();
    let parent = node(&arena);
    let child = parent.get_field_by_name("child").unwrap();
    let child = child.as_message().unwrap();

    assert_eq!(child.fields().count(), 0);
    assert!(!parent.has_field_by_name("child"));
}

#[test]
fn extensions() {
    let desc = POOL.get_message_by_name("test2.Extendable").unwrap();
    let tag = POOL.get_extension_by_name("test2.tag").unwrap();
    let labels = POOL.get_extension_by_name("test2.labels").unwrap();
    let arena = Arena::new();
    let mut message = DynamicMessage::new(desc, &arena);

    assert!(!message.has_extension(&tag));
    assert_eq!(message.get_extension(&tag), Value::I32(0));

    message.set_extension(&tag, Value::I32(5)).unwrap();
    message
        .set_extension(
            &labels,
            Value::List(vec![Value::String("x".to_owned())]),
        )
        .unwrap();
    assert!(message.has_extension(&tag));
    assert_eq!(message.get_extension(&tag), Value::I32(5));

    let numbers: Vec<_> = message.extensions().map(|(desc, _)| desc.number()).collect();
    assert_eq!(numbers, [100, 101]);

    assert!(matches!(
        message.set_extension(&tag, Value::String("5".to_owned())),
        Err(SetFieldError::TypeMismatch { .. })
    ));

    message.clear_extension(&tag);
    assert!(!message.has_extension(&tag));
    assert!(message.has_extension(&labels));
}

#[test]
fn extension_on_wrong_message() {
    let tag = POOL.get_extension_by_name("test2.tag").unwrap();
    let mut message = node(&Arena::new());

    let err = message.set_extension(&tag, Value::I32(1)).unwrap_err();
    assert_eq!(
        err,
        SetFieldError::TypeMismatch {
            field: "test2.tag".to_owned(),
            expected: "an extension of 'test.Node'".to_owned(),
        }
    );
    assert!(!message.has_extension(&tag));
}

#[test]
fn equality() {
    let a = node_with_id(&Arena::new(), 3);
    let b = node_with_id(&Arena::new(), 3);
    let c = node_with_id(&Arena::new(), 4);

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn debug_format() {
    let arena = Arena::new();
    let mut message = node_with_id(&arena, 3);
    message
        .set_field_by_name("text", Value::String("hi".to_owned()))
        .unwrap();

    insta::assert_snapshot!(format!("{:?}", message), @r###"test.Node { id: I32(3), text: String("hi") }"###);
}
