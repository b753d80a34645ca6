//! Descriptors shared by the integration tests, built directly from descriptor protos.

use once_cell::sync::Lazy;
use prost_runtime::{
    prost_types::{
        descriptor_proto::ExtensionRange,
        field_descriptor_proto::{Label, Type},
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FieldOptions, FileDescriptorProto, FileDescriptorSet, MessageOptions,
        OneofDescriptorProto,
    },
    DescriptorPool, ExtensionDescriptor, MessageDescriptor,
};

pub static POOL: Lazy<DescriptorPool> = Lazy::new(|| {
    DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![proto3_file(), proto2_file()],
    })
    .expect("test schema should be valid")
});

pub fn message(name: &str) -> MessageDescriptor {
    POOL.get_message_by_name(name)
        .unwrap_or_else(|| panic!("message '{}' not found", name))
}

pub fn extension(name: &str) -> ExtensionDescriptor {
    POOL.get_extension_by_name(name)
        .unwrap_or_else(|| panic!("extension '{}' not found", name))
}

fn field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn typed(name: &str, number: i32, ty: Type, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, ty)
    }
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

fn packed(field: FieldDescriptorProto, packed: bool) -> FieldDescriptorProto {
    FieldDescriptorProto {
        options: Some(FieldOptions {
            packed: Some(packed),
            ..Default::default()
        }),
        ..repeated(field)
    }
}

fn map_entry(name: &str, key: Type, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: vec![field("key", 1, key), value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn enumeration(name: &str, values: &[(&str, i32)]) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: values
            .iter()
            .map(|&(name, number)| EnumValueDescriptorProto {
                name: Some(name.to_owned()),
                number: Some(number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn proto3_file() -> FileDescriptorProto {
    let scalars = DescriptorProto {
        name: Some("Scalars".to_owned()),
        field: vec![
            field("double", 1, Type::Double),
            field("float", 2, Type::Float),
            field("int32", 3, Type::Int32),
            field("int64", 4, Type::Int64),
            field("uint32", 5, Type::Uint32),
            field("uint64", 6, Type::Uint64),
            field("sint32", 7, Type::Sint32),
            field("sint64", 8, Type::Sint64),
            field("fixed32", 9, Type::Fixed32),
            field("fixed64", 10, Type::Fixed64),
            field("sfixed32", 11, Type::Sfixed32),
            field("sfixed64", 12, Type::Sfixed64),
            field("bool", 13, Type::Bool),
            field("string", 14, Type::String),
            field("bytes", 15, Type::Bytes),
            typed("color", 16, Type::Enum, ".test.Color"),
        ],
        ..Default::default()
    };

    let container = DescriptorProto {
        name: Some("Container".to_owned()),
        field: vec![
            typed("scalars", 1, Type::Message, ".test.Scalars"),
            repeated(field("numbers", 2, Type::Int32)),
            repeated(typed(
                "counts",
                3,
                Type::Message,
                ".test.Container.CountsEntry",
            )),
            FieldDescriptorProto {
                oneof_index: Some(0),
                ..field("int_choice", 4, Type::Int32)
            },
            FieldDescriptorProto {
                oneof_index: Some(0),
                ..field("str_choice", 5, Type::String)
            },
            FieldDescriptorProto {
                oneof_index: Some(0),
                ..typed("msg_choice", 6, Type::Message, ".test.Scalars")
            },
            FieldDescriptorProto {
                oneof_index: Some(1),
                proto3_optional: Some(true),
                ..field("opt", 7, Type::Int32)
            },
            repeated(field("names", 8, Type::String)),
            typed("child", 9, Type::Message, ".test.Container"),
            packed(field("unpacked", 10, Type::Int32), false),
            repeated(typed(
                "messages",
                11,
                Type::Message,
                ".test.Container.MessagesEntry",
            )),
        ],
        nested_type: vec![
            map_entry("CountsEntry", Type::String, field("value", 2, Type::Int32)),
            map_entry(
                "MessagesEntry",
                Type::Int32,
                typed("value", 2, Type::Message, ".test.Scalars"),
            ),
        ],
        oneof_decl: vec![
            OneofDescriptorProto {
                name: Some("choice".to_owned()),
                ..Default::default()
            },
            OneofDescriptorProto {
                name: Some("_opt".to_owned()),
                ..Default::default()
            },
        ],
        ..Default::default()
    };

    let shuffled = DescriptorProto {
        name: Some("Shuffled".to_owned()),
        field: vec![
            field("c", 3, Type::Int32),
            field("a", 1, Type::Int32),
            field("b", 2, Type::String),
        ],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        package: Some("test".to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type: vec![scalars, container, shuffled],
        enum_type: vec![enumeration(
            "Color",
            &[("RED", 0), ("GREEN", 1), ("BLUE", 2)],
        )],
        ..Default::default()
    }
}

fn proto2_file() -> FileDescriptorProto {
    let legacy = DescriptorProto {
        name: Some("Legacy".to_owned()),
        field: vec![
            field("a", 1, Type::Int32),
            typed("closed", 2, Type::Enum, ".test2.Closed"),
            repeated(typed("closed_list", 3, Type::Enum, ".test2.Closed")),
            field("loose", 4, Type::String),
            typed("grp", 5, Type::Group, ".test2.Legacy.Grp"),
            packed(field("packed", 6, Type::Int32), true),
            repeated(typed(
                "closed_map",
                7,
                Type::Message,
                ".test2.Legacy.ClosedMapEntry",
            )),
            repeated(typed(
                "loose_map",
                8,
                Type::Message,
                ".test2.Legacy.LooseMapEntry",
            )),
        ],
        nested_type: vec![
            DescriptorProto {
                name: Some("Grp".to_owned()),
                field: vec![field("x", 1, Type::Int32)],
                ..Default::default()
            },
            map_entry(
                "ClosedMapEntry",
                Type::Int32,
                typed("value", 2, Type::Enum, ".test2.Closed"),
            ),
            map_entry("LooseMapEntry", Type::String, field("value", 2, Type::Int32)),
        ],
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(536_870_912),
            ..Default::default()
        }],
        ..Default::default()
    };

    let recursive = DescriptorProto {
        name: Some("Recursive".to_owned()),
        field: vec![
            typed("child", 1, Type::Message, ".test2.Recursive"),
            field("value", 2, Type::Int32),
        ],
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("proto2.proto".to_owned()),
        package: Some("test2".to_owned()),
        syntax: Some("proto2".to_owned()),
        message_type: vec![legacy, recursive],
        enum_type: vec![enumeration("Closed", &[("A", 1), ("B", 2)])],
        extension: vec![
            FieldDescriptorProto {
                extendee: Some(".test2.Legacy".to_owned()),
                ..field("ext_int", 536_860_000, Type::Int32)
            },
            FieldDescriptorProto {
                extendee: Some(".test2.Legacy".to_owned()),
                ..repeated(field("ext_strs", 101, Type::String))
            },
        ],
        ..Default::default()
    }
}
