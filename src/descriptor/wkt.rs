use crate::descriptor::types::{
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MessageOptions, OneofDescriptorProto, Options,
};

/// Identifies one of the `google.protobuf` well-known message types, which text and JSON codecs
/// format specially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownType {
    /// `google.protobuf.Any`
    Any,
    /// `google.protobuf.Timestamp`
    Timestamp,
    /// `google.protobuf.Duration`
    Duration,
    /// `google.protobuf.FieldMask`
    FieldMask,
    /// `google.protobuf.Struct`
    Struct,
    /// `google.protobuf.Value`
    Value,
    /// `google.protobuf.ListValue`
    ListValue,
    /// `google.protobuf.Empty`
    Empty,
    /// `google.protobuf.DoubleValue`
    DoubleValue,
    /// `google.protobuf.FloatValue`
    FloatValue,
    /// `google.protobuf.Int64Value`
    Int64Value,
    /// `google.protobuf.UInt64Value`
    UInt64Value,
    /// `google.protobuf.Int32Value`
    Int32Value,
    /// `google.protobuf.UInt32Value`
    UInt32Value,
    /// `google.protobuf.BoolValue`
    BoolValue,
    /// `google.protobuf.StringValue`
    StringValue,
    /// `google.protobuf.BytesValue`
    BytesValue,
}

impl WellKnownType {
    /// Gets the well-known type with the given fully-qualified message name, if any.
    pub fn from_full_name(name: &str) -> Option<Self> {
        let name = name.strip_prefix('.').unwrap_or(name);
        let ty = match name.strip_prefix("google.protobuf.")? {
            "Any" => WellKnownType::Any,
            "Timestamp" => WellKnownType::Timestamp,
            "Duration" => WellKnownType::Duration,
            "FieldMask" => WellKnownType::FieldMask,
            "Struct" => WellKnownType::Struct,
            "Value" => WellKnownType::Value,
            "ListValue" => WellKnownType::ListValue,
            "Empty" => WellKnownType::Empty,
            "DoubleValue" => WellKnownType::DoubleValue,
            "FloatValue" => WellKnownType::FloatValue,
            "Int64Value" => WellKnownType::Int64Value,
            "UInt64Value" => WellKnownType::UInt64Value,
            "Int32Value" => WellKnownType::Int32Value,
            "UInt32Value" => WellKnownType::UInt32Value,
            "BoolValue" => WellKnownType::BoolValue,
            "StringValue" => WellKnownType::StringValue,
            "BytesValue" => WellKnownType::BytesValue,
            _ => return None,
        };
        Some(ty)
    }

    /// Gets the fully-qualified name of the message type, e.g. `google.protobuf.Timestamp`.
    pub fn full_name(&self) -> &'static str {
        match self {
            WellKnownType::Any => "google.protobuf.Any",
            WellKnownType::Timestamp => "google.protobuf.Timestamp",
            WellKnownType::Duration => "google.protobuf.Duration",
            WellKnownType::FieldMask => "google.protobuf.FieldMask",
            WellKnownType::Struct => "google.protobuf.Struct",
            WellKnownType::Value => "google.protobuf.Value",
            WellKnownType::ListValue => "google.protobuf.ListValue",
            WellKnownType::Empty => "google.protobuf.Empty",
            WellKnownType::DoubleValue => "google.protobuf.DoubleValue",
            WellKnownType::FloatValue => "google.protobuf.FloatValue",
            WellKnownType::Int64Value => "google.protobuf.Int64Value",
            WellKnownType::UInt64Value => "google.protobuf.UInt64Value",
            WellKnownType::Int32Value => "google.protobuf.Int32Value",
            WellKnownType::UInt32Value => "google.protobuf.UInt32Value",
            WellKnownType::BoolValue => "google.protobuf.BoolValue",
            WellKnownType::StringValue => "google.protobuf.StringValue",
            WellKnownType::BytesValue => "google.protobuf.BytesValue",
        }
    }

    /// Whether this is one of the single-field wrapper types such as `google.protobuf.Int32Value`.
    pub fn is_wrapper(&self) -> bool {
        matches!(
            self,
            WellKnownType::DoubleValue
                | WellKnownType::FloatValue
                | WellKnownType::Int64Value
                | WellKnownType::UInt64Value
                | WellKnownType::Int32Value
                | WellKnownType::UInt32Value
                | WellKnownType::BoolValue
                | WellKnownType::StringValue
                | WellKnownType::BytesValue
        )
    }
}

/// The files defining the well-known types, in dependency order.
pub(super) fn well_known_type_files() -> Vec<FileDescriptorProto> {
    vec![
        file(
            "google/protobuf/any.proto",
            vec![message(
                "Any",
                vec![
                    field("type_url", 1, Type::String),
                    field("value", 2, Type::Bytes),
                ],
            )],
            vec![],
        ),
        file(
            "google/protobuf/duration.proto",
            vec![message(
                "Duration",
                vec![
                    field("seconds", 1, Type::Int64),
                    field("nanos", 2, Type::Int32),
                ],
            )],
            vec![],
        ),
        file("google/protobuf/empty.proto", vec![message("Empty", vec![])], vec![]),
        file(
            "google/protobuf/field_mask.proto",
            vec![message(
                "FieldMask",
                vec![repeated(field("paths", 1, Type::String))],
            )],
            vec![],
        ),
        file(
            "google/protobuf/struct.proto",
            vec![
                DescriptorProto {
                    nested_type: vec![map_entry(
                        "FieldsEntry",
                        field("key", 1, Type::String),
                        message_field("value", 2, ".google.protobuf.Value"),
                    )],
                    ..message(
                        "Struct",
                        vec![repeated(message_field(
                            "fields",
                            1,
                            ".google.protobuf.Struct.FieldsEntry",
                        ))],
                    )
                },
                DescriptorProto {
                    oneof_decl: vec![OneofDescriptorProto {
                        name: Some("kind".to_owned()),
                        options: None,
                    }],
                    ..message(
                        "Value",
                        vec![
                            in_oneof(enum_field("null_value", 1, ".google.protobuf.NullValue")),
                            in_oneof(field("number_value", 2, Type::Double)),
                            in_oneof(field("string_value", 3, Type::String)),
                            in_oneof(field("bool_value", 4, Type::Bool)),
                            in_oneof(message_field("struct_value", 5, ".google.protobuf.Struct")),
                            in_oneof(message_field(
                                "list_value",
                                6,
                                ".google.protobuf.ListValue",
                            )),
                        ],
                    )
                },
                message(
                    "ListValue",
                    vec![repeated(message_field(
                        "values",
                        1,
                        ".google.protobuf.Value",
                    ))],
                ),
            ],
            vec![EnumDescriptorProto {
                name: Some("NullValue".to_owned()),
                value: vec![EnumValueDescriptorProto {
                    name: Some("NULL_VALUE".to_owned()),
                    number: Some(0),
                    options: None,
                }],
                ..Default::default()
            }],
        ),
        file(
            "google/protobuf/timestamp.proto",
            vec![message(
                "Timestamp",
                vec![
                    field("seconds", 1, Type::Int64),
                    field("nanos", 2, Type::Int32),
                ],
            )],
            vec![],
        ),
        file(
            "google/protobuf/wrappers.proto",
            vec![
                message("DoubleValue", vec![field("value", 1, Type::Double)]),
                message("FloatValue", vec![field("value", 1, Type::Float)]),
                message("Int64Value", vec![field("value", 1, Type::Int64)]),
                message("UInt64Value", vec![field("value", 1, Type::Uint64)]),
                message("Int32Value", vec![field("value", 1, Type::Int32)]),
                message("UInt32Value", vec![field("value", 1, Type::Uint32)]),
                message("BoolValue", vec![field("value", 1, Type::Bool)]),
                message("StringValue", vec![field("value", 1, Type::String)]),
                message("BytesValue", vec![field("value", 1, Type::Bytes)]),
            ],
            vec![],
        ),
    ]
}

fn file(
    name: &str,
    message_type: Vec<DescriptorProto>,
    enum_type: Vec<EnumDescriptorProto>,
) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: Some("google.protobuf".to_owned()),
        message_type,
        enum_type,
        syntax: Some("proto3".to_owned()),
        ..Default::default()
    }
}

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field,
        ..Default::default()
    }
}

fn map_entry(name: &str, key: FieldDescriptorProto, value: FieldDescriptorProto) -> DescriptorProto {
    DescriptorProto {
        options: Some(Options::new(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        })),
        ..message(name, vec![key, value])
    }
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

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, Type::Message)
    }
}

fn enum_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, Type::Enum)
    }
}

fn repeated(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        label: Some(Label::Repeated as i32),
        ..field
    }
}

fn in_oneof(field: FieldDescriptorProto) -> FieldDescriptorProto {
    FieldDescriptorProto {
        oneof_index: Some(0),
        ..field
    }
}
