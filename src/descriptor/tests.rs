use prost::Message;
use prost_types::{
    descriptor_proto::ExtensionRange,
    field_descriptor_proto::{Label, Type},
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, FileDescriptorSet, MessageOptions, MethodDescriptorProto,
    ServiceDescriptorProto,
};

use crate::{
    descriptor::types, Cardinality, DescriptorErrorKind, DescriptorPool, Edition, EnumType,
    FieldPresence, Kind, MessageEncoding, RepeatedFieldEncoding, Syntax, Utf8Validation,
    WellKnownType,
};

fn message(name: &str, field: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field,
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(Type::Message as i32),
        type_name: Some(type_name.to_owned()),
        ..Default::default()
    }
}

fn file(name: &str, package: &str, message_type: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some(name.to_owned()),
        package: Some(package.to_owned()),
        syntax: Some("proto3".to_owned()),
        message_type,
        ..Default::default()
    }
}

fn open_enum(name: &str) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(name.to_owned()),
        value: vec![EnumValueDescriptorProto {
            name: Some(format!("{}_ZERO", name.to_uppercase())),
            number: Some(0),
            ..Default::default()
        }],
        ..Default::default()
    }
}

#[test]
fn resolve_relative_and_absolute_names() {
    let mut outer = message(
        "Outer",
        vec![
            message_field("sibling", 1, "Sibling"),
            message_field("nested", 2, "Inner"),
            message_field("absolute", 3, ".my.package.Sibling"),
        ],
    );
    outer.nested_type.push(message("Inner", vec![]));
    let set = FileDescriptorSet {
        file: vec![file(
            "myfile.proto",
            "my.package",
            vec![message("Sibling", vec![]), outer],
        )],
    };

    let pool = DescriptorPool::from_file_descriptor_set(set).unwrap();
    let outer = pool.get_message_by_name("my.package.Outer").unwrap();
    let type_of = |name: &str| {
        outer
            .get_field_by_name(name)
            .unwrap()
            .kind()
            .as_message()
            .unwrap()
            .full_name()
            .to_owned()
    };
    assert_eq!(type_of("sibling"), "my.package.Sibling");
    assert_eq!(type_of("nested"), "my.package.Outer.Inner");
    assert_eq!(type_of("absolute"), "my.package.Sibling");
    assert_eq!(outer.package_name(), "my.package");
    assert_eq!(pool.find_message_by_name(".my.package.Outer"), Some(outer));
}

#[test]
fn resolve_service_types() {
    let set = FileDescriptorSet {
        file: vec![FileDescriptorProto {
            service: vec![ServiceDescriptorProto {
                name: Some("Echo".to_owned()),
                method: vec![MethodDescriptorProto {
                    name: Some("Call".to_owned()),
                    input_type: Some("Request".to_owned()),
                    output_type: Some(".svc.Request".to_owned()),
                    server_streaming: Some(true),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..file("svc.proto", "svc", vec![message("Request", vec![])])
        }],
    };

    let pool = DescriptorPool::from_file_descriptor_set(set).unwrap();
    let service = pool.get_service_by_name("svc.Echo").unwrap();
    let method = service.get_method_by_name("Call").unwrap();
    assert_eq!(method.full_name(), "svc.Echo.Call");
    assert_eq!(method.input().full_name(), "svc.Request");
    assert_eq!(method.output(), method.input());
    assert!(!method.is_client_streaming());
    assert!(method.is_server_streaming());
}

#[test]
fn reference_type_in_previously_added_file() {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(file("base.proto", "base", vec![message("Shared", vec![])]))
        .unwrap();
    pool.add_file_descriptor_proto(FileDescriptorProto {
        dependency: vec!["base.proto".to_owned()],
        ..file(
            "user.proto",
            "user",
            vec![message("User", vec![message_field("shared", 1, ".base.Shared")])],
        )
    })
    .unwrap();

    let base = pool.get_file_by_name("base.proto").unwrap();
    let user = pool.get_file_by_name("user.proto").unwrap();
    assert_eq!(user.dependencies().collect::<Vec<_>>(), vec![base.clone()]);
    assert!(pool.get_file_by_name("missing.proto").is_none());

    let field = pool
        .get_message_by_name("user.User")
        .unwrap()
        .get_field_by_name("shared")
        .unwrap();
    assert_eq!(field.kind().as_message().unwrap().parent_file(), base);
}

#[test]
fn type_from_unimported_file_is_not_visible() {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(file("base.proto", "base", vec![message("Shared", vec![])]))
        .unwrap();
    let err = pool
        .add_file_descriptor_proto(file(
            "user.proto",
            "user",
            vec![message("User", vec![message_field("shared", 1, ".base.Shared")])],
        ))
        .unwrap_err();
    assert_eq!(err.kind(), DescriptorErrorKind::UnresolvedImport);
}

#[test]
fn identical_file_is_added_once() {
    let proto = file("myfile.proto", "my.package", vec![message("MyMessage", vec![])]);

    let mut pool = DescriptorPool::new();
    let first = pool.add_file(proto.encode_to_vec().as_slice()).unwrap();
    let second = pool.add_file(proto.encode_to_vec().as_slice()).unwrap();
    pool.add_file_descriptor_proto(proto).unwrap();

    assert_eq!(first, second);
    assert_eq!(pool.files().len(), 1);
}

#[test]
fn different_file_with_same_name() {
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(file("myfile.proto", "a", vec![]))
        .unwrap();
    let err = pool
        .add_file_descriptor_proto(file("myfile.proto", "b", vec![]))
        .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::DuplicateName);
    assert_eq!(
        err.to_string(),
        "a different file named 'myfile.proto' has already been added"
    );
    assert_eq!(pool.get_file_by_name("myfile.proto").unwrap().package_name(), "a");
}

#[test]
fn duplicate_message_name() {
    let err = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![
            file("a.proto", "pkg", vec![message("Dup", vec![])]),
            file("b.proto", "pkg", vec![message("Dup", vec![])]),
        ],
    })
    .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::DuplicateName);
    assert_eq!(
        err.to_string(),
        "name 'pkg.Dup' is already defined in file 'a.proto'"
    );
}

#[test]
fn add_file_rollback_on_error() {
    let mut pool = DescriptorPool::new();
    let err = pool
        .add_file_descriptor_set(FileDescriptorSet {
            file: vec![
                file("good.proto", "good", vec![message("Good", vec![])]),
                file(
                    "bad.proto",
                    "bad",
                    vec![message("Bad", vec![message_field("nope", 1, ".bad.Nope")])],
                ),
            ],
        })
        .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::UnresolvedImport);
    assert_eq!(err.to_string(), "name '.bad.Nope' is not defined");
    assert_eq!(err.file(), Some("bad.proto"));
    assert_eq!(pool.files().len(), 0);
    assert!(pool.get_message_by_name("good.Good").is_none());

    // The pool remains usable after a failed batch.
    pool.add_file_descriptor_proto(file("good.proto", "good", vec![message("Good", vec![])]))
        .unwrap();
    assert!(pool.get_message_by_name("good.Good").is_some());
}

#[test]
fn add_file_missing_dependency() {
    let mut pool = DescriptorPool::new();
    let err = pool
        .add_file_descriptor_proto(FileDescriptorProto {
            dependency: vec!["notfound.proto".to_owned()],
            ..file("myfile.proto", "my.package", vec![])
        })
        .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::UnresolvedImport);
    assert_eq!(
        err.to_string(),
        "imported file 'notfound.proto' has not been added"
    );
}

#[test]
fn dependency_must_precede_importer() {
    let err = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![
            FileDescriptorProto {
                dependency: vec!["late.proto".to_owned()],
                ..file("early.proto", "early", vec![])
            },
            file("late.proto", "late", vec![]),
        ],
    })
    .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::UnresolvedImport);
    assert_eq!(
        err.to_string(),
        "imported file 'late.proto' must be added before the files that import it"
    );
}

#[test]
fn field_type_not_message() {
    let err = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![FileDescriptorProto {
            extension: vec![FieldDescriptorProto {
                name: Some("ext".to_owned()),
                number: Some(1),
                label: Some(Label::Optional as i32),
                r#type: Some(Type::Int32 as i32),
                extendee: Some("my.package.NotAMessage".to_owned()),
                ..Default::default()
            }],
            enum_type: vec![open_enum("NotAMessage")],
            ..file("myfile.proto", "my.package", vec![])
        }],
    })
    .unwrap_err();

    assert_eq!(err.kind(), DescriptorErrorKind::MalformedDescriptor);
    assert_eq!(
        err.to_string(),
        "'my.package.NotAMessage' is not a message type"
    );
}

fn scalar_field(name: &str, number: i32, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

/// A file with `maps.Holder`, whose field `values` uses the nested `ValuesEntry` type.
fn map_file(entry_fields: Vec<FieldDescriptorProto>, label: Label) -> FileDescriptorProto {
    let values = FieldDescriptorProto {
        label: Some(label as i32),
        ..message_field("values", 1, ".maps.Holder.ValuesEntry")
    };
    let entry = DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message("ValuesEntry", entry_fields)
    };
    file(
        "maps.proto",
        "maps",
        vec![DescriptorProto {
            nested_type: vec![entry],
            ..message("Holder", vec![values])
        }],
    )
}

#[test]
fn map_entry_shape() {
    let key = || scalar_field("key", 1, Type::String);
    let value = || scalar_field("value", 2, Type::Int32);

    let mut pool = DescriptorPool::new();
    let file = pool
        .add_file(map_file(vec![key(), value()], Label::Repeated).encode_to_vec().as_slice())
        .unwrap();
    let values = file.messages().next().unwrap().get_field(1).unwrap();
    assert!(values.is_map());

    let invalid = [
        (
            vec![value()],
            Label::Repeated,
            "expected a key field numbered 1 and a value field numbered 2",
        ),
        (
            vec![key(), value(), scalar_field("extra", 3, Type::Bool)],
            Label::Repeated,
            "expected exactly two fields",
        ),
        (
            vec![
                key(),
                FieldDescriptorProto {
                    label: Some(Label::Repeated as i32),
                    ..value()
                },
            ],
            Label::Repeated,
            "the key and value fields cannot be repeated",
        ),
        (
            vec![scalar_field("key", 1, Type::Double), value()],
            Label::Repeated,
            "the key must have an integral, bool or string type",
        ),
        (
            vec![scalar_field("key", 1, Type::Bytes), value()],
            Label::Repeated,
            "the key must have an integral, bool or string type",
        ),
        (
            vec![key(), value()],
            Label::Optional,
            "only repeated fields can use a map entry type",
        ),
    ];
    for (fields, label, reason) in invalid {
        let err = DescriptorPool::new()
            .add_file_descriptor_proto(map_file(fields, label))
            .unwrap_err();
        assert_eq!(err.kind(), DescriptorErrorKind::MalformedDescriptor);
        assert_eq!(
            err.to_string(),
            format!("invalid map entry type 'maps.Holder.ValuesEntry': {}", reason)
        );
    }
}

#[test]
fn duplicate_extension_number() {
    let extension = |name: &str| FieldDescriptorProto {
        extendee: Some(".pkg.Extendee".to_owned()),
        ..scalar_field(name, 100, Type::Int32)
    };
    let extendee = DescriptorProto {
        extension_range: vec![ExtensionRange {
            start: Some(100),
            end: Some(200),
            ..Default::default()
        }],
        ..message("Extendee", vec![])
    };
    let proto2 = |name: &str, message_type, extension| FileDescriptorProto {
        syntax: Some("proto2".to_owned()),
        extension,
        ..file(name, "pkg", message_type)
    };

    let err = DescriptorPool::new()
        .add_file_descriptor_proto(proto2(
            "ext.proto",
            vec![extendee.clone()],
            vec![extension("first"), extension("second")],
        ))
        .unwrap_err();
    assert_eq!(err.kind(), DescriptorErrorKind::MalformedDescriptor);
    assert_eq!(err.to_string(), "field number '100' is already used");

    // Extensions added by an earlier file count too.
    let mut pool = DescriptorPool::new();
    pool.add_file_descriptor_proto(proto2("ext.proto", vec![extendee], vec![extension("first")]))
        .unwrap();
    let err = pool
        .add_file_descriptor_proto(FileDescriptorProto {
            dependency: vec!["ext.proto".to_owned()],
            ..proto2("more.proto", vec![], vec![extension("second")])
        })
        .unwrap_err();
    assert_eq!(err.to_string(), "field number '100' is already used");
    assert_eq!(pool.all_extensions().len(), 1);
    assert_eq!(
        pool.get_message_by_name("pkg.Extendee").unwrap().extensions().len(),
        1
    );
}

#[test]
fn legacy_syntax_features() {
    let pool = DescriptorPool::from_file_descriptor_set(FileDescriptorSet {
        file: vec![
            FileDescriptorProto {
                syntax: Some("proto2".to_owned()),
                enum_type: vec![open_enum("Kind")],
                ..file(
                    "legacy2.proto",
                    "legacy2",
                    vec![message(
                        "Message",
                        vec![
                            FieldDescriptorProto {
                                name: Some("required".to_owned()),
                                number: Some(1),
                                label: Some(Label::Required as i32),
                                r#type: Some(Type::String as i32),
                                ..Default::default()
                            },
                            FieldDescriptorProto {
                                name: Some("kind".to_owned()),
                                number: Some(2),
                                label: Some(Label::Optional as i32),
                                r#type: Some(Type::Enum as i32),
                                type_name: Some(".legacy2.Kind".to_owned()),
                                ..Default::default()
                            },
                        ],
                    )],
                )
            },
            file(
                "legacy3.proto",
                "legacy3",
                vec![message(
                    "Message",
                    vec![FieldDescriptorProto {
                        name: Some("text".to_owned()),
                        number: Some(1),
                        label: Some(Label::Optional as i32),
                        r#type: Some(Type::String as i32),
                        ..Default::default()
                    }],
                )],
            ),
        ],
    })
    .unwrap();

    let proto2 = pool.get_file_by_name("legacy2.proto").unwrap();
    assert_eq!(proto2.syntax(), Syntax::Proto2);
    assert_eq!(proto2.edition(), Edition::Proto2);

    let message = pool.get_message_by_name("legacy2.Message").unwrap();
    let required = message.get_field_by_name("required").unwrap();
    assert_eq!(required.cardinality(), Cardinality::Required);
    assert_eq!(
        required.features().field_presence(),
        FieldPresence::LegacyRequired
    );
    assert!(!required.validates_utf8());
    assert!(message.get_field_by_name("kind").unwrap().is_closed_enum());

    let proto3 = pool.get_file_by_name("legacy3.proto").unwrap();
    assert_eq!(proto3.syntax(), Syntax::Proto3);
    let text = pool
        .get_message_by_name("legacy3.Message")
        .unwrap()
        .get_field_by_name("text")
        .unwrap();
    assert!(!text.supports_presence());
    assert!(text.validates_utf8());
}

fn feature_set(f: impl FnOnce(&mut types::FeatureSet)) -> Option<types::FeatureSet> {
    let mut features = types::FeatureSet::default();
    f(&mut features);
    Some(features)
}

fn editions_field(
    name: &str,
    number: i32,
    label: Label,
    ty: Type,
    features: Option<types::FeatureSet>,
) -> types::FieldDescriptorProto {
    types::FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        options: features.map(|features| {
            types::Options::new(types::FieldOptions {
                features: Some(features),
                ..Default::default()
            })
        }),
        ..Default::default()
    }
}

fn editions_file(
    edition: i32,
    features: Option<types::FeatureSet>,
    message_type: Vec<types::DescriptorProto>,
) -> types::FileDescriptorProto {
    types::FileDescriptorProto {
        name: Some("editions.proto".to_owned()),
        package: Some("ed".to_owned()),
        syntax: Some("editions".to_owned()),
        edition: Some(edition),
        options: features.map(|features| {
            types::Options::new(types::FileOptions {
                features: Some(features),
            })
        }),
        message_type,
        ..Default::default()
    }
}

fn add_editions_file(
    file: types::FileDescriptorProto,
) -> Result<DescriptorPool, crate::DescriptorError> {
    let mut pool = DescriptorPool::new();
    pool.add_file(file.encode_to_vec().as_slice())?;
    Ok(pool)
}

#[test]
fn editions_feature_inheritance() {
    let outer = types::DescriptorProto {
        name: Some("Outer".to_owned()),
        field: vec![
            editions_field("plain", 1, Label::Optional, Type::Int32, None),
            editions_field("list", 2, Label::Repeated, Type::Int32, None),
            editions_field(
                "explicit",
                3,
                Label::Optional,
                Type::Int32,
                feature_set(|f| f.field_presence = Some(1)),
            ),
            editions_field(
                "packed",
                4,
                Label::Repeated,
                Type::Int32,
                feature_set(|f| f.repeated_field_encoding = Some(1)),
            ),
            types::FieldDescriptorProto {
                oneof_index: Some(0),
                ..editions_field("text", 5, Label::Optional, Type::String, None)
            },
            types::FieldDescriptorProto {
                oneof_index: Some(0),
                ..editions_field(
                    "checked",
                    6,
                    Label::Optional,
                    Type::String,
                    feature_set(|f| f.utf8_validation = Some(2)),
                )
            },
            types::FieldDescriptorProto {
                type_name: Some(".ed.Outer".to_owned()),
                ..editions_field(
                    "child",
                    7,
                    Label::Optional,
                    Type::Message,
                    feature_set(|f| f.message_encoding = Some(2)),
                )
            },
        ],
        oneof_decl: vec![types::OneofDescriptorProto {
            name: Some("choice".to_owned()),
            options: Some(types::Options::new(types::OneofOptions {
                features: feature_set(|f| f.utf8_validation = Some(3)),
            })),
        }],
        options: Some(types::Options::new(types::MessageOptions {
            features: feature_set(|f| f.repeated_field_encoding = Some(2)),
            ..Default::default()
        })),
        ..Default::default()
    };

    let pool = add_editions_file(editions_file(
        1000,
        feature_set(|f| f.field_presence = Some(2)),
        vec![outer],
    ))
    .unwrap();

    let file = pool.get_file_by_name("editions.proto").unwrap();
    assert_eq!(file.syntax(), Syntax::Editions);
    assert_eq!(file.edition(), Edition::Edition2023);
    assert_eq!(file.features().field_presence(), FieldPresence::Implicit);

    let outer = pool.get_message_by_name("ed.Outer").unwrap();
    assert_eq!(
        outer.features().repeated_field_encoding(),
        RepeatedFieldEncoding::Expanded
    );
    assert_eq!(outer.features().field_presence(), FieldPresence::Implicit);

    let field = |name: &str| outer.get_field_by_name(name).unwrap();

    assert!(!field("plain").supports_presence());
    assert!(!field("list").is_packed());
    assert!(field("explicit").supports_presence());
    assert_eq!(
        field("explicit").features().field_presence(),
        FieldPresence::Explicit
    );
    assert!(field("packed").is_packed());

    // Oneof features apply to members unless the member overrides them.
    assert_eq!(
        field("text").features().utf8_validation(),
        Utf8Validation::None
    );
    assert!(!field("text").validates_utf8());
    assert!(field("checked").validates_utf8());
    assert!(field("text").supports_presence());

    let child = field("child");
    assert!(child.is_group());
    assert_eq!(
        child.features().message_encoding(),
        MessageEncoding::Delimited
    );
    assert!(matches!(child.kind(), Kind::Message(desc) if desc == outer));
}

#[test]
fn editions_enum_type() {
    let mut file = editions_file(1001, None, vec![]);
    file.enum_type.push(types::EnumDescriptorProto {
        name: Some("Closed".to_owned()),
        value: vec![types::EnumValueDescriptorProto {
            name: Some("CLOSED_ONE".to_owned()),
            number: Some(1),
            ..Default::default()
        }],
        options: Some(types::Options::new(types::EnumOptions {
            features: feature_set(|f| f.enum_type = Some(2)),
            ..Default::default()
        })),
        ..Default::default()
    });
    file.enum_type.push(types::EnumDescriptorProto {
        name: Some("Open".to_owned()),
        value: vec![types::EnumValueDescriptorProto {
            name: Some("OPEN_ZERO".to_owned()),
            number: Some(0),
            ..Default::default()
        }],
        ..Default::default()
    });

    let pool = add_editions_file(file).unwrap();
    assert_eq!(
        pool.get_file_by_name("editions.proto").unwrap().edition(),
        Edition::Edition2024
    );

    let closed = pool.get_enum_by_name("ed.Closed").unwrap();
    assert!(closed.is_closed());
    assert_eq!(closed.features().enum_type(), EnumType::Closed);
    assert_eq!(closed.default_value().number(), 1);
    assert!(!pool.get_enum_by_name("ed.Open").unwrap().is_closed());
}

#[test]
fn features_rejected_outside_editions() {
    let mut file = editions_file(
        0,
        feature_set(|f| f.field_presence = Some(2)),
        vec![],
    );
    file.syntax = Some("proto3".to_owned());
    file.edition = None;

    let err = add_editions_file(file).unwrap_err();
    assert_eq!(err.kind(), DescriptorErrorKind::MalformedDescriptor);
    assert_eq!(
        err.to_string(),
        "features are only allowed in files using editions"
    );
}

#[test]
fn invalid_feature_value() {
    let err = add_editions_file(editions_file(
        1000,
        feature_set(|f| f.repeated_field_encoding = Some(7)),
        vec![],
    ))
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid value '7' for feature 'repeated_field_encoding'"
    );
}

#[test]
fn unsupported_edition() {
    let err = add_editions_file(editions_file(900, None, vec![])).unwrap_err();
    assert_eq!(err.kind(), DescriptorErrorKind::MalformedDescriptor);
    assert_eq!(err.to_string(), "unsupported edition '900'");
}

#[test]
fn invalid_field_presence() {
    let check = |field: types::FieldDescriptorProto, expected: &str| {
        let message = types::DescriptorProto {
            name: Some("Message".to_owned()),
            field: vec![field],
            ..Default::default()
        };
        let err = add_editions_file(editions_file(1000, None, vec![message])).unwrap_err();
        assert_eq!(err.to_string(), expected);
    };

    let implicit = || feature_set(|f| f.field_presence = Some(2));
    check(
        editions_field("list", 1, Label::Repeated, Type::Int32, implicit()),
        "invalid field presence: repeated fields cannot specify field presence",
    );
    check(
        types::FieldDescriptorProto {
            type_name: Some(".ed.Message".to_owned()),
            ..editions_field("child", 1, Label::Optional, Type::Message, implicit())
        },
        "invalid field presence: message fields cannot have implicit field presence",
    );
}

#[test]
fn well_known_types() {
    let pool = DescriptorPool::global();
    for (name, wkt) in [
        ("google.protobuf.Any", WellKnownType::Any),
        ("google.protobuf.Timestamp", WellKnownType::Timestamp),
        ("google.protobuf.Duration", WellKnownType::Duration),
        ("google.protobuf.FieldMask", WellKnownType::FieldMask),
    ] {
        let desc = pool.get_message_by_name(name).unwrap();
        assert_eq!(desc.well_known_type(), Some(wkt));
    }

    let seconds = pool
        .get_message_by_name("google.protobuf.Timestamp")
        .unwrap()
        .get_field_by_name("seconds")
        .unwrap();
    assert!(matches!(seconds.kind(), Kind::Int64));
}
