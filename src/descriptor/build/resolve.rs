use std::collections::HashSet;

use prost::bytes::Bytes;

use crate::{
    descriptor::{
        build::{
            join, to_json_name,
            visit::{Def, Site},
            Expect, Pass, Watermark,
        },
        def_index,
        error::{Issue, Label},
        features::{FeatureSet, FieldPresence, JsonFormat, MessageEncoding, RepeatedFieldEncoding},
        tag,
        types::{
            field_descriptor_proto::{Label as FieldLabel, Type},
            FieldDescriptorProto, FileDescriptorProto, MethodDescriptorProto,
        },
        EnumIndex, EnumValueIndex, ExtensionEntry, ExtensionIndex, FieldEntry, FieldIndex,
        FileIndex, Ident, KindRef, MessageEntry, MessageIndex, MethodEntry, MethodIndex, OneofIndex,
        ServiceEntry, ServiceIndex, SymbolKind, FIELD_NUMBERS, IMPLEMENTATION_RESERVED,
        MAP_KEY_NUMBER, MAP_VALUE_NUMBER,
    },
    Cardinality, Value,
};

/// `FeatureSet.FieldPresence.IMPLICIT` on the wire.
const IMPLICIT_PRESENCE: i32 = 2;

/// What fields and extensions have in common once their type and features are known.
struct FieldShape {
    kind: Option<KindRef>,
    cardinality: Cardinality,
    features: FeatureSet,
    packed: bool,
    default: Option<Value>,
}

impl Pass<'_> {
    /// Second pass: resolves everything that refers to other definitions.
    pub(super) fn resolve(&mut self, site: Site<'_>, def: Def<'_>) {
        match def {
            Def::File(proto) => self.resolve_imports(&site, proto),
            Def::Field {
                message,
                index,
                proto,
            } => self.resolve_message_field(&site, message, index, proto),
            Def::Extension {
                scope,
                index,
                proto,
            } => self.resolve_extension(&site, scope, index, proto),
            Def::EnumValue {
                parent,
                index,
                proto,
            } => self.index_enum_value(&site, parent, index, proto.number(), proto.name()),
            Def::Service { index, proto } => {
                debug_assert_eq!(def_index(self.data.services.len()), index);
                self.data.services.push(ServiceEntry {
                    ident: Ident::new(site.file, site.path, site.full_name),
                    methods: Vec::with_capacity(proto.method.len()),
                });
            }
            Def::Method {
                service,
                index,
                proto,
            } => self.resolve_method(&site, service, index, proto),
            Def::Message { .. } | Def::Oneof { .. } | Def::Enum { .. } => {}
        }
    }

    fn resolve_imports(&mut self, site: &Site<'_>, proto: &FileDescriptorProto) {
        let file = site.file;
        let mut imports = Vec::with_capacity(proto.dependency.len());
        let mut visible = HashSet::with_capacity(proto.dependency.len() + 1);
        visible.insert(file);

        for (i, name) in proto.dependency.iter().enumerate() {
            let issue = match self.data.file_names.get(name.as_str()) {
                Some(&dep) if dep < file => {
                    imports.push(dep);
                    if visible.insert(dep) {
                        self.reexports(dep, &mut visible);
                    }
                    continue;
                }
                Some(_) => Issue::ImportOutOfOrder(name.clone()),
                None => Issue::ImportNotFound(name.clone()),
            };
            let at = self.label(file, site.path, &[tag::FILE_DEPENDENCY, i as i32], "found here");
            self.problems.push(issue.at(at));
        }

        let entry = &mut self.data.files[file as usize];
        entry.imports = imports;
        entry.visible = visible;

        let in_range = |i: &&i32| matches!(usize::try_from(**i), Ok(i) if i < proto.dependency.len());
        let bad_indices = proto
            .public_dependency
            .iter()
            .chain(&proto.weak_dependency)
            .filter(|i| !in_range(i))
            .count();
        self.problems
            .extend((0..bad_indices).map(|_| Issue::InvalidImportIndex.into()));
    }

    /// Adds the files that `file` re-exports through `import public`, transitively.
    fn reexports(&self, file: FileIndex, visible: &mut HashSet<FileIndex>) {
        let proto = &self.data.files[file as usize].proto;
        for &i in &proto.public_dependency {
            let dep = usize::try_from(i)
                .ok()
                .and_then(|i| proto.dependency.get(i))
                .and_then(|name| self.data.file_names.get(name.as_str()));
            if let Some(&dep) = dep {
                if visible.insert(dep) {
                    self.reexports(dep, visible);
                }
            }
        }
    }

    fn resolve_message_field(
        &mut self,
        site: &Site<'_>,
        message: MessageIndex,
        index: FieldIndex,
        proto: &FieldDescriptorProto,
    ) {
        debug_assert_eq!(
            def_index(self.data.messages[message as usize].fields.len()),
            index
        );
        self.check_field_number(site, message, proto);

        let oneof_count = self.data.messages[message as usize].oneofs.len();
        let oneof = match proto.oneof_index {
            None => None,
            Some(i) if usize::try_from(i).map_or(false, |i| i < oneof_count) => {
                Some(i as OneofIndex)
            }
            Some(_) => {
                self.problems.push(Issue::InvalidOneofIndex.into());
                None
            }
        };

        let entry = &self.data.messages[message as usize];
        let inherited = match oneof {
            Some(oneof) => entry.oneofs[oneof as usize].features,
            None => entry.features,
        };
        let shape = self.resolve_field(site, proto, inherited, oneof.is_some());

        let has_presence = shape.cardinality != Cardinality::Repeated
            && (oneof.is_some()
                || shape.kind.map_or(false, |k| k.is_message())
                || shape.features.field_presence() != FieldPresence::Implicit);
        let json_name: Box<str> = match &proto.json_name {
            Some(json_name) => json_name.as_str().into(),
            None => to_json_name(proto.name()).into(),
        };
        let number = proto.number() as u32;

        let entry = &mut self.data.messages[message as usize];
        if let Some(oneof) = oneof {
            entry.oneofs[oneof as usize].members.push(index);
        }
        let same_number = entry.by_number.insert(number, index);
        let same_json_name = entry
            .by_json_name
            .insert(json_name.clone(), index)
            .filter(|_| shape.features.json_format() == JsonFormat::Allow);
        entry.by_name.insert(proto.name().into(), index);
        entry.fields.push(FieldEntry {
            ident: Ident::new(site.file, site.path, site.full_name),
            number,
            json_name: json_name.clone(),
            kind: shape.kind.unwrap_or(KindRef::Double),
            oneof,
            proto3_optional: proto.proto3_optional(),
            packed: shape.packed,
            has_presence,
            cardinality: shape.cardinality,
            features: shape.features,
            default: shape.default,
        });

        if let Some(earlier) = same_number {
            let issue = Issue::DuplicateFieldNumber(number);
            self.clashing_field(site, message, earlier, tag::FIELD_NUMBER, issue);
        }
        if let Some(earlier) = same_json_name {
            let issue = Issue::DuplicateJsonName(json_name.into());
            self.clashing_field(site, message, earlier, tag::FIELD_NAME, issue);
        }
    }

    fn clashing_field(
        &mut self,
        site: &Site<'_>,
        message: MessageIndex,
        earlier: FieldIndex,
        tail: i32,
        issue: Issue,
    ) {
        let earlier = &self.data.messages[message as usize].fields[earlier as usize].ident;
        let first = Label::new(
            &self.data.files,
            earlier.file,
            join(&earlier.path, &[tail]),
            "first defined here",
        );
        let second = self.label(site.file, site.path, &[tail], "defined again here");
        self.problems.push(issue.at(second).related(first));
    }

    fn resolve_extension(
        &mut self,
        site: &Site<'_>,
        scope: Option<MessageIndex>,
        index: ExtensionIndex,
        proto: &FieldDescriptorProto,
    ) {
        debug_assert_eq!(def_index(self.data.extensions.len()), index);

        let extendee = self.resolve_message(site, proto.extendee(), tag::FIELD_EXTENDEE);
        if let Some(extendee) = extendee {
            self.check_field_number(site, extendee, proto);
            self.check_extension_clash(site, extendee, proto.number() as u32);
            self.data.messages[extendee as usize].extensions.push(index);
        }

        let inherited = self.scope_features(site.file, scope);
        let shape = self.resolve_field(site, proto, inherited, false);
        if presence_override(proto) == Some(IMPLICIT_PRESENCE) {
            self.invalid_presence(site, "extensions cannot have implicit field presence");
        }

        self.data.extensions.push(ExtensionEntry {
            ident: Ident::new(site.file, site.path, site.full_name),
            scope,
            number: proto.number() as u32,
            json_name: format!("[{}]", site.full_name).into(),
            extendee: extendee.unwrap_or(MessageIndex::MAX),
            kind: shape.kind.unwrap_or(KindRef::Double),
            packed: shape.packed,
            cardinality: shape.cardinality,
            features: shape.features,
            default: shape.default,
        });
    }

    /// Two extensions of one message cannot share a number, wherever they are declared.
    fn check_extension_clash(&mut self, site: &Site<'_>, extendee: MessageIndex, number: u32) {
        let extensions = &self.data.extensions;
        let earlier = self.data.messages[extendee as usize]
            .extensions
            .iter()
            .map(|&ext| &extensions[ext as usize])
            .find(|ext| ext.number == number);
        if let Some(earlier) = earlier {
            let first = Label::new(
                &self.data.files,
                earlier.ident.file,
                join(&earlier.ident.path, &[tag::FIELD_NUMBER]),
                "first defined here",
            );
            let second = self.label(site.file, site.path, &[tag::FIELD_NUMBER], "defined again here");
            self.problems
                .push(Issue::DuplicateFieldNumber(number).at(second).related(first));
        }
    }

    /// Checks the map entry types added in this batch, and the fields and extensions that use
    /// them. Runs after every field is resolved, since an entry may be declared after its user.
    pub(super) fn check_map_entries(&mut self, mark: Watermark) {
        for message in &self.data.messages[mark.messages as usize..] {
            if message.map_entry {
                if let Some(reason) = map_entry_problem(message) {
                    let at = self.label(message.ident.file, &message.ident.path, &[], "defined here");
                    let name = message.ident.full_name().to_owned();
                    self.problems
                        .push(Issue::InvalidMapEntry { name, reason }.at(at));
                }
            }

            for field in &message.fields {
                if field.cardinality != Cardinality::Repeated {
                    if let Some(entry) = self.map_entry_of(field.kind) {
                        let name = entry.ident.full_name().to_owned();
                        let at = self.label(field.ident.file, &field.ident.path, &[], "used here");
                        let reason = "only repeated fields can use a map entry type";
                        self.problems
                            .push(Issue::InvalidMapEntry { name, reason }.at(at));
                    }
                }
            }
        }

        for extension in &self.data.extensions[mark.extensions as usize..] {
            if let Some(entry) = self.map_entry_of(extension.kind) {
                let name = entry.ident.full_name().to_owned();
                let at = self.label(extension.ident.file, &extension.ident.path, &[], "used here");
                let reason = "extensions cannot use a map entry type";
                self.problems
                    .push(Issue::InvalidMapEntry { name, reason }.at(at));
            }
        }
    }

    fn map_entry_of(&self, kind: KindRef) -> Option<&MessageEntry> {
        match kind {
            KindRef::Message(message) | KindRef::Group(message) => {
                Some(&self.data.messages[message as usize]).filter(|entry| entry.map_entry)
            }
            _ => None,
        }
    }

    fn resolve_method(
        &mut self,
        site: &Site<'_>,
        service: ServiceIndex,
        index: MethodIndex,
        proto: &MethodDescriptorProto,
    ) {
        let input = self
            .resolve_message(site, proto.input_type(), tag::METHOD_INPUT_TYPE)
            .unwrap_or(MessageIndex::MAX);
        let output = self
            .resolve_message(site, proto.output_type(), tag::METHOD_OUTPUT_TYPE)
            .unwrap_or(MessageIndex::MAX);

        let methods = &mut self.data.services[service as usize].methods;
        debug_assert_eq!(def_index(methods.len()), index);
        methods.push(MethodEntry {
            ident: Ident::new(site.file, site.path, site.full_name),
            input,
            output,
            client_streaming: proto.client_streaming(),
            server_streaming: proto.server_streaming(),
        });
    }

    fn index_enum_value(
        &mut self,
        site: &Site<'_>,
        parent: EnumIndex,
        index: EnumValueIndex,
        number: i32,
        name: &str,
    ) {
        let files = &self.data.files;
        let entry = &mut self.data.enums[parent as usize];
        let number_label = |message| {
            Label::new(files, site.file, join(site.path, &[tag::ENUM_VALUE_NUMBER]), message)
        };

        for (i, range) in entry.reserved_ranges.iter().enumerate() {
            if range.contains(&number) {
                let reserved = Label::new(
                    files,
                    entry.ident.file,
                    join(&entry.ident.path, &[tag::ENUM_RESERVED_RANGE, i as i32]),
                    "reserved range defined here",
                );
                self.problems.push(
                    Issue::ReservedEnumNumber {
                        number,
                        range: range.clone(),
                    }
                    .at(number_label("defined here"))
                    .related(reserved),
                );
            }
        }

        // Aliases go after every value already holding the number, so the first declared value
        // stays first.
        let first = entry.by_number.partition_point(|&(n, _)| n < number);
        let end = entry.by_number.partition_point(|&(n, _)| n <= number);
        if first < end && !entry.allow_alias {
            let earlier = &entry.values[entry.by_number[first].1 as usize].ident;
            let related = Label::new(
                files,
                earlier.file,
                join(&earlier.path, &[tag::ENUM_VALUE_NUMBER]),
                "first defined here",
            );
            self.problems.push(
                Issue::DuplicateEnumNumber(number)
                    .at(number_label("defined again here"))
                    .related(related),
            );
        }
        entry.by_number.insert(end, (number, index));
        entry.by_name.insert(name.into(), index);
    }

    /// Works out the kind, cardinality, features and default of a field or extension.
    ///
    /// In `proto2` and `proto3` files the legacy spellings (`required`, `[packed = ...]`,
    /// `group`, `optional` in proto3) are folded into the feature set, so nothing downstream has
    /// to look at the syntax again.
    fn resolve_field(
        &mut self,
        site: &Site<'_>,
        proto: &FieldDescriptorProto,
        inherited: FeatureSet,
        in_oneof: bool,
    ) -> FieldShape {
        let file = site.file;
        let raw = proto.options.as_ref().and_then(|o| o.value.features.as_ref());
        let mut features = self.features(
            file,
            inherited,
            raw,
            site.path,
            &[tag::FIELD_OPTIONS, tag::FIELD_OPTIONS_FEATURES],
        );
        if !self.data.files[file as usize].edition.is_editions() {
            features = legacy_features(features, proto);
        }

        let cardinality = if proto.label() == FieldLabel::Repeated {
            Cardinality::Repeated
        } else if features.field_presence() == FieldPresence::LegacyRequired {
            Cardinality::Required
        } else {
            Cardinality::Optional
        };

        let kind = self.field_kind(site, proto).map(|kind| match kind {
            KindRef::Message(message)
                if features.message_encoding() == MessageEncoding::Delimited
                    && !self.data.messages[message as usize].map_entry =>
            {
                KindRef::Group(message)
            }
            KindRef::Group(message)
                if features.message_encoding() == MessageEncoding::LengthPrefixed =>
            {
                KindRef::Message(message)
            }
            kind => kind,
        });

        if let (None, Some(presence)) = (&proto.extendee, presence_override(proto)) {
            let reason = if cardinality == Cardinality::Repeated {
                Some("repeated fields cannot specify field presence")
            } else if presence != IMPLICIT_PRESENCE {
                None
            } else if kind.map_or(false, |k| k.is_message()) {
                Some("message fields cannot have implicit field presence")
            } else if in_oneof {
                Some("oneof fields cannot have implicit field presence")
            } else {
                None
            };
            if let Some(reason) = reason {
                self.invalid_presence(site, reason);
            }
        }

        let packed = cardinality == Cardinality::Repeated
            && kind.map_or(false, |k| k.is_packable())
            && features.repeated_field_encoding() == RepeatedFieldEncoding::Packed;
        let default = match (kind, proto.default_value.as_deref()) {
            (Some(kind), Some(text)) => self.parse_default(site, kind, text),
            _ => None,
        };

        FieldShape {
            kind,
            cardinality,
            features,
            packed,
            default,
        }
    }

    fn field_kind(&mut self, site: &Site<'_>, proto: &FieldDescriptorProto) -> Option<KindRef> {
        let ty = proto.r#type();
        if proto.type_name().is_empty() {
            let kind = scalar_kind(ty);
            if kind.is_none() {
                let at = self.label(
                    site.file,
                    site.path,
                    &[tag::FIELD_TYPE_NAME],
                    "type name is missing",
                );
                self.problems.push(Issue::MissingField.at(at));
            }
            return kind;
        }

        match self.resolve_name(site, proto.type_name(), tag::FIELD_TYPE_NAME, Expect::FieldType)? {
            SymbolKind::Message(message) if ty == Type::Group => Some(KindRef::Group(message)),
            SymbolKind::Message(message) => Some(KindRef::Message(message)),
            SymbolKind::Enum(enum_) => Some(KindRef::Enum(enum_)),
            _ => None,
        }
    }

    fn resolve_message(&mut self, site: &Site<'_>, name: &str, tail: i32) -> Option<MessageIndex> {
        match self.resolve_name(site, name, tail, Expect::Message)? {
            SymbolKind::Message(message) => Some(message),
            _ => None,
        }
    }

    fn parse_default(&mut self, site: &Site<'_>, kind: KindRef, text: &str) -> Option<Value> {
        let parsed = match kind {
            KindRef::Enum(enum_) => {
                let entry = &self.data.enums[enum_ as usize];
                entry
                    .values
                    .iter()
                    .find(|value| value.ident.name() == text)
                    .map(|value| Value::EnumNumber(value.number))
                    .ok_or_else(|| entry.ident.full_name().to_owned())
            }
            KindRef::Message(_) | KindRef::Group(_) => Err("message type".to_owned()),
            scalar => parse_scalar(scalar, text).ok_or_else(|| format!("{:?}", scalar)),
        };

        match parsed {
            Ok(value) => Some(value),
            Err(kind) => {
                let at = self.label(site.file, site.path, &[tag::FIELD_DEFAULT_VALUE], "found here");
                self.problems.push(
                    Issue::InvalidDefault {
                        value: text.to_owned(),
                        kind,
                    }
                    .at(at),
                );
                None
            }
        }
    }

    /// Checks a field or extension number against the limits of the message it belongs to.
    fn check_field_number(
        &mut self,
        site: &Site<'_>,
        message: MessageIndex,
        proto: &FieldDescriptorProto,
    ) {
        let number = proto.number();
        let files = &self.data.files;
        let entry = &self.data.messages[message as usize];
        let found = || {
            Label::new(files, site.file, join(site.path, &[tag::FIELD_NUMBER]), "defined here")
        };
        let declared = |tail: [i32; 2], message| {
            Label::new(files, entry.ident.file, join(&entry.ident.path, &tail), message)
        };

        let mut problems = Vec::new();
        if !FIELD_NUMBERS.contains(&number) || IMPLEMENTATION_RESERVED.contains(&number) {
            problems.push(Issue::InvalidFieldNumber(number).at(found()));
        }

        for (i, range) in entry.reserved_ranges.iter().enumerate() {
            if range.contains(&number) {
                let issue = Issue::ReservedFieldNumber {
                    number,
                    range: range.clone(),
                };
                let related = declared(
                    [tag::MESSAGE_RESERVED_RANGE, i as i32],
                    "reserved range defined here",
                );
                problems.push(issue.at(found()).related(related));
            }
        }

        let extension_range = entry
            .declared_extension_ranges
            .iter()
            .position(|range| range.contains(&number));
        match (proto.extendee.is_some(), extension_range) {
            (false, Some(i)) => {
                let issue = Issue::FieldInExtensionRange {
                    number,
                    range: entry.declared_extension_ranges[i].clone(),
                };
                let related = declared(
                    [tag::MESSAGE_EXTENSION_RANGE, i as i32],
                    "extension range defined here",
                );
                problems.push(issue.at(found()).related(related));
            }
            (true, None) => {
                let issue = Issue::ExtensionOutOfRange {
                    number,
                    message: entry.ident.full_name().to_owned(),
                };
                problems.push(issue.at(found()));
            }
            _ => {}
        }

        self.problems.extend(problems);
    }

    fn invalid_presence(&mut self, site: &Site<'_>, reason: &'static str) {
        let at = self.label(
            site.file,
            site.path,
            &[tag::FIELD_OPTIONS, tag::FIELD_OPTIONS_FEATURES],
            "found here",
        );
        self.problems.push(Issue::InvalidFieldPresence(reason).at(at));
    }
}

/// Maps the legacy field options of `proto2` and `proto3` onto editions features.
fn legacy_features(mut features: FeatureSet, proto: &FieldDescriptorProto) -> FeatureSet {
    if proto.label() == FieldLabel::Required {
        features = features.with_field_presence(FieldPresence::LegacyRequired);
    } else if proto.proto3_optional() {
        features = features.with_field_presence(FieldPresence::Explicit);
    }
    if let Some(packed) = proto.options.as_ref().and_then(|o| o.value.packed) {
        features = features.with_repeated_field_encoding(if packed {
            RepeatedFieldEncoding::Packed
        } else {
            RepeatedFieldEncoding::Expanded
        });
    }
    if proto.r#type() == Type::Group {
        features = features.with_message_encoding(MessageEncoding::Delimited);
    }
    features
}

/// The `field_presence` feature written directly on a field.
/// Why a type marked `map_entry` cannot stand for `map<K, V>`, if it cannot.
fn map_entry_problem(entry: &MessageEntry) -> Option<&'static str> {
    let field = |number| {
        let &index = entry.by_number.get(&number)?;
        Some(&entry.fields[index as usize])
    };
    let (Some(key), Some(value)) = (field(MAP_KEY_NUMBER), field(MAP_VALUE_NUMBER)) else {
        return Some("expected a key field numbered 1 and a value field numbered 2");
    };

    if entry.fields.len() != 2 {
        Some("expected exactly two fields")
    } else if key.cardinality == Cardinality::Repeated || value.cardinality == Cardinality::Repeated
    {
        Some("the key and value fields cannot be repeated")
    } else if !matches!(
        key.kind,
        KindRef::Int32
            | KindRef::Int64
            | KindRef::Uint32
            | KindRef::Uint64
            | KindRef::Sint32
            | KindRef::Sint64
            | KindRef::Fixed32
            | KindRef::Fixed64
            | KindRef::Sfixed32
            | KindRef::Sfixed64
            | KindRef::Bool
            | KindRef::String
    ) {
        Some("the key must have an integral, bool or string type")
    } else {
        None
    }
}

fn presence_override(proto: &FieldDescriptorProto) -> Option<i32> {
    proto
        .options
        .as_ref()
        .and_then(|o| o.value.features.as_ref())
        .and_then(|f| f.field_presence)
}

fn scalar_kind(ty: Type) -> Option<KindRef> {
    Some(match ty {
        Type::Double => KindRef::Double,
        Type::Float => KindRef::Float,
        Type::Int64 => KindRef::Int64,
        Type::Uint64 => KindRef::Uint64,
        Type::Int32 => KindRef::Int32,
        Type::Fixed64 => KindRef::Fixed64,
        Type::Fixed32 => KindRef::Fixed32,
        Type::Bool => KindRef::Bool,
        Type::String => KindRef::String,
        Type::Bytes => KindRef::Bytes,
        Type::Uint32 => KindRef::Uint32,
        Type::Sfixed32 => KindRef::Sfixed32,
        Type::Sfixed64 => KindRef::Sfixed64,
        Type::Sint32 => KindRef::Sint32,
        Type::Sint64 => KindRef::Sint64,
        Type::Group | Type::Message | Type::Enum => return None,
    })
}

fn parse_scalar(kind: KindRef, text: &str) -> Option<Value> {
    match kind {
        KindRef::Double => text.parse().ok().map(Value::F64),
        KindRef::Float => text.parse().ok().map(Value::F32),
        KindRef::Int32 | KindRef::Sint32 | KindRef::Sfixed32 => text.parse().ok().map(Value::I32),
        KindRef::Int64 | KindRef::Sint64 | KindRef::Sfixed64 => text.parse().ok().map(Value::I64),
        KindRef::Uint32 | KindRef::Fixed32 => text.parse().ok().map(Value::U32),
        KindRef::Uint64 | KindRef::Fixed64 => text.parse().ok().map(Value::U64),
        KindRef::Bool => text.parse().ok().map(Value::Bool),
        KindRef::String => Some(Value::String(text.to_owned())),
        KindRef::Bytes => unescape(text).ok().map(Value::Bytes),
        KindRef::Enum(_) | KindRef::Message(_) | KindRef::Group(_) => None,
    }
}

/// Decodes the C-style escapes protoc uses when it writes a `bytes` default as text.
fn unescape(text: &str) -> Result<Bytes, &'static str> {
    let mut out = Vec::with_capacity(text.len());
    let mut input = text.bytes().peekable();

    while let Some(byte) = input.next() {
        if byte != b'\\' {
            out.push(byte);
            continue;
        }

        let escape = input.next().ok_or("missing escape character")?;
        let decoded = match escape {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,
            b'\\' | b'?' | b'\'' | b'"' => escape,
            b'0'..=b'7' => {
                // Up to three octal digits, including the one already read.
                let mut value = escape - b'0';
                for _ in 0..2 {
                    match input.peek() {
                        Some(&digit @ b'0'..=b'7') => {
                            value = value.wrapping_mul(8).wrapping_add(digit - b'0');
                            input.next();
                        }
                        _ => break,
                    }
                }
                value
            }
            b'x' | b'X' => match (input.next(), input.next()) {
                (Some(high), Some(low)) => hex_digit(high)? << 4 | hex_digit(low)?,
                _ => return Err("hex escape must contain two characters"),
            },
            _ => return Err("invalid escape character"),
        };
        out.push(decoded);
    }

    Ok(out.into())
}

fn hex_digit(byte: u8) -> Result<u8, &'static str> {
    char::from(byte)
        .to_digit(16)
        .map(|digit| digit as u8)
        .ok_or("invalid hex escape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unescape_bytes_defaults() {
        assert_eq!(unescape("plain").unwrap(), Bytes::from_static(b"plain"));
        assert_eq!(unescape(r"\0\012\377").unwrap(), Bytes::from_static(b"\0\n\xff"));
        assert_eq!(unescape(r"\x7f\X41").unwrap(), Bytes::from_static(b"\x7fA"));
        assert_eq!(unescape(r"\x411").unwrap(), Bytes::from_static(b"A1"));
        assert_eq!(
            unescape(r#"\a\b\f\n\r\t\v\\\?\'\""#).unwrap(),
            Bytes::from_static(b"\x07\x08\x0c\n\r\t\x0b\\?'\"")
        );
        assert_eq!(unescape(r"\18").unwrap(), Bytes::from_static(b"\x018"));
    }

    #[test]
    fn unescape_errors() {
        assert_eq!(unescape("\\"), Err("missing escape character"));
        assert_eq!(unescape(r"\x4"), Err("hex escape must contain two characters"));
        assert_eq!(unescape(r"\xg0"), Err("invalid hex escape"));
        assert_eq!(unescape(r"\q"), Err("invalid escape character"));
    }
}
