use std::{
    collections::{hash_map::Entry, BTreeMap, HashMap, HashSet},
    iter,
};

use once_cell::sync::OnceCell;

use crate::{
    descriptor::{
        build::{
            join,
            visit::{Def, Site},
            Pass,
        },
        def_index,
        error::{Issue, Label},
        features::{Edition, EnumType, FeatureSet},
        tag,
        types::{DescriptorProto, EnumDescriptorProto, FileDescriptorProto},
        EnumEntry, EnumIndex, EnumValueEntry, FileEntry, Ident, MessageEntry,
        MessageIndex, OneofEntry, Symbol, SymbolKind, FIELD_NUMBERS,
    },
    Syntax, WellKnownType,
};

impl Pass<'_> {
    /// First pass: registers every name in the batch and records the definitions whose contents
    /// do not depend on other definitions.
    pub(super) fn collect(&mut self, site: Site<'_>, def: Def<'_>) {
        let file = site.file;
        match def {
            Def::File(proto) => self.collect_file(&site, proto),
            Def::Message {
                parent,
                index,
                proto,
            } => self.collect_message(&site, parent, index, proto),
            Def::Oneof {
                message,
                index,
                proto,
            } => {
                self.define(&site, tag::ONEOF_NAME, SymbolKind::Oneof);

                let inherited = self.data.messages[message as usize].features;
                let raw = proto.options.as_ref().and_then(|o| o.value.features.as_ref());
                let features = self.features(
                    file,
                    inherited,
                    raw,
                    site.path,
                    &[tag::ONEOF_OPTIONS, tag::ONEOF_OPTIONS_FEATURES],
                );

                let oneofs = &mut self.data.messages[message as usize].oneofs;
                debug_assert_eq!(def_index(oneofs.len()), index);
                oneofs.push(OneofEntry {
                    ident: Ident::new(file, site.path, site.full_name),
                    features,
                    members: Vec::new(),
                });
            }
            Def::Field { .. } => self.define(&site, tag::FIELD_NAME, SymbolKind::Field),
            Def::Extension { index, .. } => {
                self.define(&site, tag::FIELD_NAME, SymbolKind::Extension(index))
            }
            Def::Enum {
                parent,
                index,
                proto,
            } => self.collect_enum(&site, parent, index, proto),
            Def::EnumValue {
                parent,
                index,
                proto,
            } => {
                self.define(&site, tag::ENUM_VALUE_NAME, SymbolKind::EnumValue);

                let values = &mut self.data.enums[parent as usize].values;
                debug_assert_eq!(def_index(values.len()), index);
                values.push(EnumValueEntry {
                    ident: Ident::new(file, site.path, site.full_name),
                    number: proto.number(),
                });
            }
            Def::Service { index, .. } => {
                self.define(&site, tag::SERVICE_NAME, SymbolKind::Service(index))
            }
            Def::Method { .. } => self.define(&site, tag::METHOD_NAME, SymbolKind::Method),
        }
    }

    fn collect_file(&mut self, site: &Site<'_>, proto: &FileDescriptorProto) {
        let file = site.file;
        debug_assert_eq!(def_index(self.data.files.len()), file);

        let (syntax, edition, bad_syntax) = match proto.syntax() {
            "" | "proto2" => (Syntax::Proto2, Edition::Proto2, None),
            "proto3" => (Syntax::Proto3, Edition::Proto3, None),
            "editions" => match proto
                .edition
                .and_then(Edition::from_i32)
                .filter(|e| e.is_editions())
            {
                Some(edition) => (Syntax::Editions, edition, None),
                None => (
                    Syntax::Editions,
                    Edition::Edition2023,
                    Some((Issue::UnsupportedEdition(proto.edition()), tag::FILE_EDITION)),
                ),
            },
            other => (
                Syntax::Proto2,
                Edition::Proto2,
                Some((Issue::UnknownSyntax(other.to_owned()), tag::FILE_SYNTAX)),
            ),
        };

        match self.data.file_names.entry(proto.name().into()) {
            Entry::Vacant(slot) => {
                slot.insert(file);
            }
            Entry::Occupied(_) => self
                .problems
                .push(Issue::DuplicateFile(proto.name().to_owned()).into()),
        }

        let defaults = FeatureSet::edition_defaults(edition);
        self.data.files.push(FileEntry {
            syntax,
            edition,
            features: defaults,
            proto: proto.clone(),
            interop: Default::default(),
            imports: Vec::with_capacity(proto.dependency.len()),
            visible: HashSet::new(),
        });

        if let Some((issue, tail)) = bad_syntax {
            let at = self.label(file, site.path, &[tail], "found here");
            self.problems.push(issue.at(at));
        }

        let raw = proto.options.as_ref().and_then(|o| o.value.features.as_ref());
        let features = self.features(
            file,
            defaults,
            raw,
            site.path,
            &[tag::FILE_OPTIONS, tag::FILE_OPTIONS_FEATURES],
        );
        self.data.files[file as usize].features = features;

        // Every prefix of the package is a namespace of its own.
        let package = proto.package();
        if !package.is_empty() {
            let prefixes = package
                .match_indices('.')
                .map(|(dot, _)| &package[..dot])
                .chain(iter::once(package));
            for prefix in prefixes {
                self.insert_symbol(
                    prefix,
                    Symbol {
                        file,
                        path: join(site.path, &[tag::FILE_PACKAGE]),
                        kind: SymbolKind::Package,
                    },
                );
            }
        }
    }

    fn collect_message(
        &mut self,
        site: &Site<'_>,
        parent: Option<MessageIndex>,
        index: MessageIndex,
        proto: &DescriptorProto,
    ) {
        let file = site.file;
        self.define(site, tag::MESSAGE_NAME, SymbolKind::Message(index));

        let inherited = self.scope_features(file, parent);
        let raw = proto.options.as_ref().and_then(|o| o.value.features.as_ref());
        let features = self.features(
            file,
            inherited,
            raw,
            site.path,
            &[tag::MESSAGE_OPTIONS, tag::MESSAGE_OPTIONS_FEATURES],
        );

        let declared_extension_ranges: Box<[_]> = proto
            .extension_range
            .iter()
            .map(|range| range.start()..range.end())
            .collect();
        let extension_ranges = declared_extension_ranges
            .iter()
            .filter(|range| {
                range.start < range.end
                    && FIELD_NUMBERS.contains(&range.start)
                    && range.end <= FIELD_NUMBERS.end
            })
            .map(|range| range.start as u32..range.end as u32)
            .collect();

        debug_assert_eq!(def_index(self.data.messages.len()), index);
        self.data.messages.push(MessageEntry {
            ident: Ident::new(file, site.path, site.full_name),
            parent,
            features,
            map_entry: proto.options.as_ref().map_or(false, |o| o.value.map_entry()),
            well_known: WellKnownType::from_full_name(site.full_name),
            reserved_ranges: proto
                .reserved_range
                .iter()
                .map(|range| range.start()..range.end())
                .collect(),
            declared_extension_ranges,
            extension_ranges,
            extensions: Vec::new(),
            fields: Vec::with_capacity(proto.field.len()),
            by_number: BTreeMap::new(),
            by_name: HashMap::with_capacity(proto.field.len()),
            by_json_name: HashMap::with_capacity(proto.field.len()),
            oneofs: Vec::with_capacity(proto.oneof_decl.len()),
            mini_table: OnceCell::new(),
        });
    }

    fn collect_enum(
        &mut self,
        site: &Site<'_>,
        parent: Option<MessageIndex>,
        index: EnumIndex,
        proto: &EnumDescriptorProto,
    ) {
        let file = site.file;
        self.define(site, tag::ENUM_NAME, SymbolKind::Enum(index));

        let inherited = self.scope_features(file, parent);
        let raw = proto.options.as_ref().and_then(|o| o.value.features.as_ref());
        let features = self.features(
            file,
            inherited,
            raw,
            site.path,
            &[tag::ENUM_OPTIONS, tag::ENUM_OPTIONS_FEATURES],
        );

        match proto.value.first() {
            None => {
                let at = self.label(file, site.path, &[], "enum defined here");
                self.problems.push(Issue::EmptyEnum.at(at));
            }
            Some(first) if features.enum_type() == EnumType::Open && first.number() != 0 => {
                let at = self.label(
                    file,
                    site.path,
                    &[tag::ENUM_VALUE, 0, tag::ENUM_VALUE_NUMBER],
                    "defined here",
                );
                self.problems.push(Issue::OpenEnumDefault.at(at));
            }
            Some(_) => {}
        }

        debug_assert_eq!(def_index(self.data.enums.len()), index);
        self.data.enums.push(EnumEntry {
            ident: Ident::new(file, site.path, site.full_name),
            parent,
            features,
            allow_alias: proto.options.as_ref().map_or(false, |o| o.value.allow_alias()),
            reserved_ranges: proto
                .reserved_range
                .iter()
                .map(|range| range.start()..=range.end())
                .collect(),
            values: Vec::with_capacity(proto.value.len()),
            by_number: Vec::with_capacity(proto.value.len()),
            by_name: HashMap::with_capacity(proto.value.len()),
        });
    }

    /// Registers the definition at `site` under its full name.
    fn define(&mut self, site: &Site<'_>, name_tag: i32, kind: SymbolKind) {
        let symbol = Symbol {
            file: site.file,
            path: join(site.path, &[name_tag]),
            kind,
        };
        self.insert_symbol(site.full_name, symbol);
    }

    fn insert_symbol(&mut self, name: &str, symbol: Symbol) {
        let Some(existing) = self.data.symbols.get(name) else {
            self.data.symbols.insert(name.into(), symbol);
            return;
        };
        if matches!(
            (existing.kind, symbol.kind),
            (SymbolKind::Package, SymbolKind::Package)
        ) {
            return;
        }

        let first = Label::new(
            &self.data.files,
            existing.file,
            existing.path.clone(),
            "first defined here",
        );
        let second = Label::new(&self.data.files, symbol.file, symbol.path, "defined again here");
        self.problems
            .push(Issue::DuplicateName(name.to_owned()).at(second).related(first));
    }
}
