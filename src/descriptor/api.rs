use std::{fmt, iter, ops::Range, sync::Arc};

use prost::{bytes::Buf, encoding::WireType, Message};
use prost_types::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};

use crate::{
    descriptor::{
        def_index,
        features::{Edition, EnumType, FeatureSet, Utf8Validation},
        types,
        wkt::well_known_type_files,
        DefIndex, EnumEntry, EnumIndex, EnumValueEntry, ExtensionEntry, FieldEntry, FileEntry,
        KindRef, MessageEntry, MessageIndex, MethodEntry, OneofEntry, ServiceEntry, SymbolKind,
        WellKnownType, MAP_KEY_NUMBER, MAP_VALUE_NUMBER,
    },
    minitable::MiniTable,
    Cardinality, DescriptorError, DescriptorPool, EnumDescriptor, EnumValueDescriptor,
    ExtensionDescriptor, FieldDescriptor, FileDescriptor, Kind, MessageDescriptor,
    MethodDescriptor, OneofDescriptor, ServiceDescriptor, Syntax, Value,
};

impl Kind {
    fn from_ref(pool: &DescriptorPool, kind: KindRef) -> Self {
        match kind {
            KindRef::Double => Kind::Double,
            KindRef::Float => Kind::Float,
            KindRef::Int32 => Kind::Int32,
            KindRef::Int64 => Kind::Int64,
            KindRef::Uint32 => Kind::Uint32,
            KindRef::Uint64 => Kind::Uint64,
            KindRef::Sint32 => Kind::Sint32,
            KindRef::Sint64 => Kind::Sint64,
            KindRef::Fixed32 => Kind::Fixed32,
            KindRef::Fixed64 => Kind::Fixed64,
            KindRef::Sfixed32 => Kind::Sfixed32,
            KindRef::Sfixed64 => Kind::Sfixed64,
            KindRef::Bool => Kind::Bool,
            KindRef::String => Kind::String,
            KindRef::Bytes => Kind::Bytes,
            KindRef::Message(index) | KindRef::Group(index) => {
                Kind::Message(pool.message_at(index))
            }
            KindRef::Enum(index) => Kind::Enum(pool.enum_at(index)),
        }
    }

    /// Returns the message type, if this is [`Kind::Message`].
    pub fn as_message(&self) -> Option<&MessageDescriptor> {
        match self {
            Kind::Message(desc) => Some(desc),
            _ => None,
        }
    }

    /// Returns the enum type, if this is [`Kind::Enum`].
    pub fn as_enum(&self) -> Option<&EnumDescriptor> {
        match self {
            Kind::Enum(desc) => Some(desc),
            _ => None,
        }
    }

    /// The wire type of a single, unpacked value of this kind.
    ///
    /// Messages report [`WireType::LengthDelimited`] here even when a field stores them delimited;
    /// check [`FieldDescriptor::is_group`] for that.
    pub fn wire_type(&self) -> WireType {
        match self {
            Kind::Double | Kind::Fixed64 | Kind::Sfixed64 => WireType::SixtyFourBit,
            Kind::Float | Kind::Fixed32 | Kind::Sfixed32 => WireType::ThirtyTwoBit,
            Kind::String | Kind::Bytes | Kind::Message(_) => WireType::LengthDelimited,
            Kind::Int32
            | Kind::Int64
            | Kind::Uint32
            | Kind::Uint64
            | Kind::Sint32
            | Kind::Sint64
            | Kind::Bool
            | Kind::Enum(_) => WireType::Varint,
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Message(message) => message.full_name(),
            Kind::Enum(enum_) => enum_.full_name(),
            Kind::Double => "double",
            Kind::Float => "float",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Sint32 => "sint32",
            Kind::Sint64 => "sint64",
            Kind::Fixed32 => "fixed32",
            Kind::Fixed64 => "fixed64",
            Kind::Sfixed32 => "sfixed32",
            Kind::Sfixed64 => "sfixed64",
            Kind::Bool => "bool",
            Kind::String => "string",
            Kind::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

impl DescriptorPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        DescriptorPool::default()
    }

    /// Creates a pool holding the files that define the google well-known types, such as
    /// `google/protobuf/timestamp.proto` and `google/protobuf/any.proto`.
    pub fn with_well_known_types() -> Self {
        let mut pool = DescriptorPool::new();
        pool.build_files(well_known_type_files())
            .expect("well-known type files are valid");
        pool
    }

    /// Creates a pool from a [`FileDescriptorSet`], such as one written by
    /// `protoc --descriptor_set_out`.
    ///
    /// Each file must come after the files it imports.
    pub fn from_file_descriptor_set(set: FileDescriptorSet) -> Result<Self, DescriptorError> {
        let mut pool = DescriptorPool::new();
        pool.add_file_descriptor_set(set)?;
        Ok(pool)
    }

    /// Creates a pool from an encoded [`FileDescriptorSet`].
    ///
    /// # Errors
    ///
    /// Fails if the bytes do not decode, or if any file in the set is rejected.
    pub fn decode<B>(bytes: B) -> Result<Self, DescriptorError>
    where
        B: Buf,
    {
        let mut pool = DescriptorPool::new();
        pool.decode_file_descriptor_set(bytes)?;
        Ok(pool)
    }

    /// Decodes one encoded [`FileDescriptorProto`], adds it to the pool and returns it.
    ///
    /// Its imports must already be in the pool. Adding a file equal to one already present does
    /// nothing and returns the existing file.
    ///
    /// # Errors
    ///
    /// [`DescriptorError::kind`] tells apart a name clash, an import or type reference that cannot
    /// be resolved, and any other malformed input. A rejected file leaves the pool as it was.
    pub fn add_file<B>(&mut self, bytes: B) -> Result<FileDescriptor, DescriptorError>
    where
        B: Buf,
    {
        let proto = types::FileDescriptorProto::decode(bytes)
            .map_err(DescriptorError::decode_file_descriptor_set)?;
        let name = proto.name().to_owned();
        self.build_files(iter::once(proto))?;

        let index = self.data.file_names[name.as_str()];
        Ok(FileDescriptor {
            pool: self.clone(),
            index,
        })
    }

    /// Adds every file in a [`FileDescriptorSet`]. Files equal to ones already present are
    /// skipped.
    ///
    /// # Errors
    ///
    /// If any file is rejected, none of the set is added.
    pub fn add_file_descriptor_set(&mut self, set: FileDescriptorSet) -> Result<(), DescriptorError> {
        self.add_file_descriptor_protos(set.file)
    }

    /// Adds files in order, as a single batch. A file may refer to types defined earlier in the
    /// batch or already in the pool.
    ///
    /// # Errors
    ///
    /// If any file is rejected, none of the batch is added.
    pub fn add_file_descriptor_protos<I>(&mut self, files: I) -> Result<(), DescriptorError>
    where
        I: IntoIterator<Item = FileDescriptorProto>,
    {
        let mut batch = Vec::new();
        for file in files {
            // Re-decoded so the pool works from one representation.
            let proto = types::FileDescriptorProto::decode(file.encode_to_vec().as_slice())
                .map_err(DescriptorError::decode_file_descriptor_set)?;
            batch.push(proto);
        }
        self.build_files(batch)
    }

    /// Adds a single file.
    ///
    /// # Errors
    ///
    /// Fails if the file is rejected, leaving the pool unchanged.
    pub fn add_file_descriptor_proto(&mut self, file: FileDescriptorProto) -> Result<(), DescriptorError> {
        self.add_file_descriptor_protos(iter::once(file))
    }

    /// Decodes and adds a single file.
    ///
    /// Fields that [`prost_types`] does not know about, such as `edition`, survive this route but
    /// not [`add_file_descriptor_proto`][DescriptorPool::add_file_descriptor_proto].
    pub fn decode_file_descriptor_proto<B>(&mut self, bytes: B) -> Result<(), DescriptorError>
    where
        B: Buf,
    {
        self.add_file(bytes)?;
        Ok(())
    }

    /// Decodes and adds an encoded [`FileDescriptorSet`].
    pub fn decode_file_descriptor_set<B>(&mut self, bytes: B) -> Result<(), DescriptorError>
    where
        B: Buf,
    {
        let set = types::FileDescriptorSet::decode(bytes)
            .map_err(DescriptorError::decode_file_descriptor_set)?;
        self.build_files(set.file)
    }

    /// The files in this pool, in the order they were added.
    pub fn files(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        handles(self.data.files.len(), move |index| FileDescriptor {
            pool: self.clone(),
            index,
        })
    }

    /// Finds a file by the name it was added under, e.g. `google/protobuf/any.proto`.
    pub fn get_file_by_name(&self, name: &str) -> Option<FileDescriptor> {
        let &index = self.data.file_names.get(name)?;
        Some(FileDescriptor {
            pool: self.clone(),
            index,
        })
    }

    /// Every service in the pool.
    pub fn services(&self) -> impl ExactSizeIterator<Item = ServiceDescriptor> + '_ {
        handles(self.data.services.len(), move |index| ServiceDescriptor {
            pool: self.clone(),
            index,
        })
    }

    /// Every message type in the pool, nested ones included.
    pub fn all_messages(&self) -> impl ExactSizeIterator<Item = MessageDescriptor> + '_ {
        handles(self.data.messages.len(), move |index| self.message_at(index))
    }

    /// Every enum type in the pool, nested ones included.
    pub fn all_enums(&self) -> impl ExactSizeIterator<Item = EnumDescriptor> + '_ {
        handles(self.data.enums.len(), move |index| self.enum_at(index))
    }

    /// Every extension in the pool, wherever it is declared.
    pub fn all_extensions(&self) -> impl ExactSizeIterator<Item = ExtensionDescriptor> + '_ {
        handles(self.data.extensions.len(), move |index| self.extension_at(index))
    }

    /// Finds a message type by its fully-qualified name, e.g. `my.package.MyMessage`. A leading
    /// `.` is accepted.
    pub fn get_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        match self.symbol_kind(name)? {
            SymbolKind::Message(index) => Some(self.message_at(index)),
            _ => None,
        }
    }

    /// Same as [`get_message_by_name`][DescriptorPool::get_message_by_name].
    pub fn find_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.get_message_by_name(name)
    }

    /// Finds an enum type by its fully-qualified name.
    pub fn get_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        match self.symbol_kind(name)? {
            SymbolKind::Enum(index) => Some(self.enum_at(index)),
            _ => None,
        }
    }

    /// Finds an extension by its fully-qualified name, which is scoped by where it is declared
    /// rather than by the message it extends.
    pub fn get_extension_by_name(&self, name: &str) -> Option<ExtensionDescriptor> {
        match self.symbol_kind(name)? {
            SymbolKind::Extension(index) => Some(self.extension_at(index)),
            _ => None,
        }
    }

    /// Finds a service by its fully-qualified name.
    pub fn get_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        match self.symbol_kind(name)? {
            SymbolKind::Service(index) => Some(ServiceDescriptor {
                pool: self.clone(),
                index,
            }),
            _ => None,
        }
    }

    pub(crate) fn message_at(&self, index: MessageIndex) -> MessageDescriptor {
        debug_assert!((index as usize) < self.data.messages.len());
        MessageDescriptor {
            pool: self.clone(),
            index,
        }
    }

    pub(crate) fn enum_at(&self, index: EnumIndex) -> EnumDescriptor {
        debug_assert!((index as usize) < self.data.enums.len());
        EnumDescriptor {
            pool: self.clone(),
            index,
        }
    }

    fn extension_at(&self, index: DefIndex) -> ExtensionDescriptor {
        ExtensionDescriptor {
            pool: self.clone(),
            index,
        }
    }

    fn file_at(&self, index: DefIndex) -> FileDescriptor {
        FileDescriptor {
            pool: self.clone(),
            index,
        }
    }

    fn symbol_kind(&self, name: &str) -> Option<SymbolKind> {
        self.data.symbol(name).map(|symbol| symbol.kind)
    }
}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorPool")
            .field("files", &self.files().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl PartialEq for DescriptorPool {
    /// Pools are equal when they share the same tables.
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for DescriptorPool {}

impl FileDescriptor {
    /// The pool this file belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// The position of this file in [`DescriptorPool::files`].
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// The file's path relative to its source root, e.g. `my/package/types.proto`.
    pub fn name(&self) -> &str {
        self.entry().proto.name()
    }

    /// The declared package, or an empty string.
    pub fn package_name(&self) -> &str {
        self.entry().proto.package()
    }

    /// Gets the syntax the file declares. Editions files report [`Syntax::Editions`].
    pub fn syntax(&self) -> Syntax {
        self.entry().syntax
    }

    /// The edition this file is written in. `proto2` and `proto3` files report
    /// [`Edition::Proto2`] and [`Edition::Proto3`].
    pub fn edition(&self) -> Edition {
        self.entry().edition
    }

    /// The features in effect at file scope.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// The files this file imports, in declaration order.
    pub fn dependencies(&self) -> impl ExactSizeIterator<Item = FileDescriptor> + '_ {
        self.entry()
            .imports
            .iter()
            .map(|&index| self.pool.file_at(index))
    }

    /// The imports marked `import public`, which are re-exported to files importing this one.
    pub fn public_dependencies(&self) -> impl Iterator<Item = FileDescriptor> + '_ {
        let entry = self.entry();
        entry
            .proto
            .public_dependency
            .iter()
            .filter_map(move |&position| entry.imports.get(position as usize))
            .map(move |&index| self.pool.file_at(index))
    }

    /// The message types declared at the top level of this file.
    pub fn messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        let data = &self.pool.data;
        (0..data.messages.len())
            .filter(move |&i| {
                data.messages[i].ident.file == self.index && data.messages[i].parent.is_none()
            })
            .map(move |i| self.pool.message_at(def_index(i)))
    }

    /// The enum types declared at the top level of this file.
    pub fn enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        let data = &self.pool.data;
        (0..data.enums.len())
            .filter(move |&i| {
                data.enums[i].ident.file == self.index && data.enums[i].parent.is_none()
            })
            .map(move |i| self.pool.enum_at(def_index(i)))
    }

    /// The extensions declared at the top level of this file.
    pub fn extensions(&self) -> impl Iterator<Item = ExtensionDescriptor> + '_ {
        let data = &self.pool.data;
        (0..data.extensions.len())
            .filter(move |&i| {
                data.extensions[i].ident.file == self.index && data.extensions[i].scope.is_none()
            })
            .map(move |i| self.pool.extension_at(def_index(i)))
    }

    /// Gets the top-level services declared in this file.
    pub fn services(&self) -> impl Iterator<Item = ServiceDescriptor> + '_ {
        self.pool
            .services()
            .filter(|service| service.entry().ident.file == self.index)
    }

    /// This file as a [`prost_types`] message.
    ///
    /// Fields [`prost_types`] does not model, such as `edition`, are missing here;
    /// [`encode_to_vec`][FileDescriptor::encode_to_vec] keeps them.
    pub fn file_descriptor_proto(&self) -> &FileDescriptorProto {
        &self.entry().interop
    }

    /// Encodes the file exactly as it was added.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.entry().proto.encode_to_vec()
    }

    fn entry(&self) -> &FileEntry {
        &self.pool.data.files[self.index as usize]
    }
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileDescriptor")
            .field("name", &self.name())
            .field("package_name", &self.package_name())
            .field("edition", &self.edition())
            .finish()
    }
}

impl MessageDescriptor {
    /// The pool this message type belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this message type is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        self.pool.file_at(self.entry().ident.file)
    }

    /// The message this type is nested in, if any.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.entry().parent.map(|index| self.pool.message_at(index))
    }

    /// The unqualified name, e.g. `MyMessage`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name, e.g. `my.package.MyMessage`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// Gets the package of the file declaring this message, or an empty string.
    pub fn package_name(&self) -> &str {
        self.pool.data.files[self.entry().ident.file as usize]
            .proto
            .package()
    }

    /// The location of this message within its file descriptor, e.g. `[4, 0, 3, 1]`.
    pub fn path(&self) -> &[i32] {
        &self.entry().ident.path
    }

    /// This message type as a [`prost_types`] message.
    pub fn descriptor_proto(&self) -> &DescriptorProto {
        let file = &self.pool.data.files[self.entry().ident.file as usize].interop;
        // The path alternates field tag and position: the first pair indexes the file's
        // messages, each later pair a nested message.
        let mut positions = self.path().chunks_exact(2).map(|pair| pair[1] as usize);
        let top = positions.next().expect("message path is never empty");
        positions.fold(&file.message_type[top], |message, position| {
            &message.nested_type[position]
        })
    }

    /// The features in effect for this message.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// Which google well-known type this is, if any.
    pub fn well_known_type(&self) -> Option<WellKnownType> {
        self.entry().well_known
    }

    /// The storage layout for this message type, compiled on first use and then shared by every
    /// descriptor from the same pool.
    pub fn mini_table(&self) -> Arc<MiniTable> {
        let cell = &self.entry().mini_table;
        Arc::clone(cell.get_or_init(|| Arc::new(MiniTable::compile(self))))
    }

    /// The fields of this message, in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        handles(self.entry().fields.len(), move |index| self.field_at(index))
    }

    /// Gets the oneofs of this message, including synthetic ones, in declaration order.
    pub fn oneofs(&self) -> impl ExactSizeIterator<Item = OneofDescriptor> + '_ {
        handles(self.entry().oneofs.len(), move |index| OneofDescriptor {
            message: self.clone(),
            index,
        })
    }

    /// The message types declared directly inside this one.
    pub fn child_messages(&self) -> impl Iterator<Item = MessageDescriptor> + '_ {
        self.pool
            .all_messages()
            .filter(|message| message.entry().parent == Some(self.index))
    }

    /// The enum types declared directly inside this one.
    pub fn child_enums(&self) -> impl Iterator<Item = EnumDescriptor> + '_ {
        self.pool
            .all_enums()
            .filter(|enum_| enum_.entry().parent == Some(self.index))
    }

    /// Extensions of this message type known to the pool, in the order they were added.
    pub fn extensions(&self) -> impl ExactSizeIterator<Item = ExtensionDescriptor> + '_ {
        self.entry()
            .extensions
            .iter()
            .map(|&index| self.pool.extension_at(index))
    }

    /// Finds a field by number.
    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        let &index = self.entry().by_number.get(&number)?;
        Some(self.field_at(index))
    }

    /// Finds a field by its declared name.
    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let &index = self.entry().by_name.get(name)?;
        Some(self.field_at(index))
    }

    /// Finds a field by its JSON name.
    pub fn get_field_by_json_name(&self, json_name: &str) -> Option<FieldDescriptor> {
        let &index = self.entry().by_json_name.get(json_name)?;
        Some(self.field_at(index))
    }

    /// Whether this type was generated for the entries of a map field. Such a type has exactly
    /// a key field numbered 1 and a value field numbered 2.
    pub fn is_map_entry(&self) -> bool {
        self.entry().map_entry
    }

    /// The key field of a map entry type.
    ///
    /// # Panics
    ///
    /// Panics if this is not a map entry type.
    pub fn map_entry_key_field(&self) -> FieldDescriptor {
        self.get_field(MAP_KEY_NUMBER)
            .expect("map entry types have a key field")
    }

    /// The value field of a map entry type.
    ///
    /// # Panics
    ///
    /// Panics if this is not a map entry type.
    pub fn map_entry_value_field(&self) -> FieldDescriptor {
        self.get_field(MAP_VALUE_NUMBER)
            .expect("map entry types have a value field")
    }

    /// The valid extension number ranges, end exclusive.
    pub fn extension_ranges(&self) -> impl ExactSizeIterator<Item = Range<u32>> + '_ {
        self.entry().extension_ranges.iter().cloned()
    }

    /// The reserved field number ranges, end exclusive.
    pub fn reserved_ranges(&self) -> impl ExactSizeIterator<Item = Range<i32>> + '_ {
        self.entry().reserved_ranges.iter().cloned()
    }

    /// Returns `true` if `number` lies within one of the declared extension ranges.
    pub fn is_extension_number(&self, number: u32) -> bool {
        self.extension_ranges().any(|range| range.contains(&number))
    }

    /// Finds an extension of this message type by number.
    pub fn get_extension(&self, number: u32) -> Option<ExtensionDescriptor> {
        self.extensions().find(|ext| ext.number() == number)
    }

    /// Finds an extension of this message type by its fully-qualified name.
    pub fn get_extension_by_full_name(&self, name: &str) -> Option<ExtensionDescriptor> {
        let name = name.strip_prefix('.').unwrap_or(name);
        self.extensions().find(|ext| ext.full_name() == name)
    }

    pub(crate) fn index(&self) -> MessageIndex {
        self.index
    }

    pub(crate) fn field_at(&self, index: DefIndex) -> FieldDescriptor {
        debug_assert!((index as usize) < self.entry().fields.len());
        FieldDescriptor {
            message: self.clone(),
            index,
        }
    }

    fn entry(&self) -> &MessageEntry {
        &self.pool.data.messages[self.index as usize]
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("full_name", &self.full_name())
            .field("is_map_entry", &self.is_map_entry())
            .field("fields", &self.fields().collect::<Vec<_>>())
            .field("oneofs", &self.oneofs().collect::<Vec<_>>())
            .finish()
    }
}

impl FieldDescriptor {
    /// Gets a reference to the pool this field's message type belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        self.message.parent_pool()
    }

    /// Gets the file this field is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        self.message.parent_file()
    }

    /// The message type declaring this field.
    pub fn parent_message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// The unqualified name, e.g. `my_field`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name, e.g. `my.package.MyMessage.my_field`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// The location of this field within its file descriptor, e.g. `[4, 0, 2, 1]`.
    pub fn path(&self) -> &[i32] {
        &self.entry().ident.path
    }

    /// Gets the field number, which identifies the field on the wire.
    pub fn number(&self) -> u32 {
        self.entry().number
    }

    /// The name used in JSON: the declared `json_name`, or else the field name in lower camel
    /// case.
    pub fn json_name(&self) -> &str {
        &self.entry().json_name
    }

    /// Whether message values of this field are written with start and end group tags.
    pub fn is_group(&self) -> bool {
        matches!(self.entry().kind, KindRef::Group(_))
    }

    /// Whether this is a repeated field that is not a map.
    pub fn is_list(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && !self.is_map()
    }

    /// Whether this is a repeated field of a map entry type.
    pub fn is_map(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && is_map_kind(&self.kind())
    }

    /// Whether repeated values are written as one packed record.
    pub fn is_packed(&self) -> bool {
        self.entry().packed
    }

    /// Gets the cardinality: optional, required or repeated.
    pub fn cardinality(&self) -> Cardinality {
        self.entry().cardinality
    }

    /// Whether an unset field can be told apart from one set to its default.
    ///
    /// True for message fields, oneof members and singular fields with explicit or
    /// legacy-required presence.
    pub fn supports_presence(&self) -> bool {
        self.entry().has_presence
    }

    /// Whether the field was declared with the `proto3` `optional` keyword.
    pub fn is_proto3_optional(&self) -> bool {
        self.entry().proto3_optional
    }

    /// The features in effect for this field.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// Whether decoded strings must be checked for valid UTF-8.
    pub fn validates_utf8(&self) -> bool {
        validates_utf8(self.entry().kind, self.features())
    }

    /// Whether the field's enum type is closed. Unknown numbers read for such a field are kept
    /// with the message's unknown fields.
    pub fn is_closed_enum(&self) -> bool {
        is_closed_enum(self.parent_pool(), self.entry().kind)
    }

    /// Gets the type of this field. Message, group and enum kinds carry the resolved type.
    pub fn kind(&self) -> Kind {
        Kind::from_ref(self.parent_pool(), self.entry().kind)
    }

    /// The oneof containing this field, if any.
    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        let index = self.entry().oneof?;
        Some(OneofDescriptor {
            message: self.message.clone(),
            index,
        })
    }

    pub(crate) fn default_value(&self) -> Option<&Value> {
        self.entry().default.as_ref()
    }

    pub(crate) fn kind_ref(&self) -> KindRef {
        self.entry().kind
    }

    /// Declaration position within the parent message.
    pub(crate) fn index(&self) -> DefIndex {
        self.index
    }

    fn entry(&self) -> &FieldEntry {
        &self.message.entry().fields[self.index as usize]
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .field("kind", &self.kind())
            .field("cardinality", &self.cardinality())
            .field("oneof", &self.containing_oneof().map(|o| o.name().to_owned()))
            .field("default", &self.default_value())
            .field("features", &self.features())
            .finish()
    }
}

impl ExtensionDescriptor {
    /// Gets a reference to the pool this extension belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file declaring this extension. This may differ from the file of the extended
    /// message.
    pub fn parent_file(&self) -> FileDescriptor {
        self.pool.file_at(self.entry().ident.file)
    }

    /// The message this extension is declared inside, if any. This is only a naming scope; the
    /// type being extended is [`containing_message`][ExtensionDescriptor::containing_message].
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.entry().scope.map(|index| self.pool.message_at(index))
    }

    /// Gets the unqualified name, e.g. `my_extension`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name, scoped by where the extension is declared, e.g.
    /// `my.package.Scope.my_extension`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// Gets the location of this extension within its file descriptor, e.g. `[7, 0]`.
    pub fn path(&self) -> &[i32] {
        &self.entry().ident.path
    }

    /// Gets the field number this extension occupies in the extended message.
    pub fn number(&self) -> u32 {
        self.entry().number
    }

    /// The bracketed name used in JSON, e.g. `[my.package.my_extension]`.
    pub fn json_name(&self) -> &str {
        &self.entry().json_name
    }

    /// Whether message values are written with start and end group tags.
    pub fn is_group(&self) -> bool {
        matches!(self.entry().kind, KindRef::Group(_))
    }

    /// Whether this is a repeated extension.
    pub fn is_list(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && !self.is_map()
    }

    /// Always `false` for extensions, which cannot use a map entry type.
    pub fn is_map(&self) -> bool {
        self.cardinality() == Cardinality::Repeated && is_map_kind(&self.kind())
    }

    /// Whether repeated values are written as one packed record.
    pub fn is_packed(&self) -> bool {
        self.entry().packed
    }

    /// Gets the cardinality of the extension.
    pub fn cardinality(&self) -> Cardinality {
        self.entry().cardinality
    }

    /// Singular extensions always track presence.
    pub fn supports_presence(&self) -> bool {
        self.cardinality() != Cardinality::Repeated
    }

    /// Gets the features in effect for this extension.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// Whether decoded strings must be checked for valid UTF-8.
    pub fn validates_utf8(&self) -> bool {
        validates_utf8(self.entry().kind, self.features())
    }

    /// Whether the extension's enum type is closed.
    pub fn is_closed_enum(&self) -> bool {
        is_closed_enum(&self.pool, self.entry().kind)
    }

    /// Gets the type of values this extension holds.
    pub fn kind(&self) -> Kind {
        Kind::from_ref(&self.pool, self.entry().kind)
    }

    /// The message type this extension adds a field to.
    pub fn containing_message(&self) -> MessageDescriptor {
        self.pool.message_at(self.entry().extendee)
    }

    pub(crate) fn default_value(&self) -> Option<&Value> {
        self.entry().default.as_ref()
    }

    pub(crate) fn kind_ref(&self) -> KindRef {
        self.entry().kind
    }

    fn entry(&self) -> &ExtensionEntry {
        &self.pool.data.extensions[self.index as usize]
    }
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("full_name", &self.full_name())
            .field("number", &self.number())
            .field("extendee", &self.containing_message().full_name())
            .field("kind", &self.kind())
            .field("cardinality", &self.cardinality())
            .finish()
    }
}

impl EnumDescriptor {
    /// Gets a reference to the pool this enum belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this enum is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        self.pool.file_at(self.entry().ident.file)
    }

    /// The message this enum is nested in, if any.
    pub fn parent_message(&self) -> Option<MessageDescriptor> {
        self.entry().parent.map(|index| self.pool.message_at(index))
    }

    /// Gets the unqualified name, e.g. `MyEnum`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name, e.g. `my.package.MyEnum`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// Gets the location of this enum within its file descriptor, e.g. `[5, 0]`.
    pub fn path(&self) -> &[i32] {
        &self.entry().ident.path
    }

    /// Gets the features in effect for this enum.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// Whether this enum is closed, accepting only its declared numbers.
    pub fn is_closed(&self) -> bool {
        self.features().enum_type() == EnumType::Closed
    }

    /// Whether several values may share a number.
    pub fn allows_alias(&self) -> bool {
        self.entry().allow_alias
    }

    /// The reserved number ranges, end inclusive.
    pub fn reserved_ranges(&self) -> impl ExactSizeIterator<Item = (i32, i32)> + '_ {
        self.entry()
            .reserved_ranges
            .iter()
            .map(|range| (*range.start(), *range.end()))
    }

    /// The first declared value, which is the default.
    pub fn default_value(&self) -> EnumValueDescriptor {
        self.value_at(0)
    }

    /// Finds a value of this enum by its unqualified name.
    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        let &index = self.entry().by_name.get(name)?;
        Some(self.value_at(index))
    }

    /// Finds the value with the given number. Among aliases, the one declared first wins.
    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        let by_number = &self.entry().by_number;
        let at = by_number.partition_point(|&(n, _)| n < number);
        match by_number.get(at) {
            Some(&(n, index)) if n == number => Some(self.value_at(index)),
            _ => None,
        }
    }

    /// The values of this enum, in declaration order.
    pub fn values(&self) -> impl ExactSizeIterator<Item = EnumValueDescriptor> + '_ {
        handles(self.entry().values.len(), move |index| self.value_at(index))
    }

    fn value_at(&self, index: DefIndex) -> EnumValueDescriptor {
        EnumValueDescriptor {
            parent: self.clone(),
            index,
        }
    }

    fn entry(&self) -> &EnumEntry {
        &self.pool.data.enums[self.index as usize]
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumDescriptor")
            .field("full_name", &self.full_name())
            .field("is_closed", &self.is_closed())
            .field("values", &self.values().collect::<Vec<_>>())
            .finish()
    }
}

impl EnumValueDescriptor {
    /// Gets a reference to the pool this value's enum belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        self.parent.parent_pool()
    }

    /// Gets the file this value is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        self.parent.parent_file()
    }

    /// Gets the enum this value belongs to.
    pub fn parent_enum(&self) -> &EnumDescriptor {
        &self.parent
    }

    /// Gets the unqualified name, e.g. `MY_VALUE`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name. Enum values are scoped alongside their enum, not inside it,
    /// e.g. `my.package.MY_VALUE`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// Gets the number of this value.
    pub fn number(&self) -> i32 {
        self.entry().number
    }

    fn entry(&self) -> &EnumValueEntry {
        &self.parent.entry().values[self.index as usize]
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.name(), self.number())
    }
}

impl OneofDescriptor {
    /// Gets a reference to the pool this oneof belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        self.message.parent_pool()
    }

    /// Gets the message type declaring this oneof.
    pub fn parent_message(&self) -> &MessageDescriptor {
        &self.message
    }

    /// Gets the unqualified name, e.g. `my_oneof`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// Gets the fully-qualified name, e.g. `my.package.MyMessage.my_oneof`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// Gets the features in effect for this oneof.
    pub fn features(&self) -> FeatureSet {
        self.entry().features
    }

    /// Whether this oneof only exists to track presence of a single `proto3` `optional` field.
    pub fn is_synthetic(&self) -> bool {
        match self.entry().members.as_slice() {
            &[only] => self.message.field_at(only).is_proto3_optional(),
            _ => false,
        }
    }

    /// The member fields, in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.entry()
            .members
            .iter()
            .map(|&index| self.message.field_at(index))
    }

    pub(crate) fn index(&self) -> DefIndex {
        self.index
    }

    fn entry(&self) -> &OneofEntry {
        &self.message.entry().oneofs[self.index as usize]
    }
}

impl fmt::Debug for OneofDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<u32> = self.fields().map(|field| field.number()).collect();
        f.debug_struct("OneofDescriptor")
            .field("full_name", &self.full_name())
            .field("fields", &numbers)
            .finish()
    }
}

impl ServiceDescriptor {
    /// The position of this service in [`DescriptorPool::services`].
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Gets a reference to the pool this service belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        &self.pool
    }

    /// Gets the file this service is declared in.
    pub fn parent_file(&self) -> FileDescriptor {
        self.pool.file_at(self.entry().ident.file)
    }

    /// Gets the unqualified name, e.g. `MyService`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// Gets the fully-qualified name, e.g. `my.package.MyService`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// The methods of this service, in declaration order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = MethodDescriptor> + '_ {
        handles(self.entry().methods.len(), move |index| MethodDescriptor {
            service: self.clone(),
            index,
        })
    }

    /// Finds a method of this service by its unqualified name.
    pub fn get_method_by_name(&self, name: &str) -> Option<MethodDescriptor> {
        self.methods().find(|method| method.name() == name)
    }

    fn entry(&self) -> &ServiceEntry {
        &self.pool.data.services[self.index as usize]
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("full_name", &self.full_name())
            .field("methods", &self.methods().collect::<Vec<_>>())
            .finish()
    }
}

impl MethodDescriptor {
    /// The position of this method within its service.
    pub fn index(&self) -> usize {
        self.index as usize
    }

    /// Gets the service this method belongs to.
    pub fn parent_service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Gets a reference to the pool this method's service belongs to.
    pub fn parent_pool(&self) -> &DescriptorPool {
        self.service.parent_pool()
    }

    /// Gets the unqualified name, e.g. `MyMethod`.
    pub fn name(&self) -> &str {
        self.entry().ident.name()
    }

    /// The fully-qualified name, e.g. `my.package.MyService.MyMethod`.
    pub fn full_name(&self) -> &str {
        self.entry().ident.full_name()
    }

    /// The request message type.
    pub fn input(&self) -> MessageDescriptor {
        self.parent_pool().message_at(self.entry().input)
    }

    /// The response message type.
    pub fn output(&self) -> MessageDescriptor {
        self.parent_pool().message_at(self.entry().output)
    }

    /// Whether the client sends a stream of request messages.
    pub fn is_client_streaming(&self) -> bool {
        self.entry().client_streaming
    }

    /// Whether the server sends a stream of response messages.
    pub fn is_server_streaming(&self) -> bool {
        self.entry().server_streaming
    }

    fn entry(&self) -> &MethodEntry {
        &self.service.entry().methods[self.index as usize]
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("full_name", &self.full_name())
            .field("input", &self.input().full_name())
            .field("output", &self.output().full_name())
            .field("client_streaming", &self.is_client_streaming())
            .field("server_streaming", &self.is_server_streaming())
            .finish()
    }
}

/// Maps each position of a table of `len` entries to a handle.
fn handles<T>(len: usize, handle: impl Fn(DefIndex) -> T) -> impl ExactSizeIterator<Item = T> {
    (0..len).map(move |position| handle(def_index(position)))
}

fn is_map_kind(kind: &Kind) -> bool {
    kind.as_message().map_or(false, MessageDescriptor::is_map_entry)
}

fn validates_utf8(kind: KindRef, features: FeatureSet) -> bool {
    kind == KindRef::String && features.utf8_validation() == Utf8Validation::Verify
}

fn is_closed_enum(pool: &DescriptorPool, kind: KindRef) -> bool {
    match kind {
        KindRef::Enum(index) => pool.enum_at(index).is_closed(),
        _ => false,
    }
}
