//! The descriptor model: a [`DescriptorPool`] owns every loaded file, and the descriptor handles
//! returned from it are cheap references into the pool's tables.

mod api;
mod build;
mod error;
pub(crate) mod features;
mod global;
pub(crate) mod tag;
#[cfg(test)]
mod tests;
pub(crate) mod types;
mod wkt;

pub use self::error::{DescriptorError, DescriptorErrorKind};
pub use self::features::{
    Edition, EnumType, FeatureSet, FieldPresence, JsonFormat, MessageEncoding,
    RepeatedFieldEncoding, Utf8Validation,
};
pub use self::wkt::WellKnownType;

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fmt,
    ops::{Range, RangeInclusive},
    sync::Arc,
};

use once_cell::sync::OnceCell;

use crate::{minitable::MiniTable, Value};

pub(crate) const MAP_KEY_NUMBER: u32 = 1;
pub(crate) const MAP_VALUE_NUMBER: u32 = 2;

/// Numbers reserved for the protobuf implementation itself.
pub(crate) const IMPLEMENTATION_RESERVED: Range<i32> = 19_000..20_000;
/// Every number a message field or extension may use.
pub(crate) const FIELD_NUMBERS: Range<i32> = 1..536_870_912;

/// Whether a field may appear once, must appear once, or may appear any number of times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Cardinality {
    /// Zero or one occurrence.
    Optional,
    /// Exactly one occurrence. Only fields with `LEGACY_REQUIRED` presence are required.
    Required,
    /// Any number of occurrences.
    Repeated,
}

/// The syntax declared at the top of a proto file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// `syntax = "proto2"`, also used when no syntax is declared.
    Proto2,
    /// `syntax = "proto3"`.
    Proto3,
    /// `edition = "..."`. See [`FileDescriptor::edition`] for which one.
    Editions,
}

/// The value type of a field.
#[derive(Clone, PartialEq, Eq)]
pub enum Kind {
    /// `double`
    Double,
    /// `float`
    Float,
    /// `int32`
    Int32,
    /// `int64`
    Int64,
    /// `uint32`
    Uint32,
    /// `uint64`
    Uint64,
    /// `sint32`
    Sint32,
    /// `sint64`
    Sint64,
    /// `fixed32`
    Fixed32,
    /// `fixed64`
    Fixed64,
    /// `sfixed32`
    Sfixed32,
    /// `sfixed64`
    Sfixed64,
    /// `bool`
    Bool,
    /// `string`
    String,
    /// `bytes`
    Bytes,
    /// A message type, encoded either length-prefixed or delimited.
    Message(MessageDescriptor),
    /// An enum type.
    Enum(EnumDescriptor),
}

/// The pool-internal form of [`Kind`]. Message and enum types are referred to by table index, and
/// delimited message encoding is folded into the `Group` variant.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum KindRef {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageIndex),
    Enum(EnumIndex),
    Group(MessageIndex),
}

pub(crate) type DefIndex = u32;
type FileIndex = DefIndex;
type ServiceIndex = DefIndex;
type MethodIndex = DefIndex;
pub(crate) type MessageIndex = DefIndex;
type FieldIndex = DefIndex;
type OneofIndex = DefIndex;
type ExtensionIndex = DefIndex;
pub(crate) type EnumIndex = DefIndex;
type EnumValueIndex = DefIndex;

/// A set of protobuf files and the definitions they contain.
///
/// A pool is usually loaded from the [`FileDescriptorSet`][prost_types::FileDescriptorSet] written
/// by `protoc --descriptor_set_out`, or grown a file at a time with [`DescriptorPool::add_file`].
/// Imports are never searched for: each one must already be in the pool, or come earlier in the
/// same batch, when the importing file is added.
///
/// Cloning a pool only bumps a reference count. Adding files to a pool copies its tables if other
/// clones exist, so descriptors taken from the earlier clones keep seeing the old contents.
#[derive(Clone, Default)]
pub struct DescriptorPool {
    data: Arc<PoolData>,
}

#[derive(Clone, Default)]
struct PoolData {
    symbols: HashMap<Box<str>, Symbol>,
    file_names: HashMap<Box<str>, FileIndex>,
    files: Vec<FileEntry>,
    messages: Vec<MessageEntry>,
    enums: Vec<EnumEntry>,
    extensions: Vec<ExtensionEntry>,
    services: Vec<ServiceEntry>,
}

/// Where a definition lives, and what it is called.
#[derive(Clone)]
struct Ident {
    file: FileIndex,
    path: Box<[i32]>,
    full_name: Box<str>,
    short_start: usize,
}

/// An entry in the pool's namespace.
#[derive(Clone, Debug)]
struct Symbol {
    file: FileIndex,
    path: Box<[i32]>,
    kind: SymbolKind,
}

#[derive(Copy, Clone, Debug)]
enum SymbolKind {
    Package,
    Message(MessageIndex),
    Field,
    Oneof,
    Service(ServiceIndex),
    Method,
    Enum(EnumIndex),
    EnumValue,
    Extension(ExtensionIndex),
}

/// A single `.proto` file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pool: DescriptorPool,
    index: FileIndex,
}

#[derive(Clone)]
struct FileEntry {
    syntax: Syntax,
    edition: Edition,
    features: FeatureSet,
    proto: types::FileDescriptorProto,
    interop: prost_types::FileDescriptorProto,
    imports: Vec<FileIndex>,
    /// This file, its imports, and everything those re-export through `import public`.
    visible: HashSet<FileIndex>,
}

/// A message type.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageDescriptor {
    pool: DescriptorPool,
    index: MessageIndex,
}

#[derive(Clone)]
struct MessageEntry {
    ident: Ident,
    parent: Option<MessageIndex>,
    features: FeatureSet,
    map_entry: bool,
    well_known: Option<WellKnownType>,
    reserved_ranges: Box<[Range<i32>]>,
    declared_extension_ranges: Box<[Range<i32>]>,
    extension_ranges: Vec<Range<u32>>,
    extensions: Vec<ExtensionIndex>,
    fields: Vec<FieldEntry>,
    by_number: BTreeMap<u32, FieldIndex>,
    by_name: HashMap<Box<str>, FieldIndex>,
    by_json_name: HashMap<Box<str>, FieldIndex>,
    oneofs: Vec<OneofEntry>,
    mini_table: OnceCell<Arc<MiniTable>>,
}

/// A oneof declared in a message.
#[derive(Clone, PartialEq, Eq)]
pub struct OneofDescriptor {
    message: MessageDescriptor,
    index: OneofIndex,
}

#[derive(Clone)]
struct OneofEntry {
    ident: Ident,
    features: FeatureSet,
    members: Vec<FieldIndex>,
}

/// A field declared in a message.
#[derive(Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    message: MessageDescriptor,
    index: FieldIndex,
}

#[derive(Clone)]
struct FieldEntry {
    ident: Ident,
    number: u32,
    json_name: Box<str>,
    kind: KindRef,
    oneof: Option<OneofIndex>,
    proto3_optional: bool,
    packed: bool,
    has_presence: bool,
    cardinality: Cardinality,
    features: FeatureSet,
    default: Option<Value>,
}

/// An extension field, declared at file scope or nested in a message.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtensionDescriptor {
    pool: DescriptorPool,
    index: ExtensionIndex,
}

#[derive(Clone)]
struct ExtensionEntry {
    ident: Ident,
    scope: Option<MessageIndex>,
    number: u32,
    json_name: Box<str>,
    extendee: MessageIndex,
    kind: KindRef,
    packed: bool,
    cardinality: Cardinality,
    features: FeatureSet,
    default: Option<Value>,
}

/// An enum type.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumDescriptor {
    pool: DescriptorPool,
    index: EnumIndex,
}

#[derive(Clone)]
struct EnumEntry {
    ident: Ident,
    parent: Option<MessageIndex>,
    features: FeatureSet,
    allow_alias: bool,
    reserved_ranges: Box<[RangeInclusive<i32>]>,
    values: Vec<EnumValueEntry>,
    /// Sorted by number. Aliases follow the first value declared with their number.
    by_number: Vec<(i32, EnumValueIndex)>,
    by_name: HashMap<Box<str>, EnumValueIndex>,
}

/// One named value of an enum type.
#[derive(Clone, PartialEq, Eq)]
pub struct EnumValueDescriptor {
    parent: EnumDescriptor,
    index: EnumValueIndex,
}

#[derive(Clone)]
struct EnumValueEntry {
    ident: Ident,
    number: i32,
}

/// An RPC service.
#[derive(Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pool: DescriptorPool,
    index: ServiceIndex,
}

#[derive(Clone)]
struct ServiceEntry {
    ident: Ident,
    methods: Vec<MethodEntry>,
}

/// One method of a [`ServiceDescriptor`].
#[derive(Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    service: ServiceDescriptor,
    index: MethodIndex,
}

#[derive(Clone)]
struct MethodEntry {
    ident: Ident,
    input: MessageIndex,
    output: MessageIndex,
    client_streaming: bool,
    server_streaming: bool,
}

impl Ident {
    fn new(file: FileIndex, path: &[i32], full_name: &str) -> Ident {
        Ident {
            file,
            path: path.into(),
            full_name: full_name.into(),
            short_start: full_name.rfind('.').map_or(0, |dot| dot + 1),
        }
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn name(&self) -> &str {
        &self.full_name[self.short_start..]
    }
}

impl KindRef {
    /// Whether repeated values of this kind may share one length-delimited record.
    pub(crate) fn is_packable(&self) -> bool {
        !matches!(
            self,
            KindRef::String | KindRef::Bytes | KindRef::Message(_) | KindRef::Group(_)
        )
    }

    pub(crate) fn is_message(&self) -> bool {
        matches!(self, KindRef::Message(_) | KindRef::Group(_))
    }

    fn name(&self) -> &'static str {
        match self {
            KindRef::Double => "double",
            KindRef::Float => "float",
            KindRef::Int32 => "int32",
            KindRef::Int64 => "int64",
            KindRef::Uint32 => "uint32",
            KindRef::Uint64 => "uint64",
            KindRef::Sint32 => "sint32",
            KindRef::Sint64 => "sint64",
            KindRef::Fixed32 => "fixed32",
            KindRef::Fixed64 => "fixed64",
            KindRef::Sfixed32 => "sfixed32",
            KindRef::Sfixed64 => "sfixed64",
            KindRef::Bool => "bool",
            KindRef::String => "string",
            KindRef::Bytes => "bytes",
            KindRef::Message(_) => "message",
            KindRef::Group(_) => "group",
            KindRef::Enum(_) => "enum",
        }
    }
}

impl fmt::Debug for KindRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl PoolData {
    fn symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name.strip_prefix('.').unwrap_or(name))
    }
}

fn def_index(position: usize) -> DefIndex {
    DefIndex::try_from(position).expect("descriptor pool table overflow")
}

#[test]
fn descriptors_are_send_sync() {
    fn is_send_sync<T: Send + Sync>() {}

    is_send_sync::<DescriptorPool>();
    is_send_sync::<Kind>();
    is_send_sync::<DescriptorError>();
}
