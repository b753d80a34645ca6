use std::{collections::HashMap, fmt};

use prost::bytes::Bytes;

use crate::{Arena, DynamicMessage, ExtensionDescriptor, FieldDescriptor, Kind, SetFieldError};

/// A field value read from or written to a [`DynamicMessage`].
///
/// Several protobuf types share a variant: `I32` stands for `int32`, `sint32` and `sfixed32`
/// alike. The field a value is stored in decides how it is written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32` or `sfixed32`
    I32(i32),
    /// `int64`, `sint64` or `sfixed64`
    I64(i64),
    /// `uint32` or `fixed32`
    U32(u32),
    /// `uint64` or `fixed64`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// `string`
    String(String),
    /// `bytes`
    Bytes(Bytes),
    /// The number of an enum value. Open enums accept numbers with no declared value.
    EnumNumber(i32),
    /// A message, which may share storage with the message it was read from.
    Message(DynamicMessage),
    /// The elements of a repeated field.
    List(Vec<Value>),
    /// The entries of a map field.
    Map(HashMap<MapKey, Value>),
}

/// The key of a map field entry. Only integral, `bool` and `string` types may be map keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    /// `bool`
    Bool(bool),
    /// `int32`, `sint32` or `sfixed32`
    I32(i32),
    /// `int64`, `sint64` or `sfixed64`
    I64(i64),
    /// `uint32` or `fixed32`
    U32(u32),
    /// `uint64` or `fixed64`
    U64(u64),
    /// `string`
    String(String),
}

/// What value conversion needs to know about a message field or an extension.
pub(super) trait FieldLike: fmt::Debug {
    fn full_name(&self) -> &str;
    fn kind(&self) -> Kind;
    fn is_list(&self) -> bool;
    fn is_map(&self) -> bool;
    /// The `default` declared on the field, if any.
    fn declared_default(&self) -> Option<&Value>;

    fn default_value(&self) -> Value {
        if self.is_list() {
            Value::List(Vec::new())
        } else if self.is_map() {
            Value::Map(HashMap::new())
        } else {
            match self.declared_default() {
                Some(value) => value.clone(),
                None => Value::default_value(&self.kind()),
            }
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        let kind = self.kind();
        match value {
            Value::List(items) if self.is_list() => items.iter().all(|item| item.is_valid(&kind)),
            Value::Map(entries) if self.is_map() => {
                let Kind::Message(entry) = kind else {
                    return false;
                };
                let key_kind = entry.map_entry_key_field().kind();
                let value_kind = entry.map_entry_value_field().kind();
                entries
                    .iter()
                    .all(|(key, value)| key.is_valid(&key_kind) && value.is_valid(&value_kind))
            }
            _ if self.is_list() || self.is_map() => false,
            value => value.is_valid(&kind),
        }
    }

    /// The error reported when [`accepts`][FieldLike::accepts] fails.
    fn type_mismatch(&self) -> SetFieldError {
        let kind = self.kind();
        let expected = match &kind {
            Kind::Message(entry) if self.is_map() => format!(
                "map<{:?}, {:?}>",
                entry.map_entry_key_field().kind(),
                entry.map_entry_value_field().kind()
            ),
            kind if self.is_list() => format!("repeated {:?}", kind),
            kind => format!("{:?}", kind),
        };
        SetFieldError::TypeMismatch {
            field: self.full_name().to_owned(),
            expected,
        }
    }
}

impl FieldLike for FieldDescriptor {
    fn full_name(&self) -> &str {
        FieldDescriptor::full_name(self)
    }

    fn kind(&self) -> Kind {
        FieldDescriptor::kind(self)
    }

    fn is_list(&self) -> bool {
        FieldDescriptor::is_list(self)
    }

    fn is_map(&self) -> bool {
        FieldDescriptor::is_map(self)
    }

    fn declared_default(&self) -> Option<&Value> {
        FieldDescriptor::default_value(self)
    }
}

impl FieldLike for ExtensionDescriptor {
    fn full_name(&self) -> &str {
        ExtensionDescriptor::full_name(self)
    }

    fn kind(&self) -> Kind {
        ExtensionDescriptor::kind(self)
    }

    fn is_list(&self) -> bool {
        ExtensionDescriptor::is_list(self)
    }

    fn is_map(&self) -> bool {
        ExtensionDescriptor::is_map(self)
    }

    fn declared_default(&self) -> Option<&Value> {
        ExtensionDescriptor::default_value(self)
    }
}

impl Value {
    /// The value read from `field_desc` when it is unset: an empty list or map for repeated
    /// fields, otherwise the declared default or the zero value of its type.
    pub fn default_value_for_field(field_desc: &FieldDescriptor) -> Self {
        FieldLike::default_value(field_desc)
    }

    /// Like [`default_value_for_field`][Value::default_value_for_field], for an extension.
    pub fn default_value_for_extension(extension_desc: &ExtensionDescriptor) -> Self {
        FieldLike::default_value(extension_desc)
    }

    /// The zero value of a single element of type `kind`. For a message type this is an empty
    /// message in a fresh arena.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Bool => Value::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Float => Value::F32(0.0),
            Kind::Double => Value::F64(0.0),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Bytes::new()),
            Kind::Enum(desc) => Value::EnumNumber(desc.default_value().number()),
            Kind::Message(desc) => Value::Message(DynamicMessage::new(desc.clone(), &Arena::new())),
        }
    }

    /// Whether this equals the value `field_desc` reads as when unset.
    pub fn is_default_for_field(&self, field_desc: &FieldDescriptor) -> bool {
        *self == Value::default_value_for_field(field_desc)
    }

    /// Whether this value may be stored in `field_desc`, taking lists and maps into account.
    ///
    /// Enum numbers are not checked against the declared values.
    pub fn is_valid_for_field(&self, field_desc: &FieldDescriptor) -> bool {
        field_desc.accepts(self)
    }

    /// Like [`is_valid_for_field`][Value::is_valid_for_field], for an extension.
    pub fn is_valid_for_extension(&self, extension_desc: &ExtensionDescriptor) -> bool {
        extension_desc.accepts(self)
    }

    /// Whether this is a single element of type `kind`. Lists and maps never are.
    pub fn is_valid(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Bool(_), Kind::Bool)
            | (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
            | (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
            | (Value::U32(_), Kind::Uint32 | Kind::Fixed32)
            | (Value::U64(_), Kind::Uint64 | Kind::Fixed64)
            | (Value::F32(_), Kind::Float)
            | (Value::F64(_), Kind::Double)
            | (Value::String(_), Kind::String)
            | (Value::Bytes(_), Kind::Bytes)
            | (Value::EnumNumber(_), Kind::Enum(_)) => true,
            (Value::Message(message), Kind::Message(desc)) => message.descriptor() == *desc,
            _ => false,
        }
    }
}

macro_rules! copy_accessors {
    ($($name:ident: $variant:ident($ty:ty),)*) => {
        impl Value {
            $(
                #[doc = concat!("The inner value of a [`Value::", stringify!($variant), "`].")]
                pub fn $name(&self) -> Option<$ty> {
                    match *self {
                        Value::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            )*
        }
    };
}

copy_accessors! {
    as_bool: Bool(bool),
    as_i32: I32(i32),
    as_i64: I64(i64),
    as_u32: U32(u32),
    as_u64: U64(u64),
    as_f32: F32(f32),
    as_f64: F64(f64),
    as_enum_number: EnumNumber(i32),
}

impl Value {
    /// Gets the string slice if this is a `Value::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the bytes if this is a `Value::Bytes`.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the message if this is a `Value::Message`.
    pub fn as_message(&self) -> Option<&DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// A mutable handle to the message. Changes made through it reach the message the value was
    /// read from.
    pub fn as_message_mut(&mut self) -> Option<&mut DynamicMessage> {
        match self {
            Value::Message(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the elements if this is a `Value::List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(value) => Some(value),
            _ => None,
        }
    }

    /// Gets the entries if this is a `Value::Map`.
    pub fn as_map(&self) -> Option<&HashMap<MapKey, Value>> {
        match self {
            Value::Map(value) => Some(value),
            _ => None,
        }
    }
}

impl MapKey {
    /// The zero key of type `kind`.
    ///
    /// # Panics
    ///
    /// Panics if `kind` cannot be a map key.
    pub fn default_value(kind: &Kind) -> Self {
        match kind {
            Kind::Bool => MapKey::Bool(false),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => MapKey::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => MapKey::I64(0),
            Kind::Uint32 | Kind::Fixed32 => MapKey::U32(0),
            Kind::Uint64 | Kind::Fixed64 => MapKey::U64(0),
            Kind::String => MapKey::String(String::new()),
            kind => panic!("{:?} cannot be a map key", kind),
        }
    }

    /// Whether this key has type `kind`.
    pub fn is_valid(&self, kind: &Kind) -> bool {
        Value::from(self.clone()).is_valid(kind)
    }

    /// Gets the string slice if this is a `MapKey::String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MapKey::String(value) => Some(value),
            _ => None,
        }
    }

    /// Turns a decoded key back into a [`MapKey`], or `None` for a type that cannot be a key.
    pub(crate) fn from_value(value: Value) -> Option<Self> {
        Some(match value {
            Value::Bool(key) => MapKey::Bool(key),
            Value::I32(key) => MapKey::I32(key),
            Value::I64(key) => MapKey::I64(key),
            Value::U32(key) => MapKey::U32(key),
            Value::U64(key) => MapKey::U64(key),
            Value::String(key) => MapKey::String(key),
            _ => return None,
        })
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Bool(key) => Value::Bool(key),
            MapKey::I32(key) => Value::I32(key),
            MapKey::I64(key) => Value::I64(key),
            MapKey::U32(key) => Value::U32(key),
            MapKey::U64(key) => Value::U64(key),
            MapKey::String(key) => Value::String(key),
        }
    }
}
