mod convert;
mod storage;
#[cfg(test)]
mod tests;
mod value;

use std::{error::Error, fmt, sync::Arc};

use prost::{bytes::Bytes, Message};

pub(crate) use self::storage::{Block, MessageData, Stored};
pub use self::value::{MapKey, Value};

use self::value::FieldLike;
use crate::{
    descriptor::Kind,
    minitable::{MiniTableField, Presence},
    Arena, DecodeError, ExtensionDescriptor, FieldDescriptor, MessageDescriptor, OneofDescriptor,
};

/// A protobuf message whose type is only known at runtime.
///
/// The message's fields live in a block allocated from an [`Arena`], laid out according to the
/// [`MiniTable`][crate::minitable::MiniTable] of its type. A `DynamicMessage` is a handle to that
/// block: clones share it, and so do sub-messages read out of a field, so a change made through
/// one handle is seen through all of them.
#[derive(Clone)]
pub struct DynamicMessage {
    desc: MessageDescriptor,
    handle: Arc<MessageHandle>,
}

/// Keeps a block's arena alive for as long as some handle to the block exists. The arena hands
/// out at most one of these per block.
pub(crate) struct MessageHandle {
    arena: Arena,
    block: Arc<Block>,
}

/// Why [`DynamicMessage::set_field`] and friends refused a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetFieldError {
    /// No such field exists on this message type.
    NotFound,
    /// The value has the wrong type for the field, or the field or extension belongs to some
    /// other message type.
    TypeMismatch {
        /// Full name of the field or extension.
        field: String,
        /// The type that was expected.
        expected: String,
    },
}

impl DynamicMessage {
    /// Allocates an empty message of type `desc` in `arena`.
    pub fn new(desc: MessageDescriptor, arena: &Arena) -> Self {
        let block = arena.alloc(desc.mini_table());
        DynamicMessage::from_block(desc, arena, block)
    }

    pub(crate) fn from_block(desc: MessageDescriptor, arena: &Arena, block: Arc<Block>) -> Self {
        DynamicMessage {
            handle: arena.wrap(block),
            desc,
        }
    }

    /// The type of this message.
    pub fn descriptor(&self) -> MessageDescriptor {
        self.desc.clone()
    }

    /// The arena holding this message's storage.
    pub fn arena(&self) -> &Arena {
        &self.handle.arena
    }

    /// Whether `self` and `other` are handles to the same storage.
    pub fn ptr_eq(&self, other: &DynamicMessage) -> bool {
        Arc::ptr_eq(&self.handle, &other.handle)
    }

    /// Whether `field_desc` is set.
    ///
    /// For fields that [track presence][FieldDescriptor::supports_presence] this is whether a
    /// value was set. For the rest it is whether the value differs from the default, which is
    /// also what decides if the field is encoded.
    pub fn has_field(&self, field_desc: &FieldDescriptor) -> bool {
        self.table_field(field_desc)
            .map_or(false, |field| self.handle.block.lock().has(&field))
    }

    /// Reads `field_desc`, falling back to its default when it is unset or belongs to another
    /// message type. A message value read here shares storage with this message.
    pub fn get_field(&self, field_desc: &FieldDescriptor) -> Value {
        let value = self.table_field(field_desc).and_then(|field| {
            let data = self.handle.block.lock();
            self.read_field(&data, &field, field_desc)
        });
        value.unwrap_or_else(|| Value::default_value_for_field(field_desc))
    }

    /// Writes `value` to `field_desc`, clearing whichever other member of its oneof was set.
    ///
    /// A message value from this arena, or one fused with it, is stored as is and so stays
    /// shared. A message value from any other arena is copied in.
    pub fn set_field(
        &mut self,
        field_desc: &FieldDescriptor,
        value: Value,
    ) -> Result<(), SetFieldError> {
        let field = self.own_field(field_desc)?;
        if !field_desc.accepts(&value) {
            return Err(field_desc.type_mismatch());
        }

        let stored = Stored::from_value(value, &self.handle.arena, &self.handle.block);
        self.handle.block.lock().set(&field, stored);
        Ok(())
    }

    /// Unsets `field_desc`, so it reads as its default and is left out of the encoding.
    pub fn clear_field(&mut self, field_desc: &FieldDescriptor) {
        if let Some(field) = self.table_field(field_desc) {
            self.handle.block.lock().clear(&field);
        }
    }

    /// Like [`has_field`][Self::has_field], looking the field up by number. Returns `false`
    /// if the type has no such field.
    pub fn has_field_by_number(&self, number: u32) -> bool {
        self.desc
            .get_field(number)
            .map_or(false, |field_desc| self.has_field(&field_desc))
    }

    /// Reads the field numbered `number`, or returns `None` if the type has no such field.
    pub fn get_field_by_number(&self, number: u32) -> Option<Value> {
        let field_desc = self.desc.get_field(number)?;
        Some(self.get_field(&field_desc))
    }

    /// Sets the field numbered `number`. Fails with [`SetFieldError::NotFound`] if the type
    /// has no such field.
    pub fn set_field_by_number(&mut self, number: u32, value: Value) -> Result<(), SetFieldError> {
        match self.desc.get_field(number) {
            Some(field_desc) => self.set_field(&field_desc, value),
            None => Err(SetFieldError::NotFound),
        }
    }

    /// Clears the field numbered `number`, if the type has one.
    pub fn clear_field_by_number(&mut self, number: u32) {
        if let Some(field_desc) = self.desc.get_field(number) {
            self.clear_field(&field_desc);
        }
    }

    /// Like [`has_field`][Self::has_field], looking the field up by name.
    pub fn has_field_by_name(&self, name: &str) -> bool {
        self.desc
            .get_field_by_name(name)
            .map_or(false, |field_desc| self.has_field(&field_desc))
    }

    /// Reads the field called `name`, or returns `None` if the type has no such field.
    pub fn get_field_by_name(&self, name: &str) -> Option<Value> {
        let field_desc = self.desc.get_field_by_name(name)?;
        Some(self.get_field(&field_desc))
    }

    /// Sets the field called `name`. Fails with [`SetFieldError::NotFound`] if the type has
    /// no such field.
    pub fn set_field_by_name(&mut self, name: &str, value: Value) -> Result<(), SetFieldError> {
        match self.desc.get_field_by_name(name) {
            Some(field_desc) => self.set_field(&field_desc, value),
            None => Err(SetFieldError::NotFound),
        }
    }

    /// Clears the field called `name`, if the type has one.
    pub fn clear_field_by_name(&mut self, name: &str) {
        if let Some(field_desc) = self.desc.get_field_by_name(name) {
            self.clear_field(&field_desc);
        }
    }

    /// The member of `oneof` that is currently set.
    pub fn which_oneof(&self, oneof: &OneofDescriptor) -> Option<FieldDescriptor> {
        let member = oneof.fields().next()?;
        let field = self.table_field(&member)?;
        let Presence::Oneof { case_offset } = field.presence() else {
            // Synthetic oneofs track their only member like a plain optional field.
            return self.has_field(&member).then_some(member);
        };
        match self.handle.block.lock().oneof_case(case_offset) {
            0 => None,
            number => self.desc.get_field(number),
        }
    }

    /// The fields that are set, with their values, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldDescriptor, Value)> + '_ {
        let table = self.desc.mini_table();
        let data = self.handle.block.lock();
        let mut set = Vec::new();
        for field in table.storage_order() {
            let field_desc = self.desc.field_at(field.index());
            if let Some(value) = self.read_field(&data, field, &field_desc) {
                set.push((field_desc, value));
            }
        }
        set.into_iter()
    }

    /// A handle to the message in a singular message field, which is set to an empty message
    /// first if it was unset. Changes made through the handle land in this message.
    pub fn get_or_create_message(
        &mut self,
        field_desc: &FieldDescriptor,
    ) -> Result<DynamicMessage, SetFieldError> {
        let field = self.own_field(field_desc)?;
        let message_desc = match field_desc.kind() {
            Kind::Message(desc) if !field_desc.is_list() && !field_desc.is_map() => desc,
            _ => {
                return Err(SetFieldError::TypeMismatch {
                    field: field_desc.full_name().to_owned(),
                    expected: "a singular message field".to_owned(),
                })
            }
        };

        let block = {
            let mut data = self.handle.block.lock();
            match data.slot(&field) {
                Some(Stored::Message(block)) => block.clone(),
                _ => {
                    let block = self.handle.arena.alloc(message_desc.mini_table());
                    *data.slot_mut(&field) = Some(Stored::Message(block.clone()));
                    block
                }
            }
        };
        Ok(DynamicMessage::from_block(
            message_desc,
            &self.handle.arena,
            block,
        ))
    }

    /// Whether `extension_desc` is set. Repeated extensions count as set when non-empty.
    pub fn has_extension(&self, extension_desc: &ExtensionDescriptor) -> bool {
        let data = self.handle.block.lock();
        match data.extensions.get(&extension_desc.number()) {
            Some((desc, stored)) if desc == extension_desc => match stored {
                Stored::List(list) => !list.is_empty(),
                Stored::Map(map) => !map.is_empty(),
                _ => true,
            },
            _ => false,
        }
    }

    /// Reads `extension_desc`, or its default if unset.
    pub fn get_extension(&self, extension_desc: &ExtensionDescriptor) -> Value {
        let data = self.handle.block.lock();
        match data.extensions.get(&extension_desc.number()) {
            Some((desc, stored)) if desc == extension_desc => {
                stored.to_value(&extension_desc.kind(), &self.handle.arena)
            }
            _ => Value::default_value_for_extension(extension_desc),
        }
    }

    /// Writes an extension value.
    ///
    /// Fails with [`SetFieldError::TypeMismatch`] if `extension_desc` extends a different message
    /// type or the value does not fit it.
    pub fn set_extension(
        &mut self,
        extension_desc: &ExtensionDescriptor,
        value: Value,
    ) -> Result<(), SetFieldError> {
        if extension_desc.containing_message() != self.desc {
            return Err(SetFieldError::TypeMismatch {
                field: extension_desc.full_name().to_owned(),
                expected: format!("an extension of '{}'", self.desc.full_name()),
            });
        }
        if !extension_desc.accepts(&value) {
            return Err(extension_desc.type_mismatch());
        }

        let stored = Stored::from_value(value, &self.handle.arena, &self.handle.block);
        let mut data = self.handle.block.lock();
        data.extensions
            .insert(extension_desc.number(), (extension_desc.clone(), stored));
        Ok(())
    }

    /// Removes the value of `extension_desc`. Does nothing if another extension holds its number.
    pub fn clear_extension(&mut self, extension_desc: &ExtensionDescriptor) {
        let mut data = self.handle.block.lock();
        let number = extension_desc.number();
        if matches!(data.extensions.get(&number), Some((desc, _)) if desc == extension_desc) {
            data.extensions.remove(&number);
        }
    }

    /// The extensions that are set, ordered by number.
    pub fn extensions(&self) -> impl Iterator<Item = (ExtensionDescriptor, Value)> + '_ {
        let data = self.handle.block.lock();
        let set: Vec<_> = data
            .extensions
            .values()
            .map(|(desc, stored)| {
                let value = stored.to_value(&desc.kind(), &self.handle.arena);
                (desc.clone(), value)
            })
            .collect();
        set.into_iter()
    }

    /// The encoded unknown fields, in the order they were read.
    pub fn unknown_fields(&self) -> Bytes {
        Bytes::copy_from_slice(&self.handle.block.lock().unknown)
    }

    /// Drops the retained unknown fields.
    pub fn clear_unknown_fields(&mut self) {
        self.handle.block.lock().unknown.clear();
    }

    /// Whether this message or any sub-message holds a string that was not valid UTF-8 when
    /// decoded.
    ///
    /// Only fields that skip UTF-8 validation can hold one. Such a string reads back with
    /// `U+FFFD` replacements but encodes as the original bytes.
    pub fn has_invalid_utf8(&self) -> bool {
        self.handle.block.lock().invalid_utf8
    }

    /// Merges a generated message into this one by encoding it and decoding the bytes here.
    pub fn transcode_from<T>(&mut self, value: &T) -> Result<(), DecodeError>
    where
        T: Message,
    {
        self.merge(value.encode_to_vec().as_slice())
    }

    /// Converts this message into a generated message type by encoding and decoding it.
    pub fn transcode_to<T>(&self) -> Result<T, prost::DecodeError>
    where
        T: Message + Default,
    {
        T::decode(self.encode_to_vec().as_slice())
    }

    pub(crate) fn block(&self) -> &Arc<Block> {
        &self.handle.block
    }

    /// Like [`table_field`][Self::table_field], but a field of another message type is an error.
    fn own_field(&self, field_desc: &FieldDescriptor) -> Result<MiniTableField, SetFieldError> {
        if *field_desc.parent_message() != self.desc {
            return Err(SetFieldError::TypeMismatch {
                field: field_desc.full_name().to_owned(),
                expected: format!("a field of '{}'", self.desc.full_name()),
            });
        }
        self.table_field(field_desc).ok_or(SetFieldError::NotFound)
    }

    fn table_field(&self, field_desc: &FieldDescriptor) -> Option<MiniTableField> {
        if *field_desc.parent_message() != self.desc {
            return None;
        }
        self.desc.mini_table().find_field(field_desc.number()).copied()
    }

    fn read_field(
        &self,
        data: &MessageData,
        field: &MiniTableField,
        field_desc: &FieldDescriptor,
    ) -> Option<Value> {
        if !data.has(field) {
            return None;
        }
        data.read_scalar(field).or_else(|| {
            data.slot(field)
                .map(|stored| stored.to_value(&field_desc.kind(), &self.handle.arena))
        })
    }
}

impl MessageHandle {
    pub(crate) fn new(arena: Arena, block: Arc<Block>) -> Self {
        MessageHandle { arena, block }
    }
}

impl PartialEq for DynamicMessage {
    /// Messages are equal when they have the same type and the same fields, extensions and
    /// unknown bytes set.
    fn eq(&self, other: &Self) -> bool {
        if self.desc != other.desc {
            return false;
        }
        Arc::ptr_eq(&self.handle.block, &other.handle.block)
            || (self.fields().eq(other.fields())
                && self.extensions().eq(other.extensions())
                && self.unknown_fields() == other.unknown_fields())
    }
}

impl fmt::Debug for DynamicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(self.desc.full_name());
        for (field_desc, value) in self.fields() {
            s.field(field_desc.name(), &value);
        }
        for (extension_desc, value) in self.extensions() {
            s.field(extension_desc.full_name(), &value);
        }
        let unknown = self.unknown_fields();
        if !unknown.is_empty() {
            s.field("unknown_fields", &unknown);
        }
        s.finish()
    }
}

impl fmt::Display for SetFieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetFieldError::NotFound => f.write_str("field not found"),
            SetFieldError::TypeMismatch { field, expected } => {
                write!(f, "field '{}' expects a value of type '{}'", field, expected)
            }
        }
    }
}

impl Error for SetFieldError {}
