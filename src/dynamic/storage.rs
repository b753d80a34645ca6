use std::{
    collections::{BTreeMap, HashMap},
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use prost::bytes::Bytes;

use crate::{
    descriptor::KindRef,
    minitable::{FieldMode, FieldSlot, MiniTable, MiniTableField, Presence},
    Arena, ExtensionDescriptor, MapKey, Value,
};

/// The storage of a single message, allocated from an [`Arena`][crate::Arena].
pub(crate) struct Block {
    data: Mutex<MessageData>,
}

/// The contents of a message block, laid out according to its [`MiniTable`].
pub(crate) struct MessageData {
    table: Arc<MiniTable>,
    data: Box<[u8]>,
    slots: Box<[Option<Stored>]>,
    pub(crate) unknown: Vec<u8>,
    pub(crate) extensions: BTreeMap<u32, (ExtensionDescriptor, Stored)>,
    pub(crate) invalid_utf8: bool,
}

/// A value held in a pointer slot, a list element, a map value or an extension.
#[derive(Clone)]
pub(crate) enum Stored {
    /// A numeric, boolean or enum value.
    Scalar(Value),
    /// The raw bytes of a `string` or `bytes` value. Strings may hold invalid UTF-8 when the field
    /// does not validate it.
    Str(Bytes),
    Message(Arc<Block>),
    List(Vec<Stored>),
    Map(HashMap<MapKey, Stored>),
}

impl Block {
    pub(crate) fn new(table: Arc<MiniTable>) -> Self {
        Block {
            data: Mutex::new(MessageData::new(table)),
        }
    }

    /// The number of bytes reserved for a block laid out by `table`.
    pub(crate) fn footprint(table: &MiniTable) -> usize {
        table.size() + table.pointer_slots() * mem::size_of::<Option<Stored>>()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, MessageData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MessageData {
    pub(crate) fn new(table: Arc<MiniTable>) -> Self {
        MessageData {
            data: vec![0; table.size()].into_boxed_slice(),
            slots: (0..table.pointer_slots()).map(|_| None).collect(),
            table,
            unknown: Vec::new(),
            extensions: BTreeMap::new(),
            invalid_utf8: false,
        }
    }

    pub(crate) fn table(&self) -> &Arc<MiniTable> {
        &self.table
    }

    /// Returns `true` if the field is populated.
    ///
    /// Fields with explicit presence are populated once set. Fields without it are populated when
    /// they hold a non-zero scalar or a non-empty string, list or map.
    pub(crate) fn has(&self, field: &MiniTableField) -> bool {
        match field.presence() {
            Presence::Hasbit(hasbit) => self.hasbit(hasbit),
            Presence::Oneof { case_offset } => self.read_u32(case_offset) == field.number(),
            Presence::None => match field.slot() {
                FieldSlot::Data { offset, rep } => {
                    let range = offset as usize..(offset + rep.size()) as usize;
                    self.data[range].iter().any(|&b| b != 0)
                }
                FieldSlot::Pointer(slot) => match &self.slots[slot as usize] {
                    None => false,
                    Some(Stored::Str(bytes)) => !bytes.is_empty(),
                    Some(Stored::List(list)) => !list.is_empty(),
                    Some(Stored::Map(map)) => !map.is_empty(),
                    Some(Stored::Scalar(_) | Stored::Message(_)) => true,
                },
            },
        }
    }

    /// Gets the active field number of the oneof whose discriminant is at `case_offset`, or `0`.
    pub(crate) fn oneof_case(&self, case_offset: u32) -> u32 {
        self.read_u32(case_offset)
    }

    /// Reads a scalar field, if it is stored inline.
    ///
    /// Returns `None` for fields held in a pointer slot.
    pub(crate) fn read_scalar(&self, field: &MiniTableField) -> Option<Value> {
        match field.slot() {
            FieldSlot::Data { offset, .. } => Some(self.read_data(offset, field.kind())),
            FieldSlot::Pointer(_) => None,
        }
    }

    /// Gets the contents of a field's pointer slot.
    ///
    /// Returns `None` for inline fields, unset fields and oneof members which are not active.
    pub(crate) fn slot(&self, field: &MiniTableField) -> Option<&Stored> {
        match field.slot() {
            FieldSlot::Data { .. } => None,
            FieldSlot::Pointer(slot) => {
                if let Presence::Oneof { case_offset } = field.presence() {
                    if self.read_u32(case_offset) != field.number() {
                        return None;
                    }
                }
                self.slots[slot as usize].as_ref()
            }
        }
    }

    /// Gets mutable access to a field's pointer slot and marks the field as present.
    ///
    /// Activating a oneof member clears the value of whichever member was active before.
    ///
    /// # Panics
    ///
    /// Panics if the field is stored inline.
    pub(crate) fn slot_mut(&mut self, field: &MiniTableField) -> &mut Option<Stored> {
        let slot = match field.slot() {
            FieldSlot::Pointer(slot) => slot as usize,
            FieldSlot::Data { .. } => panic!("field {} is stored inline", field.number()),
        };

        match field.presence() {
            Presence::Hasbit(hasbit) => self.set_hasbit(hasbit, true),
            Presence::Oneof { case_offset } => {
                if self.read_u32(case_offset) != field.number() {
                    self.slots[slot] = None;
                    self.write_u32(case_offset, field.number());
                }
            }
            Presence::None => (),
        }
        &mut self.slots[slot]
    }

    /// Gets the list stored for a repeated field, creating it if necessary.
    pub(crate) fn list_mut(&mut self, field: &MiniTableField) -> &mut Vec<Stored> {
        debug_assert_eq!(field.mode(), FieldMode::Repeated);
        let slot = self.slot_mut(field);
        if !matches!(slot, Some(Stored::List(_))) {
            *slot = Some(Stored::List(Vec::new()));
        }
        match slot {
            Some(Stored::List(list)) => list,
            _ => unreachable!(),
        }
    }

    /// Gets the map stored for a map field, creating it if necessary.
    pub(crate) fn map_mut(&mut self, field: &MiniTableField) -> &mut HashMap<MapKey, Stored> {
        debug_assert_eq!(field.mode(), FieldMode::Map);
        let slot = self.slot_mut(field);
        if !matches!(slot, Some(Stored::Map(_))) {
            *slot = Some(Stored::Map(HashMap::new()));
        }
        match slot {
            Some(Stored::Map(map)) => map,
            _ => unreachable!(),
        }
    }

    /// Sets a singular field, or replaces the contents of a repeated or map field.
    pub(crate) fn set(&mut self, field: &MiniTableField, value: Stored) {
        match (field.slot(), value) {
            (FieldSlot::Data { offset, .. }, Stored::Scalar(value)) => {
                self.write_data(offset, &value);
                if let Presence::Hasbit(hasbit) = field.presence() {
                    self.set_hasbit(hasbit, true);
                }
            }
            (FieldSlot::Data { .. }, _) => {
                debug_assert!(false, "non-scalar value for inline field {}", field.number())
            }
            (FieldSlot::Pointer(_), value) => *self.slot_mut(field) = Some(value),
        }
    }

    /// Clears a field, so that [`has`][Self::has] returns `false` for it.
    pub(crate) fn clear(&mut self, field: &MiniTableField) {
        match field.presence() {
            Presence::Oneof { case_offset } => {
                if self.read_u32(case_offset) == field.number() {
                    self.write_u32(case_offset, 0);
                    if let FieldSlot::Pointer(slot) = field.slot() {
                        self.slots[slot as usize] = None;
                    }
                }
                return;
            }
            Presence::Hasbit(hasbit) => self.set_hasbit(hasbit, false),
            Presence::None => (),
        }

        match field.slot() {
            FieldSlot::Data { offset, rep } => {
                let range = offset as usize..(offset + rep.size()) as usize;
                self.data[range].fill(0);
            }
            FieldSlot::Pointer(slot) => self.slots[slot as usize] = None,
        }
    }

    /// Takes the contents of a field, leaving it cleared.
    pub(crate) fn take(&mut self, field: &MiniTableField) -> Option<Stored> {
        if !self.has(field) {
            return None;
        }
        let value = match field.slot() {
            FieldSlot::Data { offset, .. } => {
                Some(Stored::Scalar(self.read_data(offset, field.kind())))
            }
            FieldSlot::Pointer(slot) => self.slots[slot as usize].take(),
        };
        self.clear(field);
        value
    }

    /// Copies this message, allocating copies of its sub-messages in `arena`.
    pub(crate) fn deep_copy(&self, arena: &Arena) -> MessageData {
        MessageData {
            table: self.table.clone(),
            data: self.data.clone(),
            slots: self
                .slots
                .iter()
                .map(|slot| slot.as_ref().map(|stored| stored.deep_copy(arena)))
                .collect(),
            unknown: self.unknown.clone(),
            extensions: self
                .extensions
                .iter()
                .map(|(&number, (desc, stored))| (number, (desc.clone(), stored.deep_copy(arena))))
                .collect(),
            invalid_utf8: self.invalid_utf8,
        }
    }

    /// Gets every sub-message block referenced by this message.
    pub(crate) fn child_blocks(&self) -> Vec<Arc<Block>> {
        let mut blocks = Vec::new();
        for stored in self.slots.iter().flatten() {
            stored.collect_blocks(&mut blocks);
        }
        for (_, stored) in self.extensions.values() {
            stored.collect_blocks(&mut blocks);
        }
        blocks
    }

    fn hasbit(&self, hasbit: u32) -> bool {
        self.data[(hasbit / 8) as usize] & (1 << (hasbit % 8)) != 0
    }

    fn set_hasbit(&mut self, hasbit: u32, present: bool) {
        let byte = &mut self.data[(hasbit / 8) as usize];
        if present {
            *byte |= 1 << (hasbit % 8);
        } else {
            *byte &= !(1 << (hasbit % 8));
        }
    }

    fn read_u32(&self, offset: u32) -> u32 {
        u32::from_le_bytes(self.read_array(offset))
    }

    fn write_u32(&mut self, offset: u32, value: u32) {
        self.write_bytes(offset, &value.to_le_bytes());
    }

    fn read_array<const N: usize>(&self, offset: u32) -> [u8; N] {
        let mut buf = [0; N];
        buf.copy_from_slice(&self.data[offset as usize..offset as usize + N]);
        buf
    }

    fn write_bytes(&mut self, offset: u32, bytes: &[u8]) {
        self.data[offset as usize..offset as usize + bytes.len()].copy_from_slice(bytes);
    }

    fn read_data(&self, offset: u32, kind: KindRef) -> Value {
        match kind {
            KindRef::Double => Value::F64(f64::from_le_bytes(self.read_array(offset))),
            KindRef::Float => Value::F32(f32::from_le_bytes(self.read_array(offset))),
            KindRef::Int32 | KindRef::Sint32 | KindRef::Sfixed32 => {
                Value::I32(i32::from_le_bytes(self.read_array(offset)))
            }
            KindRef::Int64 | KindRef::Sint64 | KindRef::Sfixed64 => {
                Value::I64(i64::from_le_bytes(self.read_array(offset)))
            }
            KindRef::Uint32 | KindRef::Fixed32 => {
                Value::U32(u32::from_le_bytes(self.read_array(offset)))
            }
            KindRef::Uint64 | KindRef::Fixed64 => {
                Value::U64(u64::from_le_bytes(self.read_array(offset)))
            }
            KindRef::Enum(_) => Value::EnumNumber(i32::from_le_bytes(self.read_array(offset))),
            KindRef::Bool => Value::Bool(self.data[offset as usize] != 0),
            KindRef::String | KindRef::Bytes | KindRef::Message(_) | KindRef::Group(_) => {
                unreachable!("{:?} values are not stored inline", kind)
            }
        }
    }

    fn write_data(&mut self, offset: u32, value: &Value) {
        match *value {
            Value::F64(value) => self.write_bytes(offset, &value.to_le_bytes()),
            Value::F32(value) => self.write_bytes(offset, &value.to_le_bytes()),
            Value::I32(value) | Value::EnumNumber(value) => {
                self.write_bytes(offset, &value.to_le_bytes())
            }
            Value::I64(value) => self.write_bytes(offset, &value.to_le_bytes()),
            Value::U32(value) => self.write_bytes(offset, &value.to_le_bytes()),
            Value::U64(value) => self.write_bytes(offset, &value.to_le_bytes()),
            Value::Bool(value) => self.data[offset as usize] = value as u8,
            _ => debug_assert!(false, "non-scalar value written inline"),
        }
    }
}

impl Stored {
    fn collect_blocks(&self, blocks: &mut Vec<Arc<Block>>) {
        match self {
            Stored::Message(block) => blocks.push(block.clone()),
            Stored::List(list) => {
                for stored in list {
                    stored.collect_blocks(blocks);
                }
            }
            Stored::Map(map) => {
                for stored in map.values() {
                    stored.collect_blocks(blocks);
                }
            }
            Stored::Scalar(_) | Stored::Str(_) => (),
        }
    }
}
