//! Compact layout tables describing how a message's fields are stored and found.
//!
//! A [`MiniTable`] is a pure function of a [`MessageDescriptor`]: it assigns each field a slot in
//! the message's storage block, records how presence is tracked, and provides a fast lookup from
//! wire field numbers to fields. The wire codec uses the table as its execution plan.


use std::{collections::HashMap, fmt, ops::Range};

use crate::{
    descriptor::{DefIndex, KindRef, MessageIndex},
    MessageDescriptor,
};

/// Fields beyond the dense prefix are binary searched up to this count, and hashed above it.
const SORTED_LOOKUP_THRESHOLD: usize = 32;

/// The compiled storage layout of a message type.
///
/// Obtain one through [`MessageDescriptor::mini_table`], which compiles it once and caches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniTable {
    message: MessageIndex,
    size: u32,
    hasbit_bytes: u32,
    pointer_slots: u32,
    fields: Box<[MiniTableField]>,
    dense_below: u32,
    lookup: Lookup,
    storage_order: Box<[u32]>,
    extension_ranges: Box<[Range<u32>]>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lookup {
    Sorted,
    Hashed(HashMap<u32, u32>),
}

/// The layout of a single field within a [`MiniTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MiniTableField {
    number: u32,
    index: DefIndex,
    kind: KindRef,
    mode: FieldMode,
    slot: FieldSlot,
    presence: Presence,
    flags: u8,
}

/// Whether a field holds one value, a list or a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldMode {
    /// A singular field.
    Scalar,
    /// A repeated field which is not a map.
    Repeated,
    /// A map field.
    Map,
}

/// Where a field's value lives in the message block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSlot {
    /// Inline in the scalar data bytes.
    Data {
        /// Byte offset from the start of the block.
        offset: u32,
        /// Width of the value.
        rep: DataRep,
    },
    /// In the pointer slot with the given index.
    Pointer(u32),
}

/// The width of an inline scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataRep {
    /// `bool`.
    OneByte,
    /// 32-bit numbers and enums.
    FourByte,
    /// 64-bit numbers.
    EightByte,
}

/// How a field records whether it is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Presence {
    /// The field does not track presence; it is set when non-empty or non-zero.
    None,
    /// Presence is recorded in the given hasbit.
    Hasbit(u32),
    /// The field is a member of a oneof whose active field number is stored at `case_offset`.
    Oneof {
        /// Byte offset of the 4-byte discriminant.
        case_offset: u32,
    },
}

const FLAG_PACKED: u8 = 1;
const FLAG_VALIDATE_UTF8: u8 = 1 << 1;
const FLAG_CLOSED_ENUM: u8 = 1 << 2;

impl MiniTable {
    /// Compiles the layout table for a message type.
    ///
    /// Compilation is deterministic: compiling the same descriptor twice yields equal tables.
    pub fn compile(desc: &MessageDescriptor) -> MiniTable {
        let mut fields: Vec<_> = desc.fields().collect();
        fields.sort_by_key(|field| field.number());
        debug_assert!(
            fields.windows(2).all(|w| w[0].number() != w[1].number()),
            "duplicate field number in {}",
            desc.full_name()
        );

        let mut hasbit_count = 0;
        let mut layouts = Vec::with_capacity(fields.len());
        for field in &fields {
            let mode = if field.is_map() {
                FieldMode::Map
            } else if field.is_list() {
                FieldMode::Repeated
            } else {
                FieldMode::Scalar
            };
            let oneof = field
                .containing_oneof()
                .filter(|oneof| !oneof.is_synthetic())
                .map(|oneof| oneof.index());
            let rep = match (mode, oneof) {
                (FieldMode::Scalar, None) => data_rep(field.kind_ref()),
                _ => None,
            };
            let presence = if oneof.is_some() {
                Presence::Oneof { case_offset: 0 }
            } else if mode == FieldMode::Scalar && field.supports_presence() {
                hasbit_count += 1;
                Presence::Hasbit(hasbit_count - 1)
            } else {
                Presence::None
            };

            let mut flags = 0;
            if field.is_packed() {
                flags |= FLAG_PACKED;
            }
            if field.validates_utf8() {
                flags |= FLAG_VALIDATE_UTF8;
            }
            if field.is_closed_enum() {
                flags |= FLAG_CLOSED_ENUM;
            }

            layouts.push(PendingField {
                field: MiniTableField {
                    number: field.number(),
                    index: field.index(),
                    kind: field.kind_ref(),
                    mode,
                    slot: FieldSlot::Pointer(0),
                    presence,
                    flags,
                },
                rep,
                oneof,
            });
        }

        let hasbit_bytes = hasbit_count.div_ceil(8);
        let mut offset = round_up(hasbit_bytes, 8);

        for pending in layouts.iter_mut() {
            if pending.rep == Some(DataRep::EightByte) {
                pending.field.slot = FieldSlot::Data {
                    offset,
                    rep: DataRep::EightByte,
                };
                offset += 8;
            }
        }

        let mut case_offsets: HashMap<DefIndex, u32> = HashMap::new();
        for pending in layouts.iter_mut() {
            if pending.rep == Some(DataRep::FourByte) {
                pending.field.slot = FieldSlot::Data {
                    offset,
                    rep: DataRep::FourByte,
                };
                offset += 4;
            } else if let Some(oneof) = pending.oneof {
                let case_offset = *case_offsets.entry(oneof).or_insert_with(|| {
                    offset += 4;
                    offset - 4
                });
                pending.field.presence = Presence::Oneof { case_offset };
            }
        }

        for pending in layouts.iter_mut() {
            if pending.rep == Some(DataRep::OneByte) {
                pending.field.slot = FieldSlot::Data {
                    offset,
                    rep: DataRep::OneByte,
                };
                offset += 1;
            }
        }

        let size = round_up(offset, 8);

        let mut pointer_slots = 0;
        let mut oneof_slots: HashMap<DefIndex, u32> = HashMap::new();
        for pending in layouts.iter_mut() {
            if pending.rep.is_some() {
                continue;
            }
            let slot = match pending.oneof {
                Some(oneof) => *oneof_slots.entry(oneof).or_insert_with(|| {
                    pointer_slots += 1;
                    pointer_slots - 1
                }),
                None => {
                    pointer_slots += 1;
                    pointer_slots - 1
                }
            };
            pending.field.slot = FieldSlot::Pointer(slot);
        }

        let fields: Box<[MiniTableField]> = layouts.into_iter().map(|p| p.field).collect();

        let dense_below = fields
            .iter()
            .enumerate()
            .take_while(|&(i, field)| field.number as usize == i + 1)
            .count();
        let lookup = if fields.len() - dense_below > SORTED_LOOKUP_THRESHOLD {
            Lookup::Hashed(
                fields
                    .iter()
                    .enumerate()
                    .skip(dense_below)
                    .map(|(i, field)| (field.number, i as u32))
                    .collect(),
            )
        } else {
            Lookup::Sorted
        };

        let mut storage_order: Vec<u32> = (0..fields.len() as u32).collect();
        storage_order.sort_by_key(|&i| fields[i as usize].index);

        MiniTable {
            message: desc.index(),
            size,
            hasbit_bytes,
            pointer_slots,
            fields,
            dense_below: dense_below as u32,
            lookup,
            storage_order: storage_order.into_boxed_slice(),
            extension_ranges: desc.extension_ranges().collect(),
        }
    }

    /// The size in bytes of the scalar data block, including hasbits and oneof discriminants.
    pub fn size(&self) -> usize {
        self.size as usize
    }

    /// The number of bytes at the start of the data block used for hasbits.
    pub fn hasbit_bytes(&self) -> usize {
        self.hasbit_bytes as usize
    }

    /// The number of pointer slots a message block needs.
    pub fn pointer_slots(&self) -> usize {
        self.pointer_slots as usize
    }

    /// Gets the fields of this table, in field-number order.
    pub fn fields(&self) -> &[MiniTableField] {
        &self.fields
    }

    /// Gets the fields of this table in storage order, which is the order they were declared in.
    pub fn storage_order(&self) -> impl ExactSizeIterator<Item = &MiniTableField> + '_ {
        self.storage_order
            .iter()
            .map(|&i| &self.fields[i as usize])
    }

    /// Looks up a field by its wire number.
    pub fn find_field(&self, number: u32) -> Option<&MiniTableField> {
        let n = number as usize;
        if n >= 1 && n <= self.dense_below as usize {
            return Some(&self.fields[n - 1]);
        }

        let index = match &self.lookup {
            Lookup::Sorted => {
                let rest = &self.fields[self.dense_below as usize..];
                rest.binary_search_by_key(&number, |field| field.number)
                    .ok()
                    .map(|i| i + self.dense_below as usize)
            }
            Lookup::Hashed(map) => map.get(&number).map(|&i| i as usize),
        };
        index.map(|i| &self.fields[i])
    }

    /// The number of fields, counted from field 1, which are found by direct indexing.
    pub fn dense_prefix_len(&self) -> usize {
        self.dense_below as usize
    }

    /// Whether fields outside the dense prefix are found through a hash table rather than a
    /// binary search.
    pub fn uses_hash_lookup(&self) -> bool {
        matches!(self.lookup, Lookup::Hashed(_))
    }

    /// Gets the extension number ranges declared by the message.
    pub fn extension_ranges(&self) -> &[Range<u32>] {
        &self.extension_ranges
    }

    /// Whether `number` falls within one of the declared extension ranges.
    pub fn is_extension_number(&self, number: u32) -> bool {
        self.extension_ranges
            .iter()
            .any(|range| range.contains(&number))
    }

    pub(crate) fn message_index(&self) -> MessageIndex {
        self.message
    }
}

impl fmt::Display for MiniTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "size: {}, hasbit bytes: {}, pointer slots: {}",
            self.size, self.hasbit_bytes, self.pointer_slots
        )?;
        for field in self.fields.iter() {
            write!(f, "\n{}", field)?;
        }
        Ok(())
    }
}

impl MiniTableField {
    /// The field number.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// Whether this is a singular, repeated or map field.
    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    /// Where this field is stored.
    pub fn slot(&self) -> FieldSlot {
        self.slot
    }

    /// How this field records presence.
    pub fn presence(&self) -> Presence {
        self.presence
    }

    /// Whether repeated values of this field are written using packed encoding.
    pub fn is_packed(&self) -> bool {
        self.flags & FLAG_PACKED != 0
    }

    /// Whether string values must be valid UTF-8.
    pub fn validates_utf8(&self) -> bool {
        self.flags & FLAG_VALIDATE_UTF8 != 0
    }

    /// Whether this field holds a closed enum.
    pub fn is_closed_enum(&self) -> bool {
        self.flags & FLAG_CLOSED_ENUM != 0
    }

    /// Whether this field holds a message using delimited (group) encoding.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, KindRef::Group(_))
    }

    pub(crate) fn kind(&self) -> KindRef {
        self.kind
    }

    /// Position of the field in the declaration order of its message.
    pub(crate) fn index(&self) -> DefIndex {
        self.index
    }
}

impl fmt::Display for MiniTableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?}", self.number, self.kind)?;
        match self.mode {
            FieldMode::Scalar => (),
            FieldMode::Repeated => f.write_str(" repeated")?,
            FieldMode::Map => f.write_str(" map")?,
        }
        match self.slot {
            FieldSlot::Data { offset, rep } => {
                write!(f, " data[{}..{}]", offset, offset + rep.size())?
            }
            FieldSlot::Pointer(slot) => write!(f, " pointer[{}]", slot)?,
        }
        match self.presence {
            Presence::None => (),
            Presence::Hasbit(hasbit) => write!(f, " hasbit({})", hasbit)?,
            Presence::Oneof { case_offset } => write!(f, " oneof(case@{})", case_offset)?,
        }
        if self.is_packed() {
            f.write_str(" packed")?;
        }
        if self.validates_utf8() {
            f.write_str(" utf8")?;
        }
        if self.is_closed_enum() {
            f.write_str(" closed")?;
        }
        Ok(())
    }
}

impl DataRep {
    /// The width in bytes.
    pub fn size(&self) -> u32 {
        match self {
            DataRep::OneByte => 1,
            DataRep::FourByte => 4,
            DataRep::EightByte => 8,
        }
    }
}

struct PendingField {
    field: MiniTableField,
    rep: Option<DataRep>,
    oneof: Option<DefIndex>,
}

fn data_rep(kind: KindRef) -> Option<DataRep> {
    match kind {
        KindRef::Double
        | KindRef::Int64
        | KindRef::Uint64
        | KindRef::Sint64
        | KindRef::Fixed64
        | KindRef::Sfixed64 => Some(DataRep::EightByte),
        KindRef::Float
        | KindRef::Int32
        | KindRef::Uint32
        | KindRef::Sint32
        | KindRef::Fixed32
        | KindRef::Sfixed32
        | KindRef::Enum(_) => Some(DataRep::FourByte),
        KindRef::Bool => Some(DataRep::OneByte),
        KindRef::String | KindRef::Bytes | KindRef::Message(_) | KindRef::Group(_) => None,
    }
}

fn round_up(n: u32, align: u32) -> u32 {
    (n + align - 1) / align * align
}
