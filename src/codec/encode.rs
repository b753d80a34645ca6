use std::collections::HashMap;

use prost::{
    bytes::BufMut,
    encoding::{encode_key, encode_varint, encoded_len_varint, key_len, WireType},
};

use super::wire::{encode_zigzag32, encode_zigzag64, wire_type_of};
use crate::{
    descriptor::KindRef,
    dynamic::{MessageData, Stored},
    minitable::{FieldMode, MiniTable, MiniTableField},
    DescriptorPool, MapKey, Value,
};

pub(super) struct Context<'a> {
    pub(super) pool: &'a DescriptorPool,
    pub(super) deterministic: bool,
}

/// The wire representation of a scalar value, without its key.
enum Raw {
    Varint(u64),
    Fixed32([u8; 4]),
    Fixed64([u8; 8]),
}

/// Writes the known fields of a message, then its extensions in field number order, then its
/// unknown fields.
pub(super) fn encode_message(data: &MessageData, ctx: &Context<'_>, buf: &mut impl BufMut) {
    let table = data.table();
    if ctx.deterministic {
        for field in table.fields() {
            encode_field(data, field, ctx, buf);
        }
    } else {
        for field in table.storage_order() {
            encode_field(data, field, ctx, buf);
        }
    }

    for (extension, stored) in data.extensions.values() {
        encode_stored(
            extension.number(),
            extension.kind_ref(),
            extension.is_packed(),
            stored,
            ctx,
            buf,
        );
    }

    buf.put_slice(&data.unknown);
}

/// Gets the number of bytes [`encode_message`] writes for `data`.
pub(super) fn message_len(data: &MessageData, ctx: &Context<'_>) -> usize {
    let fields: usize = data
        .table()
        .fields()
        .iter()
        .map(|field| field_len(data, field, ctx))
        .sum();
    let extensions: usize = data
        .extensions
        .values()
        .map(|(extension, stored)| {
            stored_len(
                extension.number(),
                extension.kind_ref(),
                extension.is_packed(),
                stored,
                ctx,
            )
        })
        .sum();
    fields + extensions + data.unknown.len()
}

fn encode_field(
    data: &MessageData,
    field: &MiniTableField,
    ctx: &Context<'_>,
    buf: &mut impl BufMut,
) {
    if !data.has(field) {
        return;
    }
    if let Some(value) = data.read_scalar(field) {
        encode_key(field.number(), wire_type_of(field.kind()), buf);
        encode_raw(raw_scalar(&value, field.kind()), buf);
        return;
    }

    match (field.mode(), data.slot(field)) {
        (FieldMode::Map, Some(Stored::Map(map))) => encode_map(field, map, ctx, buf),
        (_, Some(stored)) => encode_stored(
            field.number(),
            field.kind(),
            field.is_packed(),
            stored,
            ctx,
            buf,
        ),
        (_, None) => (),
    }
}

fn field_len(data: &MessageData, field: &MiniTableField, ctx: &Context<'_>) -> usize {
    if !data.has(field) {
        return 0;
    }
    if let Some(value) = data.read_scalar(field) {
        return key_len(field.number()) + raw_len(&raw_scalar(&value, field.kind()));
    }

    match (field.mode(), data.slot(field)) {
        (FieldMode::Map, Some(Stored::Map(map))) => map_len(field, map, ctx),
        (_, Some(stored)) => stored_len(
            field.number(),
            field.kind(),
            field.is_packed(),
            stored,
            ctx,
        ),
        (_, None) => 0,
    }
}

fn encode_stored(
    number: u32,
    kind: KindRef,
    packed: bool,
    stored: &Stored,
    ctx: &Context<'_>,
    buf: &mut impl BufMut,
) {
    match stored {
        Stored::List(list) if packed && kind.is_packable() => {
            if list.is_empty() {
                return;
            }
            encode_key(number, WireType::LengthDelimited, buf);
            encode_varint(packed_len(kind, list) as u64, buf);
            for stored in list {
                if let Stored::Scalar(value) = stored {
                    encode_raw(raw_scalar(value, kind), buf);
                }
            }
        }
        Stored::List(list) => {
            for stored in list {
                encode_value(number, kind, stored, ctx, buf);
            }
        }
        stored => encode_value(number, kind, stored, ctx, buf),
    }
}

fn stored_len(
    number: u32,
    kind: KindRef,
    packed: bool,
    stored: &Stored,
    ctx: &Context<'_>,
) -> usize {
    match stored {
        Stored::List(list) if packed && kind.is_packable() => {
            if list.is_empty() {
                return 0;
            }
            let len = packed_len(kind, list);
            key_len(number) + encoded_len_varint(len as u64) + len
        }
        Stored::List(list) => list
            .iter()
            .map(|stored| value_len(number, kind, stored, ctx))
            .sum(),
        stored => value_len(number, kind, stored, ctx),
    }
}

fn encode_value(
    number: u32,
    kind: KindRef,
    stored: &Stored,
    ctx: &Context<'_>,
    buf: &mut impl BufMut,
) {
    match stored {
        Stored::Scalar(value) => {
            encode_key(number, wire_type_of(kind), buf);
            encode_raw(raw_scalar(value, kind), buf);
        }
        Stored::Str(bytes) => {
            encode_key(number, WireType::LengthDelimited, buf);
            encode_varint(bytes.len() as u64, buf);
            buf.put_slice(bytes);
        }
        Stored::Message(block) => {
            let child = block.lock();
            if let KindRef::Group(_) = kind {
                encode_key(number, WireType::StartGroup, buf);
                encode_message(&child, ctx, buf);
                encode_key(number, WireType::EndGroup, buf);
            } else {
                encode_key(number, WireType::LengthDelimited, buf);
                encode_varint(message_len(&child, ctx) as u64, buf);
                encode_message(&child, ctx, buf);
            }
        }
        Stored::List(_) | Stored::Map(_) => unreachable!("nested collection in field {}", number),
    }
}

fn value_len(number: u32, kind: KindRef, stored: &Stored, ctx: &Context<'_>) -> usize {
    match stored {
        Stored::Scalar(value) => key_len(number) + raw_len(&raw_scalar(value, kind)),
        Stored::Str(bytes) => key_len(number) + encoded_len_varint(bytes.len() as u64) + bytes.len(),
        Stored::Message(block) => {
            let len = message_len(&block.lock(), ctx);
            if let KindRef::Group(_) = kind {
                2 * key_len(number) + len
            } else {
                key_len(number) + encoded_len_varint(len as u64) + len
            }
        }
        Stored::List(_) | Stored::Map(_) => unreachable!("nested collection in field {}", number),
    }
}

/// Writes one length-delimited record per map entry. Every entry includes both its key and
/// value, even when they are defaults.
fn encode_map(
    field: &MiniTableField,
    map: &HashMap<MapKey, Stored>,
    ctx: &Context<'_>,
    buf: &mut impl BufMut,
) {
    let (key_kind, value_kind) = entry_kinds(field, ctx);
    let mut entries: Vec<_> = map.iter().collect();
    if ctx.deterministic {
        entries.sort_by(|(l, _), (r, _)| l.cmp(r));
    }

    for (key, value) in entries {
        let key = stored_key(key);
        encode_key(field.number(), WireType::LengthDelimited, buf);
        let len = value_len(1, key_kind, &key, ctx) + value_len(2, value_kind, value, ctx);
        encode_varint(len as u64, buf);
        encode_value(1, key_kind, &key, ctx, buf);
        encode_value(2, value_kind, value, ctx, buf);
    }
}

fn map_len(field: &MiniTableField, map: &HashMap<MapKey, Stored>, ctx: &Context<'_>) -> usize {
    let (key_kind, value_kind) = entry_kinds(field, ctx);
    map.iter()
        .map(|(key, value)| {
            let len = value_len(1, key_kind, &stored_key(key), ctx)
                + value_len(2, value_kind, value, ctx);
            key_len(field.number()) + encoded_len_varint(len as u64) + len
        })
        .sum()
}

fn entry_kinds(field: &MiniTableField, ctx: &Context<'_>) -> (KindRef, KindRef) {
    let entry = match field.kind() {
        KindRef::Message(index) => ctx.pool.message_at(index).mini_table(),
        kind => unreachable!("map field with {:?} entries", kind),
    };
    (field_kind(&entry, 1), field_kind(&entry, 2))
}

fn field_kind(table: &MiniTable, number: u32) -> KindRef {
    table
        .find_field(number)
        .expect("map entry is missing a field")
        .kind()
}

fn stored_key(key: &MapKey) -> Stored {
    match key {
        MapKey::String(value) => Stored::Str(value.clone().into()),
        key => Stored::Scalar(Value::from(key.clone())),
    }
}

fn packed_len(kind: KindRef, list: &[Stored]) -> usize {
    list.iter()
        .map(|stored| match stored {
            Stored::Scalar(value) => raw_len(&raw_scalar(value, kind)),
            _ => 0,
        })
        .sum()
}

fn raw_scalar(value: &Value, kind: KindRef) -> Raw {
    match (kind, value) {
        (KindRef::Double, &Value::F64(value)) => Raw::Fixed64(value.to_le_bytes()),
        (KindRef::Float, &Value::F32(value)) => Raw::Fixed32(value.to_le_bytes()),
        (KindRef::Int32, &Value::I32(value)) => Raw::Varint(value as i64 as u64),
        (KindRef::Int64, &Value::I64(value)) => Raw::Varint(value as u64),
        (KindRef::Uint32, &Value::U32(value)) => Raw::Varint(value.into()),
        (KindRef::Uint64, &Value::U64(value)) => Raw::Varint(value),
        (KindRef::Sint32, &Value::I32(value)) => Raw::Varint(encode_zigzag32(value)),
        (KindRef::Sint64, &Value::I64(value)) => Raw::Varint(encode_zigzag64(value)),
        (KindRef::Fixed32, &Value::U32(value)) => Raw::Fixed32(value.to_le_bytes()),
        (KindRef::Fixed64, &Value::U64(value)) => Raw::Fixed64(value.to_le_bytes()),
        (KindRef::Sfixed32, &Value::I32(value)) => Raw::Fixed32(value.to_le_bytes()),
        (KindRef::Sfixed64, &Value::I64(value)) => Raw::Fixed64(value.to_le_bytes()),
        (KindRef::Bool, &Value::Bool(value)) => Raw::Varint(value.into()),
        (KindRef::Enum(_), &Value::EnumNumber(value)) => Raw::Varint(value as i64 as u64),
        (kind, value) => unreachable!("{:?} stored for {:?} field", value, kind),
    }
}

fn encode_raw(raw: Raw, buf: &mut impl BufMut) {
    match raw {
        Raw::Varint(value) => encode_varint(value, buf),
        Raw::Fixed32(bytes) => buf.put_slice(&bytes),
        Raw::Fixed64(bytes) => buf.put_slice(&bytes),
    }
}

fn raw_len(raw: &Raw) -> usize {
    match *raw {
        Raw::Varint(value) => encoded_len_varint(value),
        Raw::Fixed32(_) => 4,
        Raw::Fixed64(_) => 8,
    }
}
