use std::sync::Arc;

use prost::{
    bytes::Bytes,
    encoding::{encode_key, encode_varint, WireType},
};

use super::{
    error::{DecodeError, DecodeErrorKind},
    wire::{decode_zigzag32, decode_zigzag64, wire_type_of, Reader},
};
use crate::{
    descriptor::{KindRef, MessageIndex},
    dynamic::{Block, MessageData, Stored},
    minitable::{FieldMode, MiniTableField},
    Arena, DescriptorPool, ExtensionDescriptor, ExtensionRegistry, MapKey, Value,
};

pub(super) struct Context<'a> {
    pub(super) arena: &'a Arena,
    pub(super) pool: &'a DescriptorPool,
    pub(super) registry: Option<&'a ExtensionRegistry>,
}

/// The properties of a field which determine how each of its values is decoded.
#[derive(Clone, Copy)]
struct ElementType {
    number: u32,
    kind: KindRef,
    validate_utf8: bool,
    closed_enum: bool,
}

/// Merges records from `reader` into `data`.
///
/// If `group` is set, the records belong to a group with that field number and decoding stops at
/// its end tag. Otherwise, decoding continues until the input is exhausted.
pub(super) fn merge_message(
    reader: &mut Reader<'_>,
    data: &mut MessageData,
    ctx: &Context<'_>,
    depth: u32,
    group: Option<u32>,
) -> Result<(), DecodeError> {
    let table = data.table().clone();
    while !reader.is_empty() {
        let start = reader.pos();
        let tag_offset = reader.offset();
        let (number, wire_type) = reader.read_tag()?;
        if wire_type == WireType::EndGroup {
            return match group {
                Some(group) if group == number => Ok(()),
                _ => Err(DecodeError::new(
                    DecodeErrorKind::UnexpectedEndGroup,
                    tag_offset,
                )),
            };
        }

        let merged = if let Some(field) = table.find_field(number) {
            merge_field(reader, data, field, wire_type, start, ctx, depth)?
        } else if table.is_extension_number(number) {
            match ctx.find_extension(table.message_index(), number) {
                Some(extension) => {
                    merge_extension(reader, data, &extension, wire_type, start, ctx, depth)?
                }
                None => false,
            }
        } else {
            false
        };

        if !merged {
            reader.skip_field(number, wire_type, depth)?;
            data.unknown.extend_from_slice(reader.since(start));
        }
    }

    match group {
        Some(_) => Err(reader.error(DecodeErrorKind::Truncated)),
        None => Ok(()),
    }
}

/// Merges one record of a known field. Returns `false`, without consuming the payload, if the
/// record's wire type is not valid for the field.
fn merge_field(
    reader: &mut Reader<'_>,
    data: &mut MessageData,
    field: &MiniTableField,
    wire_type: WireType,
    start: usize,
    ctx: &Context<'_>,
    depth: u32,
) -> Result<bool, DecodeError> {
    let ty = ElementType::of_field(field);
    match field.mode() {
        FieldMode::Map => {
            if wire_type != WireType::LengthDelimited {
                return Ok(false);
            }
            merge_map_entry(reader, data, field, start, ctx, depth)?;
        }
        FieldMode::Repeated => {
            if wire_type == WireType::LengthDelimited && ty.kind.is_packable() {
                let mut values = Vec::new();
                merge_packed(reader, ty, ctx, &mut values, &mut data.unknown)?;
                data.list_mut(field).extend(values);
            } else if wire_type == wire_type_of(ty.kind) {
                match read_element(reader, ty, ctx, depth, &mut data.invalid_utf8)? {
                    Some(value) => data.list_mut(field).push(value),
                    None => data.unknown.extend_from_slice(reader.since(start)),
                }
            } else {
                return Ok(false);
            }
        }
        FieldMode::Scalar => {
            if wire_type != wire_type_of(ty.kind) {
                return Ok(false);
            }
            if ty.kind.is_message() {
                let existing = match data.slot(field) {
                    Some(Stored::Message(block)) => Some(block.clone()),
                    _ => None,
                };
                let block = merge_child(reader, ty, existing, ctx, depth, &mut data.invalid_utf8)?;
                *data.slot_mut(field) = Some(Stored::Message(block));
            } else {
                match read_element(reader, ty, ctx, depth, &mut data.invalid_utf8)? {
                    Some(value) => data.set(field, value),
                    None => data.unknown.extend_from_slice(reader.since(start)),
                }
            }
        }
    }
    Ok(true)
}

fn merge_extension(
    reader: &mut Reader<'_>,
    data: &mut MessageData,
    extension: &ExtensionDescriptor,
    wire_type: WireType,
    start: usize,
    ctx: &Context<'_>,
    depth: u32,
) -> Result<bool, DecodeError> {
    let ty = ElementType::of_extension(extension);
    if extension.is_list() {
        if wire_type == WireType::LengthDelimited && ty.kind.is_packable() {
            let mut values = Vec::new();
            merge_packed(reader, ty, ctx, &mut values, &mut data.unknown)?;
            extension_list(data, extension).extend(values);
        } else if wire_type == wire_type_of(ty.kind) {
            match read_element(reader, ty, ctx, depth, &mut data.invalid_utf8)? {
                Some(value) => extension_list(data, extension).push(value),
                None => data.unknown.extend_from_slice(reader.since(start)),
            }
        } else {
            return Ok(false);
        }
    } else {
        if wire_type != wire_type_of(ty.kind) {
            return Ok(false);
        }
        let value = if ty.kind.is_message() {
            let existing = match data.extensions.get(&ty.number) {
                Some((_, Stored::Message(block))) => Some(block.clone()),
                _ => None,
            };
            let block = merge_child(reader, ty, existing, ctx, depth, &mut data.invalid_utf8)?;
            Some(Stored::Message(block))
        } else {
            read_element(reader, ty, ctx, depth, &mut data.invalid_utf8)?
        };
        match value {
            Some(value) => {
                data.extensions
                    .insert(ty.number, (extension.clone(), value));
            }
            None => data.unknown.extend_from_slice(reader.since(start)),
        }
    }
    Ok(true)
}

fn extension_list<'d>(
    data: &'d mut MessageData,
    extension: &ExtensionDescriptor,
) -> &'d mut Vec<Stored> {
    let entry = data
        .extensions
        .entry(extension.number())
        .or_insert_with(|| (extension.clone(), Stored::List(Vec::new())));
    if !matches!(entry.1, Stored::List(_)) {
        entry.1 = Stored::List(Vec::new());
    }
    match &mut entry.1 {
        Stored::List(list) => list,
        _ => unreachable!(),
    }
}

/// Decodes one map entry record and inserts it into the map, replacing any existing value with
/// the same key.
fn merge_map_entry(
    reader: &mut Reader<'_>,
    data: &mut MessageData,
    field: &MiniTableField,
    start: usize,
    ctx: &Context<'_>,
    depth: u32,
) -> Result<(), DecodeError> {
    let entry_index = match field.kind() {
        KindRef::Message(index) => index,
        kind => unreachable!("map field with {:?} entries", kind),
    };
    if depth == 0 {
        return Err(reader.error(DecodeErrorKind::RecursionLimitExceeded));
    }

    let entry_table = ctx.pool.message_at(entry_index).mini_table();
    let mut entry = MessageData::new(entry_table.clone());
    let mut payload = reader.read_length_delimited()?;
    merge_message(&mut payload, &mut entry, ctx, depth - 1, None)?;
    data.invalid_utf8 |= entry.invalid_utf8;

    let (key_field, value_field) = match (entry_table.find_field(1), entry_table.find_field(2)) {
        (Some(key_field), Some(value_field)) => (key_field, value_field),
        _ => {
            data.unknown.extend_from_slice(reader.since(start));
            return Ok(());
        }
    };

    // An entry whose closed enum value is not defined is kept whole as an unknown field.
    if value_field.is_closed_enum()
        && !entry.has(value_field)
        && contains_field(&entry.unknown, value_field.number())
    {
        data.unknown.extend_from_slice(reader.since(start));
        return Ok(());
    }

    let key = match entry.read_scalar(key_field) {
        Some(value) => MapKey::from_value(value),
        None => Some(MapKey::String(match entry.slot(key_field) {
            Some(Stored::Str(bytes)) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        })),
    };
    let key = match key {
        Some(key) => key,
        None => {
            data.unknown.extend_from_slice(reader.since(start));
            return Ok(());
        }
    };

    let value = match entry.take(value_field) {
        Some(stored) => stored,
        None => match (value_field.kind(), entry.read_scalar(value_field)) {
            (KindRef::Enum(index), _) => Stored::Scalar(Value::EnumNumber(
                ctx.pool.enum_at(index).default_value().number(),
            )),
            (_, Some(value)) => Stored::Scalar(value),
            (KindRef::Message(index) | KindRef::Group(index), None) => {
                Stored::Message(ctx.arena.alloc(ctx.pool.message_at(index).mini_table()))
            }
            (_, None) => Stored::Str(Bytes::new()),
        },
    };

    data.map_mut(field).insert(key, value);
    Ok(())
}

/// Decodes a length-delimited run of packed scalar values.
///
/// Values of a closed enum which the enum does not define are written to `unknown` as individual
/// varint records.
fn merge_packed(
    reader: &mut Reader<'_>,
    ty: ElementType,
    ctx: &Context<'_>,
    values: &mut Vec<Stored>,
    unknown: &mut Vec<u8>,
) -> Result<(), DecodeError> {
    let mut packed = reader.read_length_delimited()?;
    while !packed.is_empty() {
        let value = read_scalar(&mut packed, ty.kind)?;
        match ctx.unknown_enum_number(ty, &value) {
            Some(number) => {
                encode_key(ty.number, WireType::Varint, unknown);
                encode_varint(number as i64 as u64, unknown);
            }
            None => values.push(Stored::Scalar(value)),
        }
    }
    Ok(())
}

/// Reads a single value which is not packed.
///
/// Returns `None` for a closed enum value which the enum does not define.
fn read_element(
    reader: &mut Reader<'_>,
    ty: ElementType,
    ctx: &Context<'_>,
    depth: u32,
    invalid_utf8: &mut bool,
) -> Result<Option<Stored>, DecodeError> {
    match ty.kind {
        KindRef::Message(_) | KindRef::Group(_) => {
            let block = merge_child(reader, ty, None, ctx, depth, invalid_utf8)?;
            Ok(Some(Stored::Message(block)))
        }
        KindRef::String | KindRef::Bytes => read_str(reader, ty, invalid_utf8).map(Some),
        kind => {
            let value = read_scalar(reader, kind)?;
            if ctx.unknown_enum_number(ty, &value).is_some() {
                Ok(None)
            } else {
                Ok(Some(Stored::Scalar(value)))
            }
        }
    }
}

/// Decodes a sub-message or group, merging it into `existing` if set.
fn merge_child(
    reader: &mut Reader<'_>,
    ty: ElementType,
    existing: Option<Arc<Block>>,
    ctx: &Context<'_>,
    depth: u32,
    invalid_utf8: &mut bool,
) -> Result<Arc<Block>, DecodeError> {
    let index = match ty.kind {
        KindRef::Message(index) | KindRef::Group(index) => index,
        kind => unreachable!("{:?} is not a message type", kind),
    };
    if depth == 0 {
        return Err(reader.error(DecodeErrorKind::RecursionLimitExceeded));
    }

    let block = existing.unwrap_or_else(|| ctx.arena.alloc(ctx.pool.message_at(index).mini_table()));
    let mut child = block.lock();
    if let KindRef::Group(_) = ty.kind {
        merge_message(reader, &mut child, ctx, depth - 1, Some(ty.number))?;
    } else {
        let mut payload = reader.read_length_delimited()?;
        merge_message(&mut payload, &mut child, ctx, depth - 1, None)?;
    }
    *invalid_utf8 |= child.invalid_utf8;
    drop(child);

    Ok(block)
}

fn read_str(
    reader: &mut Reader<'_>,
    ty: ElementType,
    invalid_utf8: &mut bool,
) -> Result<Stored, DecodeError> {
    let payload = reader.read_length_delimited()?;
    let bytes = payload.remaining();
    if ty.kind == KindRef::String && std::str::from_utf8(bytes).is_err() {
        if ty.validate_utf8 {
            return Err(payload.error(DecodeErrorKind::InvalidUtf8));
        }
        tracing::trace!(field = ty.number, "keeping invalid UTF-8 in string field");
        *invalid_utf8 = true;
    }
    Ok(Stored::Str(Bytes::copy_from_slice(bytes)))
}

fn read_scalar(reader: &mut Reader<'_>, kind: KindRef) -> Result<Value, DecodeError> {
    Ok(match kind {
        KindRef::Double => Value::F64(f64::from_le_bytes(reader.read_fixed64()?)),
        KindRef::Float => Value::F32(f32::from_le_bytes(reader.read_fixed32()?)),
        KindRef::Int32 => Value::I32(reader.read_varint()? as i32),
        KindRef::Int64 => Value::I64(reader.read_varint()? as i64),
        KindRef::Uint32 => Value::U32(reader.read_varint()? as u32),
        KindRef::Uint64 => Value::U64(reader.read_varint()?),
        KindRef::Sint32 => Value::I32(decode_zigzag32(reader.read_varint()?)),
        KindRef::Sint64 => Value::I64(decode_zigzag64(reader.read_varint()?)),
        KindRef::Fixed32 => Value::U32(u32::from_le_bytes(reader.read_fixed32()?)),
        KindRef::Fixed64 => Value::U64(u64::from_le_bytes(reader.read_fixed64()?)),
        KindRef::Sfixed32 => Value::I32(i32::from_le_bytes(reader.read_fixed32()?)),
        KindRef::Sfixed64 => Value::I64(i64::from_le_bytes(reader.read_fixed64()?)),
        KindRef::Bool => Value::Bool(reader.read_varint()? != 0),
        KindRef::Enum(_) => Value::EnumNumber(reader.read_varint()? as i32),
        KindRef::String | KindRef::Bytes | KindRef::Message(_) | KindRef::Group(_) => {
            unreachable!("{:?} is not a scalar type", kind)
        }
    })
}

/// Returns `true` if the encoded records in `buf` include one with the given field number.
fn contains_field(buf: &[u8], number: u32) -> bool {
    let mut reader = Reader::new(buf, 0);
    while !reader.is_empty() {
        match reader.read_tag() {
            Ok((field_number, _)) if field_number == number => return true,
            Ok((field_number, wire_type)) => {
                if reader.skip_field(field_number, wire_type, u32::MAX).is_err() {
                    return false;
                }
            }
            Err(_) => return false,
        }
    }
    false
}

impl Context<'_> {
    fn find_extension(&self, message: MessageIndex, number: u32) -> Option<ExtensionDescriptor> {
        let registry = self.registry?;
        registry
            .lookup(self.pool.message_at(message).full_name(), number)
            .cloned()
    }

    /// Gets the number of a closed enum value which its enum does not define.
    fn unknown_enum_number(&self, ty: ElementType, value: &Value) -> Option<i32> {
        match (ty.kind, value) {
            (KindRef::Enum(index), &Value::EnumNumber(number)) if ty.closed_enum => {
                if self.pool.enum_at(index).get_value(number).is_none() {
                    Some(number)
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

impl ElementType {
    fn of_field(field: &MiniTableField) -> Self {
        ElementType {
            number: field.number(),
            kind: field.kind(),
            validate_utf8: field.validates_utf8(),
            closed_enum: field.is_closed_enum(),
        }
    }

    fn of_extension(extension: &ExtensionDescriptor) -> Self {
        ElementType {
            number: extension.number(),
            kind: extension.kind_ref(),
            validate_utf8: extension.validates_utf8(),
            closed_enum: extension.is_closed_enum(),
        }
    }
}
