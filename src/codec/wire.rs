use prost::encoding::WireType;

use super::error::{DecodeError, DecodeErrorKind};
use crate::descriptor::KindRef;

const MAX_FIELD_NUMBER: u64 = (1 << 29) - 1;

/// A cursor over an input buffer which tracks its position relative to the start of the
/// outermost message, for error reporting.
pub(super) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Reader<'a> {
    pub(super) fn new(buf: &'a [u8], base: usize) -> Self {
        Reader { buf, pos: 0, base }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// The position of the cursor within `buf`.
    pub(super) fn pos(&self) -> usize {
        self.pos
    }

    /// The position of the cursor within the outermost input.
    pub(super) fn offset(&self) -> usize {
        self.base + self.pos
    }

    /// Gets the bytes between `start` and the cursor.
    pub(super) fn since(&self, start: usize) -> &'a [u8] {
        &self.buf[start..self.pos]
    }

    /// Gets the unread bytes.
    pub(super) fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    pub(super) fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError::new(kind, self.offset())
    }

    pub(super) fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset();
        let mut value = 0u64;
        for i in 0..10 {
            let byte = match self.buf.get(self.pos) {
                Some(&byte) => byte,
                None => return Err(DecodeError::new(DecodeErrorKind::Truncated, start)),
            };
            self.pos += 1;
            if i == 9 && byte > 1 {
                return Err(DecodeError::new(DecodeErrorKind::InvalidVarint, start));
            }
            value |= u64::from(byte & 0x7f) << (i * 7);
            if byte < 0x80 {
                return Ok(value);
            }
        }
        Err(DecodeError::new(DecodeErrorKind::InvalidVarint, start))
    }

    pub(super) fn read_fixed32(&mut self) -> Result<[u8; 4], DecodeError> {
        let mut buf = [0; 4];
        buf.copy_from_slice(self.read_bytes(4)?);
        Ok(buf)
    }

    pub(super) fn read_fixed64(&mut self) -> Result<[u8; 8], DecodeError> {
        let mut buf = [0; 8];
        buf.copy_from_slice(self.read_bytes(8)?);
        Ok(buf)
    }

    pub(super) fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.buf.len() - self.pos < len {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a length-prefixed payload, returning a reader over it.
    pub(super) fn read_length_delimited(&mut self) -> Result<Reader<'a>, DecodeError> {
        let len_offset = self.offset();
        let len = self.read_varint()?;
        let len = usize::try_from(len)
            .map_err(|_| DecodeError::new(DecodeErrorKind::Truncated, len_offset))?;
        let base = self.offset();
        let bytes = self.read_bytes(len)?;
        Ok(Reader::new(bytes, base))
    }

    /// Reads a record tag, returning the field number and wire type.
    pub(super) fn read_tag(&mut self) -> Result<(u32, WireType), DecodeError> {
        let start = self.offset();
        let key = self.read_varint()?;
        let number = key >> 3;
        let wire_type = match key & 0x07 {
            0 => WireType::Varint,
            1 => WireType::SixtyFourBit,
            2 => WireType::LengthDelimited,
            3 => WireType::StartGroup,
            4 => WireType::EndGroup,
            5 => WireType::ThirtyTwoBit,
            _ => return Err(DecodeError::new(DecodeErrorKind::UnknownWireType, start)),
        };
        if number == 0 || number > MAX_FIELD_NUMBER {
            return Err(DecodeError::new(DecodeErrorKind::InvalidFieldNumber, start));
        }
        Ok((number as u32, wire_type))
    }

    /// Skips the payload of a record whose tag has just been read.
    ///
    /// Groups are skipped up to and including their matching end tag. Each nested group counts
    /// against `depth`.
    pub(super) fn skip_field(
        &mut self,
        number: u32,
        wire_type: WireType,
        depth: u32,
    ) -> Result<(), DecodeError> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::SixtyFourBit => {
                self.read_bytes(8)?;
            }
            WireType::ThirtyTwoBit => {
                self.read_bytes(4)?;
            }
            WireType::LengthDelimited => {
                self.read_length_delimited()?;
            }
            WireType::StartGroup => {
                if depth == 0 {
                    return Err(self.error(DecodeErrorKind::RecursionLimitExceeded));
                }
                loop {
                    if self.is_empty() {
                        return Err(self.error(DecodeErrorKind::Truncated));
                    }
                    let tag_offset = self.offset();
                    let (inner_number, inner_wire_type) = self.read_tag()?;
                    if inner_wire_type == WireType::EndGroup {
                        if inner_number != number {
                            return Err(DecodeError::new(
                                DecodeErrorKind::UnexpectedEndGroup,
                                tag_offset,
                            ));
                        }
                        break;
                    }
                    self.skip_field(inner_number, inner_wire_type, depth - 1)?;
                }
            }
            WireType::EndGroup => return Err(self.error(DecodeErrorKind::UnexpectedEndGroup)),
        }
        Ok(())
    }
}

/// Gets the wire type used to encode a single value of `kind`.
pub(super) fn wire_type_of(kind: KindRef) -> WireType {
    match kind {
        KindRef::Double | KindRef::Fixed64 | KindRef::Sfixed64 => WireType::SixtyFourBit,
        KindRef::Float | KindRef::Fixed32 | KindRef::Sfixed32 => WireType::ThirtyTwoBit,
        KindRef::Int32
        | KindRef::Int64
        | KindRef::Uint32
        | KindRef::Uint64
        | KindRef::Sint32
        | KindRef::Sint64
        | KindRef::Bool
        | KindRef::Enum(_) => WireType::Varint,
        KindRef::String | KindRef::Bytes | KindRef::Message(_) => WireType::LengthDelimited,
        KindRef::Group(_) => WireType::StartGroup,
    }
}

pub(super) fn encode_zigzag32(value: i32) -> u64 {
    ((value << 1) ^ (value >> 31)) as u32 as u64
}

pub(super) fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

pub(super) fn decode_zigzag32(value: u64) -> i32 {
    let value = value as u32;
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

pub(super) fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
