use std::{error::Error, fmt};

/// An error that may occur while decoding a message from the binary wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    kind: DecodeErrorKind,
    offset: usize,
}

/// An error that may occur while encoding a message, if the buffer is too small.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeError {
    required: usize,
    remaining: usize,
}

/// The category of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// The input ended in the middle of a record, or a group was not terminated.
    Truncated,
    /// A varint was longer than ten bytes, or overflowed 64 bits.
    InvalidVarint,
    /// A string field which validates UTF-8 contained invalid UTF-8.
    InvalidUtf8,
    /// Messages or groups were nested more deeply than the configured recursion limit.
    RecursionLimitExceeded,
    /// A tag used wire type 6 or 7.
    UnknownWireType,
    /// A tag had field number zero, or a field number larger than the maximum.
    InvalidFieldNumber,
    /// An end-group tag did not match the group being decoded, or appeared outside a group.
    UnexpectedEndGroup,
}

impl DecodeError {
    pub(super) fn new(kind: DecodeErrorKind, offset: usize) -> Self {
        DecodeError { kind, offset }
    }

    /// Gets the category of this error.
    pub fn kind(&self) -> DecodeErrorKind {
        self.kind
    }

    /// Gets the byte offset into the input at which the problem was found.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.kind, self.offset)
    }
}

impl Error for DecodeError {}

impl EncodeError {
    pub(super) fn new(required: usize, remaining: usize) -> Self {
        EncodeError {
            required,
            remaining,
        }
    }

    /// The number of bytes needed to encode the message.
    pub fn required_capacity(&self) -> usize {
        self.required
    }

    /// The number of bytes that were available in the buffer.
    pub fn remaining(&self) -> usize {
        self.remaining
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "insufficient buffer capacity (required: {}, remaining: {})",
            self.required, self.remaining
        )
    }
}

impl Error for EncodeError {}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::Truncated => write!(f, "unexpected end of input"),
            DecodeErrorKind::InvalidVarint => write!(f, "invalid varint"),
            DecodeErrorKind::InvalidUtf8 => write!(f, "invalid UTF-8 in string field"),
            DecodeErrorKind::RecursionLimitExceeded => write!(f, "recursion limit exceeded"),
            DecodeErrorKind::UnknownWireType => write!(f, "unknown wire type"),
            DecodeErrorKind::InvalidFieldNumber => write!(f, "invalid field number"),
            DecodeErrorKind::UnexpectedEndGroup => write!(f, "unexpected end group tag"),
        }
    }
}
