//! Encoding and decoding of dynamic messages in the protobuf binary wire format.

mod decode;
mod encode;
mod error;
mod options;
mod wire;

use prost::bytes::BufMut;

pub use self::{
    error::{DecodeError, DecodeErrorKind, EncodeError},
    options::{DecodeOptions, EncodeOptions},
};

use crate::{Arena, DynamicMessage, MessageDescriptor};

impl DynamicMessage {
    /// Decodes an instance of the message type specified by the [`MessageDescriptor`] from the
    /// buffer, allocating it in `arena`.
    pub fn decode(
        desc: MessageDescriptor,
        buf: &[u8],
        arena: &Arena,
    ) -> Result<Self, DecodeError> {
        DynamicMessage::decode_with_options(desc, buf, arena, &DecodeOptions::new())
    }

    /// Decodes an instance of the message type specified by the [`MessageDescriptor`] from the
    /// buffer, using the given options.
    pub fn decode_with_options(
        desc: MessageDescriptor,
        buf: &[u8],
        arena: &Arena,
        options: &DecodeOptions<'_>,
    ) -> Result<Self, DecodeError> {
        let mut message = DynamicMessage::new(desc, arena);
        message.merge_with_options(buf, options)?;
        Ok(message)
    }

    /// Merges the encoded message in `buf` into this message.
    ///
    /// Singular fields present in `buf` replace the current values, singular message fields are
    /// merged recursively, repeated fields are appended to and map entries are inserted.
    ///
    /// If an error is returned, the fields decoded before the error remain merged.
    pub fn merge(&mut self, buf: &[u8]) -> Result<(), DecodeError> {
        self.merge_with_options(buf, &DecodeOptions::new())
    }

    /// Merges the encoded message in `buf` into this message, using the given options.
    pub fn merge_with_options(
        &mut self,
        buf: &[u8],
        options: &DecodeOptions<'_>,
    ) -> Result<(), DecodeError> {
        let desc = self.descriptor();
        let ctx = decode::Context {
            arena: self.arena(),
            pool: desc.parent_pool(),
            registry: options.registry(),
        };

        let mut data = self.block().lock();
        let mut reader = wire::Reader::new(buf, 0);
        decode::merge_message(
            &mut reader,
            &mut data,
            &ctx,
            options.get_recursion_limit(),
            None,
        )
        .map_err(|err| {
            tracing::trace!(
                message = desc.full_name(),
                error = %err,
                "failed to decode message"
            );
            err
        })
    }

    /// Encodes this message into the buffer.
    ///
    /// Returns an error if the buffer does not have enough remaining capacity.
    pub fn encode<B>(&self, buf: &mut B) -> Result<(), EncodeError>
    where
        B: BufMut,
    {
        self.encode_with_options(buf, &EncodeOptions::new())
    }

    /// Encodes this message into the buffer, using the given options.
    pub fn encode_with_options<B>(
        &self,
        buf: &mut B,
        options: &EncodeOptions,
    ) -> Result<(), EncodeError>
    where
        B: BufMut,
    {
        let desc = self.descriptor();
        let ctx = encode::Context {
            pool: desc.parent_pool(),
            deterministic: options.is_deterministic(),
        };

        let data = self.block().lock();
        let required = encode::message_len(&data, &ctx);
        let remaining = buf.remaining_mut();
        if required > remaining {
            return Err(EncodeError::new(required, remaining));
        }
        encode::encode_message(&data, &ctx, buf);
        Ok(())
    }

    /// Encodes this message to a newly allocated buffer.
    pub fn encode_to_vec(&self) -> Vec<u8> {
        self.encode_to_vec_with_options(&EncodeOptions::new())
    }

    /// Encodes this message to a newly allocated buffer, using the given options.
    pub fn encode_to_vec_with_options(&self, options: &EncodeOptions) -> Vec<u8> {
        let desc = self.descriptor();
        let ctx = encode::Context {
            pool: desc.parent_pool(),
            deterministic: options.is_deterministic(),
        };

        let data = self.block().lock();
        let mut buf = Vec::with_capacity(encode::message_len(&data, &ctx));
        encode::encode_message(&data, &ctx, &mut buf);
        buf
    }

    /// Gets the number of bytes this message occupies when encoded.
    pub fn encoded_len(&self) -> usize {
        let desc = self.descriptor();
        let ctx = encode::Context {
            pool: desc.parent_pool(),
            deterministic: false,
        };
        encode::message_len(&self.block().lock(), &ctx)
    }
}
