use prost::Message;

use crate::{Arena, DescriptorPool, DynamicMessage, MessageDescriptor};

/// A generated message type that can describe itself.
///
/// This connects [`prost`]'s generated types with the dynamic API: a value can be copied into a
/// [`DynamicMessage`] and back, going through the binary encoding.
pub trait ReflectMessage: Message {
    /// The descriptor of this message's type.
    fn descriptor(&self) -> MessageDescriptor;

    /// Copies this message into a new [`DynamicMessage`] in `arena`.
    ///
    /// # Panics
    ///
    /// Panics if [`descriptor`][ReflectMessage::descriptor] does not match the encoding of
    /// `self`.
    fn transcode_to_dynamic(&self, arena: &Arena) -> DynamicMessage
    where
        Self: Sized,
    {
        let mut message = DynamicMessage::new(self.descriptor(), arena);
        if let Err(err) = message.transcode_from(self) {
            panic!(
                "message does not match its descriptor '{}': {}",
                message.descriptor().full_name(),
                err
            );
        }
        message
    }

    /// Converts a [`DynamicMessage`] into this type, failing if its fields do not decode as
    /// `Self`.
    fn transcode_from_dynamic(dynamic: &DynamicMessage) -> Result<Self, prost::DecodeError>
    where
        Self: Sized + Default,
    {
        dynamic.transcode_to()
    }
}

impl<M: ReflectMessage> ReflectMessage for Box<M> {
    fn descriptor(&self) -> MessageDescriptor {
        M::descriptor(self)
    }
}

/// Implements [`ReflectMessage`] for [`prost_types`] messages by looking them up in the global
/// pool, which always holds the well-known types.
macro_rules! well_known {
    ($($ty:ident => $full_name:literal,)*) => {
        $(
            impl ReflectMessage for prost_types::$ty {
                fn descriptor(&self) -> MessageDescriptor {
                    DescriptorPool::global()
                        .get_message_by_name($full_name)
                        .unwrap_or_else(|| panic!("'{}' missing from the global pool", $full_name))
                }
            }
        )*

        #[cfg(test)]
        const WELL_KNOWN: &[&str] = &[$($full_name),*];
    };
}

well_known! {
    Any => "google.protobuf.Any",
    Duration => "google.protobuf.Duration",
    FieldMask => "google.protobuf.FieldMask",
    Timestamp => "google.protobuf.Timestamp",
}
