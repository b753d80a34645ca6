//! A reflective protobuf runtime built on [`prost`].
//!
//! This crate provides the pieces needed to work with protobuf messages whose types are only known
//! at runtime:
//!
//! * [`DescriptorPool`] loads file descriptors, resolves cross-file references and editions
//!   features, and indexes every definition by its fully-qualified name.
//! * [`MiniTable`][minitable::MiniTable] is the compact storage layout compiled, once, for each
//!   message type.
//! * [`DynamicMessage`] stores field values in an [`Arena`], laid out by the message's mini-table.
//! * The binary wire codec decodes into and encodes from dynamic messages, consulting an
//!   [`ExtensionRegistry`] for extension fields.
//!
//! # Example - decoding
//!
//! ```
//! use prost::Message;
//! use prost_runtime::{Arena, DynamicMessage, ReflectMessage};
//! use prost_types::Duration;
//!
//! let bytes = Duration { seconds: 5, nanos: 250 }.encode_to_vec();
//!
//! let arena = Arena::new();
//! let desc = Duration::default().descriptor();
//! let message = DynamicMessage::decode(desc, &bytes, &arena).unwrap();
//!
//! assert_eq!(message.get_field_by_name("seconds").unwrap().as_i64(), Some(5));
//! assert_eq!(message.encode_to_vec(), bytes);
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_debug_implementations, missing_docs)]
#![deny(unsafe_code)]

mod arena;
mod codec;
mod descriptor;
mod dynamic;
mod extension;
pub mod minitable;
mod reflect;

pub use {prost, prost::bytes, prost_types};

pub use self::arena::Arena;
pub use self::codec::{DecodeError, DecodeErrorKind, DecodeOptions, EncodeError, EncodeOptions};
pub use self::descriptor::{
    Cardinality, DescriptorError, DescriptorErrorKind, DescriptorPool, Edition, EnumDescriptor,
    EnumType, EnumValueDescriptor, ExtensionDescriptor, FeatureSet, FieldDescriptor,
    FieldPresence, FileDescriptor, JsonFormat, Kind, MessageDescriptor, MessageEncoding,
    MethodDescriptor, OneofDescriptor, RepeatedFieldEncoding, ServiceDescriptor, Syntax,
    Utf8Validation, WellKnownType,
};
pub use self::dynamic::{DynamicMessage, MapKey, SetFieldError, Value};
pub use self::extension::{ExtensionRegistry, RegistrationError};
pub use self::reflect::ReflectMessage;
