use std::{collections::HashMap, error::Error, fmt};

use crate::{DescriptorPool, ExtensionDescriptor};

/// A set of extension fields which the decoder recognizes, keyed by the full name of the message
/// they extend and their field number.
///
/// A registry can be passed to the decoder through
/// [`DecodeOptions::extension_registry`][crate::DecodeOptions::extension_registry]. Extension
/// fields found in the input but not in the registry are kept as unknown fields.
#[derive(Debug, Default, Clone)]
pub struct ExtensionRegistry {
    extensions: HashMap<(Box<str>, u32), ExtensionDescriptor>,
}

/// Error returned when an extension cannot be added to an [`ExtensionRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// A different extension is already registered for the same message and field number.
    ConflictingRegistration {
        /// The full name of the extended message.
        message: String,
        /// The field number.
        number: u32,
        /// The full name of the extension already in the registry.
        existing: String,
    },
}

impl ExtensionRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        ExtensionRegistry::default()
    }

    /// Creates a registry containing every extension defined in `pool`.
    ///
    /// A pool never holds two extensions of one message with the same number, so each extension
    /// gets a key of its own.
    pub fn from_pool(pool: &DescriptorPool) -> Self {
        let extensions = pool
            .all_extensions()
            .map(|extension| {
                let key = (extension.containing_message().full_name().into(), extension.number());
                (key, extension)
            })
            .collect();
        ExtensionRegistry { extensions }
    }

    /// Adds an extension, keyed by its containing message and number.
    ///
    /// See [`insert`][Self::insert] for details.
    pub fn register(&mut self, extension: ExtensionDescriptor) -> Result<(), RegistrationError> {
        let message = extension.containing_message();
        let number = extension.number();
        self.insert(message.full_name(), number, extension)
    }

    /// Adds an extension under the given message name and field number.
    ///
    /// Inserting the same descriptor twice is a no-op. Returns
    /// [`RegistrationError::ConflictingRegistration`] if a different extension is already
    /// registered for the key, in which case the registry is unchanged.
    pub fn insert(
        &mut self,
        message: &str,
        number: u32,
        extension: ExtensionDescriptor,
    ) -> Result<(), RegistrationError> {
        match self.extensions.get(&(Box::from(message), number)) {
            Some(existing) if *existing == extension => Ok(()),
            Some(existing) => {
                tracing::debug!(
                    message,
                    number,
                    existing = existing.full_name(),
                    extension = extension.full_name(),
                    "conflicting extension registration"
                );
                Err(RegistrationError::ConflictingRegistration {
                    message: message.to_owned(),
                    number,
                    existing: existing.full_name().to_owned(),
                })
            }
            None => {
                self.extensions.insert((message.into(), number), extension);
                Ok(())
            }
        }
    }

    /// Gets the extension registered for the given message name and field number.
    pub fn lookup(&self, message: &str, number: u32) -> Option<&ExtensionDescriptor> {
        self.extensions.get(&(Box::from(message), number))
    }

    /// Gets the number of registered extensions.
    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    /// Returns `true` if no extensions are registered.
    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Gets an iterator over the registered extensions, in an unspecified order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ExtensionDescriptor> + '_ {
        self.extensions.values()
    }
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::ConflictingRegistration {
                message,
                number,
                existing,
            } => write!(
                f,
                "extension number {} of '{}' is already registered as '{}'",
                number, message, existing
            ),
        }
    }
}

impl Error for RegistrationError {}

#[cfg(test)]
mod tests {
    use prost_types::{
        field_descriptor_proto::{Label, Type},
        DescriptorProto, FieldDescriptorProto, FileDescriptorProto,
    };

    use super::*;

    fn pool() -> DescriptorPool {
        let extension = |name: &str, number: i32| FieldDescriptorProto {
            name: Some(name.to_owned()),
            number: Some(number),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::Int32 as i32),
            extendee: Some(".pkg.Extendee".to_owned()),
            ..Default::default()
        };

        DescriptorPool::from_file_descriptor_set(prost_types::FileDescriptorSet {
            file: vec![FileDescriptorProto {
                name: Some("ext.proto".to_owned()),
                package: Some("pkg".to_owned()),
                message_type: vec![DescriptorProto {
                    name: Some("Extendee".to_owned()),
                    extension_range: vec![prost_types::descriptor_proto::ExtensionRange {
                        start: Some(100),
                        end: Some(200),
                        ..Default::default()
                    }],
                    ..Default::default()
                }],
                extension: vec![extension("first", 100), extension("second", 101)],
                ..Default::default()
            }],
        })
        .unwrap()
    }

    #[test]
    fn from_pool_registers_all_extensions() {
        let registry = ExtensionRegistry::from_pool(&pool());
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
        assert_eq!(
            registry.lookup("pkg.Extendee", 100).unwrap().full_name(),
            "pkg.first"
        );
        assert!(registry.lookup("pkg.Extendee", 102).is_none());
        assert!(registry.lookup("pkg.Other", 100).is_none());
    }

    #[test]
    fn same_descriptor_is_no_op() {
        let pool = pool();
        let first = pool.get_extension_by_name("pkg.first").unwrap();

        let mut registry = ExtensionRegistry::new();
        registry.register(first.clone()).unwrap();
        registry.register(first).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn conflicting_registration() {
        let pool = pool();
        let first = pool.get_extension_by_name("pkg.first").unwrap();
        let second = pool.get_extension_by_name("pkg.second").unwrap();

        let mut registry = ExtensionRegistry::new();
        registry.register(first).unwrap();
        let err = registry.insert("pkg.Extendee", 100, second).unwrap_err();
        assert_eq!(
            err.to_string(),
            "extension number 100 of 'pkg.Extendee' is already registered as 'pkg.first'"
        );
        assert_eq!(
            registry.lookup("pkg.Extendee", 100).unwrap().full_name(),
            "pkg.first"
        );
    }
}
