//! Resolution of protobuf editions features.
//!
//! Every file, message, oneof, field, extension and enum carries a fully resolved [`FeatureSet`],
//! computed once when its file is added to a [`DescriptorPool`][crate::DescriptorPool]. Values
//! are inherited from the enclosing scope (field, then oneof, then the innermost message outwards,
//! then the file) and finally from the defaults of the file's edition. Files using the
//! `proto2` or `proto3` syntax are mapped onto the same model.

use std::fmt;

use crate::descriptor::types;

/// A protobuf edition, or one of the legacy syntaxes expressed as an edition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Edition {
    /// Files using `syntax = "proto2"`.
    Proto2,
    /// Files using `syntax = "proto3"`.
    Proto3,
    /// Edition 2023.
    Edition2023,
    /// Edition 2024.
    Edition2024,
}

/// Whether a singular field tracks presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldPresence {
    /// Presence is tracked; an unset field is distinguishable from one set to its default.
    Explicit,
    /// Presence is not tracked; a field at its default value is treated as unset.
    Implicit,
    /// The field is `required` (proto2 semantics).
    LegacyRequired,
}

/// Whether an enum accepts values it does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumType {
    /// Any 32-bit value is accepted.
    Open,
    /// Undeclared values are routed to the unknown field set during decoding.
    Closed,
}

/// How repeated scalar fields are written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepeatedFieldEncoding {
    /// All elements are written in a single length-delimited record.
    Packed,
    /// Each element is written as its own record.
    Expanded,
}

/// Whether `string` fields are checked for valid UTF-8 when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Utf8Validation {
    /// Invalid UTF-8 is a decode error.
    Verify,
    /// Invalid UTF-8 is accepted.
    None,
}

/// How message-typed fields are written on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageEncoding {
    /// A length-prefixed record.
    LengthPrefixed,
    /// A group delimited by start and end tags.
    Delimited,
}

/// Whether the JSON mapping is guaranteed to be well-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonFormat {
    /// JSON conflicts are rejected.
    Allow,
    /// JSON is supported on a best-effort basis.
    LegacyBestEffort,
}

/// A fully resolved set of editions features.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureSet {
    field_presence: FieldPresence,
    enum_type: EnumType,
    repeated_field_encoding: RepeatedFieldEncoding,
    utf8_validation: Utf8Validation,
    message_encoding: MessageEncoding,
    json_format: JsonFormat,
}

/// A feature value that could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InvalidFeature {
    pub name: &'static str,
    pub value: i32,
}

impl Edition {
    /// Returns the value of the `google.protobuf.Edition` enum corresponding to this edition.
    pub fn as_i32(self) -> i32 {
        match self {
            Edition::Proto2 => 998,
            Edition::Proto3 => 999,
            Edition::Edition2023 => 1000,
            Edition::Edition2024 => 1001,
        }
    }

    /// Gets the edition with the given `google.protobuf.Edition` value, or `None` if it is not
    /// supported.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            998 => Some(Edition::Proto2),
            999 => Some(Edition::Proto3),
            1000 => Some(Edition::Edition2023),
            1001 => Some(Edition::Edition2024),
            _ => None,
        }
    }

    /// Whether this edition uses the `editions` syntax rather than a legacy syntax.
    pub fn is_editions(self) -> bool {
        matches!(self, Edition::Edition2023 | Edition::Edition2024)
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edition::Proto2 => f.write_str("proto2"),
            Edition::Proto3 => f.write_str("proto3"),
            Edition::Edition2023 => f.write_str("2023"),
            Edition::Edition2024 => f.write_str("2024"),
        }
    }
}

impl FeatureSet {
    /// Gets the default features for the given edition.
    pub const fn edition_defaults(edition: Edition) -> Self {
        match edition {
            Edition::Proto2 => FeatureSet {
                field_presence: FieldPresence::Explicit,
                enum_type: EnumType::Closed,
                repeated_field_encoding: RepeatedFieldEncoding::Expanded,
                utf8_validation: Utf8Validation::None,
                message_encoding: MessageEncoding::LengthPrefixed,
                json_format: JsonFormat::LegacyBestEffort,
            },
            Edition::Proto3 => FeatureSet {
                field_presence: FieldPresence::Implicit,
                enum_type: EnumType::Open,
                repeated_field_encoding: RepeatedFieldEncoding::Packed,
                utf8_validation: Utf8Validation::Verify,
                message_encoding: MessageEncoding::LengthPrefixed,
                json_format: JsonFormat::Allow,
            },
            Edition::Edition2023 | Edition::Edition2024 => FeatureSet {
                field_presence: FieldPresence::Explicit,
                enum_type: EnumType::Open,
                repeated_field_encoding: RepeatedFieldEncoding::Packed,
                utf8_validation: Utf8Validation::Verify,
                message_encoding: MessageEncoding::LengthPrefixed,
                json_format: JsonFormat::Allow,
            },
        }
    }

    /// Gets the `field_presence` feature.
    pub fn field_presence(&self) -> FieldPresence {
        self.field_presence
    }

    /// Gets the `enum_type` feature.
    pub fn enum_type(&self) -> EnumType {
        self.enum_type
    }

    /// Gets the `repeated_field_encoding` feature.
    pub fn repeated_field_encoding(&self) -> RepeatedFieldEncoding {
        self.repeated_field_encoding
    }

    /// Gets the `utf8_validation` feature.
    pub fn utf8_validation(&self) -> Utf8Validation {
        self.utf8_validation
    }

    /// Gets the `message_encoding` feature.
    pub fn message_encoding(&self) -> MessageEncoding {
        self.message_encoding
    }

    /// Gets the `json_format` feature.
    pub fn json_format(&self) -> JsonFormat {
        self.json_format
    }

    pub(crate) fn with_field_presence(mut self, value: FieldPresence) -> Self {
        self.field_presence = value;
        self
    }

    pub(crate) fn with_repeated_field_encoding(mut self, value: RepeatedFieldEncoding) -> Self {
        self.repeated_field_encoding = value;
        self
    }

    pub(crate) fn with_message_encoding(mut self, value: MessageEncoding) -> Self {
        self.message_encoding = value;
        self
    }

    /// Applies the features explicitly set in `overrides` on top of `self`.
    pub(crate) fn merge(&self, overrides: &types::FeatureSet) -> Result<Self, InvalidFeature> {
        let mut result = *self;

        if let Some(value) = overrides.field_presence {
            result.field_presence = match value {
                1 => FieldPresence::Explicit,
                2 => FieldPresence::Implicit,
                3 => FieldPresence::LegacyRequired,
                _ => return Err(InvalidFeature::new("field_presence", value)),
            };
        }
        if let Some(value) = overrides.enum_type {
            result.enum_type = match value {
                1 => EnumType::Open,
                2 => EnumType::Closed,
                _ => return Err(InvalidFeature::new("enum_type", value)),
            };
        }
        if let Some(value) = overrides.repeated_field_encoding {
            result.repeated_field_encoding = match value {
                1 => RepeatedFieldEncoding::Packed,
                2 => RepeatedFieldEncoding::Expanded,
                _ => return Err(InvalidFeature::new("repeated_field_encoding", value)),
            };
        }
        if let Some(value) = overrides.utf8_validation {
            result.utf8_validation = match value {
                2 => Utf8Validation::Verify,
                3 => Utf8Validation::None,
                _ => return Err(InvalidFeature::new("utf8_validation", value)),
            };
        }
        if let Some(value) = overrides.message_encoding {
            result.message_encoding = match value {
                1 => MessageEncoding::LengthPrefixed,
                2 => MessageEncoding::Delimited,
                _ => return Err(InvalidFeature::new("message_encoding", value)),
            };
        }
        if let Some(value) = overrides.json_format {
            result.json_format = match value {
                1 => JsonFormat::Allow,
                2 => JsonFormat::LegacyBestEffort,
                _ => return Err(InvalidFeature::new("json_format", value)),
            };
        }

        Ok(result)
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureSet")
            .field("field_presence", &self.field_presence)
            .field("enum_type", &self.enum_type)
            .field("repeated_field_encoding", &self.repeated_field_encoding)
            .field("utf8_validation", &self.utf8_validation)
            .field("message_encoding", &self.message_encoding)
            .field("json_format", &self.json_format)
            .finish()
    }
}

impl InvalidFeature {
    fn new(name: &'static str, value: i32) -> Self {
        InvalidFeature { name, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_syntax_defaults() {
        let proto2 = FeatureSet::edition_defaults(Edition::Proto2);
        assert_eq!(proto2.field_presence(), FieldPresence::Explicit);
        assert_eq!(proto2.enum_type(), EnumType::Closed);
        assert_eq!(
            proto2.repeated_field_encoding(),
            RepeatedFieldEncoding::Expanded
        );
        assert_eq!(proto2.utf8_validation(), Utf8Validation::None);

        let proto3 = FeatureSet::edition_defaults(Edition::Proto3);
        assert_eq!(proto3.field_presence(), FieldPresence::Implicit);
        assert_eq!(proto3.enum_type(), EnumType::Open);
        assert_eq!(proto3.repeated_field_encoding(), RepeatedFieldEncoding::Packed);
        assert_eq!(proto3.utf8_validation(), Utf8Validation::Verify);
    }

    #[test]
    fn merge_overrides_only_set_values() {
        let base = FeatureSet::edition_defaults(Edition::Edition2023);
        let merged = base
            .merge(&types::FeatureSet {
                enum_type: Some(2),
                repeated_field_encoding: Some(2),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(merged.enum_type(), EnumType::Closed);
        assert_eq!(
            merged.repeated_field_encoding(),
            RepeatedFieldEncoding::Expanded
        );
        assert_eq!(merged.field_presence(), base.field_presence());
        assert_eq!(merged.utf8_validation(), base.utf8_validation());
    }

    #[test]
    fn merge_rejects_unknown_values() {
        let base = FeatureSet::edition_defaults(Edition::Edition2024);
        let err = base
            .merge(&types::FeatureSet {
                utf8_validation: Some(1),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            InvalidFeature {
                name: "utf8_validation",
                value: 1
            }
        );
    }

    #[test]
    fn edition_numbers() {
        for edition in [
            Edition::Proto2,
            Edition::Proto3,
            Edition::Edition2023,
            Edition::Edition2024,
        ] {
            assert_eq!(Edition::from_i32(edition.as_i32()), Some(edition));
        }
        assert_eq!(Edition::from_i32(900), None);
    }
}
