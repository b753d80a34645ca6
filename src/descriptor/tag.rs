//! Field numbers within `google/protobuf/descriptor.proto`. Source locations and error labels
//! address definitions by paths made of these numbers and element indices.

pub(crate) const FILE_PACKAGE: i32 = 2;
pub(crate) const FILE_DEPENDENCY: i32 = 3;
pub(crate) const FILE_MESSAGE_TYPE: i32 = 4;
pub(crate) const FILE_ENUM_TYPE: i32 = 5;
pub(crate) const FILE_SERVICE: i32 = 6;
pub(crate) const FILE_EXTENSION: i32 = 7;
pub(crate) const FILE_OPTIONS: i32 = 8;
pub(crate) const FILE_SYNTAX: i32 = 12;
pub(crate) const FILE_EDITION: i32 = 14;
pub(crate) const FILE_OPTIONS_FEATURES: i32 = 50;

pub(crate) const MESSAGE_NAME: i32 = 1;
pub(crate) const MESSAGE_FIELD: i32 = 2;
pub(crate) const MESSAGE_NESTED_TYPE: i32 = 3;
pub(crate) const MESSAGE_ENUM_TYPE: i32 = 4;
pub(crate) const MESSAGE_EXTENSION_RANGE: i32 = 5;
pub(crate) const MESSAGE_EXTENSION: i32 = 6;
pub(crate) const MESSAGE_OPTIONS: i32 = 7;
pub(crate) const MESSAGE_ONEOF_DECL: i32 = 8;
pub(crate) const MESSAGE_RESERVED_RANGE: i32 = 9;
pub(crate) const MESSAGE_OPTIONS_FEATURES: i32 = 12;

pub(crate) const FIELD_NAME: i32 = 1;
pub(crate) const FIELD_EXTENDEE: i32 = 2;
pub(crate) const FIELD_NUMBER: i32 = 3;
pub(crate) const FIELD_TYPE_NAME: i32 = 6;
pub(crate) const FIELD_DEFAULT_VALUE: i32 = 7;
pub(crate) const FIELD_OPTIONS: i32 = 8;
pub(crate) const FIELD_OPTIONS_FEATURES: i32 = 21;

pub(crate) const ONEOF_NAME: i32 = 1;
pub(crate) const ONEOF_OPTIONS: i32 = 2;
pub(crate) const ONEOF_OPTIONS_FEATURES: i32 = 1;

pub(crate) const ENUM_NAME: i32 = 1;
pub(crate) const ENUM_VALUE: i32 = 2;
pub(crate) const ENUM_OPTIONS: i32 = 3;
pub(crate) const ENUM_RESERVED_RANGE: i32 = 4;
pub(crate) const ENUM_OPTIONS_FEATURES: i32 = 7;

pub(crate) const ENUM_VALUE_NAME: i32 = 1;
pub(crate) const ENUM_VALUE_NUMBER: i32 = 2;

pub(crate) const SERVICE_NAME: i32 = 1;
pub(crate) const SERVICE_METHOD: i32 = 2;

pub(crate) const METHOD_NAME: i32 = 1;
pub(crate) const METHOD_INPUT_TYPE: i32 = 2;
pub(crate) const METHOD_OUTPUT_TYPE: i32 = 3;
