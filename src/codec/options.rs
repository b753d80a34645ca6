use crate::ExtensionRegistry;

/// The default maximum nesting depth of messages and groups accepted by the decoder.
const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Options to control decoding of messages from the binary wire format.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions<'a> {
    recursion_limit: u32,
    registry: Option<&'a ExtensionRegistry>,
}

/// Options to control encoding of messages to the binary wire format.
#[derive(Debug, Clone, Copy)]
pub struct EncodeOptions {
    deterministic: bool,
}

impl<'a> DecodeOptions<'a> {
    /// Creates a new instance of [`DecodeOptions`] with the default options.
    pub const fn new() -> Self {
        DecodeOptions {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            registry: None,
        }
    }

    /// The maximum depth of nested messages and groups.
    ///
    /// Input nested more deeply fails with
    /// [`RecursionLimitExceeded`][crate::DecodeErrorKind::RecursionLimitExceeded].
    ///
    /// The default value is `100`.
    pub const fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// The registry used to find extension fields.
    ///
    /// A field whose number is not declared by the message but falls inside one of its extension
    /// ranges is decoded as an extension if the registry has an entry for it, and kept as an
    /// unknown field otherwise.
    ///
    /// By default no registry is used, so all extensions are kept as unknown fields.
    pub const fn extension_registry(mut self, registry: &'a ExtensionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub(super) fn get_recursion_limit(&self) -> u32 {
        self.recursion_limit
    }

    pub(super) fn registry(&self) -> Option<&'a ExtensionRegistry> {
        self.registry
    }
}

impl Default for DecodeOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeOptions {
    /// Creates a new instance of [`EncodeOptions`] with the default options.
    pub const fn new() -> Self {
        EncodeOptions {
            deterministic: false,
        }
    }

    /// Whether to produce the same bytes for equal messages.
    ///
    /// When enabled, fields are written in ascending field number order and map entries are
    /// sorted by key. Otherwise fields are written in declaration order and map entries in an
    /// unspecified order.
    ///
    /// The default value is `false`.
    pub const fn deterministic(mut self, yes: bool) -> Self {
        self.deterministic = yes;
        self
    }

    pub(super) fn is_deterministic(&self) -> bool {
        self.deterministic
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::new()
    }
}
