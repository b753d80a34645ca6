use std::{
    fmt,
    ops::{Range, RangeInclusive},
};

use crate::descriptor::{FileEntry, FileIndex};

/// The reason a batch of files could not be added to a [`DescriptorPool`][crate::DescriptorPool].
///
/// Building a pool reports every problem it finds rather than stopping at the first. The
/// accessors on this type describe the first problem; with the `miette` feature enabled, the rest
/// are available as related diagnostics.
#[derive(Debug)]
pub struct DescriptorError {
    problems: Box<[Problem]>,
    #[cfg(feature = "miette")]
    source: Option<String>,
}

/// The broad category of a [`DescriptorError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorErrorKind {
    /// Two different files, or two definitions, claim the same name.
    DuplicateName,
    /// An import or a referenced type is not available to the file that needs it.
    UnresolvedImport,
    /// Anything else that makes a file descriptor invalid.
    MalformedDescriptor,
}

/// One problem found while building, with the locations it refers to.
#[derive(Debug)]
pub(super) struct Problem {
    issue: Issue,
    at: Option<Label>,
    related: Option<Label>,
    #[cfg_attr(not(feature = "miette"), allow(dead_code))]
    help: Option<String>,
}

#[derive(Debug)]
pub(super) enum Issue {
    MissingField,
    UnknownSyntax(String),
    UnsupportedEdition(i32),
    FeaturesOutsideEditions,
    InvalidFeature { name: &'static str, value: i32 },
    InvalidFieldPresence(&'static str),
    DuplicateFile(String),
    ImportNotFound(String),
    ImportOutOfOrder(String),
    InvalidImportIndex,
    InvalidOneofIndex,
    InvalidMapEntry { name: String, reason: &'static str },
    DuplicateName(String),
    DuplicateFieldNumber(u32),
    DuplicateJsonName(String),
    NameNotFound(String),
    WrongKind { name: String, expected: &'static str },
    InvalidFieldNumber(i32),
    ReservedFieldNumber { number: i32, range: Range<i32> },
    FieldInExtensionRange { number: i32, range: Range<i32> },
    ExtensionOutOfRange { number: i32, message: String },
    InvalidDefault { value: String, kind: String },
    EmptyEnum,
    OpenEnumDefault,
    DuplicateEnumNumber(i32),
    ReservedEnumNumber { number: i32, range: RangeInclusive<i32> },
    Decode(prost::DecodeError),
}

/// A location in a file descriptor, optionally with a source span from its `SourceCodeInfo`.
#[derive(Debug)]
pub(super) struct Label {
    file: String,
    path: Box<[i32]>,
    span: Option<[i32; 4]>,
    #[cfg_attr(not(feature = "miette"), allow(dead_code))]
    message: &'static str,
    #[cfg(feature = "miette")]
    resolved: Option<miette::SourceSpan>,
}

impl DescriptorError {
    pub(super) fn new(problems: Vec<Problem>) -> DescriptorError {
        debug_assert!(!problems.is_empty());
        DescriptorError {
            problems: problems.into(),
            #[cfg(feature = "miette")]
            source: None,
        }
    }

    pub(super) fn decode_file_descriptor_set(err: prost::DecodeError) -> Self {
        DescriptorError::new(vec![Issue::Decode(err).into()])
    }

    /// The category of the first problem.
    pub fn kind(&self) -> DescriptorErrorKind {
        self.first().issue.kind()
    }

    /// Whether any of the problems falls into `kind`.
    pub fn has_kind(&self, kind: DescriptorErrorKind) -> bool {
        self.problems.iter().any(|p| p.issue.kind() == kind)
    }

    /// The name of the file the first problem was found in.
    pub fn file(&self) -> Option<&str> {
        self.first().at.as_ref().map(|l| l.file.as_str())
    }

    /// The 1-based line of the first problem, when the file carried source info.
    pub fn line(&self) -> Option<usize> {
        self.span().map(|s| s[0] as usize + 1)
    }

    /// The 1-based column of the first problem, when the file carried source info.
    pub fn column(&self) -> Option<usize> {
        self.span().map(|s| s[1] as usize + 1)
    }

    /// The location of the first problem as a descriptor path: alternating field numbers of
    /// [`FileDescriptorProto`][prost_types::FileDescriptorProto] and indices into repeated fields.
    pub fn path(&self) -> Option<&[i32]> {
        self.first().at.as_ref().map(|l| &*l.path)
    }

    /// Attaches the text of [`file()`][DescriptorError::file] so spans can be rendered.
    #[cfg(feature = "miette")]
    #[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
    pub fn with_source_code(mut self, source: &str) -> Self {
        let Some(file) = self.file().map(str::to_owned) else {
            return self;
        };

        for problem in self.problems.iter_mut() {
            for label in [&mut problem.at, &mut problem.related].into_iter().flatten() {
                label.resolve_span(&file, source);
            }
        }
        self.source = Some(source.to_owned());
        self
    }

    fn first(&self) -> &Problem {
        &self.problems[0]
    }

    fn span(&self) -> Option<[i32; 4]> {
        self.first().at.as_ref().and_then(|l| l.span)
    }
}

impl std::error::Error for DescriptorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.first().source()
    }
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.first().fmt(f)
    }
}

#[cfg(feature = "miette")]
#[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
impl miette::Diagnostic for DescriptorError {
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.first().help()
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source.as_ref().map(|s| s as &dyn miette::SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        self.first().labels()
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn miette::Diagnostic> + 'a>> {
        if self.problems.len() < 2 {
            return None;
        }
        Some(Box::new(
            self.problems[1..].iter().map(|p| p as &dyn miette::Diagnostic),
        ))
    }
}

impl Issue {
    pub(super) fn at(self, label: Label) -> Problem {
        Problem::from(self).at(label)
    }

    fn kind(&self) -> DescriptorErrorKind {
        match self {
            Issue::DuplicateFile(_) | Issue::DuplicateName(_) => DescriptorErrorKind::DuplicateName,
            Issue::ImportNotFound(_) | Issue::ImportOutOfOrder(_) | Issue::NameNotFound(_) => {
                DescriptorErrorKind::UnresolvedImport
            }
            _ => DescriptorErrorKind::MalformedDescriptor,
        }
    }
}

impl From<Issue> for Problem {
    fn from(issue: Issue) -> Self {
        Problem {
            issue,
            at: None,
            related: None,
            help: None,
        }
    }
}

impl Problem {
    pub(super) fn at(mut self, label: Label) -> Self {
        self.at = Some(label);
        self
    }

    pub(super) fn related(mut self, label: Label) -> Self {
        self.related = Some(label);
        self
    }

    pub(super) fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl std::error::Error for Problem {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.issue {
            Issue::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.issue {
            Issue::MissingField => {
                let path = self.at.as_ref().map_or(&[][..], |l| &l.path);
                write!(f, "missing required field at {:?}", path)
            }
            Issue::UnknownSyntax(syntax) => write!(f, "unknown syntax '{}'", syntax),
            Issue::UnsupportedEdition(edition) => write!(f, "unsupported edition '{}'", edition),
            Issue::FeaturesOutsideEditions => {
                f.write_str("features are only allowed in files using editions")
            }
            Issue::InvalidFeature { name, value } => {
                write!(f, "invalid value '{}' for feature '{}'", value, name)
            }
            Issue::InvalidFieldPresence(reason) => write!(f, "invalid field presence: {}", reason),
            Issue::DuplicateFile(name) => write!(
                f,
                "a different file named '{}' has already been added",
                name
            ),
            Issue::ImportNotFound(name) => {
                write!(f, "imported file '{}' has not been added", name)
            }
            Issue::ImportOutOfOrder(name) => write!(
                f,
                "imported file '{}' must be added before the files that import it",
                name
            ),
            Issue::InvalidImportIndex => f.write_str("invalid import index"),
            Issue::InvalidOneofIndex => f.write_str("invalid oneof index"),
            Issue::InvalidMapEntry { name, reason } => {
                write!(f, "invalid map entry type '{}': {}", name, reason)
            }
            Issue::DuplicateName(name) => match (&self.related, &self.at) {
                (Some(first), Some(second)) if first.file != second.file => write!(
                    f,
                    "name '{}' is already defined in file '{}'",
                    name, first.file
                ),
                _ => write!(f, "name '{}' is defined twice", name),
            },
            Issue::DuplicateFieldNumber(number) => {
                write!(f, "field number '{}' is already used", number)
            }
            Issue::DuplicateJsonName(name) => {
                write!(f, "a field with JSON name '{}' is already defined", name)
            }
            Issue::NameNotFound(name) => write!(f, "name '{}' is not defined", name),
            Issue::WrongKind { name, expected } => write!(f, "'{}' is not {}", name, expected),
            Issue::InvalidFieldNumber(number) => write!(f, "invalid field number '{}'", number),
            Issue::ReservedFieldNumber { number, range } => write!(
                f,
                "field number '{}' conflicts with reserved range '{} to {}'",
                number,
                range.start,
                range.end - 1
            ),
            Issue::FieldInExtensionRange { number, range } => write!(
                f,
                "field number '{}' conflicts with extension range '{} to {}'",
                number,
                range.start,
                range.end - 1
            ),
            Issue::ExtensionOutOfRange { number, message } => write!(
                f,
                "message '{}' does not define '{}' as an extension number",
                message, number
            ),
            Issue::InvalidDefault { value, kind } => {
                write!(f, "invalid default value '{}' for type '{}'", value, kind)
            }
            Issue::EmptyEnum => f.write_str("enums must have at least one value"),
            Issue::OpenEnumDefault => f.write_str("the first value of an open enum must be zero"),
            Issue::DuplicateEnumNumber(number) => {
                write!(f, "enum number '{}' has already been used", number)
            }
            Issue::ReservedEnumNumber { number, range } => write!(
                f,
                "enum number '{}' conflicts with reserved range '{} to {}'",
                number,
                range.start(),
                range.end()
            ),
            Issue::Decode(_) => f.write_str("failed to decode file descriptor set"),
        }
    }
}

#[cfg(feature = "miette")]
#[cfg_attr(docsrs, doc(cfg(feature = "miette")))]
impl miette::Diagnostic for Problem {
    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        if let Some(help) = &self.help {
            return Some(Box::new(help));
        }
        let text = match self.issue {
            Issue::UnknownSyntax(_) => "valid values are 'proto2', 'proto3' and 'editions'",
            Issue::UnsupportedEdition(_) => "supported editions are 2023 and 2024",
            Issue::DuplicateEnumNumber(_) => {
                "set the 'allow_alias' option to let enum values share a number"
            }
            _ => return None,
        };
        Some(Box::new(text))
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let spans: Vec<_> = [&self.at, &self.related]
            .into_iter()
            .flatten()
            .filter_map(Label::to_span)
            .collect();
        if spans.is_empty() {
            None
        } else {
            Some(Box::new(spans.into_iter()))
        }
    }
}

impl Label {
    pub(super) fn new(
        files: &[FileEntry],
        file: FileIndex,
        path: impl Into<Box<[i32]>>,
        message: &'static str,
    ) -> Self {
        let path = path.into();
        let proto = &files[file as usize].proto;

        let span = proto
            .source_code_info
            .iter()
            .flat_map(|info| &info.location)
            .find(|location| *location.path == *path)
            .and_then(|location| match location.span[..] {
                [line, start, end] => Some([line, start, line, end]),
                [start_line, start, end_line, end] => Some([start_line, start, end_line, end]),
                _ => None,
            });

        Label {
            file: proto.name.clone().unwrap_or_default(),
            path,
            span,
            message,
            #[cfg(feature = "miette")]
            resolved: None,
        }
    }

    #[cfg(feature = "miette")]
    fn resolve_span(&mut self, file: &str, source: &str) {
        let Some([start_line, start_col, end_line, end_col]) = self.span else {
            return;
        };
        if file != self.file {
            return;
        }

        let offset = |line: i32, col: i32| {
            miette::SourceOffset::from_location(
                source,
                line.saturating_add(1) as usize,
                col.saturating_add(1) as usize,
            )
            .offset()
        };
        let start = offset(start_line, start_col);
        let end = offset(end_line, end_col);
        self.resolved = Some(miette::SourceSpan::from(start..end));
    }

    #[cfg(feature = "miette")]
    fn to_span(&self) -> Option<miette::LabeledSpan> {
        self.resolved
            .filter(|span| !span.is_empty())
            .map(|span| miette::LabeledSpan::new_with_span(Some(self.message.to_owned()), span))
    }
}
