//! Adding files to a pool. A batch is walked twice: the first pass records every name and the
//! definitions that need no lookups, the second resolves type references, imports and numbers.
//! If either pass reports a problem, the pool is truncated back to where it was before the batch.

mod names;
mod resolve;
mod visit;

use std::{iter, sync::Arc};

use prost::Message;

use crate::{
    descriptor::{
        def_index,
        error::{Issue, Label, Problem},
        features::FeatureSet,
        types::{self, FileDescriptorProto},
        EnumIndex, ExtensionIndex, FileIndex, MessageIndex, PoolData, ServiceIndex, Symbol,
        SymbolKind,
    },
    DescriptorError, DescriptorPool,
};

use self::visit::{walk, Site};

/// The length of each pool table before a batch was added.
#[derive(Clone, Copy)]
struct Watermark {
    files: FileIndex,
    messages: MessageIndex,
    enums: EnumIndex,
    services: ServiceIndex,
    extensions: ExtensionIndex,
}

impl Watermark {
    fn of(data: &PoolData) -> Self {
        Watermark {
            files: def_index(data.files.len()),
            messages: def_index(data.messages.len()),
            enums: def_index(data.enums.len()),
            services: def_index(data.services.len()),
            extensions: def_index(data.extensions.len()),
        }
    }

    fn restore(self, data: &mut PoolData) {
        data.files.truncate(self.files as usize);
        data.messages.truncate(self.messages as usize);
        data.enums.truncate(self.enums as usize);
        data.services.truncate(self.services as usize);
        data.extensions.truncate(self.extensions as usize);

        data.symbols.retain(|_, symbol| symbol.file < self.files);
        data.file_names.retain(|_, &mut file| file < self.files);
        for message in &mut data.messages {
            message.extensions.retain(|&ext| ext < self.extensions);
        }
    }
}

impl DescriptorPool {
    pub(super) fn build_files<I>(&mut self, files: I) -> Result<(), DescriptorError>
    where
        I: IntoIterator<Item = FileDescriptorProto>,
    {
        let mark = Watermark::of(&self.data);

        // A file identical to one already added is skipped. A different file under a taken name
        // is left in so the first pass can report it.
        let mut batch: Vec<FileDescriptorProto> = Vec::new();
        for file in files {
            let known = match self.data.file_names.get(file.name()) {
                Some(&index) => Some(&self.data.files[index as usize].proto),
                None => batch.iter().find(|f| f.name() == file.name()),
            };
            if known != Some(&file) {
                batch.push(file);
            }
        }
        if batch.is_empty() {
            return Ok(());
        }

        let data = Arc::make_mut(&mut self.data);
        match build(data, mark, &batch) {
            Ok(()) => {
                tracing::debug!(
                    files = batch.len(),
                    total = data.files.len(),
                    "added files to descriptor pool"
                );
                Ok(())
            }
            Err(err) => {
                tracing::debug!(error = %err, files = batch.len(), "discarding rejected files");
                mark.restore(data);
                Err(err)
            }
        }
    }
}

fn build(
    data: &mut PoolData,
    mark: Watermark,
    batch: &[FileDescriptorProto],
) -> Result<(), DescriptorError> {
    let mut pass = Pass::new(data);
    walk(mark, batch, |site, def| pass.collect(site, def));
    pass.finish()?;

    let mut pass = Pass::new(data);
    walk(mark, batch, |site, def| pass.resolve(site, def));
    pass.check_map_entries(mark);
    pass.finish()?;

    for file in &mut data.files[mark.files as usize..] {
        file.interop = prost_types::FileDescriptorProto::decode(file.proto.encode_to_vec().as_slice())
            .unwrap_or_default();
    }
    Ok(())
}

/// One walk over a batch, accumulating problems instead of stopping at the first.
struct Pass<'a> {
    data: &'a mut PoolData,
    problems: Vec<Problem>,
}

impl<'a> Pass<'a> {
    fn new(data: &'a mut PoolData) -> Self {
        Pass {
            data,
            problems: Vec::new(),
        }
    }

    fn finish(self) -> Result<(), DescriptorError> {
        if self.problems.is_empty() {
            Ok(())
        } else {
            Err(DescriptorError::new(self.problems))
        }
    }

    fn label(&self, file: FileIndex, path: &[i32], tail: &[i32], message: &'static str) -> Label {
        Label::new(&self.data.files, file, join(path, tail), message)
    }

    fn file_name(&self, file: FileIndex) -> &str {
        self.data.files[file as usize].proto.name()
    }

    /// The features of the innermost enclosing message, or of the file at top level.
    fn scope_features(&self, file: FileIndex, parent: Option<MessageIndex>) -> FeatureSet {
        match parent {
            Some(parent) => self.data.messages[parent as usize].features,
            None => self.data.files[file as usize].features,
        }
    }

    /// Applies the features written on a definition over those it inherits. On error the
    /// inherited set is kept so the rest of the pass can continue.
    fn features(
        &mut self,
        file: FileIndex,
        inherited: FeatureSet,
        raw: Option<&types::FeatureSet>,
        path: &[i32],
        tail: &[i32],
    ) -> FeatureSet {
        let Some(raw) = raw else {
            return inherited;
        };

        let issue = if !self.data.files[file as usize].edition.is_editions() {
            Issue::FeaturesOutsideEditions
        } else {
            match inherited.merge(raw) {
                Ok(features) => return features,
                Err(err) => Issue::InvalidFeature {
                    name: err.name,
                    value: err.value,
                },
            }
        };
        let at = self.label(file, path, tail, "found here");
        self.problems.push(issue.at(at));
        inherited
    }

    /// Looks `name` up from the scope of `site`, recording a problem if it cannot be used.
    fn resolve_name(
        &mut self,
        site: &Site<'_>,
        name: &str,
        tail: i32,
        expect: Expect,
    ) -> Option<SymbolKind> {
        let at = || self.label(site.file, site.path, &[tail], "found here");
        let problem = match lookup(self.data, site.file, site.full_name, name, expect) {
            Lookup::Found(symbol) => return Some(symbol.kind),
            Lookup::WrongKind(found, symbol) => {
                let defined =
                    Label::new(&self.data.files, symbol.file, symbol.path.clone(), "defined here");
                Issue::WrongKind {
                    name: found,
                    expected: expect.describe(),
                }
                .at(at())
                .related(defined)
            }
            Lookup::NotVisible(found, file) => {
                let help = format!(
                    "'{}' is defined in '{}', which is not imported by '{}'",
                    found,
                    self.file_name(file),
                    self.file_name(site.file)
                );
                Issue::NameNotFound(found).at(at()).help(help)
            }
            Lookup::Missing => Issue::NameNotFound(name.to_owned()).at(at()),
        };
        self.problems.push(problem);
        None
    }
}

/// What a type reference is allowed to name.
#[derive(Clone, Copy)]
enum Expect {
    Message,
    FieldType,
}

impl Expect {
    fn accepts(self, kind: SymbolKind) -> bool {
        match self {
            Expect::Message => matches!(kind, SymbolKind::Message(_)),
            Expect::FieldType => matches!(kind, SymbolKind::Message(_) | SymbolKind::Enum(_)),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Expect::Message => "a message type",
            Expect::FieldType => "a message or enum type",
        }
    }
}

enum Lookup<'a> {
    Found(&'a Symbol),
    WrongKind(String, &'a Symbol),
    NotVisible(String, FileIndex),
    Missing,
}

/// Resolves a possibly relative name the way protoc does: an absolute name (leading `.`) is
/// used as is, otherwise the name is tried in each enclosing scope from the innermost outwards.
/// The first usable match wins; failing that, the first candidate that exists but cannot be used
/// explains the failure.
fn lookup<'a>(
    data: &'a PoolData,
    file: FileIndex,
    scope: &str,
    name: &str,
    expect: Expect,
) -> Lookup<'a> {
    let visible = &data.files[file as usize].visible;

    let mut failure = Lookup::Missing;
    for candidate in candidates(scope, name) {
        let Some(symbol) = data.symbols.get(candidate.as_str()) else {
            continue;
        };
        let result = if !visible.contains(&symbol.file) {
            Lookup::NotVisible(candidate, symbol.file)
        } else if !expect.accepts(symbol.kind) {
            Lookup::WrongKind(candidate, symbol)
        } else {
            return Lookup::Found(symbol);
        };
        if matches!(failure, Lookup::Missing) {
            failure = result;
        }
    }
    failure
}

fn candidates<'a>(scope: &'a str, name: &'a str) -> impl Iterator<Item = String> + 'a {
    let mut absolute = name.strip_prefix('.');
    let mut prefix = match absolute {
        Some(_) => None,
        None => Some(scope),
    };

    iter::from_fn(move || {
        if let Some(full_name) = absolute.take() {
            return Some(full_name.to_owned());
        }

        let current = prefix?;
        if current.is_empty() {
            prefix = None;
            return Some(name.to_owned());
        }
        prefix = Some(current.rfind('.').map_or("", |dot| &current[..dot]));
        Some(format!("{}.{}", current, name))
    })
}

fn join(path: &[i32], tail: &[i32]) -> Box<[i32]> {
    [path, tail].concat().into_boxed_slice()
}

/// Computes the default JSON name of a field: underscores are dropped and the letter after each
/// one is uppercased.
fn to_json_name(name: &str) -> String {
    let mut json_name = String::with_capacity(name.len());
    let mut upper = false;
    for ch in name.chars() {
        match ch {
            '_' => upper = true,
            ch if upper => {
                json_name.push(ch.to_ascii_uppercase());
                upper = false;
            }
            ch => json_name.push(ch),
        }
    }
    json_name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_name_candidates() {
        let names: Vec<_> = candidates("pkg.Outer.field", "Inner").collect();
        assert_eq!(
            names,
            ["pkg.Outer.field.Inner", "pkg.Outer.Inner", "pkg.Inner", "Inner"]
        );
    }

    #[test]
    fn absolute_name_candidates() {
        let names: Vec<_> = candidates("pkg.Outer", ".other.Type").collect();
        assert_eq!(names, ["other.Type"]);
    }

    #[test]
    fn json_names() {
        assert_eq!(to_json_name("foo_bar_baz"), "fooBarBaz");
        assert_eq!(to_json_name("already"), "already");
        assert_eq!(to_json_name("trailing_"), "trailing");
    }
}
