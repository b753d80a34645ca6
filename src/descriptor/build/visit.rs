//! Depth-first traversal of a batch of files, assigning every definition its table index, its
//! descriptor path and its fully-qualified name.

use crate::descriptor::{
    build::Watermark,
    def_index, tag,
    types::{
        DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
        FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto,
    },
    DefIndex, EnumIndex, EnumValueIndex, ExtensionIndex, FieldIndex, FileIndex, MessageIndex,
    MethodIndex, OneofIndex, ServiceIndex,
};

/// Where the definition being visited lives.
pub(super) struct Site<'a> {
    pub file: FileIndex,
    pub path: &'a [i32],
    pub full_name: &'a str,
}

pub(super) enum Def<'a> {
    File(&'a FileDescriptorProto),
    Message {
        parent: Option<MessageIndex>,
        index: MessageIndex,
        proto: &'a DescriptorProto,
    },
    Oneof {
        message: MessageIndex,
        index: OneofIndex,
        proto: &'a OneofDescriptorProto,
    },
    Field {
        message: MessageIndex,
        index: FieldIndex,
        proto: &'a FieldDescriptorProto,
    },
    Extension {
        scope: Option<MessageIndex>,
        index: ExtensionIndex,
        proto: &'a FieldDescriptorProto,
    },
    Enum {
        parent: Option<MessageIndex>,
        index: EnumIndex,
        proto: &'a EnumDescriptorProto,
    },
    EnumValue {
        parent: EnumIndex,
        index: EnumValueIndex,
        proto: &'a EnumValueDescriptorProto,
    },
    Service {
        index: ServiceIndex,
        proto: &'a ServiceDescriptorProto,
    },
    Method {
        service: ServiceIndex,
        index: MethodIndex,
        proto: &'a MethodDescriptorProto,
    },
}

/// Calls `f` for every definition in `files`, parents before children. Table indices continue
/// from `mark`, so both build passes see the same numbering.
///
/// Within a message, oneofs come before fields so a field can find its oneof already recorded.
pub(super) fn walk<'a, F>(mark: Watermark, files: &'a [FileDescriptorProto], f: F)
where
    F: FnMut(Site<'_>, Def<'a>),
{
    let mut walker = Walker {
        path: Vec::new(),
        scope: String::new(),
        next: mark,
        file: 0,
        f,
    };
    for file in files {
        walker.file(file);
    }
}

struct Walker<F> {
    path: Vec<i32>,
    scope: String,
    next: Watermark,
    file: FileIndex,
    f: F,
}

impl<'a, F> Walker<F>
where
    F: FnMut(Site<'_>, Def<'a>),
{
    fn file(&mut self, proto: &'a FileDescriptorProto) {
        self.file = bump(&mut self.next.files);
        let outer = self.enter(proto.package());
        self.emit(Def::File(proto));

        self.each(tag::FILE_MESSAGE_TYPE, &proto.message_type, |w, _, message| {
            w.message(None, message)
        });
        self.each(tag::FILE_ENUM_TYPE, &proto.enum_type, |w, _, enum_| {
            w.enum_(None, enum_)
        });
        self.each(tag::FILE_SERVICE, &proto.service, |w, _, service| {
            w.service(service)
        });
        self.each(tag::FILE_EXTENSION, &proto.extension, |w, _, extension| {
            w.extension(None, extension)
        });

        self.leave(outer);
    }

    fn message(&mut self, parent: Option<MessageIndex>, proto: &'a DescriptorProto) {
        let index = bump(&mut self.next.messages);
        let outer = self.enter(proto.name());
        self.emit(Def::Message {
            parent,
            index,
            proto,
        });

        self.each(tag::MESSAGE_ONEOF_DECL, &proto.oneof_decl, |w, i, oneof| {
            w.leaf(
                oneof.name(),
                Def::Oneof {
                    message: index,
                    index: i,
                    proto: oneof,
                },
            )
        });
        self.each(tag::MESSAGE_FIELD, &proto.field, |w, i, field| {
            w.leaf(
                field.name(),
                Def::Field {
                    message: index,
                    index: i,
                    proto: field,
                },
            )
        });
        self.each(tag::MESSAGE_NESTED_TYPE, &proto.nested_type, |w, _, nested| {
            w.message(Some(index), nested)
        });
        self.each(tag::MESSAGE_ENUM_TYPE, &proto.enum_type, |w, _, enum_| {
            w.enum_(Some(index), enum_)
        });
        self.each(tag::MESSAGE_EXTENSION, &proto.extension, |w, _, extension| {
            w.extension(Some(index), extension)
        });

        self.leave(outer);
    }

    fn enum_(&mut self, parent: Option<MessageIndex>, proto: &'a EnumDescriptorProto) {
        let index = bump(&mut self.next.enums);
        self.leaf(
            proto.name(),
            Def::Enum {
                parent,
                index,
                proto,
            },
        );

        // Values share the scope of their enum rather than nesting inside it.
        self.each(tag::ENUM_VALUE, &proto.value, |w, i, value| {
            w.leaf(
                value.name(),
                Def::EnumValue {
                    parent: index,
                    index: i,
                    proto: value,
                },
            )
        });
    }

    fn extension(&mut self, scope: Option<MessageIndex>, proto: &'a FieldDescriptorProto) {
        let index = bump(&mut self.next.extensions);
        self.leaf(
            proto.name(),
            Def::Extension {
                scope,
                index,
                proto,
            },
        );
    }

    fn service(&mut self, proto: &'a ServiceDescriptorProto) {
        let index = bump(&mut self.next.services);
        let outer = self.enter(proto.name());
        self.emit(Def::Service { index, proto });

        self.each(tag::SERVICE_METHOD, &proto.method, |w, i, method| {
            w.leaf(
                method.name(),
                Def::Method {
                    service: index,
                    index: i,
                    proto: method,
                },
            )
        });

        self.leave(outer);
    }

    fn each<T>(
        &mut self,
        tag: i32,
        items: &'a [T],
        mut visit: impl FnMut(&mut Self, DefIndex, &'a T),
    ) {
        self.path.push(tag);
        for (i, item) in items.iter().enumerate() {
            self.path.push(i as i32);
            visit(self, def_index(i), item);
            self.path.pop();
        }
        self.path.pop();
    }

    fn leaf(&mut self, name: &str, def: Def<'a>) {
        let outer = self.enter(name);
        self.emit(def);
        self.leave(outer);
    }

    fn emit(&mut self, def: Def<'a>) {
        let site = Site {
            file: self.file,
            path: &self.path,
            full_name: &self.scope,
        };
        (self.f)(site, def);
    }

    /// Appends `name` to the current scope, returning the length to restore afterwards.
    fn enter(&mut self, name: &str) -> usize {
        let outer = self.scope.len();
        if !self.scope.is_empty() {
            self.scope.push('.');
        }
        self.scope.push_str(name);
        outer
    }

    fn leave(&mut self, outer: usize) {
        self.scope.truncate(outer);
    }
}

fn bump(next: &mut DefIndex) -> DefIndex {
    let index = *next;
    *next += 1;
    index
}
