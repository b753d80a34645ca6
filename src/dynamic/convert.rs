use std::{collections::HashMap, sync::Arc};

use prost::bytes::Bytes;

use super::storage::{Block, Stored};
use crate::{Arena, DynamicMessage, Kind, Value};

impl Stored {
    /// Converts a value into its stored form, for a field of the message held by `parent`.
    ///
    /// Sub-messages allocated in `arena` or an arena fused to it are shared, unless that would
    /// make `parent` reachable from itself. Any other sub-message is copied into `arena`.
    pub(super) fn from_value(value: Value, arena: &Arena, parent: &Arc<Block>) -> Stored {
        match value {
            Value::String(value) => Stored::Str(Bytes::from(value)),
            Value::Bytes(value) => Stored::Str(value),
            Value::Message(message) => Stored::Message(adopt(message, arena, parent)),
            Value::List(list) => Stored::List(
                list.into_iter()
                    .map(|value| Stored::from_value(value, arena, parent))
                    .collect(),
            ),
            Value::Map(map) => Stored::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Stored::from_value(value, arena, parent)))
                    .collect(),
            ),
            value => Stored::Scalar(value),
        }
    }

    /// Converts a stored value of type `kind` back into a [`Value`].
    ///
    /// Sub-messages are returned as handles sharing the stored message.
    pub(super) fn to_value(&self, kind: &Kind, arena: &Arena) -> Value {
        match (self, kind) {
            (Stored::Scalar(value), _) => value.clone(),
            (Stored::Str(bytes), Kind::String) => {
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            (Stored::Str(bytes), _) => Value::Bytes(bytes.clone()),
            (Stored::Message(block), Kind::Message(desc)) => Value::Message(
                DynamicMessage::from_block(desc.clone(), arena, block.clone()),
            ),
            (Stored::Message(_), _) => unreachable!("message stored for {:?} field", kind),
            (Stored::List(list), kind) => {
                Value::List(list.iter().map(|stored| stored.to_value(kind, arena)).collect())
            }
            (Stored::Map(map), Kind::Message(entry)) => {
                let value_kind = entry.map_entry_value_field().kind();
                Value::Map(
                    map.iter()
                        .map(|(key, stored)| (key.clone(), stored.to_value(&value_kind, arena)))
                        .collect::<HashMap<_, _>>(),
                )
            }
            (Stored::Map(_), _) => unreachable!("map stored for {:?} field", kind),
        }
    }

    /// Copies this value, allocating copies of any sub-messages in `arena`.
    pub(super) fn deep_copy(&self, arena: &Arena) -> Stored {
        match self {
            Stored::Message(block) => Stored::Message(block.deep_copy(arena)),
            Stored::List(list) => {
                Stored::List(list.iter().map(|stored| stored.deep_copy(arena)).collect())
            }
            Stored::Map(map) => Stored::Map(
                map.iter()
                    .map(|(key, stored)| (key.clone(), stored.deep_copy(arena)))
                    .collect(),
            ),
            Stored::Scalar(_) | Stored::Str(_) => self.clone(),
        }
    }
}

impl Block {
    /// Copies this message and all of its sub-messages into `arena`.
    pub(super) fn deep_copy(&self, arena: &Arena) -> Arc<Block> {
        let data = self.lock().deep_copy(arena);
        let block = arena.alloc(data.table().clone());
        *block.lock() = data;
        block
    }

    /// Returns `true` if `target` is this block or one of its transitive sub-messages.
    fn reaches(self: &Arc<Self>, target: &Arc<Block>) -> bool {
        let mut stack = vec![self.clone()];
        while let Some(block) = stack.pop() {
            if Arc::ptr_eq(&block, target) {
                return true;
            }
            stack.extend(block.lock().child_blocks());
        }
        false
    }
}

fn adopt(message: DynamicMessage, arena: &Arena, parent: &Arc<Block>) -> Arc<Block> {
    let block = message.block().clone();
    if message.arena().is_fused(arena) && !block.reaches(parent) {
        block
    } else {
        tracing::trace!(
            message = message.descriptor().full_name(),
            "copying sub-message into parent arena"
        );
        block.deep_copy(arena)
    }
}
