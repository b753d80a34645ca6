use std::thread;

use prost_runtime::{Arena, DynamicMessage, Value};

use crate::{decode, length_delimited, schema};

#[test]
fn arena_and_messages_are_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<Arena>();
    assert_send_sync::<DynamicMessage>();
}

#[test]
fn decode_allocates_in_arena() {
    let arena = Arena::new();
    let buf = [
        length_delimited(1, &[0x18, 0x01]),
        length_delimited(9, &length_delimited(9, &[])),
    ]
    .concat();
    let _message = DynamicMessage::decode(schema::message("test.Container"), &buf, &arena).unwrap();

    // The top-level message, `scalars` and two nested `child` messages.
    assert_eq!(arena.message_count(), 4);
    assert!(arena.space_allocated() > 0);
}

#[test]
fn fused_arena_keeps_storage_alive() {
    let parent_arena = Arena::new();
    let child_arena = Arena::new();
    parent_arena.fuse(&child_arena);

    let mut parent = DynamicMessage::new(schema::message("test.Container"), &parent_arena);
    let child = decode_in("test.Scalars", &[0x18, 0x07], &child_arena);
    parent
        .set_field_by_name("scalars", Value::Message(child.clone()))
        .unwrap();
    drop(child_arena);

    let scalars = parent.get_field_by_name("scalars").unwrap();
    assert!(scalars.as_message().unwrap().ptr_eq(&child));
    assert_eq!(
        scalars.as_message().unwrap().get_field_by_name("int32"),
        Some(Value::I32(7))
    );
}

#[test]
fn unfused_sub_message_is_copied() {
    let mut parent = DynamicMessage::new(schema::message("test.Container"), &Arena::new());
    let child = decode("test.Scalars", &[0x18, 0x07]).unwrap();
    parent
        .set_field_by_name("scalars", Value::Message(child.clone()))
        .unwrap();

    let scalars = parent.get_field_by_name("scalars").unwrap();
    let scalars = scalars.as_message().unwrap();
    assert!(!scalars.ptr_eq(&child));
    assert_eq!(*scalars, child);
    assert!(scalars.arena().is_fused(parent.arena()));
}

#[test]
fn handles_are_reused() {
    let message = decode(
        "test.Container",
        &length_delimited(9, &length_delimited(9, &[0x20, 0x01])),
    )
    .unwrap();

    let child = message.get_field_by_name("child").unwrap();
    let grandchild = child
        .as_message()
        .unwrap()
        .get_field_by_name("child")
        .unwrap();
    let again = message.get_field_by_name("child").unwrap();
    let again = again
        .as_message()
        .unwrap()
        .get_field_by_name("child")
        .unwrap();

    assert!(grandchild
        .as_message()
        .unwrap()
        .ptr_eq(again.as_message().unwrap()));
}

#[test]
fn concurrent_decoding_into_one_arena() {
    let arena = Arena::new();
    let buf = length_delimited(1, &[0x18, 0x01]);

    let messages: Vec<DynamicMessage> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    DynamicMessage::decode(schema::message("test.Container"), &buf, &arena)
                        .unwrap()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(arena.message_count(), 16);
    for message in &messages {
        assert_eq!(message.encode_to_vec(), buf);
    }
}

#[test]
fn concurrent_fusing() {
    let arenas: Vec<Arena> = (0..16).map(|_| Arena::new()).collect();

    thread::scope(|scope| {
        for pair in arenas.windows(2) {
            scope.spawn(move || pair[0].fuse(&pair[1]));
        }
    });

    for arena in &arenas {
        assert!(arena.is_fused(&arenas[0]));
    }
}

fn decode_in(name: &str, buf: &[u8], arena: &Arena) -> DynamicMessage {
    DynamicMessage::decode(schema::message(name), buf, arena).unwrap()
}
