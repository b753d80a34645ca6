use std::fmt::Debug;

use proptest::{prelude::*, test_runner::TestCaseError};
use prost::Message;
use prost_runtime::{Arena, DynamicMessage, EncodeOptions, ReflectMessage};
use prost_types::{Any, Duration, FieldMask, Timestamp};

use crate::{decode, schema};

/// Mirrors `test.Scalars` from the test schema.
#[derive(Clone, PartialEq, Message)]
struct Scalars {
    #[prost(double, tag = "1")]
    double: f64,
    #[prost(float, tag = "2")]
    float: f32,
    #[prost(int32, tag = "3")]
    int32: i32,
    #[prost(int64, tag = "4")]
    int64: i64,
    #[prost(uint32, tag = "5")]
    uint32: u32,
    #[prost(uint64, tag = "6")]
    uint64: u64,
    #[prost(sint32, tag = "7")]
    sint32: i32,
    #[prost(sint64, tag = "8")]
    sint64: i64,
    #[prost(fixed32, tag = "9")]
    fixed32: u32,
    #[prost(fixed64, tag = "10")]
    fixed64: u64,
    #[prost(sfixed32, tag = "11")]
    sfixed32: i32,
    #[prost(sfixed64, tag = "12")]
    sfixed64: i64,
    #[prost(bool, tag = "13")]
    r#bool: bool,
    #[prost(string, tag = "14")]
    string: String,
    #[prost(bytes = "vec", tag = "15")]
    bytes: Vec<u8>,
    // Encoded the same way as the `test.Color` enum field.
    #[prost(int32, tag = "16")]
    color: i32,
}

prop_compose! {
    fn scalars()(
        double in prop::num::f64::NORMAL,
        float in prop::num::f32::NORMAL,
        int32 in any::<i32>(),
        int64 in any::<i64>(),
        uint32 in any::<u32>(),
        uint64 in any::<u64>(),
        sint32 in any::<i32>(),
        sint64 in any::<i64>(),
        fixed32 in any::<u32>(),
        fixed64 in any::<u64>(),
        sfixed32 in any::<i32>(),
        sfixed64 in any::<i64>(),
        r#bool in any::<bool>(),
        string in any::<String>(),
        bytes in any::<Vec<u8>>(),
        color in -1..4,
    ) -> Scalars {
        Scalars {
            double,
            float,
            int32,
            int64,
            uint32,
            uint64,
            sint32,
            sint64,
            fixed32,
            fixed64,
            sfixed32,
            sfixed64,
            r#bool,
            string,
            bytes,
            color,
        }
    }
}

fn timestamp() -> impl Strategy<Value = Timestamp> {
    (any::<i64>(), 0..1_000_000_000i32).prop_map(|(seconds, nanos)| Timestamp { seconds, nanos })
}

fn duration() -> impl Strategy<Value = Duration> {
    any::<std::time::Duration>().prop_map(|duration| Duration {
        seconds: duration.as_secs() as i64,
        nanos: duration.subsec_nanos() as i32,
    })
}

fn any_message() -> impl Strategy<Value = Any> {
    (any::<String>(), any::<Vec<u8>>()).prop_map(|(type_url, value)| Any { type_url, value })
}

fn field_mask() -> impl Strategy<Value = FieldMask> {
    prop::collection::vec("[a-z_.]{0,12}", 0..4).prop_map(|paths| FieldMask { paths })
}

/// Decodes `message` as a dynamic message of the named type and checks that it encodes back to
/// the same bytes and converts back to an equal value.
fn roundtrip<T>(message: &T, name: &str) -> Result<(), TestCaseError>
where
    T: PartialEq + Debug + Message + Default,
{
    let bytes = message.encode_to_vec();
    let dynamic = decode(name, &bytes).map_err(|err| TestCaseError::fail(err.to_string()))?;

    prop_assert_eq!(dynamic.encoded_len(), bytes.len());
    prop_assert_eq!(dynamic.encode_to_vec(), bytes);
    prop_assert_eq!(&dynamic.transcode_to::<T>()?, message);
    Ok(())
}

fn roundtrip_reflect<T>(message: &T) -> Result<(), TestCaseError>
where
    T: PartialEq + Debug + ReflectMessage + Default,
{
    let dynamic = message.transcode_to_dynamic(&Arena::new());
    prop_assert_eq!(dynamic.descriptor(), message.descriptor());
    prop_assert_eq!(&T::transcode_from_dynamic(&dynamic)?, message);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn roundtrip_arb_scalars(message in scalars()) {
        roundtrip(&message, "test.Scalars")?;
    }

    #[test]
    fn roundtrip_arb_well_known_types(
        timestamp in timestamp(),
        duration in duration(),
        any in any_message(),
        field_mask in field_mask(),
    ) {
        roundtrip_reflect(&timestamp)?;
        roundtrip_reflect(&duration)?;
        roundtrip_reflect(&any)?;
        roundtrip_reflect(&field_mask)?;
    }

    #[test]
    fn decode_arbitrary_bytes(bytes in prop::collection::vec(any::<u8>(), 0..64)) {
        let deterministic = EncodeOptions::new().deterministic(true);
        let arena = Arena::new();

        if let Ok(message) = DynamicMessage::decode(schema::message("test.Container"), &bytes, &arena) {
            let encoded = message.encode_to_vec_with_options(&deterministic);
            prop_assert_eq!(encoded.len(), message.encoded_len());

            let decoded = DynamicMessage::decode(schema::message("test.Container"), &encoded, &arena)
                .map_err(|err| TestCaseError::fail(err.to_string()))?;
            prop_assert_eq!(decoded.encode_to_vec_with_options(&deterministic), encoded);
        }
    }
}
