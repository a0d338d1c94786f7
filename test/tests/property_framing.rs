/// PROPERTY-BASED TESTS: Stream framing invariants
///
/// Uses proptest to verify the frame decoder against arbitrary read boundaries.
///
/// Key invariants:
/// 1. However a byte stream is split into reads, the same messages come out
/// 2. A partial frame never yields a message and never consumes bytes
/// 3. An oversized length prefix is refused before its payload arrives
use bytes::BytesMut;
use proptest::prelude::*;
use tokio_util::codec::Decoder;

use mirror_shared::{CodecError, Message, ObjectEvent, Value, WireCodec};

fn message_strategy() -> impl Strategy<Value = Message> {
    prop_oneof![
        (any::<u32>(), "[a-z]{1,12}", any::<i64>()).prop_map(|(request_id, service, arg)| {
            Message::Invoke {
                request_id,
                service,
                args: vec![Value::Int(arg)],
            }
        }),
        (1u32..1000, 1u32..1000, any::<i64>()).prop_map(|(object_id, version, hp)| {
            Message::ObjectEvent(ObjectEvent::field_changed(object_id, version, "hp", hp))
        }),
        any::<u32>().prop_map(|nonce| Message::Ping { nonce }),
        Just(Message::Logoff),
    ]
}

proptest! {
    /// Splitting the stream at arbitrary points never changes what is decoded
    #[test]
    fn prop_split_reads_decode_identically(
        messages in prop::collection::vec(message_strategy(), 1..8),
        chunk_sizes in prop::collection::vec(1usize..16, 1..64),
    ) {
        let mut codec = WireCodec::default();
        let mut stream = Vec::new();
        for message in &messages {
            stream.extend(codec.encode_frame(message).unwrap());
        }

        let mut buffer = BytesMut::new();
        let mut decoded = Vec::new();
        let mut offset = 0;
        let mut sizes = chunk_sizes.iter().cycle();
        while offset < stream.len() {
            let size = (*sizes.next().unwrap()).min(stream.len() - offset);
            buffer.extend_from_slice(&stream[offset..offset + size]);
            offset += size;
            while let Some(message) = codec.decode(&mut buffer).unwrap() {
                decoded.push(message);
            }
        }

        prop_assert!(buffer.is_empty());
        prop_assert_eq!(decoded, messages);
    }

    /// Any strict prefix of a frame decodes to nothing and leaves the buffer intact
    #[test]
    fn prop_partial_frame_is_not_consumed(
        message in message_strategy(),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut codec = WireCodec::default();
        let frame = codec.encode_frame(&message).unwrap();
        let prefix = &frame[..cut.index(frame.len())];

        let mut buffer = BytesMut::from(prefix);
        prop_assert_eq!(codec.decode(&mut buffer).unwrap(), None);
        prop_assert_eq!(buffer.len(), prefix.len());
    }

    /// A declared length past the limit fails as soon as the header is read
    #[test]
    fn prop_oversized_header_is_refused_early(
        max in 16usize..4096,
        excess in 1u32..1_000_000,
    ) {
        let mut codec = WireCodec::new(max);
        let declared = max as u32 + excess;
        let mut buffer = BytesMut::from(&declared.to_be_bytes()[..]);

        prop_assert_eq!(
            codec.decode(&mut buffer),
            Err(CodecError::FrameTooLarge {
                declared: declared as usize,
                max,
            })
        );
    }
}
