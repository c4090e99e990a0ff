//! Decoding must not depend on how the byte stream is split into chunks.

use monoio_wsframe::{
    EncodeOptions, Error, Frame, FrameCodec, Role,
    error::ProtocolError,
    protocol::frame::{Body, coding::OpCode},
};
use proptest::prelude::*;

const ROLE_PAIRS: [(Role, Role); 4] = [
    (Role::Client, Role::Server),
    (Role::Server, Role::Client),
    (Role::Masked, Role::Masked),
    (Role::Unmasked, Role::Unmasked),
];

fn arb_roles() -> impl Strategy<Value = (Role, Role)> {
    (0..ROLE_PAIRS.len()).prop_map(|i| ROLE_PAIRS[i])
}

fn arb_data_frame() -> impl Strategy<Value = (OpCode, bool, Vec<u8>)> {
    (
        prop_oneof![Just(OpCode::Text), Just(OpCode::Binary), Just(OpCode::Continue)],
        any::<bool>(),
        prop::collection::vec(any::<u8>(), 0..400),
    )
}

fn encode_all(sender: Role, frames: &[(OpCode, bool, Vec<u8>)]) -> Vec<u8> {
    let mut codec = FrameCodec::new(sender);
    let mut wire = Vec::new();
    for (opcode, is_final, payload) in frames {
        let options = EncodeOptions::default().opcode(*opcode).is_final(*is_final);
        wire.extend_from_slice(&codec.encode(payload, options).unwrap());
    }
    wire
}

fn decode_in_chunks(receiver: Role, wire: &[u8], cuts: &[usize]) -> Vec<Frame> {
    let mut codec = FrameCodec::new(receiver);
    let mut frames = Vec::new();
    let mut start = 0;
    for &cut in cuts.iter().chain(std::iter::once(&wire.len())) {
        let end = cut.clamp(start, wire.len());
        let mut chunk = &wire[start..end];
        while let Some(frame) = codec.decode(chunk).unwrap() {
            frames.push(frame);
            chunk = &[];
        }
        start = end;
    }
    assert_eq!(codec.buffered(), 0);
    frames
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn roundtrip_any_split(
        (sender, receiver) in arb_roles(),
        frames in prop::collection::vec(arb_data_frame(), 1..6),
        cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..8),
    ) {
        let wire = encode_all(sender, &frames);
        let mut cuts: Vec<usize> = cuts.iter().map(|i| i.index(wire.len() + 1)).collect();
        cuts.sort_unstable();

        let decoded = decode_in_chunks(receiver, &wire, &cuts);
        prop_assert_eq!(decoded.len(), frames.len());
        for (frame, (opcode, is_final, payload)) in decoded.iter().zip(&frames) {
            prop_assert_eq!(frame.opcode(), *opcode);
            prop_assert_eq!(frame.is_final(), *is_final);
            prop_assert_eq!(frame.payload_length(), payload.len() as u64);
            prop_assert_eq!(frame.payload().as_ref(), &payload[..]);
            prop_assert_eq!(frame.masking_key().is_some(), sender.masks_output());
        }
    }

    #[test]
    fn whole_and_bytewise_agree(
        (sender, receiver) in arb_roles(),
        frames in prop::collection::vec(arb_data_frame(), 1..4),
    ) {
        let wire = encode_all(sender, &frames);
        let whole = decode_in_chunks(receiver, &wire, &[]);
        let cuts: Vec<usize> = (1..wire.len()).collect();
        let bytewise = decode_in_chunks(receiver, &wire, &cuts);
        prop_assert_eq!(whole, bytewise);
    }

    #[test]
    fn text_body_never_fails(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let wire = encode_all(Role::Unmasked, &[(OpCode::Text, true, payload.clone())]);
        let frame = decode_in_chunks(Role::Unmasked, &wire, &[]).remove(0);
        prop_assert_eq!(
            frame.body(),
            &Body::Text(String::from_utf8_lossy(&payload).into_owned().into())
        );
    }
}

#[test]
fn length_boundaries() {
    for (length, header_len) in [
        (0usize, 2usize),
        (125, 2),
        (126, 4),
        (65535, 4),
        (65536, 10),
    ] {
        let payload = vec![0x5a; length];
        let wire = encode_all(Role::Unmasked, &[(OpCode::Binary, true, payload.clone())]);
        assert_eq!(wire.len(), header_len + length, "length {length}");

        // Feed the header one byte short of complete, then the rest.
        let frames = decode_in_chunks(Role::Unmasked, &wire, &[header_len - 1]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload().len(), length);
    }
}

#[test]
fn masked_boundaries() {
    for (length, header_len) in [(125usize, 6usize), (126, 8), (65536, 14)] {
        let payload = vec![0xa5; length];
        let wire = encode_all(Role::Client, &[(OpCode::Binary, true, payload.clone())]);
        assert_eq!(wire.len(), header_len + length, "length {length}");
        assert_ne!(&wire[header_len..], &payload[..]);

        let frames = decode_in_chunks(Role::Server, &wire, &[2, header_len - 1]);
        assert_eq!(frames[0].payload().as_ref(), &payload[..]);
    }
}

#[test]
fn errors_are_sticky() {
    let mut codec = FrameCodec::new(Role::Server);
    assert!(matches!(
        codec.decode(&[0x81, 0x02, b'h', b'i']),
        Err(Error::Protocol(ProtocolError::UnmaskedFrameFromClient))
    ));
    assert!(matches!(codec.decode(&[]), Err(Error::DecoderFailed)));
    assert!(codec.decoder_mut().is_failed());
}

#[test]
fn protocol_violations() {
    let cases: [(Role, &[u8], ProtocolError); 5] = [
        (Role::Client, &[0x81, 0x82], ProtocolError::MaskedFrameFromServer),
        (Role::Unmasked, &[0x83, 0x00], ProtocolError::InvalidOpcode(3)),
        (Role::Unmasked, &[0x8b, 0x00], ProtocolError::InvalidOpcode(11)),
        (Role::Unmasked, &[0x89, 0x7e], ProtocolError::ControlFrameTooBig),
        (Role::Unmasked, &[0x09, 0x00], ProtocolError::FragmentedControlFrame),
    ];
    for (role, wire, expected) in cases {
        let mut codec = FrameCodec::new(role);
        match codec.decode(wire) {
            Err(Error::Protocol(err)) => assert_eq!(err, expected),
            other => panic!("unexpected result for {wire:?}: {other:?}"),
        }
    }
}

#[test]
fn rsv_bits_are_carried() {
    let mut codec = FrameCodec::new(Role::Unmasked);
    let frame = codec.decode(&[0xc2, 0x01, 0xff]).unwrap().unwrap();
    assert!(frame.header().rsv1);
    assert!(!frame.header().rsv2 && !frame.header().rsv3);
}
