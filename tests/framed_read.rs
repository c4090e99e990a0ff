//! Drives the decoder through `monoio-codec` over an in-memory reader.

use monoio::io::stream::Stream;
use monoio_codec::FramedRead;
use monoio_wsframe::{EncodeOptions, FrameCodec, FrameDecoder, Message, Role};

#[monoio::test]
async fn framed_read_yields_frames() {
    let mut sender = FrameCodec::new(Role::Client);
    let mut wire = Vec::new();
    let options = EncodeOptions::default();
    let large = vec![7u8; 70_000];
    wire.extend_from_slice(&sender.encode("Hello WebSocket", options).unwrap());
    wire.extend_from_slice(&sender.ping(b"p").unwrap());
    wire.extend_from_slice(&sender.encode(&large, options).unwrap());
    wire.extend_from_slice(&sender.close(Some(1001)).unwrap());

    let mut framed = FramedRead::new(wire.as_slice(), FrameDecoder::new(Role::Server));

    let text = framed.next().await.unwrap().unwrap();
    assert_eq!(text.body().as_text(), Some("Hello WebSocket"));

    let ping = framed.next().await.unwrap().unwrap();
    assert!(ping.is_ping());

    let binary = framed.next().await.unwrap().unwrap();
    assert_eq!(binary.payload().len(), 70_000);

    let close = framed.next().await.unwrap().unwrap();
    assert!(close.is_close());
    assert_eq!(&close.payload()[..2], &[0x03, 0xe9]);

    assert!(framed.next().await.is_none());
}

#[monoio::test]
async fn framed_read_reports_violations() {
    let wire = [0x81u8, 0x02, b'h', b'i'];
    let mut framed = FramedRead::new(&wire[..], FrameDecoder::new(Role::Server));
    assert!(framed.next().await.unwrap().is_err());
}

#[test]
fn decode_message_from_chunks() {
    let mut sender = FrameCodec::new(Role::Server);
    let mut wire = Vec::new();
    for frame in sender
        .multi_encode("stream of text", Some(4), EncodeOptions::default())
        .unwrap()
    {
        wire.extend_from_slice(&frame.unwrap());
    }

    let mut receiver = FrameCodec::new(Role::Client);
    let mut messages = Vec::new();
    for chunk in wire.chunks(3) {
        if let Some(message) = receiver.decode_message(chunk).unwrap() {
            messages.push(message);
        }
    }
    assert_eq!(messages, vec![Message::text("stream of text")]);
}
