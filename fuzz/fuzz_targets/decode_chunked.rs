#![no_main]

use libfuzzer_sys::fuzz_target;
use monoio_wsframe::{FrameCodec, Role};

// The first byte picks the chunk size, the rest is the stream.
fuzz_target!(|data: &[u8]| {
    let Some((&size, stream)) = data.split_first() else {
        return;
    };
    let mut whole = FrameCodec::new(Role::Unmasked);
    let mut chunked = FrameCodec::new(Role::Unmasked);

    let mut expected = Vec::new();
    let mut chunk = stream;
    loop {
        match whole.decode(chunk) {
            Ok(Some(frame)) => expected.push(frame),
            _ => break,
        }
        chunk = &[];
    }

    let mut actual = Vec::new();
    'feed: for chunk in stream.chunks(usize::from(size).max(1)) {
        let mut chunk = chunk;
        loop {
            match chunked.decode(chunk) {
                Ok(Some(frame)) => actual.push(frame),
                Ok(None) => break,
                Err(_) => break 'feed,
            }
            chunk = &[];
        }
    }

    assert_eq!(expected, actual);
});
