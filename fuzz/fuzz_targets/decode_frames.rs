#![no_main]

use libfuzzer_sys::fuzz_target;
use monoio_wsframe::{FrameCodec, Role};

fuzz_target!(|data: &[u8]| {
    let mut codec = FrameCodec::new(Role::Server);
    let mut chunk = data;
    while let Ok(Some(_)) = codec.decode_message(chunk) {
        chunk = &[];
    }
});
