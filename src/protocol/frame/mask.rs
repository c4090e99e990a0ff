use std::fmt;

/// Source of masking keys for outgoing frames.
///
/// Masking only obfuscates the payload for intermediaries, so any unpredictable source is good
/// enough; it does not need to be cryptographically secure.
pub trait MaskSource: fmt::Debug + Send {
    /// Returns the next 4-byte masking key.
    fn next_mask(&mut self) -> [u8; 4];
}

/// Masking keys drawn from the thread-local generator of `rand`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMask;

impl MaskSource for RandomMask {
    #[inline]
    fn next_mask(&mut self) -> [u8; 4] {
        rand::random()
    }
}

/// Masks or unmasks `buf` in place. Applying the same key twice restores the input.
#[inline]
pub fn apply_mask(buf: &mut [u8], mask: [u8; 4]) {
    apply_mask_fast32(buf, mask)
}

/// Returns a masked copy of `data`.
pub fn websocket_mask(data: &[u8], mask: [u8; 4]) -> Vec<u8> {
    let mut out = data.to_vec();
    apply_mask(&mut out, mask);
    out
}

/// A safe unoptimized mask application.
#[inline]
fn apply_mask_fallback(buf: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in buf.iter_mut().enumerate() {
        *byte ^= mask[i & 3];
    }
}

/// Faster version of `apply_mask()` which operates on 4-byte blocks.
#[inline]
fn apply_mask_fast32(buf: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);

    // SAFETY: every bit pattern is a valid u32, and the prefix/suffix are handled bytewise.
    let (prefix, words, suffix) = unsafe { buf.align_to_mut::<u32>() };
    apply_mask_fallback(prefix, mask);
    let head = prefix.len() & 3;
    let mask_u32 = if head > 0 {
        if cfg!(target_endian = "big") {
            mask_u32.rotate_left(8 * head as u32)
        } else {
            mask_u32.rotate_right(8 * head as u32)
        }
    } else {
        mask_u32
    };
    for word in words.iter_mut() {
        *word ^= mask_u32;
    }
    apply_mask_fallback(suffix, mask_u32.to_ne_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_mask() {
        let mask = [0x6d, 0xb6, 0xb2, 0x80];
        let unmasked = [
            0xf3, 0x00, 0x01, 0x02, 0x03, 0x80, 0x81, 0x82, 0xff, 0xfe, 0x00, 0x17, 0x74, 0xf9,
            0x12, 0x03,
        ];

        // Check masking with proper alignment.
        {
            let mut masked = unmasked;
            apply_mask_fallback(&mut masked, mask);

            let mut masked_fast = unmasked;
            apply_mask_fast32(&mut masked_fast, mask);

            assert_eq!(masked, masked_fast);
        }

        // Check masking without alignment.
        for offset in 1..4 {
            let mut masked = unmasked;
            apply_mask_fallback(&mut masked[offset..], mask);

            let mut masked_fast = unmasked;
            apply_mask_fast32(&mut masked_fast[offset..], mask);

            assert_eq!(masked, masked_fast);
        }
    }

    #[test]
    fn mask_is_involution() {
        let key = [0x37, 0xfa, 0x21, 0x3d];
        let data = b"Hello, masked world!".to_vec();
        assert_ne!(websocket_mask(&data, key), data);
        assert_eq!(websocket_mask(&websocket_mask(&data, key), key), data);
    }

    #[test]
    fn rfc_example() {
        // RFC 6455 5.7: a single-frame masked text message containing "Hello".
        let key = [0x37, 0xfa, 0x21, 0x3d];
        assert_eq!(
            websocket_mask(b"Hello", key),
            [0x7f, 0x9f, 0x4d, 0x51, 0x58]
        );
    }
}
