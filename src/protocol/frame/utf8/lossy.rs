// Streaming lossy UTF-8 decoding, modified from https://github.com/SimonSapin/rust-utf8/blob/218fea2b57b0e4c3de9fa17a376fcc4a4c0d08f3/src/lossy.rs

const REPLACEMENT: char = '\u{FFFD}';

/// Collects a text message from fragments, substituting U+FFFD for malformed sequences.
///
/// A multi-byte sequence that is split between two fragments is held back until the next
/// fragment arrives, so the result equals `String::from_utf8_lossy` over the concatenation.
#[derive(Debug, Default)]
pub(crate) struct LossyCollector {
    data: String,
    incomplete: [u8; 4],
    incomplete_len: u8,
}

impl LossyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes collected so far, including a held-back partial sequence.
    pub fn len(&self) -> usize {
        self.data.len().saturating_add(self.incomplete_len as usize)
    }

    pub fn extend(&mut self, tail: &[u8]) {
        let mut input = tail;

        if self.incomplete_len > 0 {
            match self.try_complete(input) {
                Some(rest) => input = rest,
                None => return,
            }
        }

        while !input.is_empty() {
            match simdutf8::compat::from_utf8(input) {
                Ok(text) => {
                    self.data.push_str(text);
                    return;
                }

                Err(error) => {
                    let (valid, after_valid) = input.split_at(error.valid_up_to());
                    // SAFETY: `valid_up_to` marks the end of the valid prefix.
                    self.data.push_str(unsafe { std::str::from_utf8_unchecked(valid) });

                    match error.error_len() {
                        Some(invalid_sequence_length) => {
                            self.data.push(REPLACEMENT);
                            input = &after_valid[invalid_sequence_length..];
                        }

                        None => {
                            self.incomplete[..after_valid.len()].copy_from_slice(after_valid);
                            self.incomplete_len = after_valid.len() as u8;
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Finishes the message. A dangling partial sequence becomes a single U+FFFD.
    pub fn into_string(mut self) -> String {
        if self.incomplete_len > 0 {
            self.data.push(REPLACEMENT);
        }
        self.data
    }

    /// Feeds the held-back sequence with bytes from `input`.
    ///
    /// Returns the unconsumed input, or `None` when the sequence is still incomplete and the
    /// input is exhausted.
    fn try_complete<'input>(&mut self, input: &'input [u8]) -> Option<&'input [u8]> {
        let initial_len = self.incomplete_len as usize;
        let copied = input.len().min(4 - initial_len);
        self.incomplete[initial_len..initial_len + copied].copy_from_slice(&input[..copied]);
        let spliced = &self.incomplete[..initial_len + copied];

        let consumed = match simdutf8::compat::from_utf8(spliced) {
            Ok(text) => {
                self.data.push_str(text);
                copied
            }

            Err(error) if error.valid_up_to() > 0 => {
                let valid_up_to = error.valid_up_to();
                // SAFETY: `valid_up_to` marks the end of the valid prefix.
                self.data
                    .push_str(unsafe { std::str::from_utf8_unchecked(&spliced[..valid_up_to]) });
                valid_up_to.saturating_sub(initial_len)
            }

            Err(error) => match error.error_len() {
                Some(invalid_sequence_length) => {
                    self.data.push(REPLACEMENT);
                    invalid_sequence_length.saturating_sub(initial_len)
                }

                None => {
                    self.incomplete_len = spliced.len() as u8;
                    return None;
                }
            },
        };

        self.incomplete_len = 0;
        Some(&input[consumed..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(parts: &[&[u8]]) -> String {
        let mut collector = LossyCollector::new();
        for part in parts {
            collector.extend(part);
        }
        collector.into_string()
    }

    #[test]
    fn joins_split_sequences() {
        let euro = "€".as_bytes();
        assert_eq!(collect(&[&b"a"[..], &euro[..1], &euro[1..2], &euro[2..], &b"b"[..]]), "a€b");
        assert_eq!(collect(&[&b"x\xf0\x9f"[..], &b"\x98\x80y"[..]]), "x😀y");
    }

    #[test]
    fn matches_std_lossy() {
        let input: &[u8] = b"ok\xe2\x82 \xff\xfe tail \xf0\x9f\x98";
        let expected = String::from_utf8_lossy(input).into_owned();
        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            assert_eq!(collect(&[a, b]), expected, "split at {split}");
        }
        let bytewise: Vec<&[u8]> = input.chunks(1).collect();
        assert_eq!(collect(&bytewise), expected);
    }

    #[test]
    fn len_counts_pending_bytes() {
        let mut collector = LossyCollector::new();
        collector.extend(b"ab\xe2\x82");
        assert_eq!(collector.len(), 4);
        assert_eq!(collector.into_string(), "ab\u{FFFD}");
    }
}
