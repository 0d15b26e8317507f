//! Incremental UTF-8 validation for fragmented TEXT messages.
//!
//! A TEXT payload may be split at arbitrary byte positions across frames,
//! so validation has to carry the multibyte sequence state between
//! pushes.

/// Streaming UTF-8 validator.
#[derive(Debug, Default)]
pub(crate) struct Utf8Validator {
    /// Continuation bytes still expected for the current sequence.
    need: u8,
    /// Allowed range of the next continuation byte; only the first
    /// continuation of a sequence is restricted beyond `80..=BF`.
    next_min: u8,
    next_max: u8,
}

impl Utf8Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Validate the next payload piece.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<(), ()> {
        for &byte in bytes {
            if self.need > 0 {
                if byte < self.next_min || byte > self.next_max {
                    return Err(());
                }
                self.need -= 1;
                self.next_min = 0x80;
                self.next_max = 0xbf;
                continue;
            }
            match byte {
                0x00..=0x7f => {}
                0xc2..=0xdf => self.expect(1, 0x80, 0xbf),
                // overlong sequences
                0xe0 => self.expect(2, 0xa0, 0xbf),
                // UTF-16 surrogates
                0xed => self.expect(2, 0x80, 0x9f),
                0xe1..=0xec | 0xee..=0xef => self.expect(2, 0x80, 0xbf),
                0xf0 => self.expect(3, 0x90, 0xbf),
                0xf1..=0xf3 => self.expect(3, 0x80, 0xbf),
                // past U+10FFFF
                0xf4 => self.expect(3, 0x80, 0x8f),
                _ => return Err(()),
            }
        }
        Ok(())
    }

    /// The message ended, no sequence may be left open.
    pub(crate) fn finish(&mut self) -> Result<(), ()> {
        match self.need {
            0 => Ok(()),
            _ => Err(()),
        }
    }

    fn expect(&mut self, need: u8, min: u8, max: u8) {
        self.need = need;
        self.next_min = min;
        self.next_max = max;
    }
}

#[cfg(test)]
mod tests {
    use super::Utf8Validator;

    fn valid(pieces: &[&[u8]]) -> bool {
        let mut v = Utf8Validator::new();
        for piece in pieces {
            if v.push(piece).is_err() {
                return false;
            }
        }
        v.finish().is_ok()
    }

    #[test]
    fn ascii_and_multibyte() {
        assert!(valid(&[b"hello"]));
        assert!(valid(&["héllo wörld".as_bytes()]));
        assert!(valid(&["𝄞 music".as_bytes()]));
    }

    #[test]
    fn split_at_any_position() {
        let text = "caf\u{e9} 𝄞".as_bytes();
        for at in 0..=text.len() {
            let (a, b) = text.split_at(at);
            assert!(valid(&[a, b]), "split at {at}");
        }
    }

    #[test]
    fn rejects_invalid() {
        // lone continuation
        assert!(!valid(&[&[0x80]]));
        // truncated sequence
        assert!(!valid(&[&[0xc3]]));
        // overlong encoding of '/'
        assert!(!valid(&[&[0xc0, 0xaf]]));
        // UTF-16 surrogate
        assert!(!valid(&[&[0xed, 0xa0, 0x80]]));
        // past U+10FFFF
        assert!(!valid(&[&[0xf4, 0x90, 0x80, 0x80]]));
    }
}
