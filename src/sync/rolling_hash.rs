//! Weak rolling checksum
//!
//! Adler-32 style checksum used as the cheap pre-filter for block matching.
//! It is never the integrity guarantee; a strong hash confirms every match.

const MOD_ADLER: u32 = 65521;

/// Checksum of a single block, computed in one pass.
///
/// Equivalent to `WeakChecksum::new()` + `update(block)` + `digest()`.
pub fn weak_checksum(block: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for &byte in block {
        a = (a + byte as u32) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }

    (b << 16) | a
}

/// Adler-32 style rolling state over a window of fixed length.
///
/// `a` is 1 + the sum of the window bytes, `b` is the sum of the running
/// `a` values; both modulo 65521.
#[derive(Debug, Clone)]
pub struct WeakChecksum {
    a: u32,
    b: u32,
    window: usize,
}

impl WeakChecksum {
    pub fn new() -> Self {
        Self { a: 1, b: 0, window: 0 }
    }

    /// One-shot checksum of `block`
    pub fn of(block: &[u8]) -> u32 {
        weak_checksum(block)
    }

    /// Start a new window covering `block`
    pub fn update(&mut self, block: &[u8]) {
        self.reset();
        for &byte in block {
            self.a = (self.a + byte as u32) % MOD_ADLER;
            self.b = (self.b + self.a) % MOD_ADLER;
        }
        self.window = block.len();
    }

    /// Slide the window one byte: drop `old_byte` from the front, append `new_byte`.
    ///
    /// a' = a - old + new
    /// b' = b - n*old + a' - 1
    pub fn roll(&mut self, old_byte: u8, new_byte: u8) {
        let old = old_byte as u32;
        let new = new_byte as u32;
        let n = (self.window as u64 % MOD_ADLER as u64) as u32;

        self.a = (self.a + MOD_ADLER - old + new) % MOD_ADLER;

        let subtract = ((n as u64 * old as u64 + 1) % MOD_ADLER as u64) as u32;
        self.b = (self.b + MOD_ADLER + self.a - subtract) % MOD_ADLER;
    }

    pub fn digest(&self) -> u32 {
        (self.b << 16) | self.a
    }

    /// Length of the current window
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn reset(&mut self) {
        self.a = 1;
        self.b = 0;
        self.window = 0;
    }
}

impl Default for WeakChecksum {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_adler32_value() {
        // Reference Adler-32 of "Wikipedia"
        assert_eq!(weak_checksum(b"Wikipedia"), 0x11E6_0398);
        assert_eq!(weak_checksum(b""), 1);
    }

    #[test]
    fn test_update_matches_one_shot() {
        let data = b"Hello, World!";
        let mut weak = WeakChecksum::new();
        weak.update(data);

        assert_eq!(weak.digest(), WeakChecksum::of(data));
        assert_eq!(weak.window(), data.len());
    }

    #[test]
    fn test_rolling_matches_one_shot_for_every_window() {
        let data = b"The quick brown fox jumps over the lazy dog";

        for window in [1, 4, 8, 16] {
            let mut weak = WeakChecksum::new();
            weak.update(&data[..window]);

            for i in 1..=data.len() - window {
                weak.roll(data[i - 1], data[i + window - 1]);
                assert_eq!(
                    weak.digest(),
                    weak_checksum(&data[i..i + window]),
                    "window {}, position {}",
                    window,
                    i
                );
            }
        }
    }

    #[test]
    fn test_different_blocks_usually_differ() {
        assert_ne!(weak_checksum(b"AAAABBBB"), weak_checksum(b"AAAABBBC"));
        assert_ne!(weak_checksum(b"abcd"), weak_checksum(b"abdc"));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut weak = WeakChecksum::new();
        weak.update(b"test");
        let first = weak.digest();

        weak.reset();
        assert_eq!(weak.digest(), 1);

        weak.update(b"test");
        assert_eq!(weak.digest(), first);
    }
}
