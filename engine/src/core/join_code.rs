//! Join code generation
//!
//! Codes are short, human-enterable, and drawn from an alphabet without the
//! visually ambiguous characters (0/O, 1/I). Uniqueness among concurrently
//! active sessions is enforced by the engine's collision-checked retry loop.

use rand::Rng;

/// Characters a join code may contain
pub const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Join code length
pub const CODE_LEN: usize = 6;

/// Generate one candidate join code
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
