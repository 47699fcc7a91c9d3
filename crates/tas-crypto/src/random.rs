//! CSPRNG helpers backed by the operating system RNG.

use rand::rngs::OsRng;
use rand::RngCore;
use tas_core::Nonce;

/// Length of handshake and challenge nonces.
pub const NONCE_LEN: usize = 16;

/// Length of server tokens.
pub const TOKEN_LEN: usize = 32;

/// `N` random bytes.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    OsRng.fill_bytes(&mut buf);
    buf
}

/// A fresh 16-byte nonce.
pub fn random_nonce() -> Nonce {
    Nonce::from_bytes(random_bytes::<NONCE_LEN>().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_have_fixed_length_and_differ() {
        let a = random_nonce();
        let b = random_nonce();
        assert_eq!(a.as_bytes().len(), NONCE_LEN);
        assert_ne!(a, b);
    }

    #[test]
    fn token_bytes_are_not_all_zero() {
        assert_ne!(random_bytes::<TOKEN_LEN>(), [0u8; TOKEN_LEN]);
    }
}
