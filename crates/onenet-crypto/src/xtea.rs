use thiserror::Error;

use crate::keys::Key;

/// Cipher block size in bytes.
pub const BLOCK_LEN: usize = 8;
const DELTA: u32 = 0x9E37_79B9;

/// Errors returned by payload cipher backends.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CipherError {
    #[error("payload length {0} is not a whole number of cipher blocks")]
    PartialBlock(usize),
    #[error("round count must be non-zero")]
    ZeroRounds,
}

/// Block cipher backend used by the trial-decrypt pipeline.
///
/// `rounds` is chosen by the caller from the packet kind.
pub trait PayloadCipher {
    fn encrypt(&self, key: &Key, rounds: u8, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, key: &Key, rounds: u8, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// XTEA in ECB mode with big-endian word packing.
#[derive(Debug, Default, Clone, Copy)]
pub struct XteaCipher;

impl XteaCipher {
    fn check(rounds: u8, len: usize) -> Result<(), CipherError> {
        if rounds == 0 {
            return Err(CipherError::ZeroRounds);
        }
        if len % BLOCK_LEN != 0 {
            return Err(CipherError::PartialBlock(len));
        }
        Ok(())
    }

    fn key_words(key: &Key) -> [u32; 4] {
        let bytes = key.as_bytes();
        let mut words = [0_u32; 4];
        for (word, chunk) in words.iter_mut().zip(bytes.chunks_exact(4)) {
            *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
        words
    }

    fn split(block: &[u8]) -> (u32, u32) {
        (
            u32::from_be_bytes([block[0], block[1], block[2], block[3]]),
            u32::from_be_bytes([block[4], block[5], block[6], block[7]]),
        )
    }

    fn join(block: &mut [u8], v0: u32, v1: u32) {
        block[..4].copy_from_slice(&v0.to_be_bytes());
        block[4..].copy_from_slice(&v1.to_be_bytes());
    }

    fn mix(v: u32) -> u32 {
        ((v << 4) ^ (v >> 5)).wrapping_add(v)
    }

    fn encrypt_block(k: &[u32; 4], rounds: u8, block: &mut [u8]) {
        let (mut v0, mut v1) = Self::split(block);
        let mut sum = 0_u32;
        for _ in 0..rounds {
            v0 = v0.wrapping_add(Self::mix(v1) ^ sum.wrapping_add(k[(sum & 3) as usize]));
            sum = sum.wrapping_add(DELTA);
            v1 = v1.wrapping_add(Self::mix(v0) ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]));
        }
        Self::join(block, v0, v1);
    }

    fn decrypt_block(k: &[u32; 4], rounds: u8, block: &mut [u8]) {
        let (mut v0, mut v1) = Self::split(block);
        let mut sum = DELTA.wrapping_mul(u32::from(rounds));
        for _ in 0..rounds {
            v1 = v1.wrapping_sub(Self::mix(v0) ^ sum.wrapping_add(k[((sum >> 11) & 3) as usize]));
            sum = sum.wrapping_sub(DELTA);
            v0 = v0.wrapping_sub(Self::mix(v1) ^ sum.wrapping_add(k[(sum & 3) as usize]));
        }
        Self::join(block, v0, v1);
    }
}

impl PayloadCipher for XteaCipher {
    fn encrypt(&self, key: &Key, rounds: u8, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Self::check(rounds, plaintext.len())?;
        let k = Self::key_words(key);
        let mut out = plaintext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_LEN) {
            Self::encrypt_block(&k, rounds, block);
        }
        Ok(out)
    }

    fn decrypt(&self, key: &Key, rounds: u8, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        Self::check(rounds, ciphertext.len())?;
        let k = Self::key_words(key);
        let mut out = ciphertext.to_vec();
        for block in out.chunks_exact_mut(BLOCK_LEN) {
            Self::decrypt_block(&k, rounds, block);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::{CipherError, PayloadCipher, XteaCipher};
    use crate::keys::{Key, DEFAULT_NETWORK_KEY};

    #[test]
    fn matches_published_32_round_vector() {
        let ciphertext = XteaCipher
            .encrypt(&DEFAULT_NETWORK_KEY, 32, b"ABCDEFGH")
            .expect("one block");
        assert_eq!(hex::encode(ciphertext), "497df3d072612cb5");
    }

    #[test]
    fn decrypt_inverts_encrypt_for_each_round_count() {
        let key = Key::from_bytes([0x5A; 16]);
        let plaintext: Vec<u8> = (0..32_u8).collect();
        for rounds in [8_u8, 32] {
            let ciphertext = XteaCipher.encrypt(&key, rounds, &plaintext).unwrap();
            assert_ne!(ciphertext, plaintext);
            assert_eq!(XteaCipher.decrypt(&key, rounds, &ciphertext).unwrap(), plaintext);
        }
    }

    #[test]
    fn round_count_changes_ciphertext() {
        let key = DEFAULT_NETWORK_KEY;
        let plaintext = [0x42_u8; 8];
        let full = XteaCipher.encrypt(&key, 32, &plaintext).unwrap();
        let reduced = XteaCipher.encrypt(&key, 8, &plaintext).unwrap();
        assert_ne!(full, reduced);
        assert_ne!(XteaCipher.decrypt(&key, 8, &full).unwrap(), plaintext);
    }

    #[test]
    fn wrong_key_does_not_recover_plaintext() {
        let plaintext = *b"onenet!!";
        let ciphertext = XteaCipher.encrypt(&DEFAULT_NETWORK_KEY, 32, &plaintext).unwrap();
        let other = Key::from_bytes([0xEE; 16]);
        assert_ne!(XteaCipher.decrypt(&other, 32, &ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn rejects_partial_blocks_and_zero_rounds() {
        let key = DEFAULT_NETWORK_KEY;
        assert_eq!(
            XteaCipher.encrypt(&key, 32, &[0; 9]),
            Err(CipherError::PartialBlock(9))
        );
        assert_eq!(XteaCipher.decrypt(&key, 0, &[0; 8]), Err(CipherError::ZeroRounds));
    }
}
