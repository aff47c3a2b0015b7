//! Payload cryptography for ONE-NET traffic.
//!
//! Includes the XTEA payload cipher behind a trait seam and key/keyring
//! handling for network and invite keys.

pub mod keys;
pub mod xtea;

pub use keys::{Key, KeyError, KeyRings, Keyring, DEFAULT_NETWORK_KEY};
pub use xtea::{CipherError, PayloadCipher, XteaCipher};
