//! Network and invite keys.

use std::fmt;
use std::str::FromStr;

use onenet_core::KeyScope;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub const KEY_LEN: usize = 16;
/// Hex digits in a textual network key.
pub const KEY_HEX_DIGITS: usize = KEY_LEN * 2;
/// Characters in an invite code; the code is repeated to fill the key.
pub const INVITE_CODE_LEN: usize = 8;
/// Trailing key bytes exchanged as the key fragment.
pub const KEY_FRAGMENT_LEN: usize = 4;

const KEY_SEPARATORS: [char; 3] = ['-', ':', ' '];

/// Key shipped with every device until the network key is changed.
pub const DEFAULT_NETWORK_KEY: Key = Key([
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F,
]);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected {expected} characters, found {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid hex digit {ch:?} at {index}")]
    InvalidDigit { ch: char, index: usize },
    #[error("invalid invite code character {ch:?} at {index}")]
    InvalidInviteChar { ch: char, index: usize },
}

/// A 16-byte XTEA key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key([u8; KEY_LEN]);

impl Key {
    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Parses 32 hex digits; `-`, `:` and spaces between digits are ignored.
    pub fn parse_hex(text: &str) -> Result<Self, KeyError> {
        let mut digits = String::with_capacity(KEY_HEX_DIGITS);
        for (index, ch) in text.trim().chars().enumerate() {
            if KEY_SEPARATORS.contains(&ch) {
                continue;
            }
            if !ch.is_ascii_hexdigit() {
                return Err(KeyError::InvalidDigit { ch, index });
            }
            digits.push(ch);
        }
        if digits.len() != KEY_HEX_DIGITS {
            return Err(KeyError::WrongLength {
                expected: KEY_HEX_DIGITS,
                actual: digits.len(),
            });
        }
        let mut bytes = [0_u8; KEY_LEN];
        hex::decode_to_slice(&digits, &mut bytes).map_err(|_| KeyError::WrongLength {
            expected: KEY_HEX_DIGITS,
            actual: digits.len(),
        })?;
        Ok(Self(bytes))
    }

    /// Parses an 8-character invite code such as `ABCD-1234`.
    ///
    /// Any printable ASCII character other than space may appear in the code.
    /// A `-` between the two halves of a 9-character input is a separator.
    /// The code is upper-cased and its ASCII bytes repeated to 16 bytes.
    pub fn parse_invite(text: &str) -> Result<Self, KeyError> {
        let text = text.trim();
        let half = INVITE_CODE_LEN / 2;
        let separated =
            text.chars().count() == INVITE_CODE_LEN + 1 && text.chars().nth(half) == Some('-');
        let mut code = String::with_capacity(INVITE_CODE_LEN);
        for (index, ch) in text.chars().enumerate() {
            if separated && index == half {
                continue;
            }
            if !ch.is_ascii_graphic() {
                return Err(KeyError::InvalidInviteChar { ch, index });
            }
            code.push(ch.to_ascii_uppercase());
        }
        if code.len() != INVITE_CODE_LEN {
            return Err(KeyError::WrongLength {
                expected: INVITE_CODE_LEN,
                actual: code.len(),
            });
        }
        let mut bytes = [0_u8; KEY_LEN];
        for chunk in bytes.chunks_exact_mut(INVITE_CODE_LEN) {
            chunk.copy_from_slice(code.as_bytes());
        }
        Ok(Self(bytes))
    }

    /// The invite code this key was built from, if it is an invite key.
    pub fn invite_code(&self) -> Option<String> {
        let (first, second) = self.0.split_at(INVITE_CODE_LEN);
        if first != second || !first.iter().all(|b| b.is_ascii_graphic()) {
            return None;
        }
        let code = std::str::from_utf8(first).ok()?;
        Some(format!("{}-{}", &code[..4], &code[4..]))
    }

    /// Last four key bytes, big-endian.
    pub fn fragment(&self) -> u32 {
        let tail = &self.0[KEY_LEN - KEY_FRAGMENT_LEN..];
        u32::from_be_bytes([tail[0], tail[1], tail[2], tail[3]])
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chunk) in self.0.chunks(KEY_FRAGMENT_LEN).enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            f.write_str(&hex::encode_upper(chunk))?;
        }
        Ok(())
    }
}

// Full key bytes stay out of debug output; the fragment identifies the key.
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key(..{:08X})", self.fragment())
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_hex(s)
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse_hex(&text).map_err(de::Error::custom)
    }
}

/// Ordered, duplicate-free list of keys tried in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyring {
    keys: Vec<Key>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `key`; returns `false` when it is already present.
    pub fn insert(&mut self, key: Key) -> bool {
        if self.keys.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Removes `key`; returns `false` when it was not present.
    pub fn remove(&mut self, key: &Key) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        self.keys.len() != before
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.keys.contains(key)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

impl FromIterator<Key> for Keyring {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        let mut ring = Keyring::new();
        for key in iter {
            ring.insert(key);
        }
        ring
    }
}

impl<'a> IntoIterator for &'a Keyring {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter()
    }
}

/// Network and invite keyrings for one analysis session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRings {
    pub network: Keyring,
    pub invite: Keyring,
}

impl KeyRings {
    pub fn with_default_network_key() -> Self {
        Self {
            network: std::iter::once(DEFAULT_NETWORK_KEY).collect(),
            invite: Keyring::new(),
        }
    }

    pub fn for_scope(&self, scope: KeyScope) -> &Keyring {
        match scope {
            KeyScope::Network => &self.network,
            KeyScope::Invite => &self.invite,
        }
    }

    pub fn for_scope_mut(&mut self, scope: KeyScope) -> &mut Keyring {
        match scope {
            KeyScope::Network => &mut self.network,
            KeyScope::Invite => &mut self.invite,
        }
    }
}
