//! Analysis session settings.

use onenet_crypto::{Key, KeyRings, DEFAULT_NETWORK_KEY};
use serde::{Deserialize, Serialize};

use crate::attribute::AttributeSet;
use crate::error::ConfigError;
use crate::filter::{Filter, FilterCommand};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniffConfig {
    /// Added to every capture timestamp before it is stored.
    pub timestamp_offset_ms: i64,
    /// Try the documented default network key before the configured ones.
    pub use_default_network_key: bool,
    pub network_keys: Vec<Key>,
    /// Eight-character invite codes.
    pub invite_keys: Vec<String>,
    /// Filter commands applied in order when the session starts.
    pub filter_commands: Vec<String>,
    /// Attributes to render; empty renders all of them.
    pub attributes: Vec<String>,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            timestamp_offset_ms: 0,
            use_default_network_key: true,
            network_keys: Vec::new(),
            invite_keys: Vec::new(),
            filter_commands: Vec::new(),
            attributes: Vec::new(),
        }
    }
}

impl SniffConfig {
    pub fn keyrings(&self) -> Result<KeyRings, ConfigError> {
        let mut rings = KeyRings::default();
        if self.use_default_network_key {
            rings.network.insert(DEFAULT_NETWORK_KEY);
        }
        for key in &self.network_keys {
            rings.network.insert(*key);
        }
        for code in &self.invite_keys {
            rings.invite.insert(Key::parse_invite(code)?);
        }
        Ok(rings)
    }

    pub fn filter(&self) -> Result<Filter, ConfigError> {
        let mut filter = Filter::new();
        for text in &self.filter_commands {
            text.parse::<FilterCommand>()?.apply(&mut filter)?;
        }
        Ok(filter)
    }

    pub fn attribute_set(&self) -> Result<AttributeSet, ConfigError> {
        if self.attributes.is_empty() {
            return Ok(AttributeSet::default());
        }
        AttributeSet::from_names(&self.attributes)
    }

    /// Checks every textual setting without building a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.keyrings()?;
        self.filter()?;
        self.attribute_set()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::filter::FilterField;
    use onenet_crypto::KeyError;

    #[test]
    fn default_config_holds_the_default_network_key() {
        let rings = SniffConfig::default().keyrings().unwrap();
        assert_eq!(rings.network.iter().copied().collect::<Vec<_>>(), vec![DEFAULT_NETWORK_KEY]);
        assert!(rings.invite.is_empty());
    }

    #[test]
    fn configured_keys_follow_the_default_without_duplicates() {
        let extra = Key::from_bytes([0xAA; 16]);
        let config = SniffConfig {
            network_keys: vec![DEFAULT_NETWORK_KEY, extra],
            invite_keys: vec!["abcd-1234".into()],
            ..SniffConfig::default()
        };
        let rings = config.keyrings().unwrap();
        assert_eq!(
            rings.network.iter().copied().collect::<Vec<_>>(),
            vec![DEFAULT_NETWORK_KEY, extra]
        );
        let invite = rings.invite.iter().next().unwrap();
        assert_eq!(invite.invite_code().as_deref(), Some("ABCD-1234"));
    }

    #[test]
    fn bad_invite_code_is_a_key_error() {
        let config = SniffConfig {
            invite_keys: vec!["ABC".into()],
            ..SniffConfig::default()
        };
        assert!(matches!(
            config.keyrings(),
            Err(ConfigError::Key(KeyError::WrongLength { .. }))
        ));
    }

    #[test]
    fn filter_commands_apply_in_order() {
        let config = SniffConfig {
            filter_commands: vec!["src add 0x10-0x20".into(), "src remove 0x15".into()],
            ..SniffConfig::default()
        };
        let filter = config.filter().unwrap();
        assert!(filter.value_accepted(FilterField::SrcDid, 0x14));
        assert!(!filter.value_accepted(FilterField::SrcDid, 0x15));
        assert!(!filter.value_accepted(FilterField::SrcDid, 0x21));

        let broken = SniffConfig {
            filter_commands: vec!["src frobnicate 1".into()],
            ..SniffConfig::default()
        };
        assert!(broken.validate().is_err());
    }

    #[test]
    fn attributes_select_a_subset() {
        let config = SniffConfig {
            attributes: vec!["timestamp".into(), "src".into()],
            ..SniffConfig::default()
        };
        let set = config.attribute_set().unwrap();
        assert!(set.contains(Attribute::SrcDid));
        assert!(!set.contains(Attribute::Payload));
    }

    #[test]
    fn deserializes_with_missing_fields() {
        let config: SniffConfig =
            serde_json::from_str(r#"{"timestamp_offset_ms": -500, "network_keys": ["000102030405060708090a0b0c0d0e0f"]}"#)
                .unwrap();
        assert_eq!(config.timestamp_offset_ms, -500);
        assert!(config.use_default_network_key);
        assert_eq!(config.network_keys, vec![DEFAULT_NETWORK_KEY]);
    }
}
