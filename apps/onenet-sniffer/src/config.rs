use config::{Config, ConfigError, Environment, File};
use onenet_crypto::Key;
use onenet_sniff::SniffConfig;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::report::OutputFormat;

pub const ENV_PREFIX: &str = "ONENET_SNIFF";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SnifferConfig {
    pub timestamp_offset_ms: i64,
    pub use_default_network_key: bool,
    #[serde(deserialize_with = "deserialize_list")]
    pub network_keys: Vec<String>,
    #[serde(deserialize_with = "deserialize_list")]
    pub invite_keys: Vec<String>,
    #[serde(deserialize_with = "deserialize_list")]
    pub filter: Vec<String>,
    #[serde(deserialize_with = "deserialize_list")]
    pub attributes: Vec<String>,
    pub output: OutputFormat,
    /// Only report packets captured within this span of the last packet.
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub window: Option<Duration>,
}

fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct ListVisitor;

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or a sequence of strings")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(split_list(value))
        }

        fn visit_seq<S>(self, mut seq: S) -> Result<Self::Value, S::Error>
        where
            S: de::SeqAccess<'de>,
        {
            let mut vec = Vec::new();
            while let Some(element) = seq.next_element()? {
                vec.push(element);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(ListVisitor)
}

/// Splits a `,`/`;` separated list, dropping empty items.
fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', ';'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl SnifferConfig {
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("timestamp_offset_ms", 0)?
            .set_default("use_default_network_key", true)?
            .set_default("network_keys", Vec::<String>::new())?
            .set_default("invite_keys", Vec::<String>::new())?
            .set_default("filter", Vec::<String>::new())?
            .set_default("attributes", Vec::<String>::new())?
            .set_default("output", "text")?;

        if let Some(path) = config_path {
            if path.extension().and_then(|ext| ext.to_str()) == Some("env") {
                // .env files feed the environment source below.
                match dotenvy::from_path(&path) {
                    Ok(_) => tracing::info!("loaded environment from {}", path.display()),
                    Err(err) => {
                        tracing::warn!("failed to load .env from {}: {}", path.display(), err)
                    }
                }
            } else {
                builder = builder.add_source(File::from(path));
            }
        }

        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        builder.build()?.try_deserialize()
    }

    /// Library settings for an analysis session; keys are checked here.
    pub fn sniff_config(&self) -> Result<SniffConfig, onenet_sniff::ConfigError> {
        let network_keys = self
            .network_keys
            .iter()
            .map(|text| Key::parse_hex(text))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SniffConfig {
            timestamp_offset_ms: self.timestamp_offset_ms,
            use_default_network_key: self.use_default_network_key,
            network_keys,
            invite_keys: self.invite_keys.clone(),
            filter_commands: self.filter.clone(),
            attributes: self.attributes.clone(),
        })
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
