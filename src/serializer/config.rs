use crate::container::{Codec, DEFAULT_SYNC_INTERVAL, WriteError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SYNC_INTERVAL_KEYS: [&str; 3] = ["syncInterval", "sync-interval", "sync_interval"];
const CODEC_KEYS: [&str; 3] = ["compressionCodec", "codec", "compression-codec"];

/// Construction-time settings of a serializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializerConfig {
    /// Records per block
    #[serde(alias = "syncInterval", alias = "sync-interval")]
    pub sync_interval: usize,
    #[serde(alias = "compressionCodec")]
    pub codec: Codec,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            sync_interval: DEFAULT_SYNC_INTERVAL,
            codec: Codec::default(),
        }
    }
}

impl SerializerConfig {
    pub fn new(sync_interval: usize) -> Self {
        Self {
            sync_interval,
            ..Self::default()
        }
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Read settings from a host context (string key/value pairs).
    /// Missing keys keep their defaults.
    pub fn from_context(context: &BTreeMap<String, String>) -> Result<Self, WriteError> {
        let mut config = Self::default();

        if let Some(value) = lookup(context, &SYNC_INTERVAL_KEYS) {
            config.sync_interval = value.trim().parse().map_err(|_| {
                WriteError::InvalidConfig(format!("sync interval '{value}' is not a number"))
            })?;
        }

        if let Some(value) = lookup(context, &CODEC_KEYS) {
            config.codec = Codec::from_name(value.trim())
                .ok_or_else(|| WriteError::InvalidConfig(format!("unknown codec '{value}'")))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WriteError> {
        if self.sync_interval == 0 {
            return Err(WriteError::InvalidConfig(
                "sync interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn lookup<'a>(context: &'a BTreeMap<String, String>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|key| context.get(*key))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = SerializerConfig::from_context(&BTreeMap::new()).unwrap();
        assert_eq!(config, SerializerConfig::default());
        assert_eq!(config.sync_interval, 4096);
        assert_eq!(config.codec, Codec::Deflate);
    }

    #[test]
    fn test_from_context_keys() {
        let config = SerializerConfig::from_context(&context(&[
            ("syncInterval", "2"),
            ("compressionCodec", "null"),
        ]))
        .unwrap();
        assert_eq!(config.sync_interval, 2);
        assert_eq!(config.codec, Codec::Null);

        let config =
            SerializerConfig::from_context(&context(&[("sync-interval", " 16 ")])).unwrap();
        assert_eq!(config.sync_interval, 16);
    }

    #[test]
    fn test_from_context_rejects_bad_values() {
        for pairs in [
            &[("syncInterval", "0")][..],
            &[("syncInterval", "many")][..],
            &[("syncInterval", "-1")][..],
            &[("compressionCodec", "snappy")][..],
        ] {
            assert!(
                matches!(
                    SerializerConfig::from_context(&context(pairs)),
                    Err(WriteError::InvalidConfig(_))
                ),
                "{pairs:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_toml_aliases() {
        let config: SerializerConfig =
            toml::from_str("syncInterval = 8\ncodec = \"null\"").unwrap();
        assert_eq!(config, SerializerConfig::new(8).with_codec(Codec::Null));

        let config: SerializerConfig = toml::from_str("sync-interval = 3").unwrap();
        assert_eq!(config.sync_interval, 3);
        assert_eq!(config.codec, Codec::Deflate);
    }
}
