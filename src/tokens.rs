//! JSON token cache so repeated runs skip re-authentication. The cache also
//! carries the instrument id minted at seed time, so a later run trades the
//! same instrument the starting balances were pushed to.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Auth tokens keyed by account email, plus the seeded instrument id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenCache {
    #[serde(default)]
    instrument_id: Option<u64>,
    #[serde(default)]
    tokens: BTreeMap<String, String>,
}

impl TokenCache {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, email: &str) -> Option<&str> {
        self.tokens.get(email).map(String::as_str)
    }

    pub fn insert(&mut self, email: String, token: String) {
        self.tokens.insert(email, token);
    }

    pub fn instrument_id(&self) -> Option<u64> {
        self.instrument_id
    }

    pub fn set_instrument(&mut self, instrument_id: u64) {
        self.instrument_id = Some(instrument_id);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!("stampede-tokens-{}.json", uuid::Uuid::new_v4()));

        let mut cache = TokenCache::default();
        cache.insert("bot0@mail.ru".to_string(), "jwt-0".to_string());
        cache.insert("bank1@mail.ru".to_string(), "jwt-bank".to_string());
        cache.set_instrument(23);
        cache.save(&path).unwrap();

        let loaded = TokenCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("bot0@mail.ru"), Some("jwt-0"));
        assert_eq!(loaded.get("missing@mail.ru"), None);
        assert_eq!(loaded.instrument_id(), Some(23));

        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn instrument_id_is_optional_in_the_file() {
        let cache: TokenCache =
            serde_json::from_str(r#"{"tokens":{"bot0@mail.ru":"jwt-0"}}"#).unwrap();
        assert_eq!(cache.instrument_id(), None);
        assert_eq!(cache.get("bot0@mail.ru"), Some("jwt-0"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(TokenCache::load("/nonexistent/stampede-tokens.json").is_err());
    }
}
