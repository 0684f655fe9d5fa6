//! JSON Codec using `serde_json`

use crate::traits::CacheCodec;
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// JSON Codec using `serde_json`
///
/// Values are stored as UTF-8 JSON text, which keeps them readable from
/// `redis-cli` and from other processes sharing the store.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl CacheCodec for JsonCodec {
    fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).context("value is not representable as JSON")
    }

    fn deserialize<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .with_context(|| format!("{} stored bytes do not decode as the requested type", bytes.len()))
    }

    fn name(&self) -> &'static str {
        "serde_json"
    }
}
