use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::CodecError;

/// Wire encoding for step payloads.
///
/// Codecs work on `serde_json::Value`; typed conversion happens at the step
/// boundary so the trait stays object safe.
pub trait Codec: Send + Sync {
    fn content_type(&self) -> &'static str;
    fn encode(&self, value: &JsonValue) -> Result<Vec<u8>, CodecError>;
    fn decode(&self, bytes: &[u8]) -> Result<JsonValue, CodecError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode(&self, value: &JsonValue) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(value)?)
    }

    fn decode(&self, bytes: &[u8]) -> Result<JsonValue, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn content_type(&self) -> &'static str {
        "application/yaml"
    }

    fn encode(&self, value: &JsonValue) -> Result<Vec<u8>, CodecError> {
        Ok(serde_yaml::to_string(value)?.into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<JsonValue, CodecError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }
}

pub fn encode_value<T: Serialize>(codec: &dyn Codec, value: &T) -> Result<Vec<u8>, CodecError> {
    codec.encode(&serde_json::to_value(value)?)
}

pub fn decode_value<T: DeserializeOwned>(codec: &dyn Codec, bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_value(codec.decode(bytes)?)?)
}
