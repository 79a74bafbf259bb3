//! Value codecs: turn caller values into the strings that get chunked.
//!
//! `Json` is the default. `Raw` stores strings verbatim, and `FnCodec`
//! adapts a pair of closures for one-off formats.

use crate::error::{DecodeError, EncodeError};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encoder/decoder pair for values of type `T`.
pub trait Codec<T> {
    fn encode(&self, value: &T) -> Result<String, EncodeError>;
    fn decode(&self, raw: &str) -> Result<T, DecodeError>;
}

/// serde_json text encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct Json;

impl<T: Serialize + DeserializeOwned> Codec<T> for Json {
    fn encode(&self, value: &T) -> Result<String, EncodeError> {
        serde_json::to_string(value).map_err(|e| EncodeError(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<T, DecodeError> {
        serde_json::from_str(raw).map_err(|e| DecodeError::Invalid(e.to_string()))
    }
}

/// Identity codec for strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct Raw;

impl Codec<String> for Raw {
    fn encode(&self, value: &String) -> Result<String, EncodeError> {
        Ok(value.clone())
    }

    fn decode(&self, raw: &str) -> Result<String, DecodeError> {
        Ok(raw.to_string())
    }
}

/// Codec built from an encode closure and a decode closure.
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D> {
    pub fn new<T>(encode: E, decode: D) -> Self
    where
        E: Fn(&T) -> Result<String, EncodeError>,
        D: Fn(&str) -> Result<T, DecodeError>,
    {
        Self { encode, decode }
    }
}

impl<T, E, D> Codec<T> for FnCodec<E, D>
where
    E: Fn(&T) -> Result<String, EncodeError>,
    D: Fn(&str) -> Result<T, DecodeError>,
{
    fn encode(&self, value: &T) -> Result<String, EncodeError> {
        (self.encode)(value)
    }

    fn decode(&self, raw: &str) -> Result<T, DecodeError> {
        (self.decode)(raw)
    }
}
