//! Value codecs.
//!
//! A bucket stores bytes; a [`Codec`] turns caller values into those bytes
//! and back. The codec is fixed when the bucket is opened.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Pair of pure conversions between a value type and stored bytes.
pub trait Codec {
    type Value;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: Vec<u8>) -> Result<Self::Value, CodecError>;
}

/// Identity codec over raw bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct RawCodec;

impl Codec for RawCodec {
    type Value = Vec<u8>;

    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        Ok(bytes)
    }
}

/// UTF-8 text values.
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Codec;

impl Codec for Utf8Codec {
    type Value = String;

    fn encode(&self, value: &String) -> Result<Vec<u8>, CodecError> {
        Ok(value.as_bytes().to_vec())
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<String, CodecError> {
        String::from_utf8(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Any serde type, stored as JSON.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for JsonCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JsonCodec")
    }
}

impl<T: Serialize + DeserializeOwned> Codec for JsonCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<T, CodecError> {
        serde_json::from_slice(&bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

/// Codec built from two plain functions.
pub struct FnCodec<T> {
    encode: fn(&T) -> Result<Vec<u8>, CodecError>,
    decode: fn(&[u8]) -> Result<T, CodecError>,
}

impl<T> FnCodec<T> {
    pub fn new(
        encode: fn(&T) -> Result<Vec<u8>, CodecError>,
        decode: fn(&[u8]) -> Result<T, CodecError>,
    ) -> Self {
        Self { encode, decode }
    }
}

impl<T> Clone for FnCodec<T> {
    fn clone(&self) -> Self {
        Self {
            encode: self.encode,
            decode: self.decode,
        }
    }
}

impl<T> fmt::Debug for FnCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCodec")
    }
}

impl<T> Codec for FnCodec<T> {
    type Value = T;

    fn encode(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        (self.encode)(value)
    }

    fn decode(&self, bytes: Vec<u8>) -> Result<T, CodecError> {
        (self.decode)(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn raw_is_identity() {
        let bytes = vec![0u8, 255, 7];
        assert_eq!(RawCodec.decode(RawCodec.encode(&bytes).unwrap()).unwrap(), bytes);
    }

    #[test]
    fn utf8_rejects_invalid_bytes() {
        assert_eq!(Utf8Codec.decode(b"ok".to_vec()).unwrap(), "ok");
        assert!(matches!(Utf8Codec.decode(vec![0xff, 0xfe]), Err(CodecError::Decode(_))));
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn json_codec_uses_serde() {
        let codec = JsonCodec::<Point>::new();
        let bytes = codec.encode(&Point { x: 1, y: -2 }).unwrap();
        assert_eq!(bytes, br#"{"x":1,"y":-2}"#);
        assert_eq!(codec.decode(bytes).unwrap(), Point { x: 1, y: -2 });
        assert!(codec.decode(b"[]".to_vec()).is_err());
    }

    #[test]
    fn fn_codec_calls_functions() {
        fn enc(v: &u32) -> Result<Vec<u8>, CodecError> {
            Ok(v.to_be_bytes().to_vec())
        }
        fn dec(b: &[u8]) -> Result<u32, CodecError> {
            let arr: [u8; 4] = b.try_into().map_err(|_| CodecError::Decode("need 4 bytes".into()))?;
            Ok(u32::from_be_bytes(arr))
        }
        let codec = FnCodec::new(enc, dec);
        assert_eq!(codec.encode(&258).unwrap(), vec![0, 0, 1, 2]);
        assert_eq!(codec.decode(vec![0, 0, 1, 2]).unwrap(), 258);
        assert!(codec.decode(vec![1]).is_err());
    }
}
