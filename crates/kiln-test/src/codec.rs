//! Encoding and decoding of request and response content.
//!
//! | Media type | Encode | Decode |
//! |------------|--------|--------|
//! | `application/json` | any `Serialize` | any `Deserialize` |
//! | `application/x-www-form-urlencoded` | flat structs and maps | flat structs and maps |
//! | `text/plain` | string values only | string targets only |
//!
//! [`EmptyContent`] is special-cased everywhere: it never produces a body or
//! a query string, and decoding it always succeeds. It is recognised through
//! serde, so `&EmptyContent`, `Some(EmptyContent)` and boxed forms count too.

use std::any::Any;
use std::fmt;

use bytes::Bytes;
use kiln_app::MediaType;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::ser::{self, Impossible};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};

/// Unit struct name `EmptyContent` serializes under.
const EMPTY_CONTENT_NAME: &str = "kiln_test::EmptyContent";

/// Marker for "no payload".
///
/// Passing `EmptyContent` as a body or query is the same as passing none.
///
/// # Example
///
/// ```
/// use kiln_test::{ContentCodec, EmptyContent};
/// use kiln_app::MediaType;
///
/// assert!(ContentCodec::encode(&EmptyContent, &MediaType::Json).unwrap().is_none());
/// assert!(ContentCodec::encode(&Some(&EmptyContent), &MediaType::Json).unwrap().is_none());
/// assert!(ContentCodec::encode_query(&EmptyContent).unwrap().is_none());
/// let _: EmptyContent = ContentCodec::decode(b"", &MediaType::Json).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EmptyContent;

impl Serialize for EmptyContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_unit_struct(EMPTY_CONTENT_NAME)
    }
}

impl<'de> Deserialize<'de> for EmptyContent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(deserializer).map(|_| Self)
    }
}

/// Whether `value` is [`EmptyContent`], possibly behind references,
/// smart pointers or `Some`.
fn is_empty_content<T: Serialize + ?Sized>(value: &T) -> bool {
    value.serialize(EmptyContentCheck).unwrap_or(false)
}

/// Serializer answering "is this the empty-content sentinel?".
///
/// Scalars answer `false`; compound values stop early with an error, which
/// also means "no".
struct EmptyContentCheck;

#[derive(Debug)]
struct NotEmpty;

impl fmt::Display for NotEmpty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("not empty content")
    }
}

impl std::error::Error for NotEmpty {}

impl ser::Error for NotEmpty {
    fn custom<M: fmt::Display>(_msg: M) -> Self {
        Self
    }
}

impl Serializer for EmptyContentCheck {
    type Ok = bool;
    type Error = NotEmpty;
    type SerializeSeq = Impossible<bool, NotEmpty>;
    type SerializeTuple = Impossible<bool, NotEmpty>;
    type SerializeTupleStruct = Impossible<bool, NotEmpty>;
    type SerializeTupleVariant = Impossible<bool, NotEmpty>;
    type SerializeMap = Impossible<bool, NotEmpty>;
    type SerializeStruct = Impossible<bool, NotEmpty>;
    type SerializeStructVariant = Impossible<bool, NotEmpty>;

    fn serialize_unit_struct(self, name: &'static str) -> Result<bool, NotEmpty> {
        Ok(name == EMPTY_CONTENT_NAME)
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<bool, NotEmpty> {
        value.serialize(self)
    }

    fn serialize_bool(self, _v: bool) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_i8(self, _v: i8) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_i16(self, _v: i16) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_i32(self, _v: i32) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_i64(self, _v: i64) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_u8(self, _v: u8) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_u16(self, _v: u16) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_u32(self, _v: u32) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_u64(self, _v: u64) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_f32(self, _v: f32) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_f64(self, _v: f64) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_char(self, _v: char) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_str(self, _v: &str) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_none(self) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_unit(self) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
    ) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _value: &T,
    ) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<bool, NotEmpty> {
        Ok(false)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, NotEmpty> {
        Err(NotEmpty)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, NotEmpty> {
        Err(NotEmpty)
    }
}

/// Stateless content codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentCodec;

impl ContentCodec {
    /// Encodes `value` as a body of the given media type.
    ///
    /// Returns `None` for [`EmptyContent`].
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Encode` if serialization fails or the media
    /// type has no encoder.
    pub fn encode<T: Serialize + ?Sized>(
        value: &T,
        media_type: &MediaType,
    ) -> HarnessResult<Option<Bytes>> {
        if is_empty_content(value) {
            return Ok(None);
        }

        let bytes = match media_type {
            MediaType::Json => serde_json::to_vec(value)
                .map(Bytes::from)
                .map_err(|e| HarnessError::encode(media_type, e))?,
            MediaType::UrlEncodedForm => serde_urlencoded::to_string(value)
                .map(Bytes::from)
                .map_err(|e| HarnessError::encode(media_type, e))?,
            MediaType::PlainText => match serde_json::to_value(value) {
                Ok(Value::String(text)) => Bytes::from(text),
                Ok(other) => {
                    return Err(HarnessError::encode(
                        media_type,
                        format!("only string values can be sent as text, got {}", kind(&other)),
                    ))
                }
                Err(e) => return Err(HarnessError::encode(media_type, e)),
            },
            MediaType::Other(_) => {
                return Err(HarnessError::encode(media_type, "no encoder for this media type"))
            }
        };

        Ok(Some(bytes))
    }

    /// Encodes `value` as a form-urlencoded query string.
    ///
    /// Returns `None` for [`EmptyContent`].
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Encode` if the value is not a flat struct or map.
    pub fn encode_query<T: Serialize + ?Sized>(value: &T) -> HarnessResult<Option<String>> {
        if is_empty_content(value) {
            return Ok(None);
        }

        serde_urlencoded::to_string(value)
            .map(Some)
            .map_err(|e| HarnessError::encode(MediaType::UrlEncodedForm, e))
    }

    /// Decodes a body of the given media type into `T`.
    ///
    /// # Errors
    ///
    /// Returns `HarnessError::Decode` if the body does not match `T` or the
    /// media type has no decoder.
    pub fn decode<T: DeserializeOwned + Any>(body: &[u8], media_type: &MediaType) -> HarnessResult<T> {
        if std::any::TypeId::of::<T>() == std::any::TypeId::of::<EmptyContent>() {
            return serde_json::from_value(Value::Null)
                .map_err(|e| HarnessError::decode(media_type, e));
        }

        match media_type {
            MediaType::Json => {
                serde_json::from_slice(body).map_err(|e| HarnessError::decode(media_type, e))
            }
            MediaType::UrlEncodedForm => {
                serde_urlencoded::from_bytes(body).map_err(|e| HarnessError::decode(media_type, e))
            }
            MediaType::PlainText => {
                let text = std::str::from_utf8(body)
                    .map_err(|e| HarnessError::decode(media_type, e))?;
                serde_json::from_value(Value::String(text.to_string()))
                    .map_err(|e| HarnessError::decode(media_type, e))
            }
            MediaType::Other(_) => Err(HarnessError::decode(
                media_type,
                "no decoder for this media type",
            )),
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
