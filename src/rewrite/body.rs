//! JSON body parsing and password field replacement.
//!
//! Members are held as raw JSON text, so every field other than the password
//! is written back exactly as the client sent it (numbers keep their
//! precision and spelling).

use std::fmt;

use bytes::Bytes;
use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::value::{to_raw_value, RawValue};
use thiserror::Error;

use crate::rewrite::hasher::{HashError, PasswordHasher};

pub const PASSWORD_FIELD: &str = "password";

/// Where the password lives inside the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocation {
    /// `{"password": ...}`
    TopLevel,
    /// `{"<parent>": {"password": ...}}`
    Nested { parent: String },
    /// `{"password": ..., "<guard>": ...}`; hashed only when `guard` is present.
    Guarded { guard: String },
}

#[derive(Debug, Error)]
pub enum BodyRewriteError {
    #[error("request body is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    #[error("request body must be a JSON object")]
    NotObject,

    #[error("field `{0}` must be a string")]
    NotString(String),

    #[error("failed to serialize rewritten body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error(transparent)]
    Hash(#[from] HashError),
}

/// A JSON object in source order whose member values are left unparsed.
#[derive(Debug, Default)]
pub struct RawObject {
    members: Vec<(String, Box<RawValue>)>,
}

impl RawObject {
    /// `None` when `raw` holds valid JSON of another type.
    fn from_raw(raw: &RawValue) -> Result<Option<Self>, serde_json::Error> {
        if !raw.get().starts_with('{') {
            return Ok(None);
        }
        serde_json::from_str(raw.get()).map(Some)
    }

    fn get(&self, key: &str) -> Option<&RawValue> {
        // Last duplicate wins, as with any JSON object reader.
        self.members
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| &**value)
    }

    fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn set(&mut self, key: &str, value: Box<RawValue>) {
        if let Some((_, slot)) = self.members.iter_mut().rev().find(|(name, _)| name == key) {
            *slot = value;
        }
    }

    fn to_raw(&self) -> Result<Box<RawValue>, serde_json::Error> {
        to_raw_value(self)
    }
}

impl<'de> Deserialize<'de> for RawObject {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawObjectVisitor;

        impl<'de> Visitor<'de> for RawObjectVisitor {
            type Value = RawObject;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RawObject, A::Error> {
                let mut members = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Box<RawValue>>()? {
                    members.push(entry);
                }
                Ok(RawObject { members })
            }
        }

        deserializer.deserialize_map(RawObjectVisitor)
    }
}

impl Serialize for RawObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.members.len()))?;
        for (name, value) in &self.members {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Plaintext of a password value, or an error when it is not a string.
fn plaintext(value: &RawValue) -> Result<String, BodyRewriteError> {
    serde_json::from_str::<String>(value.get())
        .map_err(|_| BodyRewriteError::NotString(PASSWORD_FIELD.to_string()))
}

/// Parse a body as a JSON object, keeping member order and raw values.
pub fn parse_object(body: &[u8]) -> Result<RawObject, BodyRewriteError> {
    let raw: &RawValue = serde_json::from_slice(body).map_err(BodyRewriteError::NotJson)?;
    RawObject::from_raw(raw)
        .map_err(BodyRewriteError::NotJson)?
        .ok_or(BodyRewriteError::NotObject)
}

/// Replace the password at `location` with its bcrypt hash.
///
/// Returns freshly serialized bytes; the input is left untouched. When the
/// field is absent the document is re-serialized as-is.
pub async fn rewrite_password(
    body: &[u8],
    location: &FieldLocation,
    hasher: &PasswordHasher,
) -> Result<Bytes, BodyRewriteError> {
    let mut document = parse_object(body)?;

    match location {
        FieldLocation::TopLevel => {
            hash_member(&mut document, hasher).await?;
        }
        FieldLocation::Guarded { guard } => {
            if document.contains_key(guard) {
                hash_member(&mut document, hasher).await?;
            }
        }
        FieldLocation::Nested { parent } => {
            let inner = match document.get(parent) {
                Some(value) => RawObject::from_raw(value).map_err(BodyRewriteError::NotJson)?,
                None => None,
            };
            if let Some(mut inner) = inner {
                if hash_member(&mut inner, hasher).await? {
                    let raw = inner.to_raw().map_err(BodyRewriteError::Serialize)?;
                    document.set(parent, raw);
                }
            }
        }
    }

    serde_json::to_vec(&document)
        .map(Bytes::from)
        .map_err(BodyRewriteError::Serialize)
}

/// Hash `password` in place; `false` when the object has none.
async fn hash_member(object: &mut RawObject, hasher: &PasswordHasher) -> Result<bool, BodyRewriteError> {
    let Some(value) = object.get(PASSWORD_FIELD) else {
        return Ok(false);
    };
    let hashed = hasher.hash(plaintext(value)?).await?;
    let raw = to_raw_value(&hashed).map_err(BodyRewriteError::Serialize)?;
    object.set(PASSWORD_FIELD, raw);
    Ok(true)
}
