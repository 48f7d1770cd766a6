//! Variant values as carried in ConnMan property dictionaries.
//!
//! ConnMan only ever uses a handful of D-Bus shapes for its properties:
//! booleans, bytes, 16- and 64-bit unsigned integers, strings, object paths,
//! arrays of strings and nested `a{sv}` dictionaries. [`Variant`] is a closed
//! sum type over exactly those shapes, so every conversion to and from
//! [`zvariant::Value`] is an explicit match on the tag.

use std::collections::HashMap;
use std::fmt;

use zvariant::{OwnedValue, Value};

use crate::api::models::CodecError;

/// Mapping from property name to value. The wire form of an entity's state.
pub type PropertyDict = HashMap<String, Variant>;

/// A D-Bus object path, as assigned by the daemon to services and technologies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
    /// Wraps a path string. Validity is checked when the path goes on the wire.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Returns the path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectPath {
    fn from(path: &str) -> Self {
        Self(path.to_string())
    }
}

impl From<String> for ObjectPath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl From<zvariant::OwnedObjectPath> for ObjectPath {
    fn from(path: zvariant::OwnedObjectPath) -> Self {
        Self(path.as_str().to_string())
    }
}

impl AsRef<str> for ObjectPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A dynamically typed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// `b`
    Bool(bool),
    /// `y`
    Byte(u8),
    /// `q`
    UInt16(u16),
    /// `t`
    UInt64(u64),
    /// `s`
    Str(String),
    /// `o`
    ObjectPath(ObjectPath),
    /// `as`
    StrList(Vec<String>),
    /// `a{sv}`
    Dict(PropertyDict),
}

/// The tag of a [`Variant`], used for type checks and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantType {
    /// Boolean.
    Bool,
    /// Unsigned 8-bit integer.
    Byte,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Unsigned 64-bit integer.
    UInt64,
    /// UTF-8 string.
    Str,
    /// Object path.
    ObjectPath,
    /// Sequence of strings.
    StrList,
    /// Nested property dictionary.
    Dict,
}

impl VariantType {
    /// The D-Bus signature of values with this tag.
    pub fn signature(self) -> &'static str {
        match self {
            Self::Bool => "b",
            Self::Byte => "y",
            Self::UInt16 => "q",
            Self::UInt64 => "t",
            Self::Str => "s",
            Self::ObjectPath => "o",
            Self::StrList => "as",
            Self::Dict => "a{sv}",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Byte => "u8",
            Self::UInt16 => "u16",
            Self::UInt64 => "u64",
            Self::Str => "string",
            Self::ObjectPath => "object path",
            Self::StrList => "string list",
            Self::Dict => "dictionary",
        };
        write!(f, "{} `{}`", name, self.signature())
    }
}

impl Variant {
    /// Returns the tag of this value.
    pub fn variant_type(&self) -> VariantType {
        match self {
            Self::Bool(_) => VariantType::Bool,
            Self::Byte(_) => VariantType::Byte,
            Self::UInt16(_) => VariantType::UInt16,
            Self::UInt64(_) => VariantType::UInt64,
            Self::Str(_) => VariantType::Str,
            Self::ObjectPath(_) => VariantType::ObjectPath,
            Self::StrList(_) => VariantType::StrList,
            Self::Dict(_) => VariantType::Dict,
        }
    }

    /// Returns the string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts this value into a `zvariant::Value` ready to be sent.
    ///
    /// Fails only when an object path is not a valid D-Bus path.
    pub fn into_bus_value(self) -> Result<Value<'static>, CodecError> {
        Ok(match self {
            Self::Bool(b) => Value::from(b),
            Self::Byte(n) => Value::from(n),
            Self::UInt16(n) => Value::from(n),
            Self::UInt64(n) => Value::from(n),
            Self::Str(s) => Value::from(s),
            Self::ObjectPath(p) => Value::from(zvariant::ObjectPath::try_from(p.0)?),
            Self::StrList(items) => Value::from(items),
            Self::Dict(dict) => Value::from(dict_to_bus(dict)?),
        })
    }
}

impl From<bool> for Variant {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<u8> for Variant {
    fn from(n: u8) -> Self {
        Self::Byte(n)
    }
}

impl From<u16> for Variant {
    fn from(n: u16) -> Self {
        Self::UInt16(n)
    }
}

impl From<u64> for Variant {
    fn from(n: u64) -> Self {
        Self::UInt64(n)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Variant {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<ObjectPath> for Variant {
    fn from(p: ObjectPath) -> Self {
        Self::ObjectPath(p)
    }
}

impl From<Vec<String>> for Variant {
    fn from(items: Vec<String>) -> Self {
        Self::StrList(items)
    }
}

impl From<PropertyDict> for Variant {
    fn from(dict: PropertyDict) -> Self {
        Self::Dict(dict)
    }
}

impl TryFrom<&Value<'_>> for Variant {
    type Error = CodecError;

    fn try_from(value: &Value<'_>) -> Result<Self, Self::Error> {
        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::U8(n) => Ok(Self::Byte(*n)),
            Value::U16(n) => Ok(Self::UInt16(*n)),
            Value::U64(n) => Ok(Self::UInt64(*n)),
            Value::Str(s) => Ok(Self::Str(s.to_string())),
            Value::ObjectPath(p) => Ok(Self::ObjectPath(ObjectPath::new(p.as_str()))),
            // Values nested inside an `a{sv}` arrive boxed in a variant.
            Value::Value(inner) => Self::try_from(&**inner),
            // The element signature decides, so an empty `au` is not an `as`.
            Value::Array(array) => match array.element_signature().to_string().as_str() {
                "s" | "v" => array
                    .inner()
                    .iter()
                    .map(string_item)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Self::StrList),
                other => Err(CodecError::UnsupportedValue(format!("a{other}"))),
            },
            Value::Dict(_) => {
                let map = HashMap::<String, OwnedValue>::try_from(value.try_clone()?)?;
                dict_from_bus(map).map(Self::Dict)
            }
            other => Err(CodecError::UnsupportedValue(
                other.value_signature().to_string(),
            )),
        }
    }
}

impl TryFrom<OwnedValue> for Variant {
    type Error = CodecError;

    fn try_from(value: OwnedValue) -> Result<Self, Self::Error> {
        Self::try_from(&*value)
    }
}

fn string_item(item: &Value<'_>) -> Result<String, CodecError> {
    match item {
        Value::Str(s) => Ok(s.to_string()),
        Value::Value(inner) => string_item(inner),
        other => Err(CodecError::UnsupportedValue(format!(
            "a{}",
            other.value_signature()
        ))),
    }
}

/// Converts a dictionary received from the bus into a [`PropertyDict`].
pub fn dict_from_bus(map: HashMap<String, OwnedValue>) -> Result<PropertyDict, CodecError> {
    map.into_iter()
        .map(|(key, value)| Ok((key, Variant::try_from(value)?)))
        .collect()
}

/// Converts a [`PropertyDict`] into an `a{sv}` map ready to be sent.
pub fn dict_to_bus(dict: PropertyDict) -> Result<HashMap<String, Value<'static>>, CodecError> {
    dict.into_iter()
        .map(|(key, value)| Ok((key, value.into_bus_value()?)))
        .collect()
}
