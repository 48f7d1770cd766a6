//! Mapping between property dictionaries and typed structures.
//!
//! Every structure that can be decoded from, or encoded to, a
//! [`PropertyDict`] carries a field table generated by [`property_map!`]:
//! one entry per field, naming the property key and the field's declared
//! [`VariantType`]. The table is checked at build time, so a renamed field
//! cannot silently stop matching its property.
//!
//! Decoding strips separator punctuation from incoming keys, so the wire
//! property `IPv4.Configuration` lands in the field declared as
//! `IPv4Configuration`. A nested dictionary is decoded recursively into the
//! field's structure type; any other value must match the declared type
//! exactly.

use std::borrow::Cow;

use crate::api::models::CodecError;
use crate::codec::variant::{ObjectPath, PropertyDict, Variant, VariantType};

/// A type that can be the value of a property.
pub trait Property: Sized {
    /// The declared wire type of fields of this type.
    const TYPE: VariantType;

    /// Wraps the current value as a [`Variant`].
    fn to_variant(&self) -> Result<Variant, CodecError>;

    /// Extracts a value of this type for the property `field`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] if `value` has another type.
    fn from_variant(field: &str, value: Variant) -> Result<Self, CodecError>;

    /// Encodes a struct-shaped value into a dictionary.
    ///
    /// Returns `None` for scalar values.
    fn encode_struct(&self) -> Option<Result<PropertyDict, CodecError>> {
        None
    }
}

/// A structure with a property field table.
///
/// Implemented by [`property_map!`]; not meant to be written by hand.
pub trait PropertyMap: Property + Default {
    /// Normalized property names, in declaration order.
    const FIELDS: &'static [&'static str];

    /// Assigns the field whose name equals the normalized `key`.
    ///
    /// # Errors
    ///
    /// [`CodecError::NoSuchField`] if no field is named `key`,
    /// [`CodecError::NotSettable`] if the field is read-only, or any error
    /// from converting `value` to the field's type.
    fn set_property(&mut self, key: &str, value: Variant) -> Result<(), CodecError>;

    /// Encodes every field, recursing into nested structures.
    fn to_dict(&self) -> Result<PropertyDict, CodecError>;
}

/// Strips separator punctuation from a property name.
///
/// `"IPv4.Configuration"` becomes `"IPv4Configuration"`. Every ASCII
/// punctuation character counts as a separator, not only `.`, so field
/// table keys never contain punctuation of their own.
pub fn normalize_key(key: &str) -> Cow<'_, str> {
    if key.chars().any(|c| c.is_ascii_punctuation()) {
        Cow::Owned(key.chars().filter(|c| !c.is_ascii_punctuation()).collect())
    } else {
        Cow::Borrowed(key)
    }
}

/// Builds a `T` from a property dictionary.
///
/// Either every key is applied or an error is returned; a partially
/// populated value never escapes.
///
/// # Errors
///
/// Fails on the first key that names no field of `T`, names a read-only
/// field, or carries a value of the wrong type.
pub fn decode<T: PropertyMap>(dict: PropertyDict) -> Result<T, CodecError> {
    let mut target = T::default();
    for (key, value) in dict {
        target.set_property(&normalize_key(&key), value)?;
    }
    Ok(target)
}

/// Encodes a struct-shaped value into a property dictionary.
///
/// # Errors
///
/// Returns [`CodecError::NotAStruct`] if `value` is not a structure with a
/// field table.
pub fn encode<T: Property>(value: &T) -> Result<PropertyDict, CodecError> {
    value
        .encode_struct()
        .unwrap_or(Err(CodecError::NotAStruct(T::TYPE)))
}

macro_rules! scalar_property {
    ($ty:ty, $tag:ident) => {
        impl Property for $ty {
            const TYPE: VariantType = VariantType::$tag;

            fn to_variant(&self) -> Result<Variant, CodecError> {
                Ok(Variant::$tag(self.clone()))
            }

            fn from_variant(field: &str, value: Variant) -> Result<Self, CodecError> {
                match value {
                    Variant::$tag(v) => Ok(v),
                    other => Err(CodecError::TypeMismatch {
                        field: field.to_string(),
                        expected: Self::TYPE,
                        found: other.variant_type(),
                    }),
                }
            }
        }
    };
}

scalar_property!(bool, Bool);
scalar_property!(u8, Byte);
scalar_property!(u16, UInt16);
scalar_property!(u64, UInt64);
scalar_property!(String, Str);
scalar_property!(ObjectPath, ObjectPath);
scalar_property!(Vec<String>, StrList);

impl<T: Property> Property for Box<T> {
    const TYPE: VariantType = T::TYPE;

    fn to_variant(&self) -> Result<Variant, CodecError> {
        (**self).to_variant()
    }

    fn from_variant(field: &str, value: Variant) -> Result<Self, CodecError> {
        T::from_variant(field, value).map(Box::new)
    }

    fn encode_struct(&self) -> Option<Result<PropertyDict, CodecError>> {
        (**self).encode_struct()
    }
}

/// Declares a structure together with its property field table.
///
/// Each field names the normalized property key it maps to. A field marked
/// `[readonly]` is encoded but refuses assignment from a dictionary.
///
/// ```
/// connmanrs::property_map! {
///     #[derive(Debug, Clone, Default, PartialEq, Eq)]
///     pub struct Link {
///         pub name: String => "Name",
///         pub mtu: u16 => "MTU",
///     }
/// }
///
/// let mut dict = connmanrs::PropertyDict::new();
/// dict.insert("MTU".into(), 1500u16.into());
/// let link: Link = connmanrs::decode(dict).unwrap();
/// assert_eq!(link.mtu, 1500);
/// ```
#[macro_export]
macro_rules! property_map {
    (@assign $self:ident, $field:ident, $key:literal, $value:ident, readonly) => {{
        let _ = $value;
        Err($crate::CodecError::NotSettable($key.to_string()))
    }};
    (@assign $self:ident, $field:ident, $key:literal, $value:ident,) => {{
        $self.$field = $crate::Property::from_variant($key, $value)?;
        Ok(())
    }};
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty => $key:literal $([$access:ident])?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Property for $name {
            const TYPE: $crate::VariantType = $crate::VariantType::Dict;

            fn to_variant(&self) -> ::std::result::Result<$crate::Variant, $crate::CodecError> {
                $crate::PropertyMap::to_dict(self).map($crate::Variant::Dict)
            }

            fn from_variant(
                field: &str,
                value: $crate::Variant,
            ) -> ::std::result::Result<Self, $crate::CodecError> {
                match value {
                    $crate::Variant::Dict(dict) => $crate::decode(dict),
                    other => Err($crate::CodecError::TypeMismatch {
                        field: field.to_string(),
                        expected: $crate::VariantType::Dict,
                        found: other.variant_type(),
                    }),
                }
            }

            fn encode_struct(
                &self,
            ) -> ::std::option::Option<::std::result::Result<$crate::PropertyDict, $crate::CodecError>> {
                Some($crate::PropertyMap::to_dict(self))
            }
        }

        impl $crate::PropertyMap for $name {
            const FIELDS: &'static [&'static str] = &[$($key),*];

            fn set_property(
                &mut self,
                key: &str,
                value: $crate::Variant,
            ) -> ::std::result::Result<(), $crate::CodecError> {
                match key {
                    $(
                        $key => $crate::property_map!(@assign self, $field, $key, value, $($access)?),
                    )*
                    _ => Err($crate::CodecError::NoSuchField(key.to_string())),
                }
            }

            fn to_dict(&self) -> ::std::result::Result<$crate::PropertyDict, $crate::CodecError> {
                let mut dict = $crate::PropertyDict::with_capacity(Self::FIELDS.len());
                $(
                    dict.insert(
                        $key.to_string(),
                        $crate::Property::to_variant(&self.$field)?,
                    );
                )*
                Ok(dict)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::property_map! {
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        struct Inner {
            method: String => "Method",
            prefix: u8 => "PrefixLength",
        }
    }

    crate::property_map! {
        #[derive(Debug, Clone, Default, PartialEq, Eq)]
        struct Outer {
            path: ObjectPath => "Path",
            name: String => "Name",
            enabled: bool => "Enabled",
            mtu: u16 => "MTU",
            time: u64 => "Time",
            servers: Vec<String> => "Servers",
            current: Inner => "IPv6",
            requested: Inner => "IPv6Configuration",
            generation: u64 => "Generation" [readonly],
        }
    }

    fn sample() -> Outer {
        Outer {
            path: "/net/connman/service/ethernet_0".into(),
            name: "Wired".into(),
            enabled: true,
            mtu: 1500,
            time: 1_718_454_600,
            servers: vec!["ntp1".into(), "ntp2".into()],
            current: Inner {
                method: "auto".into(),
                prefix: 64,
            },
            requested: Inner {
                method: "manual".into(),
                prefix: 48,
            },
            generation: 0,
        }
    }

    #[test]
    fn normalize_key_strips_dots() {
        assert_eq!(normalize_key("IPv4.Configuration"), "IPv4Configuration");
        assert_eq!(normalize_key("Name"), "Name");
        assert!(matches!(normalize_key("Name"), Cow::Borrowed(_)));
    }

    #[test]
    fn normalize_key_strips_every_separator() {
        assert_eq!(normalize_key("Tethering-Freq"), "TetheringFreq");
        assert_eq!(normalize_key("mDNS_Configuration"), "mDNSConfiguration");
        assert_eq!(normalize_key("a.b/c"), "abc");
    }

    #[test]
    fn decode_assigns_every_key() {
        let mut dict = PropertyDict::new();
        dict.insert("Name".into(), Variant::from("Wired"));
        dict.insert("MTU".into(), Variant::from(1500u16));
        dict.insert(
            "Servers".into(),
            Variant::from(vec!["a".to_string(), "b".to_string()]),
        );

        let outer: Outer = decode(dict).unwrap();
        assert_eq!(outer.name, "Wired");
        assert_eq!(outer.mtu, 1500);
        assert_eq!(outer.servers, vec!["a", "b"]);
        assert!(!outer.enabled);
    }

    #[test]
    fn decode_maps_dotted_key_to_joined_field() {
        let mut inner = PropertyDict::new();
        inner.insert("Method".into(), Variant::from("manual"));

        let mut dict = PropertyDict::new();
        dict.insert("IPv6.Configuration".into(), Variant::Dict(inner));

        let outer: Outer = decode(dict).unwrap();
        assert_eq!(outer.requested.method, "manual");
        assert_eq!(outer.current, Inner::default());
    }

    #[test]
    fn decode_rejects_unknown_key() {
        let mut dict = PropertyDict::new();
        dict.insert("Bogus".into(), Variant::Bool(true));

        let err = decode::<Outer>(dict).unwrap_err();
        assert!(matches!(err, CodecError::NoSuchField(name) if name == "Bogus"));
    }

    #[test]
    fn decode_is_case_sensitive() {
        let mut dict = PropertyDict::new();
        dict.insert("name".into(), Variant::from("x"));

        assert!(matches!(
            decode::<Outer>(dict),
            Err(CodecError::NoSuchField(_))
        ));
    }

    #[test]
    fn decode_rejects_readonly_field() {
        let mut dict = PropertyDict::new();
        dict.insert("Generation".into(), Variant::UInt64(7));

        let err = decode::<Outer>(dict).unwrap_err();
        assert!(matches!(err, CodecError::NotSettable(name) if name == "Generation"));
    }

    #[test]
    fn decode_rejects_type_mismatch() {
        let mut dict = PropertyDict::new();
        dict.insert("Enabled".into(), Variant::from("yes"));

        match decode::<Outer>(dict).unwrap_err() {
            CodecError::TypeMismatch {
                field,
                expected,
                found,
            } => {
                assert_eq!(field, "Enabled");
                assert_eq!(expected, VariantType::Bool);
                assert_eq!(found, VariantType::Str);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn decode_does_not_widen_integers() {
        let mut dict = PropertyDict::new();
        dict.insert("MTU".into(), Variant::Byte(200));

        assert!(matches!(
            decode::<Outer>(dict),
            Err(CodecError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn nested_dict_into_scalar_field_is_a_mismatch() {
        let mut dict = PropertyDict::new();
        dict.insert("Name".into(), Variant::Dict(PropertyDict::new()));

        assert!(matches!(
            decode::<Outer>(dict),
            Err(CodecError::TypeMismatch {
                expected: VariantType::Str,
                found: VariantType::Dict,
                ..
            })
        ));
    }

    #[test]
    fn error_inside_nested_dict_aborts_decode() {
        let mut inner = PropertyDict::new();
        inner.insert("PrefixLength".into(), Variant::from("64"));

        let mut dict = PropertyDict::new();
        dict.insert("Name".into(), Variant::from("Wired"));
        dict.insert("IPv6".into(), Variant::Dict(inner));

        assert!(decode::<Outer>(dict).is_err());
    }

    #[test]
    fn encode_uses_declared_names_and_nests_structs() {
        let dict = encode(&sample()).unwrap();

        assert_eq!(dict.len(), Outer::FIELDS.len());
        assert_eq!(dict.get("MTU"), Some(&Variant::UInt16(1500)));
        assert_eq!(
            dict.get("Path"),
            Some(&Variant::ObjectPath("/net/connman/service/ethernet_0".into()))
        );
        let Some(Variant::Dict(requested)) = dict.get("IPv6Configuration") else {
            panic!("nested struct must encode as a dictionary");
        };
        assert_eq!(requested.get("PrefixLength"), Some(&Variant::Byte(48)));
    }

    #[test]
    fn encode_sees_through_box() {
        let boxed = Box::new(sample());
        assert_eq!(encode(&boxed).unwrap(), encode(&sample()).unwrap());
    }

    #[test]
    fn encode_rejects_scalars() {
        assert!(matches!(
            encode(&42u64),
            Err(CodecError::NotAStruct(VariantType::UInt64))
        ));
        assert!(matches!(
            encode(&"x".to_string()),
            Err(CodecError::NotAStruct(VariantType::Str))
        ));
    }

    #[test]
    fn round_trip_without_readonly_fields() {
        let original = sample();
        let mut dict = encode(&original).unwrap();
        dict.remove("Generation");

        let decoded: Outer = decode(dict).unwrap();
        assert_eq!(decoded, original);
    }
}
