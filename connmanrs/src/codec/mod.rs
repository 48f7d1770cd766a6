//! Conversion between ConnMan property dictionaries and typed structures.
//!
//! The daemon describes every object as an `a{sv}` dictionary. This module
//! turns those dictionaries into [`Variant`] trees and maps them onto
//! structures declared with [`property_map!`](crate::property_map), and back.

pub(crate) mod dict;
pub(crate) mod variant;

pub use dict::{Property, PropertyMap, decode, encode, normalize_key};
pub use variant::{ObjectPath, PropertyDict, Variant, VariantType, dict_from_bus, dict_to_bus};
