//! Type definitions and constants.
//!
//! This module contains ConnMan D-Bus names and well-known values.

pub(crate) mod constants;
